//! One ingestion cycle: resolve → fetch → parse → append.
//!
//! Any step failing aborts the cycle before the store is touched, so a cycle
//! either appends exactly one reading or nothing. There are no retries here;
//! the next scheduler tick is the retry.

use chrono::NaiveDateTime;
use std::sync::Arc;
use thiserror::Error;
use tracing::instrument;
use weatherwatch_core::location_key;
use weatherwatch_store::{Reading, ReadingStore, StoreError};
use weatherwatch_weather::{LocationResolver, UpstreamError, WeatherFetcher};

/// Format of the forecast service's `current.time` field.
pub const OBSERVATION_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M";

/// A configured location: the name sent upstream and the key it is stored under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedLocation {
    display_name: String,
    key: String,
}

impl TrackedLocation {
    pub fn new(display_name: impl Into<String>) -> Self {
        let display_name = display_name.into().trim().to_string();
        let key = location_key(&display_name);
        Self { display_name, key }
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

/// Which step of a cycle failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestStep {
    Resolve,
    Fetch,
    ParseTime,
    Append,
}

impl std::fmt::Display for IngestStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            IngestStep::Resolve => "resolve",
            IngestStep::Fetch => "fetch",
            IngestStep::ParseTime => "parse_time",
            IngestStep::Append => "append",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("resolving '{location}' failed: {source}")]
    Resolve {
        location: String,
        source: UpstreamError,
    },

    #[error("fetching weather for '{location}' failed: {source}")]
    Fetch {
        location: String,
        source: UpstreamError,
    },

    #[error("unparseable observation time '{value}' for '{location}': {source}")]
    Timestamp {
        location: String,
        value: String,
        source: chrono::ParseError,
    },

    #[error("storing reading for '{location}' failed: {source}")]
    Store {
        location: String,
        source: StoreError,
    },
}

impl IngestError {
    pub fn step(&self) -> IngestStep {
        match self {
            Self::Resolve { .. } => IngestStep::Resolve,
            Self::Fetch { .. } => IngestStep::Fetch,
            Self::Timestamp { .. } => IngestStep::ParseTime,
            Self::Store { .. } => IngestStep::Append,
        }
    }

    /// Store key of the location whose cycle failed.
    pub fn location(&self) -> &str {
        match self {
            Self::Resolve { location, .. }
            | Self::Fetch { location, .. }
            | Self::Timestamp { location, .. }
            | Self::Store { location, .. } => location,
        }
    }

    /// Transport hiccups versus upstream data-contract violations.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Resolve { source, .. } | Self::Fetch { source, .. } => source.is_transient(),
            Self::Timestamp { .. } => false,
            Self::Store { .. } => true,
        }
    }
}

pub struct IngestionPipeline {
    resolver: Arc<dyn LocationResolver>,
    fetcher: Arc<dyn WeatherFetcher>,
    store: ReadingStore,
}

impl IngestionPipeline {
    pub fn new(
        resolver: Arc<dyn LocationResolver>,
        fetcher: Arc<dyn WeatherFetcher>,
        store: ReadingStore,
    ) -> Self {
        Self {
            resolver,
            fetcher,
            store,
        }
    }

    /// Run one cycle for `location` and return the reading it appended.
    #[instrument(skip(self, location), fields(location = %location.key()), level = "debug")]
    pub async fn run_cycle(&self, location: &TrackedLocation) -> Result<Reading, IngestError> {
        let key = location.key();

        let coordinates = self
            .resolver
            .resolve(location.display_name())
            .await
            .map_err(|source| IngestError::Resolve {
                location: key.to_string(),
                source,
            })?;

        let observation = self
            .fetcher
            .fetch(coordinates)
            .await
            .map_err(|source| IngestError::Fetch {
                location: key.to_string(),
                source,
            })?;

        let observed_at =
            NaiveDateTime::parse_from_str(&observation.time, OBSERVATION_TIME_FORMAT).map_err(
                |source| IngestError::Timestamp {
                    location: key.to_string(),
                    value: observation.time.clone(),
                    source,
                },
            )?;

        let reading = Reading::new(key, observed_at, observation.temperature_celsius);

        self.store
            .append(reading.clone())
            .await
            .map_err(|source| IngestError::Store {
                location: key.to_string(),
                source,
            })?;

        tracing::info!(
            "Updated {}: {:.1}°C observed at {} {}",
            key,
            reading.temperature_celsius(),
            reading.observed_at(),
            coordinates
        );
        Ok(reading)
    }
}
