//! Forward geocoding: convert a place name to coordinates.
//! Uses the Open-Meteo geocoding API - free, no API key required.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::instrument;
use weatherwatch_core::ReqwestErrorExt;

use crate::types::{Coordinates, Place, UpstreamError};

const SERVICE: &str = "geocoding";

/// Resolves a location display name to coordinates.
#[async_trait]
pub trait LocationResolver: Send + Sync {
    async fn resolve(&self, name: &str) -> Result<Coordinates, UpstreamError>;
}

/// The API omits `results` entirely when nothing matches.
#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Option<Vec<Place>>,
}

#[derive(Debug, Clone)]
pub struct GeocodingClient {
    client: Client,
    base_url: String,
    language: String,
}

impl GeocodingClient {
    pub fn new(client: Client, base_url: &str, language: &str) -> Self {
        Self {
            client,
            base_url: base_url.to_string(),
            language: language.to_string(),
        }
    }

    /// Look up the best match for `name`.
    ///
    /// Only the first result is considered; an empty or missing result list
    /// is reported as [`UpstreamError::LocationNotFound`].
    #[instrument(skip(self), level = "debug")]
    pub async fn search(&self, name: &str) -> Result<Place, UpstreamError> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("name", name),
                ("count", "1"),
                ("language", self.language.as_str()),
                ("format", "json"),
            ])
            .send()
            .await
            .map_err(|e| UpstreamError::Network(e.into_network_error()))?;

        let status = response.status();
        if !status.is_success() {
            tracing::debug!("Geocoding returned status {}", status);
            return Err(UpstreamError::Status {
                service: SERVICE,
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| UpstreamError::Network(e.into_network_error()))?;

        let parsed: SearchResponse = serde_json::from_slice(&body)
            .map_err(|e| UpstreamError::Parse(format!("geocoding response: {}", e)))?;

        let place = parsed
            .results
            .and_then(|results| results.into_iter().next())
            .ok_or_else(|| UpstreamError::LocationNotFound(name.to_string()))?;

        tracing::debug!(
            "Geocoded '{}' to {}{} at {}",
            name,
            place.name,
            place
                .country
                .as_ref()
                .map(|c| format!(", {}", c))
                .unwrap_or_default(),
            place.coordinates()
        );
        Ok(place)
    }
}

#[async_trait]
impl LocationResolver for GeocodingClient {
    async fn resolve(&self, name: &str) -> Result<Coordinates, UpstreamError> {
        self.search(name).await.map(|place| place.coordinates())
    }
}
