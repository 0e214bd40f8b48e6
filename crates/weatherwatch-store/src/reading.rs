use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A single temperature observation for one location.
///
/// Readings are immutable: fields are only reachable through accessors and a
/// reading is replaced as a whole, never patched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    location: String,
    observed_at: NaiveDateTime,
    temperature_celsius: f64,
}

impl Reading {
    pub fn new(
        location: impl Into<String>,
        observed_at: NaiveDateTime,
        temperature_celsius: f64,
    ) -> Self {
        Self {
            location: location.into(),
            observed_at,
            temperature_celsius,
        }
    }

    /// Store key this reading belongs to.
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Observation time in the upstream's local time, no timezone.
    pub fn observed_at(&self) -> NaiveDateTime {
        self.observed_at
    }

    pub fn temperature_celsius(&self) -> f64 {
        self.temperature_celsius
    }
}
