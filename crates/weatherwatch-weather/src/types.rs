use serde::{Deserialize, Serialize};
use weatherwatch_core::NetworkError;

/// Geographic coordinates produced by the resolver for one ingestion cycle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

impl std::fmt::Display for Coordinates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.4}, {:.4})", self.latitude, self.longitude)
    }
}

/// A geocoding match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub name: String,
    #[serde(default)]
    pub country: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
}

impl Place {
    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }
}

/// Current conditions as reported by the forecast service.
///
/// `time` is kept verbatim (`YYYY-MM-DDTHH:MM`); turning it into a timestamp
/// is the caller's job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub time: String,
    pub temperature_celsius: f64,
}

/// Upstream client errors
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),
    #[error("{service} returned status {status}")]
    Status { service: &'static str, status: u16 },
    #[error("No geocoding match for '{0}'")]
    LocationNotFound(String),
    #[error("Parse error: {0}")]
    Parse(String),
}

impl UpstreamError {
    /// Transient faults are worth trying again on the next tick; data errors
    /// will most likely repeat until the upstream or the config changes.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network(e) => e.is_transport(),
            Self::Status { status, .. } => *status >= 500 || *status == 429,
            Self::LocationNotFound(_) | Self::Parse(_) => false,
        }
    }
}
