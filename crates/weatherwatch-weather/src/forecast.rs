//! Current conditions from the Open-Meteo forecast API.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::instrument;
use weatherwatch_core::ReqwestErrorExt;

use crate::types::{Coordinates, Observation, UpstreamError};

const SERVICE: &str = "forecast";

/// Fetches the current observation at a pair of coordinates.
#[async_trait]
pub trait WeatherFetcher: Send + Sync {
    async fn fetch(&self, coordinates: Coordinates) -> Result<Observation, UpstreamError>;
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    current: CurrentBlock,
}

#[derive(Debug, Deserialize)]
struct CurrentBlock {
    time: String,
    temperature_2m: f64,
}

#[derive(Debug, Clone)]
pub struct OpenMeteoClient {
    client: Client,
    base_url: String,
}

impl OpenMeteoClient {
    pub fn new(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.to_string(),
        }
    }
}

#[async_trait]
impl WeatherFetcher for OpenMeteoClient {
    #[instrument(skip(self), level = "debug")]
    async fn fetch(&self, coordinates: Coordinates) -> Result<Observation, UpstreamError> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("latitude", coordinates.latitude.to_string()),
                ("longitude", coordinates.longitude.to_string()),
                ("current", "temperature_2m".to_string()),
            ])
            .send()
            .await
            .map_err(|e| UpstreamError::Network(e.into_network_error()))?;

        let status = response.status();
        if !status.is_success() {
            tracing::debug!("Forecast returned status {}", status);
            return Err(UpstreamError::Status {
                service: SERVICE,
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| UpstreamError::Network(e.into_network_error()))?;

        let parsed: ForecastResponse = serde_json::from_slice(&body)
            .map_err(|e| UpstreamError::Parse(format!("forecast response: {}", e)))?;

        Ok(Observation {
            time: parsed.current.time,
            temperature_celsius: parsed.current.temperature_2m,
        })
    }
}
