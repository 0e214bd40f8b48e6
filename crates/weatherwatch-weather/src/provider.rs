use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use weatherwatch_core::{NetworkError, ReqwestErrorExt, UpstreamConfig};

use crate::forecast::OpenMeteoClient;
use crate::geocode::GeocodingClient;

const USER_AGENT: &str = concat!("weatherwatch/", env!("CARGO_PKG_VERSION"));

/// Both upstream clients, sharing one connection pool and one timeout.
#[derive(Debug, Clone)]
pub struct WeatherProvider {
    pub geocoding: Arc<GeocodingClient>,
    pub forecast: Arc<OpenMeteoClient>,
}

impl WeatherProvider {
    pub fn new(config: &UpstreamConfig) -> Result<Self, NetworkError> {
        let client = http_client(config.timeout())?;

        Ok(Self {
            geocoding: Arc::new(GeocodingClient::new(
                client.clone(),
                &config.geocoding_url,
                &config.language,
            )),
            forecast: Arc::new(OpenMeteoClient::new(client, &config.forecast_url)),
        })
    }
}

/// Build the HTTP client used for every upstream call.
pub fn http_client(timeout: Duration) -> Result<Client, NetworkError> {
    Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| e.into_network_error())
}
