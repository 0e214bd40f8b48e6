//! Upstream weather clients for weatherwatch.
//!
//! Two narrow interfaces sit between the ingestion pipeline and the network:
//! [`LocationResolver`] turns a place name into coordinates and
//! [`WeatherFetcher`] turns coordinates into a current observation. The
//! Open-Meteo implementations share one timeout-bounded HTTP client built by
//! [`WeatherProvider`].

pub mod forecast;
pub mod geocode;
pub mod provider;
pub mod types;

pub use forecast::{OpenMeteoClient, WeatherFetcher};
pub use geocode::{GeocodingClient, LocationResolver};
pub use provider::WeatherProvider;
pub use types::*;
