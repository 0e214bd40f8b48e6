pub mod config;
pub mod error;
pub mod location;

pub use config::{
    Config, IngestConfig, ServerConfig, StorageBackend, StorageConfig, UpstreamConfig,
    ValidationResult,
};
pub use error::{
    AppError, ConfigError, DatabaseError, NetworkError, ReqwestErrorExt, RusqliteErrorExt,
};
pub use location::location_key;

use anyhow::Result;

/// Initialize process-wide logging.
///
/// Reads the filter from `RUST_LOG`, falling back to `info`.
pub fn init() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    tracing::info!("weatherwatch core initialized");
    Ok(())
}
