use argh::FromArgs;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use weatherwatch_core::{AppError, Config, StorageBackend};
use weatherwatch_ingest::{IngestionPipeline, Scheduler};
use weatherwatch_store::{ReadingStore, SqliteReadingStore};
use weatherwatch_weather::WeatherProvider;

#[derive(FromArgs)]
/// Periodically ingest current temperatures and serve the latest reading per location
struct Args {
    /// path to the configuration file (default: <config dir>/weatherwatch/config.toml)
    #[argh(option, short = 'c')]
    config: Option<PathBuf>,

    /// port to listen on, overriding the configuration file
    #[argh(option, short = 'p')]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    weatherwatch_core::init()?;

    let args: Args = argh::from_env();

    let (mut config, _) = Config::load_validated(args.config.as_deref())?;
    if let Some(port) = args.port {
        if port == 0 {
            return Err(AppError::startup("--port must be greater than 0").into());
        }
        config.server.port = port;
    }

    if let Err(e) = run(config).await {
        tracing::error!("{}", e);
        return Err(e.into());
    }
    Ok(())
}

fn open_store(config: &Config) -> Result<ReadingStore, AppError> {
    match config.storage.backend {
        StorageBackend::Memory => Ok(ReadingStore::memory()),
        StorageBackend::Sqlite => {
            let path = config.storage.database_path();
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let store = SqliteReadingStore::open(&path).map_err(|e| {
                AppError::startup(format!("cannot open {}: {}", path.display(), e))
            })?;
            tracing::info!("Persisting readings to {}", path.display());
            Ok(ReadingStore::sqlite(store))
        }
    }
}

/// Wire the store, scheduler and HTTP server, then run until a shutdown signal.
async fn run(config: Config) -> Result<(), AppError> {
    let store = open_store(&config)?;
    let provider = WeatherProvider::new(&config.upstream)?;
    let pipeline = IngestionPipeline::new(provider.geocoding, provider.forecast, store.clone());

    let scheduler = Scheduler::from_names(
        pipeline,
        config.ingest.locations.as_slice(),
        config.ingest.interval(),
    )
    .map_err(|e| AppError::startup(e.to_string()))?;

    let listener = TcpListener::bind(config.server.bind_addr()).await?;

    let shutdown = CancellationToken::new();
    let scheduler = scheduler.spawn(shutdown.clone());
    let server = tokio::spawn(weatherwatch_api::serve(
        listener,
        store.reader(),
        shutdown.clone(),
    ));

    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            shutdown_signal().await;
            shutdown.cancel();
        }
    });

    let served = server
        .await
        .map_err(|e| AppError::startup(format!("HTTP server task failed: {}", e)));
    // The server only returns early on error; make sure ingestion stops too.
    shutdown.cancel();

    if let Err(e) = scheduler.join().await {
        tracing::warn!("Scheduler task ended abnormally: {}", e);
    }
    served??;

    tracing::info!("Shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {},
                    _ = sigterm.recv() => {},
                }
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {}", e);
                let _ = ctrl_c.await;
            }
        }
    }

    #[cfg(not(unix))]
    if let Err(e) = ctrl_c.await {
        tracing::warn!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }

    tracing::info!("Shutdown signal received");
}
