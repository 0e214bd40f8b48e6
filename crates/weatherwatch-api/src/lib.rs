//! HTTP query surface: `GET /{location}` returns the latest reading.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use weatherwatch_core::location_key;
use weatherwatch_store::ReadingView;

const NOT_FOUND_BODY: &str = "not found";

/// Shared state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub readings: ReadingView,
}

/// GET /{location} - Latest reading for a location
async fn latest_reading(State(state): State<AppState>, Path(location): Path<String>) -> Response {
    let key = location_key(&location);
    if key.is_empty() {
        return (StatusCode::NOT_FOUND, NOT_FOUND_BODY).into_response();
    }

    match state.readings.latest(&key).await {
        Ok(Some(reading)) => Json(reading).into_response(),
        Ok(None) => {
            tracing::debug!("No reading for '{}'", key);
            (StatusCode::NOT_FOUND, NOT_FOUND_BODY).into_response()
        }
        Err(e) => {
            tracing::error!("Reading lookup for '{}' failed: {}", key, e);
            (StatusCode::INTERNAL_SERVER_ERROR, "store unavailable").into_response()
        }
    }
}

/// Any route other than a single location segment.
async fn not_found() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, NOT_FOUND_BODY)
}

/// Create the HTTP router
pub fn create_router(readings: ReadingView) -> Router {
    let state = AppState { readings };

    Router::new()
        .route("/{location}", get(latest_reading))
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve on an already-bound listener until `shutdown` is cancelled.
pub async fn serve(
    listener: TcpListener,
    readings: ReadingView,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    let backend = readings.backend_name();
    let app = create_router(readings);

    if let Ok(addr) = listener.local_addr() {
        tracing::info!("HTTP server listening on {} ({} store)", addr, backend);
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    tracing::info!("HTTP server stopped");
    Ok(())
}
