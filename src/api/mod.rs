//! HTTP server module
//!
//! Serves reflected feeds and the media they point at.

use crate::Result;
use axum::{Router, routing::get};
use std::future::Future;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

pub mod error_response;
pub mod routes;
pub mod state;

pub use state::AppState;

/// Create the router with all route definitions
///
/// # Routes
///
/// - `GET /rss/:source/*path` - Upstream feed reflected as RSS
/// - `GET /content/:source/*path` - Media for an upstream page, through the fetch queue
/// - `GET /health` - Health check
///
/// Everything else answers `404 rss-reflector not found`.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route(
            &format!("{}/:source/*path", routes::RSS_PREFIX),
            get(routes::reflect_feed),
        )
        .route(
            &format!("{}/:source/*path", routes::CONTENT_PREFIX),
            get(routes::serve_content),
        )
        .route("/health", get(routes::health_check))
        .fallback(routes::not_found)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Start the HTTP server on the configured bind address
///
/// Runs until `shutdown` completes, then stops accepting connections and
/// waits for in-flight requests.
///
/// # Example
///
/// ```no_run
/// use rss_reflector::{AppState, Config, FeedReflector, Fetcher};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = Arc::new(Config::default());
/// let fetcher = Arc::new(Fetcher::new(&config.fetcher).await?);
/// let reflector = Arc::new(FeedReflector::new(&config.feed)?);
/// let state = AppState::new(fetcher, reflector, config);
///
/// rss_reflector::api::start_server(state, rss_reflector::shutdown_signal()).await?;
/// # Ok(())
/// # }
/// ```
pub async fn start_server<F>(state: AppState, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let bind_address = state.config.server.bind_address;
    let listener = TcpListener::bind(bind_address)
        .await
        .map_err(crate::error::Error::Io)?;
    serve(listener, state, shutdown).await
}

/// Serve on an already-bound listener
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let address: SocketAddr = listener.local_addr()?;
    tracing::info!(address = %address, "HTTP server listening");

    let app = create_router(state);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| crate::error::Error::ServerError(e.to_string()))?;

    tracing::info!("HTTP server stopped");
    Ok(())
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
