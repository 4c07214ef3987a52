//! # rss-reflector
//!
//! Reflects video channel feeds as podcast RSS and serves the media behind
//! them as audio files.
//!
//! Two halves make up the service:
//! - [`FeedReflector`] fetches an upstream feed and re-emits it with every item
//!   pointing back at this server;
//! - [`Fetcher`] turns those item links into cached media files. Downloads run
//!   one at a time through an external youtube-dl compatible tool, and the
//!   cache holds a bounded number of files with the oldest evicted first.
//!
//! ## Quick Start
//!
//! ```no_run
//! use rss_reflector::{Config, FetchRequest, Fetcher, Source};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let fetcher = Fetcher::new(&config.fetcher).await?;
//!
//!     let cancel = CancellationToken::new();
//!     let request = FetchRequest::new(Source::Youtube, "https://www.youtube.com/watch?v=abc");
//!     let lease = fetcher.submit_task(&cancel, request).await?;
//!     if let Some(path) = lease.path() {
//!         println!("cached at {}", path.display());
//!     }
//!     lease.finish();
//!
//!     fetcher.shutdown().await;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// HTTP server
pub mod api;
/// Media cache directory
pub mod cache;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Upstream feed reflection
pub mod feed;
/// Fetch task queue
pub mod fetcher;
/// External downloader invocation
pub mod tool;
/// Core request types
pub mod types;

// Re-export commonly used types
pub use api::AppState;
pub use cache::CacheDir;
pub use config::{Config, FeedConfig, FetcherConfig, ServerConfig};
pub use error::{Error, Result, ToHttpStatus};
pub use feed::{FeedReflector, LinkTarget};
pub use fetcher::{Fetcher, TaskLease, cache_prefix};
pub use tool::{CliDownloader, MediaDownloader};
pub use types::{FetchRequest, Source};

/// Resolve once the process receives a termination signal
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// Suitable as the shutdown future for [`api::start_server`].
pub async fn shutdown_signal() {
    wait_for_signal().await;
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Set up signal handlers - these may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) | (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register signal handlers, using ctrl_c fallback");
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
