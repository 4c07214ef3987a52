//! Application state for the HTTP server

use crate::{Config, FeedReflector, Fetcher};
use std::sync::Arc;

/// Shared application state accessible to all route handlers
///
/// Cloned for each request; every field is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// The fetch queue serving `/content` requests
    pub fetcher: Arc<Fetcher>,

    /// Upstream feed reflector serving `/rss` requests
    pub reflector: Arc<FeedReflector>,

    /// Effective configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Create a new AppState
    pub fn new(fetcher: Arc<Fetcher>, reflector: Arc<FeedReflector>, config: Arc<Config>) -> Self {
        Self {
            fetcher,
            reflector,
            config,
        }
    }
}
