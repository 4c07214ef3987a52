//! Route handlers for the HTTP server
//!
//! Handlers are organized by domain:
//! - [`content`] - media files fetched through the queue
//! - [`feed`] - reflected upstream feeds
//! - [`system`] - health and fallback

mod content;
mod feed;
mod system;

pub use content::*;
pub use feed::*;
pub use system::*;

/// Path prefix of the content route
pub const CONTENT_PREFIX: &str = "/content";

/// Path prefix of the feed route
pub const RSS_PREFIX: &str = "/rss";
