//! External media downloader invocation
//!
//! The fetch worker talks to the downloader through the [`MediaDownloader`]
//! trait. [`CliDownloader`] drives a youtube-dl compatible binary; tests plug in
//! their own implementations.

mod cli;
mod traits;

pub use cli::CliDownloader;
pub use traits::MediaDownloader;
