//! Trait for the external media downloader

use async_trait::async_trait;
use std::path::Path;

/// Trait for fetching media behind an upstream URI
///
/// Implementations write exactly one file named `<output_prefix>.<ext>`, where
/// the extension is chosen by the tool. Callers locate the result by prefix.
///
/// # Examples
///
/// ```no_run
/// use rss_reflector::tool::{CliDownloader, MediaDownloader};
/// use std::path::{Path, PathBuf};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let downloader = CliDownloader::new(PathBuf::from("youtube-dl"), "--extract-audio")?;
/// println!("using {}", downloader.probe().await?);
///
/// downloader
///     .download(
///         "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
///         Path::new("/tmp/youtube__watch?v=dQw4w9WgXcQ"),
///     )
///     .await?;
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait MediaDownloader: Send + Sync {
    /// Check that the tool can run, returning its version string
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::ToolUnavailable`] when the tool is missing or broken.
    async fn probe(&self) -> crate::Result<String>;

    /// Download `uri` to `<output_prefix>.<ext>`
    ///
    /// This runs to completion; it is never cancelled on behalf of a caller.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::DownloadFailed`] with the tool's output when it
    /// exits unsuccessfully.
    async fn download(&self, uri: &str, output_prefix: &Path) -> crate::Result<()>;

    /// Get the name of this implementation
    fn name(&self) -> &'static str;
}
