//! Configuration types for rss-reflector

use crate::error::{Error, Result};
use crate::types::Source;
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::Path, path::PathBuf, time::Duration};

/// Main configuration for the reflector
///
/// Every field has a default, so an empty TOML file is a valid configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Fetch queue, downloader and cache settings
    #[serde(default)]
    pub fetcher: FetcherConfig,

    /// Upstream feed settings
    #[serde(default)]
    pub feed: FeedConfig,
}

impl Config {
    /// Load a configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be read and [`Error::Config`] if
    /// it is not valid TOML for this structure.
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parse a configuration from a TOML string
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| Error::Config {
            message: e.to_string(),
            key: None,
        })
    }

    /// Check settings that serde cannot express
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] naming the offending key.
    pub fn validate(&self) -> Result<()> {
        self.fetcher.validate()
    }
}

/// HTTP server configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to listen on (default: 0.0.0.0:3322)
    #[serde(default = "default_bind_address")]
    pub bind_address: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
        }
    }
}

/// Fetch queue configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FetcherConfig {
    /// Base data directory; the cache lives in `<data_dir>/fetcher` (default: "data")
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Downloader binary, either a path or a name looked up on PATH (default: "youtube-dl")
    #[serde(default = "default_downloader")]
    pub downloader: PathBuf,

    /// Extra downloader flags, split with shell quoting rules
    #[serde(default = "default_downloader_flags")]
    pub downloader_flags: String,

    /// Maximum number of cached media files (default: 20)
    #[serde(default = "default_max_cached_files")]
    pub max_cached_files: usize,

    /// Sources the fetcher will serve (default: all known sources)
    #[serde(default = "default_sources")]
    pub sources: Vec<Source>,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            downloader: default_downloader(),
            downloader_flags: default_downloader_flags(),
            max_cached_files: default_max_cached_files(),
            sources: default_sources(),
        }
    }
}

impl FetcherConfig {
    /// Check fetcher settings
    pub fn validate(&self) -> Result<()> {
        if self.max_cached_files == 0 {
            return Err(Error::config(
                "max_cached_files",
                "max_cached_files must be at least 1",
            ));
        }
        if shlex::split(&self.downloader_flags).is_none() {
            return Err(Error::config(
                "downloader_flags",
                format!("cannot split downloader flags: {}", self.downloader_flags),
            ));
        }
        Ok(())
    }
}

/// Upstream feed configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Timeout for upstream feed requests (default: 30 seconds)
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub request_timeout: Duration,

    /// User agent sent upstream
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// MIME type advertised for reflected media, in enclosures and on served files
    #[serde(default = "default_content_mime_type")]
    pub content_mime_type: String,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            request_timeout: default_request_timeout(),
            user_agent: default_user_agent(),
            content_mime_type: default_content_mime_type(),
        }
    }
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 3322))
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_downloader() -> PathBuf {
    PathBuf::from("youtube-dl")
}

fn default_downloader_flags() -> String {
    r#"--extract-audio --audio-format mp3 --postprocessor-args "-strict experimental""#.to_string()
}

fn default_max_cached_files() -> usize {
    20
}

fn default_sources() -> Vec<Source> {
    Source::ALL.to_vec()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_user_agent() -> String {
    format!("rss-reflector/{}", env!("CARGO_PKG_VERSION"))
}

fn default_content_mime_type() -> String {
    "audio/mpeg".to_string()
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
