//! Error types for rss-reflector
//!
//! This module provides the error taxonomy for the whole crate:
//! - Fetch task errors (unsupported source, cancelled submission, tool failures)
//! - Filesystem errors with the operation and path that failed
//! - Upstream feed errors (network, status, parse)
//! - HTTP status code mapping for the server layer

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for rss-reflector operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for rss-reflector
///
/// Errors produced while executing a fetch task are terminal for that task only;
/// the fetch worker keeps serving later submissions.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "max_cached_files")
        key: Option<String>,
    },

    /// The request targets a source that is unknown or not enabled
    #[error("source {0} unimplemented")]
    UnsupportedSource(String),

    /// The caller's cancellation fired before the worker accepted the request
    #[error("context done before task submitted")]
    SubmissionCancelled,

    /// The fetcher is shutting down and no longer accepts submissions
    #[error("shutdown in progress: not accepting new fetch tasks")]
    ShuttingDown,

    /// The downloader binary could not be run (startup probe or spawn failure)
    #[error("downloader {tool} unavailable: {reason}")]
    ToolUnavailable {
        /// The binary that was invoked
        tool: PathBuf,
        /// Why it could not be used
        reason: String,
    },

    /// The downloader exited unsuccessfully
    #[error("download failed ({status}):\n{output}")]
    DownloadFailed {
        /// Exit status as reported by the OS
        status: String,
        /// Combined stdout and stderr of the tool
        output: String,
    },

    /// The downloader reported success but produced no file for the prefix
    #[error("tmp file with prefix {prefix} not found")]
    DownloadArtifactMissing {
        /// The scratch path prefix that was searched
        prefix: PathBuf,
    },

    /// A cache or scratch directory operation failed
    #[error("filesystem error: failed to {op} {path}: {source}")]
    Filesystem {
        /// The operation that failed (e.g. "remove", "rename")
        op: &'static str,
        /// The path the operation was applied to
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A request URI could not be parsed
    #[error("invalid uri {uri}: {reason}")]
    InvalidUri {
        /// The offending URI
        uri: String,
        /// Parser message
        reason: String,
    },

    /// The upstream feed answered with a non-success status
    #[error("upstream returned HTTP {status}: {url}")]
    Upstream {
        /// HTTP status code
        status: u16,
        /// The URL that was requested
        url: String,
    },

    /// The upstream feed could not be parsed or the output feed could not be built
    #[error("feed error: {0}")]
    Feed(String),

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP server error
    #[error("server error: {0}")]
    ServerError(String),
}

impl Error {
    /// Build a [`Error::Filesystem`] from an I/O error
    pub fn filesystem(op: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Filesystem {
            op,
            path: path.into(),
            source,
        }
    }

    /// Build a [`Error::Config`] for a given key
    pub fn config(key: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.into()),
        }
    }
}

/// Convert errors to HTTP status codes for server responses
///
/// The server never exposes error detail to clients; the status code picks the
/// generic body and the error code is only used for logging.
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            // 404 Not Found - nothing is served for this source
            Error::UnsupportedSource(_) => 404,

            // 503 Service Unavailable
            Error::ShuttingDown => 503,

            // 500 Internal Server Error - every task and feed failure is generic
            Error::Config { .. }
            | Error::SubmissionCancelled
            | Error::ToolUnavailable { .. }
            | Error::DownloadFailed { .. }
            | Error::DownloadArtifactMissing { .. }
            | Error::Filesystem { .. }
            | Error::InvalidUri { .. }
            | Error::Upstream { .. }
            | Error::Feed(_)
            | Error::Network(_)
            | Error::Io(_)
            | Error::ServerError(_) => 500,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::UnsupportedSource(_) => "unsupported_source",
            Error::SubmissionCancelled => "submission_cancelled",
            Error::ShuttingDown => "shutting_down",
            Error::ToolUnavailable { .. } => "tool_unavailable",
            Error::DownloadFailed { .. } => "download_failed",
            Error::DownloadArtifactMissing { .. } => "download_artifact_missing",
            Error::Filesystem { .. } => "filesystem_error",
            Error::InvalidUri { .. } => "invalid_uri",
            Error::Upstream { .. } => "upstream_error",
            Error::Feed(_) => "feed_error",
            Error::Network(_) => "network_error",
            Error::Io(_) => "io_error",
            Error::ServerError(_) => "server_error",
        }
    }
}
