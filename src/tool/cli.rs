//! CLI-based downloader using an external youtube-dl compatible binary

use super::traits::MediaDownloader;
use crate::config::FetcherConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

/// Output template suffix; the tool substitutes the final extension
const OUTPUT_EXTENSION_TEMPLATE: &str = ".%(ext)s";

/// Downloader backed by an external youtube-dl compatible binary
///
/// Invocations look like
/// `<binary> <flags...> --output <prefix>.%(ext)s <uri>`; the tool picks the
/// extension (e.g. `mp3` after `--extract-audio --audio-format mp3`).
#[derive(Clone, Debug)]
pub struct CliDownloader {
    binary_path: PathBuf,
    flags: Vec<String>,
}

impl CliDownloader {
    /// Create a downloader with an explicit binary and flag string
    ///
    /// `flags` is split with shell quoting rules, so
    /// `--postprocessor-args "-strict experimental"` yields two arguments.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the flags have unbalanced quotes.
    pub fn new(binary_path: PathBuf, flags: &str) -> Result<Self> {
        let flags = shlex::split(flags).ok_or_else(|| {
            Error::config(
                "downloader_flags",
                format!("cannot split downloader flags: {flags}"),
            )
        })?;
        Ok(Self { binary_path, flags })
    }

    /// Create a downloader from fetcher configuration
    ///
    /// A bare binary name is looked up on PATH with the `which` crate; if it is
    /// not found the name is kept and the startup probe reports the failure.
    pub fn from_config(config: &FetcherConfig) -> Result<Self> {
        Self::new(resolve_binary(&config.downloader), &config.downloader_flags)
    }

    /// The binary this downloader runs
    pub fn binary_path(&self) -> &Path {
        &self.binary_path
    }

    /// Flags passed before the generated output flag
    pub fn flags(&self) -> &[String] {
        &self.flags
    }

    /// Full argument list for one download
    pub fn download_args(&self, uri: &str, output_prefix: &Path) -> Vec<OsString> {
        let mut template = output_prefix.as_os_str().to_owned();
        template.push(OUTPUT_EXTENSION_TEMPLATE);

        let mut args: Vec<OsString> = self.flags.iter().map(OsString::from).collect();
        args.push("--output".into());
        args.push(template);
        args.push(uri.into());
        args
    }

    fn unavailable(&self, reason: impl Into<String>) -> Error {
        Error::ToolUnavailable {
            tool: self.binary_path.clone(),
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl MediaDownloader for CliDownloader {
    async fn probe(&self) -> Result<String> {
        let output = Command::new(&self.binary_path)
            .arg("--version")
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| self.unavailable(format!("failed to execute: {e}")))?;

        if !output.status.success() {
            return Err(self.unavailable(format!(
                "--version exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    async fn download(&self, uri: &str, output_prefix: &Path) -> Result<()> {
        let args = self.download_args(uri, output_prefix);
        tracing::info!(
            tool = %self.binary_path.display(),
            args = ?args,
            "running downloader"
        );

        let output = Command::new(&self.binary_path)
            .args(&args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| self.unavailable(format!("failed to execute: {e}")))?;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        if !output.status.success() {
            return Err(Error::DownloadFailed {
                status: output.status.to_string(),
                output: combined,
            });
        }

        tracing::debug!(output = %combined, "downloader finished");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "cli-downloader"
    }
}

/// Resolve a bare binary name on PATH, leaving explicit paths untouched
fn resolve_binary(binary: &Path) -> PathBuf {
    if binary.components().count() > 1 {
        return binary.to_path_buf();
    }
    match which::which(binary) {
        Ok(path) => path,
        Err(e) => {
            tracing::warn!(binary = %binary.display(), error = %e, "downloader not found on PATH");
            binary.to_path_buf()
        }
    }
}
