//! Fetch task queue: one worker, one download at a time, leased results.
//!
//! Every fetch goes through a single long-lived worker task. A submission moves
//! through three phases:
//!
//! 1. **accept** - the caller wins the single acceptance slot, or its
//!    cancellation token fires first and nothing runs;
//! 2. **respond** - the worker runs the task and hands back a [`TaskLease`];
//! 3. **release** - the caller finishes the lease once it no longer reads the
//!    file, and only then does the worker accept the next submission.
//!
//! Holding a lease keeps the published file safe from eviction. It also keeps
//! every other caller waiting, so a lease must be finished (or dropped)
//! promptly.
//!
//! Once accepted, a download always runs to completion: a caller that goes
//! away mid-download does not abort it, and the result still lands in the
//! cache for the next request.

mod naming;
mod worker;


pub use naming::cache_prefix;

use crate::cache::CacheDir;
use crate::config::FetcherConfig;
use crate::error::{Error, Result};
use crate::tool::{CliDownloader, MediaDownloader};
use crate::types::FetchRequest;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use worker::FetchWorker;

/// An accepted request on its way to the worker
pub(crate) struct PendingSubmission {
    /// The request to execute
    pub(crate) request: FetchRequest,
    /// The caller's cancellation signal; observed, never propagated into the download
    pub(crate) cancel: CancellationToken,
    /// The acceptance slot, held until the lease is released
    pub(crate) permit: OwnedSemaphorePermit,
    /// Where the worker sends the outcome
    pub(crate) respond: oneshot::Sender<TaskResponse>,
}

/// Worker's answer to one submission
pub(crate) struct TaskResponse {
    pub(crate) result: Result<PathBuf>,
    pub(crate) release: oneshot::Sender<()>,
}

/// The outcome of an accepted fetch task, plus the caller's hold on the worker
///
/// While a lease is alive the worker accepts no other submission, so the file
/// at [`TaskLease::path`] will not be evicted. Call [`TaskLease::finish`] once
/// the file is no longer needed. Dropping the lease releases the worker too.
#[must_use = "the fetch worker stays blocked until the lease is finished or dropped"]
pub struct TaskLease {
    request: FetchRequest,
    result: Result<PathBuf>,
    release: Option<oneshot::Sender<()>>,
}

impl TaskLease {
    /// The request this lease answers
    pub fn request(&self) -> &FetchRequest {
        &self.request
    }

    /// The task outcome: the cached file, or the error that ended the task
    pub fn result(&self) -> std::result::Result<&Path, &Error> {
        self.result.as_deref()
    }

    /// The cached file, if the task succeeded
    pub fn path(&self) -> Option<&Path> {
        self.result.as_deref().ok()
    }

    /// Release the worker so it can accept the next submission
    pub fn finish(mut self) {
        self.release_worker();
    }

    fn release_worker(&mut self) {
        if let Some(release) = self.release.take() {
            // the worker may already be gone during shutdown
            let _ = release.send(());
        }
    }
}

impl Drop for TaskLease {
    fn drop(&mut self) {
        if self.release.is_some() {
            tracing::debug!(
                uri = %self.request.uri,
                "lease dropped without finish, releasing fetch worker"
            );
            self.release_worker();
        }
    }
}

impl std::fmt::Debug for TaskLease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskLease")
            .field("request", &self.request)
            .field("result", &self.result)
            .field("released", &self.release.is_none())
            .finish()
    }
}

/// Single-worker fetch queue over the media cache
pub struct Fetcher {
    /// Hands accepted submissions to the worker
    intake: mpsc::Sender<PendingSubmission>,
    /// One permit: held from acceptance until the lease is released
    acceptance: Arc<Semaphore>,
    /// Stops the worker loop
    shutdown: CancellationToken,
    /// The worker task, taken on shutdown
    worker: Mutex<Option<JoinHandle<()>>>,
    /// Cache layout, for inspection
    cache: CacheDir,
}

impl Fetcher {
    /// Create a fetcher that runs the configured downloader binary
    ///
    /// Probes the downloader with `--version` and creates the cache
    /// directories; both failures are fatal for startup.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] for invalid settings
    /// - [`Error::ToolUnavailable`] if the downloader probe fails
    /// - [`Error::Filesystem`] if the cache directories cannot be created
    pub async fn new(config: &FetcherConfig) -> Result<Self> {
        config.validate()?;
        let downloader = CliDownloader::from_config(config)?;
        Self::with_downloader(config, Arc::new(downloader)).await
    }

    /// Create a fetcher around any [`MediaDownloader`]
    pub async fn with_downloader(
        config: &FetcherConfig,
        downloader: Arc<dyn MediaDownloader>,
    ) -> Result<Self> {
        config.validate()?;

        let version = downloader.probe().await?;
        tracing::info!(
            downloader = downloader.name(),
            version = %version,
            "downloader available"
        );

        let cache = CacheDir::open(&config.data_dir).await?;
        tracing::info!(
            data_dir = %cache.data_dir().display(),
            tmp_dir = %cache.tmp_dir().display(),
            max_cached_files = config.max_cached_files,
            "cache directories ready"
        );

        let (intake, intake_rx) = mpsc::channel(1);
        let shutdown = CancellationToken::new();
        let worker = FetchWorker::new(
            cache.clone(),
            downloader,
            config.max_cached_files,
            config.sources.clone(),
        );
        let handle = tokio::spawn(worker.run(intake_rx, shutdown.clone()));

        Ok(Self {
            intake,
            acceptance: Arc::new(Semaphore::new(1)),
            shutdown,
            worker: Mutex::new(Some(handle)),
            cache,
        })
    }

    /// Submit a request and wait for its outcome
    ///
    /// Waits until the worker accepts the request, then until the task is done.
    /// Only one submission is accepted at a time; concurrent callers wait their
    /// turn in no particular order.
    ///
    /// Execution failures (download errors, filesystem errors, unsupported
    /// sources) come back inside the lease and still require
    /// [`TaskLease::finish`]. The caller must finish every lease it receives;
    /// until it does, no other submission is accepted.
    ///
    /// # Errors
    ///
    /// - [`Error::SubmissionCancelled`] if `cancel` fires before acceptance;
    ///   the request never runs and no lease exists
    /// - [`Error::ShuttingDown`] if the fetcher is shutting down
    pub async fn submit_task(
        &self,
        cancel: &CancellationToken,
        request: FetchRequest,
    ) -> Result<TaskLease> {
        let permit = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!(uri = %request.uri, "submission cancelled before acceptance");
                return Err(Error::SubmissionCancelled);
            }
            permit = self.acceptance.clone().acquire_owned() => {
                permit.map_err(|_| Error::ShuttingDown)?
            }
        };

        let (respond, response) = oneshot::channel();
        self.intake
            .send(PendingSubmission {
                request: request.clone(),
                cancel: cancel.clone(),
                permit,
                respond,
            })
            .await
            .map_err(|_| Error::ShuttingDown)?;

        let TaskResponse { result, release } = response.await.map_err(|_| Error::ShuttingDown)?;

        Ok(TaskLease {
            request,
            result,
            release: Some(release),
        })
    }

    /// The cache this fetcher publishes into
    pub fn cache(&self) -> &CacheDir {
        &self.cache
    }

    /// Stop accepting submissions and wait for the worker to exit
    ///
    /// A download already in flight completes first. Outstanding leases no
    /// longer hold the worker back.
    pub async fn shutdown(&self) {
        tracing::info!("shutting down fetcher");
        self.acceptance.close();
        self.shutdown.cancel();

        let handle = self.worker.lock().await.take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "fetch worker panicked");
            }
        }
        tracing::info!("fetcher stopped");
    }
}
