//! The fetch worker: executes accepted submissions one at a time.

use super::naming::cache_prefix;
use super::{PendingSubmission, TaskResponse};
use crate::cache::CacheDir;
use crate::error::{Error, Result};
use crate::tool::MediaDownloader;
use crate::types::{FetchRequest, Source};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

/// Owns the cache directories and the downloader for the lifetime of the fetcher
pub(crate) struct FetchWorker {
    cache: CacheDir,
    downloader: Arc<dyn MediaDownloader>,
    max_cached_files: usize,
    sources: Vec<Source>,
}

impl FetchWorker {
    pub(crate) fn new(
        cache: CacheDir,
        downloader: Arc<dyn MediaDownloader>,
        max_cached_files: usize,
        sources: Vec<Source>,
    ) -> Self {
        Self {
            cache,
            downloader,
            max_cached_files,
            sources,
        }
    }

    /// Drain submissions until the intake closes or shutdown is requested
    pub(crate) async fn run(
        self,
        mut intake: mpsc::Receiver<PendingSubmission>,
        shutdown: CancellationToken,
    ) {
        loop {
            let submission = tokio::select! {
                biased;
                submission = intake.recv() => match submission {
                    Some(submission) => submission,
                    None => break,
                },
                _ = shutdown.cancelled() => break,
            };
            self.handle(submission, &shutdown).await;
        }
        tracing::info!("request queue closed, terminating task handler");
    }

    /// Run one submission through respond and release
    async fn handle(&self, submission: PendingSubmission, shutdown: &CancellationToken) {
        let PendingSubmission {
            request,
            cancel,
            permit,
            respond,
        } = submission;

        tracing::info!(source = %request.source, uri = %request.uri, "fetcher handling task");
        let result = self.run_task(&request).await;
        match &result {
            Ok(path) => tracing::info!(
                source = %request.source,
                uri = %request.uri,
                path = %path.display(),
                "fetcher completed task"
            ),
            Err(e) => tracing::warn!(
                source = %request.source,
                uri = %request.uri,
                error = %e,
                "fetch task failed"
            ),
        }
        if cancel.is_cancelled() {
            tracing::info!(uri = %request.uri, "caller cancelled during fetch, result kept");
        }

        let (release, released) = oneshot::channel();
        if respond.send(TaskResponse { result, release }).is_err() {
            tracing::debug!(uri = %request.uri, "caller gone before response, releasing");
            drop(permit);
            return;
        }

        // a dropped lease closes the channel, which releases as well
        tokio::select! {
            _ = released => {}
            _ = shutdown.cancelled() => {}
        }
        drop(permit);
    }

    /// Download-and-publish for one request
    ///
    /// Returns the cache entry, either already present or freshly published.
    pub(crate) async fn run_task(&self, request: &FetchRequest) -> Result<PathBuf> {
        if !self.sources.contains(&request.source) {
            return Err(Error::UnsupportedSource(request.source.to_string()));
        }

        let prefix = cache_prefix(request.source, &request.uri)?;

        if let Some(entry) = self.cache.lookup(&prefix).await? {
            tracing::debug!(path = %entry.display(), "cache hit");
            return Ok(entry);
        }

        // a crashed or killed run may have left output behind
        self.cache.remove_stale_scratch(&prefix).await?;

        // before the download, so the new entry is not counted against itself
        self.cache.evict_for_insert(self.max_cached_files).await?;

        let scratch_prefix = self.cache.scratch_prefix(&prefix);
        self.downloader
            .download(&request.uri, &scratch_prefix)
            .await?;

        let mut produced = self.cache.find_scratch(&prefix).await?;
        let scratch = produced.pop().ok_or_else(|| Error::DownloadArtifactMissing {
            prefix: scratch_prefix.clone(),
        })?;

        let entry = self.cache.publish(&scratch, &prefix).await?;

        for leftover in produced {
            tracing::warn!(path = %leftover.display(), "removing extra downloader output");
            if let Err(e) = tokio::fs::remove_file(&leftover).await {
                tracing::warn!(path = %leftover.display(), error = %e, "failed to remove extra output");
            }
        }

        Ok(entry)
    }
}
