//! On-disk media cache: published entries plus a scratch area for in-flight downloads
//!
//! Layout under the configured base directory:
//!
//! ```text
//! <base>/fetcher/data   published cache entries, named by cache prefix
//! <base>/fetcher/tmp    downloader output, named <prefix>.<ext>
//! ```
//!
//! Only the fetch worker mutates either directory. Entries enter `data` through
//! a rename from `tmp`, so a reader never sees a partially written file.

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Directory permissions for the cache tree
#[cfg(unix)]
const DEFAULT_DIR_MODE: u32 = 0o755;

/// Handle to the cache and scratch directories
#[derive(Clone, Debug)]
pub struct CacheDir {
    data_dir: PathBuf,
    tmp_dir: PathBuf,
}

impl CacheDir {
    /// Open (creating if needed) the cache tree under `base`
    ///
    /// # Errors
    ///
    /// Returns [`Error::Filesystem`] if either directory cannot be created.
    pub async fn open(base: &Path) -> Result<Self> {
        let fetcher_dir = base.join("fetcher");
        let data_dir = fetcher_dir.join("data");
        let tmp_dir = fetcher_dir.join("tmp");

        create_dir_all(&data_dir).await?;
        create_dir_all(&tmp_dir).await?;

        Ok(Self { data_dir, tmp_dir })
    }

    /// Directory holding published entries
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Directory holding in-flight downloads
    pub fn tmp_dir(&self) -> &Path {
        &self.tmp_dir
    }

    /// Path a published entry for `prefix` lives at
    pub fn entry_path(&self, prefix: &str) -> PathBuf {
        self.data_dir.join(prefix)
    }

    /// Path prefix handed to the downloader for `prefix`
    pub fn scratch_prefix(&self, prefix: &str) -> PathBuf {
        self.tmp_dir.join(prefix)
    }

    /// Return the published entry for `prefix`, if there is one
    pub async fn lookup(&self, prefix: &str) -> Result<Option<PathBuf>> {
        let path = self.entry_path(prefix);
        match tokio::fs::symlink_metadata(&path).await {
            Ok(meta) if meta.file_type().is_file() => Ok(Some(path)),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::filesystem("stat", path, e)),
        }
    }

    /// Published entries, oldest modification time first
    pub async fn entries_oldest_first(&self) -> Result<Vec<PathBuf>> {
        files_oldest_first(&self.data_dir).await
    }

    /// Scratch files the downloader produced for `prefix`, oldest first
    pub async fn find_scratch(&self, prefix: &str) -> Result<Vec<PathBuf>> {
        let mut matches: Vec<_> = regular_files(&self.tmp_dir)
            .await?
            .into_iter()
            .filter(|(path, _)| {
                path.file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(|name| matches_prefix(name, prefix))
            })
            .collect();
        sort_oldest_first(&mut matches);
        Ok(matches.into_iter().map(|(path, _)| path).collect())
    }

    /// Remove scratch files left behind for `prefix` by an earlier, interrupted run
    ///
    /// Returns the paths that were removed.
    pub async fn remove_stale_scratch(&self, prefix: &str) -> Result<Vec<PathBuf>> {
        let stale = self.find_scratch(prefix).await?;
        for path in &stale {
            tracing::info!(path = %path.display(), "removing stale tmp file");
            tokio::fs::remove_file(path)
                .await
                .map_err(|e| Error::filesystem("remove", path, e))?;
        }
        Ok(stale)
    }

    /// Make room for one more entry without exceeding `max_entries`
    ///
    /// When the cache already holds `max_entries` or more files, the oldest
    /// `count - max_entries + 1` are deleted. Returns the deleted paths. A failed
    /// deletion aborts the pass.
    pub async fn evict_for_insert(&self, max_entries: usize) -> Result<Vec<PathBuf>> {
        let entries = self.entries_oldest_first().await?;
        if entries.len() < max_entries {
            return Ok(Vec::new());
        }

        let excess = entries.len() + 1 - max_entries;
        tracing::info!(
            count = entries.len(),
            max = max_entries,
            evicting = excess,
            "removing cached files"
        );

        let mut evicted = Vec::with_capacity(excess);
        for path in entries.into_iter().take(excess) {
            tokio::fs::remove_file(&path)
                .await
                .map_err(|e| Error::filesystem("remove", &path, e))?;
            tracing::info!(path = %path.display(), "removed cached file");
            evicted.push(path);
        }
        Ok(evicted)
    }

    /// Move a finished scratch file into the cache under `prefix`
    ///
    /// Both directories share a parent, so this is a same-filesystem rename.
    pub async fn publish(&self, scratch: &Path, prefix: &str) -> Result<PathBuf> {
        let entry = self.entry_path(prefix);
        tracing::info!(
            from = %scratch.display(),
            to = %entry.display(),
            "publishing download"
        );
        tokio::fs::rename(scratch, &entry)
            .await
            .map_err(|e| Error::filesystem("rename", scratch, e))?;
        Ok(entry)
    }
}

/// Regular files in `dir`, oldest modification time first
///
/// Ties are broken by file name so the order is stable.
pub async fn files_oldest_first(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = regular_files(dir).await?;
    sort_oldest_first(&mut files);
    Ok(files.into_iter().map(|(path, _)| path).collect())
}

fn sort_oldest_first(files: &mut [(PathBuf, SystemTime)]) {
    files.sort_by(|(a_path, a_time), (b_path, b_time)| {
        a_time.cmp(b_time).then_with(|| a_path.cmp(b_path))
    });
}

/// Whether a downloader-produced file name belongs to `prefix`
///
/// The downloader writes `<prefix>.<ext>` (possibly with further suffixes such
/// as `.part`), so a bare `starts_with` would also match longer prefixes like
/// `...?v=abcd` for `...?v=abc`.
fn matches_prefix(name: &str, prefix: &str) -> bool {
    match name.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('.'),
        None => false,
    }
}

async fn regular_files(dir: &Path) -> Result<Vec<(PathBuf, SystemTime)>> {
    let mut read_dir = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| Error::filesystem("read directory", dir, e))?;

    let mut files = Vec::new();
    while let Some(entry) = read_dir
        .next_entry()
        .await
        .map_err(|e| Error::filesystem("read directory", dir, e))?
    {
        let path = entry.path();
        let meta = match entry.metadata().await {
            Ok(meta) => meta,
            // removed between listing and stat
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => return Err(Error::filesystem("stat", path, e)),
        };
        if !meta.file_type().is_file() {
            continue;
        }
        let modified = meta
            .modified()
            .map_err(|e| Error::filesystem("stat", &path, e))?;
        files.push((path, modified));
    }
    Ok(files)
}

async fn create_dir_all(path: &Path) -> Result<()> {
    let mut builder = tokio::fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    builder.mode(DEFAULT_DIR_MODE);
    builder
        .create(path)
        .await
        .map_err(|e| Error::filesystem("create directory", path, e))
}
