//! Per-folder JSON cache
//!
//! One `{folder}_cache.json` per cached folder under the cache directory.
//! Loads are best-effort: a missing file, malformed JSON, or version
//! mismatch is a cache miss, never an error for the caller.

use crate::models::LoraEntry;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Current cache file version
///
/// Increment when the entry layout or the scan semantics change; stale
/// files are then treated as misses and rebuilt on the next populate.
///
/// Version History:
/// - v1: bare entry list (WebUI extension format)
/// - v2: versioned envelope with folder label and timestamp
pub const CACHE_VERSION: u32 = 2;

/// On-disk cache envelope
#[derive(Debug, Serialize, Deserialize)]
struct CacheFile {
    version: u32,
    folder: String,
    cached_at: DateTime<Utc>,
    entries: Vec<LoraEntry>,
}

/// Outcome of clearing the cache directory
#[derive(Debug, Clone, Copy, Default)]
pub struct ClearOutcome {
    pub files_removed: usize,
    pub bytes_freed: u64,
}

/// JSON-file cache keyed by folder label
#[derive(Debug, Clone)]
pub struct FolderCache {
    cache_dir: PathBuf,
}

impl FolderCache {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Cache file path for a folder label.
    ///
    /// Only the last path component is used, filtered to alphanumerics,
    /// space, `_`, and `-`. Distinct folders can collide; last writer
    /// wins and the loser costs one rescan.
    pub fn cache_file_path(&self, folder: &str) -> PathBuf {
        let basename = folder.rsplit('/').next().unwrap_or(folder);
        let safe: String = basename
            .chars()
            .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '_' | '-'))
            .collect();
        self.cache_dir.join(format!("{}_cache.json", safe))
    }

    /// Load cached entries for a folder, or `None` on any miss condition
    pub fn load(&self, folder: &str) -> Option<Vec<LoraEntry>> {
        let path = self.cache_file_path(folder);

        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read cache file");
                return None;
            }
        };

        let file: CacheFile = match serde_json::from_str(&content) {
            Ok(f) => f,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Malformed cache file, treating as miss");
                return None;
            }
        };

        if file.version != CACHE_VERSION {
            warn!(
                path = %path.display(),
                stored = file.version,
                current = CACHE_VERSION,
                "Cache version mismatch, treating as miss"
            );
            return None;
        }

        debug!(folder, count = file.entries.len(), "Cache hit");
        Some(file.entries)
    }

    /// Persist entries for a folder, creating the cache directory
    pub fn save(&self, folder: &str, entries: &[LoraEntry]) -> Result<()> {
        std::fs::create_dir_all(&self.cache_dir).with_context(|| {
            format!(
                "Failed to create cache directory: {}",
                self.cache_dir.display()
            )
        })?;

        let path = self.cache_file_path(folder);
        let file = CacheFile {
            version: CACHE_VERSION,
            folder: folder.to_string(),
            cached_at: Utc::now(),
            entries: entries.to_vec(),
        };

        let content =
            serde_json::to_string_pretty(&file).context("Failed to serialize cache")?;
        std::fs::write(&path, content)
            .with_context(|| format!("Failed to write cache file: {}", path.display()))?;

        debug!(folder, path = %path.display(), count = entries.len(), "Cache saved");
        Ok(())
    }

    /// Remove all cache files, reporting how much was freed
    pub fn clear(&self) -> Result<ClearOutcome> {
        let mut outcome = ClearOutcome::default();

        let read_dir = match std::fs::read_dir(&self.cache_dir) {
            Ok(rd) => rd,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(outcome),
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Failed to read cache directory: {}", self.cache_dir.display())
                })
            }
        };

        for entry in read_dir.flatten() {
            let path = entry.path();
            let is_cache_file = path
                .file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.ends_with("_cache.json"))
                .unwrap_or(false);
            if !is_cache_file {
                continue;
            }

            let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
            match std::fs::remove_file(&path) {
                Ok(()) => {
                    outcome.files_removed += 1;
                    outcome.bytes_freed += size;
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to remove cache file");
                }
            }
        }

        debug!(
            removed = outcome.files_removed,
            bytes = outcome.bytes_freed,
            "Cache cleared"
        );
        Ok(outcome)
    }
}
