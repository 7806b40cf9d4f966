//! Durable cache store for enriched records.
//!
//! The store is a single JSON file mapping glyph -> merged record. It is the
//! one shared mutable resource in the pipeline: every batch completion
//! checkpoints its validated records here so an interrupted run can resume
//! without re-enriching anything.
//!
//! Writes are full read-modify-write cycles serialized behind a
//! `tokio::sync::Mutex`, so concurrent batch completions never clobber each
//! other's entries. The file is written via a temp file + rename to avoid
//! partial contents on abrupt termination.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::fs;
use tokio::sync::Mutex;

/// Errors that can occur during cache store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Failed to read or write the cache file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to serialize the cache contents.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Glyph-keyed mapping of merged records.
pub type CacheMap = HashMap<String, serde_json::Value>;

/// File-backed store of enriched records, keyed by glyph.
///
/// Entries are append-only across the store's lifetime: once a glyph is
/// written it is treated as permanently valid and never reprocessed.
pub struct CacheStore {
    /// Path of the cache file.
    path: PathBuf,
    /// Serializes read-modify-write cycles across concurrent checkpoints.
    write_lock: Mutex<()>,
}

impl CacheStore {
    /// Creates a store backed by the given file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the persisted mapping.
    ///
    /// An absent or corrupt file yields an empty mapping; corruption is
    /// logged rather than treated as fatal, since the worst case is
    /// re-enriching items that were already done.
    pub async fn load(&self) -> CacheMap {
        let contents = match fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return CacheMap::new();
            }
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to read cache file, starting empty");
                return CacheMap::new();
            }
        };

        match serde_json::from_str(&contents) {
            Ok(map) => map,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Cache file is corrupt, starting empty");
                CacheMap::new()
            }
        }
    }

    /// Merges new entries into the persisted mapping and writes it back.
    ///
    /// Performs a full read-modify-write cycle under the store's write lock:
    /// loads the current file state, applies `new_entries` on top
    /// (last-write-wins per glyph), and atomically replaces the file. Safe
    /// to call concurrently from multiple in-flight batch completions.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the merged mapping cannot be written.
    pub async fn merge_and_save(&self, new_entries: &CacheMap) -> Result<(), StoreError> {
        if new_entries.is_empty() {
            return Ok(());
        }

        let _guard = self.write_lock.lock().await;

        let mut current = self.load().await;
        for (glyph, record) in new_entries {
            current.insert(glyph.clone(), record.clone());
        }

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).await?;
            }
        }

        // Temp file + rename so an interrupted write never leaves a
        // half-written cache behind.
        let json = serde_json::to_string(&current)?;
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, json.as_bytes()).await?;
        fs::rename(&tmp_path, &self.path).await?;

        tracing::debug!(
            added = new_entries.len(),
            total = current.len(),
            "Checkpointed cache entries"
        );

        Ok(())
    }
}
