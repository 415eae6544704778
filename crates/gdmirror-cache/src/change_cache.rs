//! JSON-backed change cache
//!
//! The whole map is read once at the start of a run, mutated in memory, and
//! written back once at the end. A missing or unreadable file is never an
//! error: it only means every file is considered dirty.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use gdmirror_core::domain::CacheEntry;
use tracing::{debug, info, warn};

use crate::CacheError;

/// In-memory change cache persisted as a flat JSON object
///
/// Shared between concurrent downloads behind an `Arc`; writes are
/// last-write-wins per file id.
#[derive(Debug)]
pub struct ChangeCache {
    path: PathBuf,
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl ChangeCache {
    /// Creates an empty cache bound to `path`; nothing is read yet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Location of the cache file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replaces the in-memory map with the persisted one.
    ///
    /// Any read or parse failure leaves the cache empty.
    pub async fn load(&self) {
        let loaded = match tokio::fs::read(&self.path).await {
            Ok(bytes) => match serde_json::from_slice::<HashMap<String, CacheEntry>>(&bytes) {
                Ok(map) => map,
                Err(e) => {
                    warn!(path = %self.path.display(), error = %e, "Cache file is corrupt, starting empty");
                    HashMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No cache file, starting empty");
                HashMap::new()
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Could not read cache file, starting empty");
                HashMap::new()
            }
        };

        let count = loaded.len();
        *self.entries.write().unwrap() = loaded;
        info!(path = %self.path.display(), entries = count, "Change cache loaded");
    }

    /// Writes the current map to disk, overwriting any previous file.
    pub async fn save(&self) -> Result<(), CacheError> {
        let json = {
            let entries = self.entries.read().unwrap();
            serde_json::to_vec_pretty(&*entries)?
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::write(&self.path, json).await?;

        debug!(path = %self.path.display(), entries = self.len(), "Change cache saved");
        Ok(())
    }

    pub fn get(&self, file_id: &str) -> Option<CacheEntry> {
        self.entries.read().unwrap().get(file_id).cloned()
    }

    /// Inserts or overwrites the entry for `file_id`.
    pub fn set(&self, file_id: &str, modified_at: Option<DateTime<Utc>>, size_bytes: Option<u64>) {
        let entry = CacheEntry::new(file_id, modified_at, size_bytes);
        self.entries
            .write()
            .unwrap()
            .insert(file_id.to_string(), entry);
    }

    /// True when there is no entry or either field differs from the stored one.
    pub fn needs_update(
        &self,
        file_id: &str,
        modified_at: Option<DateTime<Utc>>,
        size_bytes: Option<u64>,
    ) -> bool {
        match self.entries.read().unwrap().get(file_id) {
            Some(entry) => entry.differs_from(modified_at, size_bytes),
            None => true,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
