//! Change-cache entries and retry-queue items
//!
//! Both are small per-file records keyed by the remote file id. A
//! [`CacheEntry`] is persisted between runs; a [`RetryQueueItem`] only lives
//! for the duration of one process.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::newtypes::RemoteId;

/// Last-known remote state of a successfully downloaded file
///
/// Equality of `(modified_at, size_bytes)` with the current remote metadata
/// is the only signal used to skip a download.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    pub file_id: String,
    #[serde(rename = "modifiedTime")]
    pub modified_at: Option<DateTime<Utc>>,
    #[serde(rename = "size")]
    pub size_bytes: Option<u64>,
}

impl CacheEntry {
    pub fn new(
        file_id: impl Into<String>,
        modified_at: Option<DateTime<Utc>>,
        size_bytes: Option<u64>,
    ) -> Self {
        Self {
            file_id: file_id.into(),
            modified_at,
            size_bytes,
        }
    }

    /// True when either tracked field differs from the given remote state
    pub fn differs_from(&self, modified_at: Option<DateTime<Utc>>, size_bytes: Option<u64>) -> bool {
        self.modified_at != modified_at || self.size_bytes != size_bytes
    }
}

/// A failed download waiting for background remediation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryQueueItem {
    pub file_id: RemoteId,
    pub target_path: PathBuf,
    /// Attempts already spent on this file
    pub attempt_count: u32,
}

impl RetryQueueItem {
    pub fn new(file_id: RemoteId, target_path: PathBuf, attempt_count: u32) -> Self {
        Self {
            file_id,
            target_path,
            attempt_count,
        }
    }

    /// Copy of this item with one more attempt recorded
    pub fn next_attempt(&self) -> Self {
        Self {
            attempt_count: self.attempt_count + 1,
            ..self.clone()
        }
    }
}
