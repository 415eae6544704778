//! gdmirror Sync - one-way mirroring engine
//!
//! Provides:
//! - Discovery of remote root folders
//! - Recursive folder download with bounded per-folder parallelism
//! - Change detection through the persisted change cache
//! - Inline exponential backoff plus a background retry queue
//! - Client-side rate limiting of every remote call
//!
//! ## Modules
//!
//! - [`engine`] - `SyncEngine` orchestrating initialization and a full sync pass
//! - [`walker`] - paged listings and root detection
//! - [`pipeline`] - stack-based folder traversal producing the manifest tree
//! - [`transfer`] - single-file download, verification and retry
//! - [`retry_queue`] - FIFO background remediation of failed downloads
//! - [`rate_limit`] - shared token bucket
//! - [`events`] - typed lifecycle events and the `EventBus`

pub mod engine;
pub mod events;
pub mod pipeline;
pub mod rate_limit;
pub mod retry_queue;
pub mod transfer;
pub mod walker;

use std::path::PathBuf;

use thiserror::Error;

pub use engine::{SyncEngine, SyncReport};
pub use events::{EventBus, SyncEvent};

/// Errors that abort initialization or a whole sync pass
#[derive(Debug, Error)]
pub enum SyncError {
    /// `sync()` was called before a successful `initialize()`
    #[error("Sync engine is not initialized")]
    NotInitialized,

    /// No service-account credentials were supplied
    #[error("Service account credentials are required")]
    MissingCredentials,

    /// The credentials failed format validation
    #[error("Invalid credentials: {}", .0.join("; "))]
    InvalidCredentials(Vec<String>),

    /// The remote drive could not be reached with the current credentials
    #[error("Connectivity check failed: {0}")]
    ConnectivityCheckFailed(String),

    /// The folder set could not be listed, so no root can be discovered
    #[error("Remote folder listing failed: {0}")]
    RemoteListing(String),

    /// The local download root could not be created
    #[error("Cannot create download root {path}: {source}")]
    DownloadRoot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An I/O error outside per-file work (manifest, cache)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Why a single file could not be produced
#[derive(Debug, Error)]
pub enum DownloadError {
    /// The remote has no metadata for the file
    #[error("File not found: {0}")]
    NotFound(String),

    /// Metadata lookup failed for a reason other than absence
    #[error("Metadata lookup failed: {0:#}")]
    Metadata(anyhow::Error),

    /// The transfer produced zero bytes
    #[error("Downloaded file is empty")]
    EmptyFile,

    /// The transfer produced a different byte count than the remote reported
    #[error("Size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch { expected: u64, actual: u64 },

    /// Content transfer failed after all inline attempts
    #[error("Transfer failed: {0:#}")]
    Transfer(anyhow::Error),

    /// A local filesystem operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DownloadError {
    /// Missing files are never worth retrying; everything else may be transient.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, DownloadError::NotFound(_))
    }
}
