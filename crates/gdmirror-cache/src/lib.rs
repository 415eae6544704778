//! gdmirror Cache - persisted change detection
//!
//! A JSON file mapping remote file ids to the `(modifiedTime, size)` pair
//! seen when the file was last downloaded and verified. The sync engine
//! consults it before every download and skips files whose remote metadata
//! is unchanged.
//!
//! ## Key Components
//!
//! - [`ChangeCache`] - in-memory map with JSON load/save
//! - [`CacheError`] - Error types for persisting the cache
//!
//! ## Usage
//!
//! ```no_run
//! use gdmirror_cache::ChangeCache;
//!
//! # async fn example() -> Result<(), gdmirror_cache::CacheError> {
//! let cache = ChangeCache::new("./.gdmirror-cache.json");
//! cache.load().await;
//! if cache.needs_update("fileId", None, Some(10)) {
//!     // download, verify, then:
//!     cache.set("fileId", None, Some(10));
//! }
//! cache.save().await?;
//! # Ok(())
//! # }
//! ```

pub mod change_cache;

pub use change_cache::ChangeCache;

/// Errors that can occur while persisting the cache
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Reading or writing the cache file failed
    #[error("Cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The cache could not be encoded as JSON
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
