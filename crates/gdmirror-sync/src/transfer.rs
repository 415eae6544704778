//! Single-file download with verification and retry
//!
//! [`Downloader::download_file`] is the unit of work the folder pipeline
//! runs for each file:
//!
//! 1. fetch remote metadata (absent metadata is a permanent failure)
//! 2. skip the file when the change cache says it is up to date
//! 3. stream the content into `<target>.tmp`, with inline exponential backoff
//! 4. verify the byte count (non-empty, equal to the remote size when known)
//! 5. rename into place and record the file in the change cache
//!
//! Any failure removes the temporary file and hands the file to the retry
//! queue before the error is returned to the caller.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use gdmirror_cache::ChangeCache;
use gdmirror_core::domain::{RemoteId, RetryQueueItem};
use gdmirror_core::ports::remote_drive::IRemoteDrive;

use crate::events::{EventBus, SyncEvent};
use crate::rate_limit::RateLimiter;
use crate::retry_queue::{RetryHandler, RetryQueue};
use crate::DownloadError;

/// Suffix appended to the target path while content is streaming
pub const TEMP_SUFFIX: &str = ".tmp";

/// Inline retry settings for content transfers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total inline attempts per transfer
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles each time
    pub initial_delay: Duration,
}

impl RetryPolicy {
    /// Backoff before the attempt following `attempt`: `initial_delay * 2^attempt`
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.initial_delay.saturating_mul(2u32.saturating_pow(attempt))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(1000),
        }
    }
}

/// Result of a download that did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// Content was transferred, verified and moved into place
    Verified { bytes: u64 },
    /// The change cache reported the local copy as current
    Skipped,
}

/// Path used for the in-progress download of `target`
pub fn temp_path(target: &Path) -> PathBuf {
    let mut name: OsString = target.as_os_str().to_owned();
    name.push(TEMP_SUFFIX);
    PathBuf::from(name)
}

pub struct Downloader {
    remote: Arc<dyn IRemoteDrive>,
    limiter: Arc<RateLimiter>,
    /// `None` disables change detection: every file is downloaded
    cache: Option<Arc<ChangeCache>>,
    events: Arc<EventBus>,
    retry_queue: Arc<RetryQueue>,
    policy: RetryPolicy,
}

impl Downloader {
    pub fn new(
        remote: Arc<dyn IRemoteDrive>,
        limiter: Arc<RateLimiter>,
        cache: Option<Arc<ChangeCache>>,
        events: Arc<EventBus>,
        retry_queue: Arc<RetryQueue>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            remote,
            limiter,
            cache,
            events,
            retry_queue,
            policy,
        }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Downloads `file_id` to `target` unless the cached copy is current.
    ///
    /// A failed download emits exactly one `file_download_error` and, unless
    /// the file does not exist, is handed to the retry queue.
    #[tracing::instrument(skip_all, fields(file_id = %file_id))]
    pub async fn download_file(
        self: &Arc<Self>,
        file_id: &RemoteId,
        target: &Path,
    ) -> Result<DownloadOutcome, DownloadError> {
        match self.download(file_id, target, 0).await {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                warn!(path = %target.display(), error = %err, "Download failed");
                self.events.emit(SyncEvent::FileDownloadError {
                    file_id: file_id.to_string(),
                    path: target.to_path_buf(),
                    error: err.to_string(),
                });

                if err.is_retryable() {
                    let handler: Arc<dyn RetryHandler> = self.clone();
                    self.retry_queue.enqueue(
                        RetryQueueItem::new(file_id.clone(), target.to_path_buf(), 0),
                        handler,
                    );
                }
                Err(err)
            }
        }
    }

    async fn download(
        &self,
        file_id: &RemoteId,
        target: &Path,
        start_attempt: u32,
    ) -> Result<DownloadOutcome, DownloadError> {
        self.limiter.acquire().await;
        let metadata = self
            .remote
            .get_metadata(file_id)
            .await
            .map_err(DownloadError::Metadata)?;

        let Some(metadata) = metadata else {
            self.events.emit(SyncEvent::FileNotFound {
                file_id: file_id.to_string(),
            });
            return Err(DownloadError::NotFound(file_id.to_string()));
        };

        if let Some(cache) = &self.cache {
            if !cache.needs_update(file_id.as_str(), metadata.modified_at, metadata.size_bytes) {
                debug!(path = %target.display(), "Up to date, skipping");
                self.events.emit(SyncEvent::FileSkipped {
                    file_id: file_id.to_string(),
                    path: target.to_path_buf(),
                });
                return Ok(DownloadOutcome::Skipped);
            }
        }

        self.events.emit(SyncEvent::FileDownloadStarted {
            file_id: file_id.to_string(),
            path: target.to_path_buf(),
        });

        let tmp = temp_path(target);
        let result = async {
            let bytes = self.transfer(file_id, &tmp, start_attempt).await?;
            self.events.emit(SyncEvent::FileDownloaded {
                file_id: file_id.to_string(),
                path: tmp.clone(),
                bytes,
            });
            self.verify(file_id, &tmp, bytes, metadata.size_bytes)?;
            tokio::fs::rename(&tmp, target).await?;
            Ok::<u64, DownloadError>(bytes)
        }
        .await;

        match result {
            Ok(bytes) => {
                if let Some(cache) = &self.cache {
                    cache.set(file_id.as_str(), metadata.modified_at, metadata.size_bytes);
                }
                info!(path = %target.display(), bytes, "File verified");
                self.events.emit(SyncEvent::FileVerified {
                    file_id: file_id.to_string(),
                    path: target.to_path_buf(),
                    bytes,
                });
                Ok(DownloadOutcome::Verified { bytes })
            }
            Err(err) => {
                if let Err(e) = tokio::fs::remove_file(&tmp).await {
                    if e.kind() != std::io::ErrorKind::NotFound {
                        warn!(path = %tmp.display(), error = %e, "Could not remove temporary file");
                    }
                }
                Err(err)
            }
        }
    }

    fn verify(
        &self,
        file_id: &RemoteId,
        tmp: &Path,
        actual: u64,
        expected: Option<u64>,
    ) -> Result<(), DownloadError> {
        if actual == 0 {
            self.events.emit(SyncEvent::FileEmpty {
                file_id: file_id.to_string(),
                path: tmp.to_path_buf(),
            });
            return Err(DownloadError::EmptyFile);
        }

        if let Some(expected) = expected.filter(|&n| n > 0) {
            if expected != actual {
                self.events.emit(SyncEvent::FileSizeMismatch {
                    file_id: file_id.to_string(),
                    expected,
                    actual,
                });
                return Err(DownloadError::SizeMismatch { expected, actual });
            }
        }
        Ok(())
    }

    /// Streams content to `dest`, retrying with exponential backoff.
    ///
    /// Attempts are numbered from `start_attempt` up to `max_attempts - 1`.
    async fn transfer(
        &self,
        file_id: &RemoteId,
        dest: &Path,
        start_attempt: u32,
    ) -> Result<u64, DownloadError> {
        let mut attempt = start_attempt;
        loop {
            match self.transfer_once(file_id, dest).await {
                Ok(bytes) => return Ok(bytes),
                Err(err) if attempt + 1 < self.policy.max_attempts => {
                    let delay = self.policy.delay_for(attempt);
                    warn!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %format!("{err:#}"),
                        "Transfer failed, backing off"
                    );
                    self.events.emit(SyncEvent::FileRetry {
                        file_id: file_id.to_string(),
                        attempt,
                        delay_ms: delay.as_millis() as u64,
                        error: format!("{err:#}"),
                    });
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(DownloadError::Transfer(err)),
            }
        }
    }

    async fn transfer_once(&self, file_id: &RemoteId, dest: &Path) -> anyhow::Result<u64> {
        self.limiter.acquire().await;
        let mut stream = self.remote.get_content_stream(file_id).await?;

        let mut file = tokio::fs::File::create(dest)
            .await
            .with_context(|| format!("Failed to create {}", dest.display()))?;

        let mut bytes = 0u64;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk)
                .await
                .with_context(|| format!("Failed to write {}", dest.display()))?;
            bytes += chunk.len() as u64;
        }
        file.flush().await?;

        Ok(bytes)
    }
}

#[async_trait::async_trait]
impl RetryHandler for Downloader {
    async fn retry(&self, item: &RetryQueueItem) -> Result<(), DownloadError> {
        self.download(&item.file_id, &item.target_path, item.attempt_count)
            .await
            .map(|_| ())
    }
}
