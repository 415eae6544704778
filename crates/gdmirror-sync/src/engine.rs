//! Sync orchestration
//!
//! The [`SyncEngine`] wires the rate limiter, change cache, retry queue,
//! tree walker and folder pipeline together and drives one full mirroring
//! pass.
//!
//! ## Flow
//!
//! 1. **initialize**: validate credentials, load the cache, create the
//!    download root, prove the remote is reachable
//! 2. **sync**: discover root folders, mirror each into
//!    `download_root/<root name>`, write the manifest, save the cache
//!
//! Only fatal preconditions and orchestration failures surface as
//! [`SyncError`]; everything below a root is absorbed into the report.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{error, info, warn};

use gdmirror_cache::ChangeCache;
use gdmirror_core::config::Config;
use gdmirror_core::domain::{LocalFolderRecord, ServiceAccountCredentials, ServiceAccountValidator};
use gdmirror_core::ports::credential_validator::ICredentialValidator;
use gdmirror_core::ports::remote_drive::IRemoteDrive;

use crate::events::{EventBus, SyncEvent};
use crate::pipeline::{FolderPipeline, SyncStats};
use crate::rate_limit::RateLimiter;
use crate::retry_queue::RetryQueue;
use crate::transfer::{Downloader, RetryPolicy};
use crate::walker::TreeWalker;
use crate::SyncError;

/// Summary of a completed sync pass
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    /// Produced root trees, as written to the manifest
    pub roots: Vec<LocalFolderRecord>,
    pub files_downloaded: u64,
    pub files_skipped: u64,
    pub files_failed: u64,
    pub files_unsupported: u64,
    pub folders_failed: u64,
    /// Non-fatal errors encountered during the pass
    pub errors: Vec<String>,
    /// Wall-clock duration of the pass in milliseconds
    pub duration_ms: u64,
    pub manifest_path: PathBuf,
}

pub struct SyncEngine {
    config: Config,
    credentials: Option<ServiceAccountCredentials>,
    validator: Arc<dyn ICredentialValidator>,
    remote: Arc<dyn IRemoteDrive>,
    cache: Option<Arc<ChangeCache>>,
    events: Arc<EventBus>,
    limiter: Arc<RateLimiter>,
    retry_queue: Arc<RetryQueue>,
    walker: Arc<TreeWalker>,
    pipeline: FolderPipeline,
    initialized: AtomicBool,
}

impl SyncEngine {
    /// Builds the component graph from `config`.
    ///
    /// Nothing touches the network or the disk until [`initialize`](Self::initialize).
    pub fn new(config: Config, remote: Arc<dyn IRemoteDrive>) -> Self {
        let events = Arc::new(EventBus::new());
        let limiter = Arc::new(RateLimiter::new(config.rate_limiting.capacity));
        let cache = config
            .cache
            .enabled
            .then(|| Arc::new(ChangeCache::new(config.cache_path())));
        let retry_queue = Arc::new(RetryQueue::new(config.retry.max_attempts, events.clone()));

        let walker = Arc::new(TreeWalker::new(
            remote.clone(),
            limiter.clone(),
            events.clone(),
            Duration::from_millis(config.sync.page_delay_ms),
        ));
        let downloader = Arc::new(Downloader::new(
            remote.clone(),
            limiter.clone(),
            cache.clone(),
            events.clone(),
            retry_queue.clone(),
            RetryPolicy {
                max_attempts: config.retry.max_attempts.max(1),
                initial_delay: Duration::from_millis(config.retry.initial_delay_ms),
            },
        ));
        let pipeline = FolderPipeline::new(
            walker.clone(),
            downloader,
            events.clone(),
            config.sync.batch_size,
        );

        Self {
            config,
            credentials: None,
            validator: Arc::new(ServiceAccountValidator::new()),
            remote,
            cache,
            events,
            limiter,
            retry_queue,
            walker,
            pipeline,
            initialized: AtomicBool::new(false),
        }
    }

    pub fn with_credentials(mut self, credentials: ServiceAccountCredentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn with_validator(mut self, validator: Arc<dyn ICredentialValidator>) -> Self {
        self.validator = validator;
        self
    }

    /// Event bus for subscribing to progress notifications
    pub fn events(&self) -> Arc<EventBus> {
        self.events.clone()
    }

    /// Token bucket shared by every Drive request the engine makes
    pub fn rate_limiter(&self) -> Arc<RateLimiter> {
        self.limiter.clone()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    /// Checks every precondition of a sync pass. Idempotent.
    #[tracing::instrument(skip(self))]
    pub async fn initialize(&self) -> Result<(), SyncError> {
        if self.is_initialized() {
            self.events.emit(SyncEvent::AlreadyInitialized);
            return Ok(());
        }
        self.events.emit(SyncEvent::Initializing);

        let result = self.run_initialize().await;
        if let Err(err) = &result {
            error!(error = %err, "Initialization failed");
            self.events.emit(SyncEvent::Error {
                message: err.to_string(),
            });
        }
        result
    }

    async fn run_initialize(&self) -> Result<(), SyncError> {
        let credentials = self
            .credentials
            .as_ref()
            .ok_or(SyncError::MissingCredentials)?;
        let report = self.validator.validate(credentials);
        if !report.is_valid {
            return Err(SyncError::InvalidCredentials(report.errors));
        }

        if let Some(cache) = &self.cache {
            cache.load().await;
            self.events.emit(SyncEvent::CacheLoaded {
                entries: cache.len(),
            });
        }

        let root = &self.config.sync.download_root;
        tokio::fs::create_dir_all(root)
            .await
            .map_err(|source| SyncError::DownloadRoot {
                path: root.clone(),
                source,
            })?;
        self.events.emit(SyncEvent::DirectoryCreated { path: root.clone() });

        self.limiter.acquire().await;
        self.remote
            .check_connection()
            .await
            .map_err(|e| SyncError::ConnectivityCheckFailed(format!("{e:#}")))?;
        self.events.emit(SyncEvent::ConnectionTested);

        self.initialized.store(true, Ordering::SeqCst);
        info!(download_root = %root.display(), "Sync engine initialized");
        self.events.emit(SyncEvent::Initialized);
        Ok(())
    }

    /// Runs one full mirroring pass.
    #[tracing::instrument(skip(self))]
    pub async fn sync(&self) -> Result<SyncReport, SyncError> {
        if !self.is_initialized() {
            return Err(SyncError::NotInitialized);
        }

        let start = Instant::now();
        self.events.emit(SyncEvent::SyncStarted);

        let result = self.run_sync(start).await;
        if let Err(err) = &result {
            error!(error = %err, "Sync failed");
            self.events.emit(SyncEvent::Error {
                message: err.to_string(),
            });
        }
        result
    }

    async fn run_sync(&self, start: Instant) -> Result<SyncReport, SyncError> {
        let mut stats = SyncStats::default();
        let mut roots = Vec::new();

        let folders = self
            .walker
            .list_folders()
            .await
            .map_err(|e| SyncError::RemoteListing(format!("{e:#}")))?;
        let remote_roots = TreeWalker::find_roots(&folders);
        info!(folders = folders.len(), roots = remote_roots.len(), "Discovered root folders");

        for root in &remote_roots {
            let local_path = self.config.sync.download_root.join(root.local_name());
            match self.pipeline.sync_folder(root, &local_path).await {
                Ok(produced) => {
                    stats.merge(produced.stats);
                    roots.push(produced.record);
                }
                Err(err) => {
                    warn!(folder_id = %root.id, error = %format!("{err:#}"), "Root folder failed");
                    stats.folders_failed += 1;
                    stats.errors.push(format!("folder {} ({}): {err:#}", root.name, root.id));
                    self.events.emit(SyncEvent::FolderError {
                        folder_id: root.id.to_string(),
                        name: root.name.clone(),
                        error: format!("{err:#}"),
                    });
                }
            }
        }

        let manifest_path = self.config.manifest_path();
        let manifest = serde_json::to_vec_pretty(&roots).map_err(std::io::Error::other)?;
        tokio::fs::write(&manifest_path, manifest).await?;
        info!(path = %manifest_path.display(), roots = roots.len(), "Manifest written");

        if self.config.sync.drain_retries_before_exit && !self.retry_queue.is_idle() {
            info!(pending = self.retry_queue.len(), "Waiting for queued retries");
            self.retry_queue.wait_idle().await;
        }

        self.save_cache().await;

        let report = SyncReport {
            roots,
            files_downloaded: stats.files_downloaded,
            files_skipped: stats.files_skipped,
            files_failed: stats.files_failed,
            files_unsupported: stats.files_unsupported,
            folders_failed: stats.folders_failed,
            errors: stats.errors,
            duration_ms: start.elapsed().as_millis() as u64,
            manifest_path,
        };

        info!(
            roots = report.roots.len(),
            downloaded = report.files_downloaded,
            skipped = report.files_skipped,
            failed = report.files_failed,
            duration_ms = report.duration_ms,
            "Sync completed"
        );
        self.events.emit(SyncEvent::SyncCompleted {
            roots: report.roots.len(),
            files_downloaded: report.files_downloaded,
            files_skipped: report.files_skipped,
            files_failed: report.files_failed,
            duration_ms: report.duration_ms,
        });
        Ok(report)
    }

    /// Persists the change cache, logging instead of failing.
    ///
    /// Safe to call at any point: the cache only ever holds verified files.
    pub async fn save_cache(&self) {
        if let Some(cache) = &self.cache {
            match cache.save().await {
                Ok(()) => info!(path = %cache.path().display(), entries = cache.len(), "Cache saved"),
                Err(err) => warn!(path = %cache.path().display(), error = %err, "Failed to save cache"),
            }
        }
    }
}
