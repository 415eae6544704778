//! # Sync events
//!
//! Typed lifecycle notifications emitted by the engine. Delivery is strictly
//! one-way: handlers observe, they cannot influence the sync.
//!
//! Two ways to consume events:
//!
//! - **Callbacks** registered per event name ([`EventBus::subscribe`]) or for
//!   every event ([`EventBus::subscribe_all`]), removed with
//!   [`EventBus::unsubscribe`]. Callbacks run synchronously on the emitting
//!   task and must be cheap.
//! - **Channels** ([`EventBus::channel`]): an unbounded tokio receiver of
//!   every event, suitable for forwarding to another task.
//!
//! ## Example
//!
//! ```rust
//! use gdmirror_sync::events::{EventBus, SyncEvent};
//!
//! let bus = EventBus::new();
//! let id = bus.subscribe("file_verified", |event| println!("{event:?}"));
//! bus.emit(SyncEvent::Initialized);
//! bus.unsubscribe(id);
//! ```

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::debug;

/// Everything the engine reports while it runs
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SyncEvent {
    // Lifecycle
    Initializing,
    CacheLoaded {
        entries: usize,
    },
    DirectoryCreated {
        path: PathBuf,
    },
    ConnectionTested,
    Initialized,
    AlreadyInitialized,
    SyncStarted,
    SyncCompleted {
        roots: usize,
        files_downloaded: u64,
        files_skipped: u64,
        files_failed: u64,
        duration_ms: u64,
    },
    Error {
        message: String,
    },

    // Listing
    FoldersListed {
        count: usize,
    },
    FilesListed {
        folder_id: String,
        count: usize,
    },

    // Folders
    FolderDownloadStarted {
        folder_id: String,
        name: String,
        path: PathBuf,
    },
    FolderDownloaded {
        folder_id: String,
        name: String,
        path: PathBuf,
        files: usize,
        folders: usize,
    },
    FolderError {
        folder_id: String,
        name: String,
        error: String,
    },

    // Files
    FileDownloadStarted {
        file_id: String,
        path: PathBuf,
    },
    FileDownloaded {
        file_id: String,
        path: PathBuf,
        bytes: u64,
    },
    FileSkipped {
        file_id: String,
        path: PathBuf,
    },
    FileNotFound {
        file_id: String,
    },
    FileEmpty {
        file_id: String,
        path: PathBuf,
    },
    FileSizeMismatch {
        file_id: String,
        expected: u64,
        actual: u64,
    },
    FileVerified {
        file_id: String,
        path: PathBuf,
        bytes: u64,
    },
    FileDownloadError {
        file_id: String,
        path: PathBuf,
        error: String,
    },
    FileRetry {
        file_id: String,
        attempt: u32,
        delay_ms: u64,
        error: String,
    },
    FileUnsupported {
        file_id: String,
        name: String,
        mime_type: String,
    },

    // Retry queue
    RetryQueued {
        file_id: String,
        attempt_count: u32,
    },
    RetrySucceeded {
        file_id: String,
        attempt_count: u32,
    },
    RetryDropped {
        file_id: String,
        attempt_count: u32,
        error: String,
    },
}

impl SyncEvent {
    /// Stable snake_case name used for subscriptions
    pub fn name(&self) -> &'static str {
        match self {
            SyncEvent::Initializing => "initializing",
            SyncEvent::CacheLoaded { .. } => "cache_loaded",
            SyncEvent::DirectoryCreated { .. } => "directory_created",
            SyncEvent::ConnectionTested => "connection_tested",
            SyncEvent::Initialized => "initialized",
            SyncEvent::AlreadyInitialized => "already_initialized",
            SyncEvent::SyncStarted => "sync_started",
            SyncEvent::SyncCompleted { .. } => "sync_completed",
            SyncEvent::Error { .. } => "error",
            SyncEvent::FoldersListed { .. } => "folders_listed",
            SyncEvent::FilesListed { .. } => "files_listed",
            SyncEvent::FolderDownloadStarted { .. } => "folder_download_started",
            SyncEvent::FolderDownloaded { .. } => "folder_downloaded",
            SyncEvent::FolderError { .. } => "folder_error",
            SyncEvent::FileDownloadStarted { .. } => "file_download_started",
            SyncEvent::FileDownloaded { .. } => "file_downloaded",
            SyncEvent::FileSkipped { .. } => "file_skipped",
            SyncEvent::FileNotFound { .. } => "file_not_found",
            SyncEvent::FileEmpty { .. } => "file_empty",
            SyncEvent::FileSizeMismatch { .. } => "file_size_mismatch",
            SyncEvent::FileVerified { .. } => "file_verified",
            SyncEvent::FileDownloadError { .. } => "file_download_error",
            SyncEvent::FileRetry { .. } => "file_retry",
            SyncEvent::FileUnsupported { .. } => "file_unsupported",
            SyncEvent::RetryQueued { .. } => "retry_queued",
            SyncEvent::RetrySucceeded { .. } => "retry_succeeded",
            SyncEvent::RetryDropped { .. } => "retry_dropped",
        }
    }
}

/// Callback invoked with each matching event
pub type EventHandler = Arc<dyn Fn(&SyncEvent) + Send + Sync>;

/// Handle returned by `subscribe`, used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Subscription {
    id: SubscriptionId,
    /// `None` matches every event
    name: Option<String>,
    handler: EventHandler,
}

/// Fan-out of [`SyncEvent`]s to callbacks and channels
///
/// Shared via `Arc<EventBus>` between the engine components.
pub struct EventBus {
    next_id: AtomicU64,
    subscriptions: Mutex<Vec<Subscription>>,
    channels: Mutex<Vec<mpsc::UnboundedSender<SyncEvent>>>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriptions", &self.subscriptions.lock().unwrap().len())
            .field("channels", &self.channels.lock().unwrap().len())
            .finish()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            subscriptions: Mutex::new(Vec::new()),
            channels: Mutex::new(Vec::new()),
        }
    }

    /// Registers `handler` for events whose [`SyncEvent::name`] equals `name`.
    pub fn subscribe<F>(&self, name: &str, handler: F) -> SubscriptionId
    where
        F: Fn(&SyncEvent) + Send + Sync + 'static,
    {
        self.add(Some(name.to_string()), Arc::new(handler))
    }

    /// Registers `handler` for every event.
    pub fn subscribe_all<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&SyncEvent) + Send + Sync + 'static,
    {
        self.add(None, Arc::new(handler))
    }

    /// Removes a subscription; returns false if it was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscriptions = self.subscriptions.lock().unwrap();
        let before = subscriptions.len();
        subscriptions.retain(|s| s.id != id);
        subscriptions.len() != before
    }

    /// Opens a receiver of every event emitted from now on.
    ///
    /// Dropping the receiver unregisters it on the next emit.
    pub fn channel(&self) -> mpsc::UnboundedReceiver<SyncEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.channels.lock().unwrap().push(tx);
        rx
    }

    /// Delivers `event` to every matching subscriber and open channel.
    pub fn emit(&self, event: SyncEvent) {
        debug!(event = event.name(), "Sync event");

        // Handlers run outside the lock so they may (un)subscribe.
        let handlers: Vec<EventHandler> = self
            .subscriptions
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.name.as_deref().map_or(true, |n| n == event.name()))
            .map(|s| Arc::clone(&s.handler))
            .collect();
        for handler in handlers {
            handler(&event);
        }

        self.channels
            .lock()
            .unwrap()
            .retain(|tx| tx.send(event.clone()).is_ok());
    }

    fn add(&self, name: Option<String>, handler: EventHandler) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscriptions.lock().unwrap().push(Subscription { id, name, handler });
        id
    }
}
