//! Background retry queue
//!
//! A single-consumer FIFO of failed downloads. `enqueue` appends an item and
//! lazily spawns a drain task when none is running; the drain pops items one
//! at a time, re-queues failures at the tail with one more attempt recorded
//! until the count reaches `max_attempts`, and exits once the queue is
//! empty. Pending items are lost when the process exits.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;
use tracing::{debug, info, warn};

use gdmirror_core::domain::RetryQueueItem;

use crate::events::{EventBus, SyncEvent};
use crate::DownloadError;

/// Performs one queued retry
#[async_trait::async_trait]
pub trait RetryHandler: Send + Sync {
    async fn retry(&self, item: &RetryQueueItem) -> Result<(), DownloadError>;
}

struct QueuedRetry {
    item: RetryQueueItem,
    handler: Arc<dyn RetryHandler>,
}

pub struct RetryQueue {
    items: Mutex<VecDeque<QueuedRetry>>,
    draining: AtomicBool,
    idle: Notify,
    max_attempts: u32,
    events: Arc<EventBus>,
}

impl RetryQueue {
    pub fn new(max_attempts: u32, events: Arc<EventBus>) -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
            draining: AtomicBool::new(false),
            idle: Notify::new(),
            max_attempts: max_attempts.max(1),
            events,
        }
    }

    /// Appends `item` and starts a drain task if none is running.
    ///
    /// Must be called from within a tokio runtime.
    pub fn enqueue(self: &Arc<Self>, item: RetryQueueItem, handler: Arc<dyn RetryHandler>) {
        debug!(file_id = %item.file_id, attempt_count = item.attempt_count, "Queueing retry");
        self.events.emit(SyncEvent::RetryQueued {
            file_id: item.file_id.to_string(),
            attempt_count: item.attempt_count,
        });
        self.items
            .lock()
            .unwrap()
            .push_back(QueuedRetry { item, handler });

        if !self.draining.swap(true, Ordering::SeqCst) {
            let queue = Arc::clone(self);
            tokio::spawn(async move { queue.drain().await });
        }
    }

    pub fn len(&self) -> usize {
        self.items.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True when nothing is queued and no drain task is running
    pub fn is_idle(&self) -> bool {
        !self.draining.load(Ordering::SeqCst) && self.is_empty()
    }

    /// Resolves once the queue is empty and the drain task has stopped.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            if self.is_idle() {
                return;
            }
            notified.await;
        }
    }

    async fn drain(self: Arc<Self>) {
        debug!("Retry drain started");
        loop {
            let next = self.items.lock().unwrap().pop_front();
            match next {
                Some(entry) => self.process(entry).await,
                None => {
                    self.draining.store(false, Ordering::SeqCst);
                    // An enqueue between the pop and the store saw `draining`
                    // still set and did not spawn a task.
                    if !self.is_empty() && !self.draining.swap(true, Ordering::SeqCst) {
                        continue;
                    }
                    debug!("Retry drain finished");
                    self.idle.notify_waiters();
                    return;
                }
            }
        }
    }

    async fn process(&self, entry: QueuedRetry) {
        let QueuedRetry { item, handler } = entry;
        let file_id = item.file_id.to_string();

        match handler.retry(&item).await {
            Ok(()) => {
                info!(file_id, attempt_count = item.attempt_count, "Queued retry succeeded");
                self.events.emit(SyncEvent::RetrySucceeded {
                    file_id,
                    attempt_count: item.attempt_count,
                });
            }
            Err(err) if err.is_retryable() && item.attempt_count < self.max_attempts => {
                warn!(file_id, attempt_count = item.attempt_count, error = %err, "Queued retry failed, requeueing");
                self.items.lock().unwrap().push_back(QueuedRetry {
                    item: item.next_attempt(),
                    handler,
                });
            }
            Err(err) => {
                warn!(file_id, attempt_count = item.attempt_count, error = %err, "Dropping retry");
                self.events.emit(SyncEvent::RetryDropped {
                    file_id,
                    attempt_count: item.attempt_count,
                    error: err.to_string(),
                });
            }
        }
    }
}
