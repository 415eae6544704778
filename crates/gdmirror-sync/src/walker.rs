//! Remote tree walker
//!
//! Drains paged listings from the remote drive and works out which folders
//! are roots of the mirror. Every page costs one rate-limiter token and
//! consecutive pages are separated by a short delay.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, info};

use gdmirror_core::domain::{RemoteId, RemoteObject};
use gdmirror_core::ports::remote_drive::{IRemoteDrive, ListQuery};

use crate::events::{EventBus, SyncEvent};
use crate::rate_limit::RateLimiter;

/// Paginated listing front-end over an [`IRemoteDrive`]
pub struct TreeWalker {
    remote: Arc<dyn IRemoteDrive>,
    limiter: Arc<RateLimiter>,
    events: Arc<EventBus>,
    page_delay: Duration,
}

impl TreeWalker {
    pub fn new(
        remote: Arc<dyn IRemoteDrive>,
        limiter: Arc<RateLimiter>,
        events: Arc<EventBus>,
        page_delay: Duration,
    ) -> Self {
        Self {
            remote,
            limiter,
            events,
            page_delay,
        }
    }

    /// Every non-trashed folder visible to the account.
    #[tracing::instrument(skip(self))]
    pub async fn list_folders(&self) -> Result<Vec<RemoteObject>> {
        let folders: Vec<RemoteObject> = self
            .list_all(&ListQuery::AllFolders)
            .await
            .context("Failed to list folders")?
            .into_iter()
            .filter(RemoteObject::is_folder)
            .collect();

        info!(count = folders.len(), "Listed remote folders");
        self.events.emit(SyncEvent::FoldersListed {
            count: folders.len(),
        });
        Ok(folders)
    }

    /// Immediate children (folders and files) of `folder_id`.
    pub async fn list_children(&self, folder_id: &RemoteId) -> Result<Vec<RemoteObject>> {
        let children = self
            .list_all(&ListQuery::ChildrenOf(folder_id.clone()))
            .await
            .with_context(|| format!("Failed to list children of {folder_id}"))?;

        self.events.emit(SyncEvent::FilesListed {
            folder_id: folder_id.to_string(),
            count: children.len(),
        });
        Ok(children)
    }

    /// Immediate non-folder children of `folder_id`.
    pub async fn list_files(&self, folder_id: &RemoteId) -> Result<Vec<RemoteObject>> {
        Ok(self
            .list_children(folder_id)
            .await?
            .into_iter()
            .filter(|o| !o.is_folder())
            .collect())
    }

    async fn list_all(&self, query: &ListQuery) -> Result<Vec<RemoteObject>> {
        let mut objects = Vec::new();
        let mut page_token: Option<String> = None;
        let mut pages = 0u32;

        loop {
            self.limiter.acquire().await;
            let page = self.remote.list_objects(query, page_token.as_deref()).await?;
            pages += 1;
            objects.extend(page.objects);

            match page.next_page_token {
                Some(token) if !token.is_empty() => {
                    debug!(pages, so_far = objects.len(), "Fetching next listing page");
                    page_token = Some(token);
                    if !self.page_delay.is_zero() {
                        tokio::time::sleep(self.page_delay).await;
                    }
                }
                _ => break,
            }
        }

        Ok(objects)
    }

    /// Folders with no discoverable parent, in first-discovery order.
    ///
    /// A folder's root is found by following `parent_id` until it is absent
    /// or names a folder outside `folders`. A revisited id ends the walk at
    /// the current node, so corrupt parent cycles terminate.
    pub fn find_roots(folders: &[RemoteObject]) -> Vec<RemoteObject> {
        let by_id: HashMap<&str, &RemoteObject> =
            folders.iter().map(|f| (f.id.as_str(), f)).collect();

        let mut seen = HashSet::new();
        let mut roots = Vec::new();
        for folder in folders {
            let root = root_of(folder, &by_id);
            if seen.insert(root.id.as_str()) {
                roots.push(root.clone());
            }
        }
        roots
    }
}

fn root_of<'a>(start: &'a RemoteObject, by_id: &HashMap<&str, &'a RemoteObject>) -> &'a RemoteObject {
    let mut current = start;
    let mut visited = HashSet::from([current.id.as_str()]);

    loop {
        let Some(parent_id) = &current.parent_id else {
            return current;
        };
        let Some(parent) = by_id.get(parent_id.as_str()) else {
            return current;
        };
        if !visited.insert(parent.id.as_str()) {
            return current;
        }
        current = parent;
    }
}
