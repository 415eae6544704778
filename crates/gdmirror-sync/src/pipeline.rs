//! Folder download pipeline
//!
//! Mirrors one remote folder subtree to a local directory and builds its
//! [`LocalFolderRecord`]. Traversal is depth-first with an explicit stack of
//! open folders rather than recursion: opening a folder creates its
//! directory, lists its children and downloads its files; a folder is closed
//! (and attached to its parent record) once every sub-folder below it has
//! been attempted.
//!
//! Files inside a folder are downloaded in batches of `batch_size`; a batch
//! must settle completely before the next one starts. Per-file and
//! per-sub-folder failures are reported and left out of the record, they
//! never abort siblings.

use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use futures_util::future::join_all;
use serde::Serialize;
use tracing::{debug, info, warn};

use gdmirror_core::domain::{LocalFileRecord, LocalFolderRecord, LocalName, RemoteId, RemoteObject};

use crate::events::{EventBus, SyncEvent};
use crate::transfer::{DownloadOutcome, Downloader};
use crate::walker::TreeWalker;

/// Counters accumulated while producing a subtree
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncStats {
    pub files_downloaded: u64,
    pub files_skipped: u64,
    pub files_failed: u64,
    pub files_unsupported: u64,
    pub folders_failed: u64,
    /// One line per failed file or folder
    pub errors: Vec<String>,
}

impl SyncStats {
    pub fn merge(&mut self, other: SyncStats) {
        self.files_downloaded += other.files_downloaded;
        self.files_skipped += other.files_skipped;
        self.files_failed += other.files_failed;
        self.files_unsupported += other.files_unsupported;
        self.folders_failed += other.folders_failed;
        self.errors.extend(other.errors);
    }
}

/// A produced subtree and what it took to produce it
#[derive(Debug, Clone)]
pub struct FolderSync {
    pub record: LocalFolderRecord,
    pub stats: SyncStats,
}

/// An open folder on the traversal stack
struct Frame {
    record: LocalFolderRecord,
    /// Sub-folders not yet attempted, in listing order
    pending: VecDeque<RemoteObject>,
    /// Ids of this folder and all its open ancestors
    ancestors: HashSet<RemoteId>,
}

pub struct FolderPipeline {
    walker: Arc<TreeWalker>,
    downloader: Arc<Downloader>,
    events: Arc<EventBus>,
    batch_size: usize,
}

impl FolderPipeline {
    pub fn new(
        walker: Arc<TreeWalker>,
        downloader: Arc<Downloader>,
        events: Arc<EventBus>,
        batch_size: usize,
    ) -> Self {
        Self {
            walker,
            downloader,
            events,
            batch_size: batch_size.max(1),
        }
    }

    /// Mirrors `folder` and everything below it into `local_path`.
    ///
    /// Fails only when `folder` itself cannot be opened; failures deeper in
    /// the tree are absorbed into [`SyncStats`].
    #[tracing::instrument(skip_all, fields(folder_id = %folder.id, name = %folder.name))]
    pub async fn sync_folder(&self, folder: &RemoteObject, local_path: &Path) -> Result<FolderSync> {
        let mut stats = SyncStats::default();
        let root = self
            .open_folder(folder, local_path.to_path_buf(), HashSet::new(), &mut stats)
            .await?;
        let mut stack = vec![root];

        while let Some(mut frame) = stack.pop() {
            match frame.pending.pop_front() {
                Some(child) => {
                    if frame.ancestors.contains(&child.id) {
                        warn!(folder_id = %child.id, name = %child.name, "Folder is its own ancestor, skipping");
                        stack.push(frame);
                        continue;
                    }

                    let child_path = frame.record.path.join(child.local_name());
                    let ancestors = frame.ancestors.clone();
                    stack.push(frame);

                    match self.open_folder(&child, child_path, ancestors, &mut stats).await {
                        Ok(child_frame) => stack.push(child_frame),
                        Err(err) => {
                            warn!(folder_id = %child.id, error = %format!("{err:#}"), "Folder failed");
                            stats.folders_failed += 1;
                            stats.errors.push(format!("folder {} ({}): {err:#}", child.name, child.id));
                            self.events.emit(SyncEvent::FolderError {
                                folder_id: child.id.to_string(),
                                name: child.name.clone(),
                                error: format!("{err:#}"),
                            });
                        }
                    }
                }
                None => {
                    let record = frame.record;
                    self.events.emit(SyncEvent::FolderDownloaded {
                        folder_id: record.id.to_string(),
                        name: record.name.clone(),
                        path: record.path.clone(),
                        files: record.files.len(),
                        folders: record.folders.len(),
                    });

                    match stack.last_mut() {
                        Some(parent) => parent.record.folders.push(record),
                        None => {
                            info!(
                                files = record.total_files(),
                                folders = record.total_folders(),
                                "Folder tree produced"
                            );
                            return Ok(FolderSync { record, stats });
                        }
                    }
                }
            }
        }

        Err(anyhow!("Traversal of {} ended without a record", folder.id))
    }

    /// Creates the directory, lists children and downloads the files.
    async fn open_folder(
        &self,
        folder: &RemoteObject,
        path: PathBuf,
        mut ancestors: HashSet<RemoteId>,
        stats: &mut SyncStats,
    ) -> Result<Frame> {
        self.events.emit(SyncEvent::FolderDownloadStarted {
            folder_id: folder.id.to_string(),
            name: folder.name.clone(),
            path: path.clone(),
        });

        tokio::fs::create_dir_all(&path)
            .await
            .with_context(|| format!("Failed to create {}", path.display()))?;

        let children = self.walker.list_children(&folder.id).await?;
        // Colliding children share one path on disk
        for name in duplicate_local_names(&children) {
            warn!(folder_id = %folder.id, name = %name.as_str(), "Several children map to the same local name");
        }
        let (folders, files): (Vec<RemoteObject>, Vec<RemoteObject>) =
            children.into_iter().partition(RemoteObject::is_folder);

        debug!(files = files.len(), folders = folders.len(), "Opened folder");

        let mut record = LocalFolderRecord::new(
            folder.id.clone(),
            folder.name.clone(),
            path,
            folder.modified_at.unwrap_or_else(Utc::now),
        );

        let downloadable: Vec<RemoteObject> = files
            .into_iter()
            .filter(|file| {
                if file.is_native_document() {
                    debug!(file_id = %file.id, mime_type = %file.mime_type, "No binary content, skipping");
                    stats.files_unsupported += 1;
                    self.events.emit(SyncEvent::FileUnsupported {
                        file_id: file.id.to_string(),
                        name: file.name.clone(),
                        mime_type: file.mime_type.clone(),
                    });
                    false
                } else {
                    true
                }
            })
            .collect();

        for batch in downloadable.chunks(self.batch_size) {
            let results = join_all(batch.iter().map(|file| {
                let target = record.path.join(file.local_name());
                async move {
                    let result = self.downloader.download_file(&file.id, &target).await;
                    (file, target, result)
                }
            }))
            .await;

            // join_all preserves input order, so files land in listing order
            for (file, target, result) in results {
                match result {
                    Ok(outcome) => {
                        match outcome {
                            DownloadOutcome::Verified { .. } => stats.files_downloaded += 1,
                            DownloadOutcome::Skipped => stats.files_skipped += 1,
                        }
                        record.files.push(LocalFileRecord {
                            id: file.id.clone(),
                            name: file.name.clone(),
                            path: target,
                            modified_at: file.modified_at.unwrap_or_else(Utc::now),
                        });
                    }
                    Err(err) => {
                        stats.files_failed += 1;
                        stats.errors.push(format!("file {} ({}): {err}", file.name, file.id));
                    }
                }
            }
        }

        ancestors.insert(folder.id.clone());
        Ok(Frame {
            record,
            pending: folders.into(),
            ancestors,
        })
    }
}

/// Local names claimed by more than one child, each reported once in
/// listing order
fn duplicate_local_names(children: &[RemoteObject]) -> Vec<LocalName> {
    let mut seen = HashSet::new();
    let mut duplicates = Vec::new();
    for child in children {
        let name = child.local_name();
        if !seen.insert(name.clone()) && !duplicates.contains(&name) {
            duplicates.push(name);
        }
    }
    duplicates
}
