//! Remote object snapshots
//!
//! A [`RemoteObject`] is an immutable view of one remote folder or file as
//! it appeared in a listing. Nothing here is persisted; every sync pass
//! fetches fresh snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::newtypes::{LocalName, RemoteId};

/// MIME type Google Drive uses for folders
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// Prefix shared by every Google-native MIME type (Docs, Sheets, folders, ...)
pub const GOOGLE_NATIVE_MIME_PREFIX: &str = "application/vnd.google-apps.";

/// Whether a remote object is a folder or a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    Folder,
    File,
}

impl ObjectKind {
    /// Classify by MIME type: only the Drive folder type is a folder.
    pub fn from_mime_type(mime_type: &str) -> Self {
        if mime_type == FOLDER_MIME_TYPE {
            ObjectKind::Folder
        } else {
            ObjectKind::File
        }
    }
}

/// A remote folder or file as returned by a listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteObject {
    /// Stable remote identifier
    pub id: RemoteId,
    /// Display name on the remote
    pub name: String,
    /// Folder or file
    pub kind: ObjectKind,
    /// Raw MIME type reported by the remote
    pub mime_type: String,
    /// First parent, absent for top-level items
    pub parent_id: Option<RemoteId>,
    /// Last modification time, when the remote reports one
    pub modified_at: Option<DateTime<Utc>>,
    /// Size in bytes (files only; Google-native documents have none)
    pub size_bytes: Option<u64>,
}

impl RemoteObject {
    /// Returns true for folder-kind objects
    pub fn is_folder(&self) -> bool {
        self.kind == ObjectKind::Folder
    }

    /// Google-native documents (Docs, Sheets, ...) have no binary content
    /// that `alt=media` can stream; they can only be exported.
    pub fn is_native_document(&self) -> bool {
        !self.is_folder() && self.mime_type.starts_with(GOOGLE_NATIVE_MIME_PREFIX)
    }

    /// Name usable as a single local path component
    pub fn local_name(&self) -> LocalName {
        LocalName::sanitize(&self.name)
    }
}

/// Metadata for a single object, fetched right before a download
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteMetadata {
    pub name: String,
    pub mime_type: String,
    pub size_bytes: Option<u64>,
    pub modified_at: Option<DateTime<Utc>>,
}
