//! Local folder-tree records
//!
//! These are the nodes of the output manifest. A [`LocalFolderRecord`] is
//! built bottom-up: a sub-folder joins its parent only once its own subtree
//! has been attempted, and a file joins only after it was verified on disk.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::newtypes::RemoteId;

/// A file that was downloaded (or confirmed up to date) and verified
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalFileRecord {
    pub id: RemoteId,
    pub name: String,
    /// Absolute local path
    pub path: PathBuf,
    pub modified_at: DateTime<Utc>,
}

/// A local folder mirroring one remote folder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalFolderRecord {
    pub id: RemoteId,
    pub name: String,
    /// Absolute local path
    pub path: PathBuf,
    pub modified_at: DateTime<Utc>,
    /// Child folders, in listing order
    pub folders: Vec<LocalFolderRecord>,
    /// Child files, in listing order
    pub files: Vec<LocalFileRecord>,
}

impl LocalFolderRecord {
    /// Creates an empty record
    pub fn new(id: RemoteId, name: impl Into<String>, path: PathBuf, modified_at: DateTime<Utc>) -> Self {
        Self {
            id,
            name: name.into(),
            path,
            modified_at,
            folders: Vec::new(),
            files: Vec::new(),
        }
    }

    /// Number of files in this folder and all descendants
    pub fn total_files(&self) -> usize {
        self.files.len() + self.folders.iter().map(Self::total_files).sum::<usize>()
    }

    /// Number of descendant folders (this folder excluded)
    pub fn total_folders(&self) -> usize {
        self.folders.len() + self.folders.iter().map(Self::total_folders).sum::<usize>()
    }

    /// Direct child folder by name
    pub fn folder(&self, name: &str) -> Option<&LocalFolderRecord> {
        self.folders.iter().find(|f| f.name == name)
    }

    /// Direct child file by name
    pub fn file(&self, name: &str) -> Option<&LocalFileRecord> {
        self.files.iter().find(|f| f.name == name)
    }
}
