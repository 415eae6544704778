//! Domain entities and business logic
//!
//! This module contains the core domain types for gdmirror:
//! - Newtypes for validated identifiers and local names
//! - Remote object snapshots and metadata
//! - Local folder-tree records written to the manifest
//! - Change-cache entries and retry-queue items
//! - Service-account credentials and their validation
//! - Domain-specific error types

pub mod cache_entry;
pub mod credentials;
pub mod errors;
pub mod newtypes;
pub mod records;
pub mod remote_object;

// Re-export commonly used types
pub use cache_entry::{CacheEntry, RetryQueueItem};
pub use credentials::{ServiceAccountCredentials, ServiceAccountValidator};
pub use errors::DomainError;
pub use newtypes::*;
pub use records::{LocalFileRecord, LocalFolderRecord};
pub use remote_object::{ObjectKind, RemoteMetadata, RemoteObject, FOLDER_MIME_TYPE};
