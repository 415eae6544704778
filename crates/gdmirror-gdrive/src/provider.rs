//! GoogleDriveProvider - IRemoteDrive implementation for Google Drive v3
//!
//! Wraps the [`DriveClient`] and translates between Drive file resources and
//! the core [`RemoteObject`] / [`RemoteMetadata`] types.
//!
//! ## Design Notes
//!
//! - Uses `tokio::sync::RwLock` because `IRemoteDrive` methods take `&self`
//!   while `DriveClient::set_access_token` requires `&mut self`.
//! - Drive reports `size` as a decimal string; an unparseable size is
//!   treated as unknown rather than failing the whole page.
//! - Only the first entry of `parents` is kept; multi-parent items are
//!   mirrored under their first parent.

use anyhow::{Context, Result};
use futures_util::StreamExt;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use gdmirror_core::domain::newtypes::RemoteId;
use gdmirror_core::domain::remote_object::{
    ObjectKind, RemoteMetadata, RemoteObject, FOLDER_MIME_TYPE,
};
use gdmirror_core::ports::remote_drive::{ByteStream, IRemoteDrive, ListQuery, ObjectPage};

use crate::client::{DriveClient, DriveFile};

/// Default number of objects requested per listing page
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Builds the Drive query-language expression for a listing
pub fn drive_query(query: &ListQuery) -> String {
    match query {
        ListQuery::AllFolders => {
            format!("mimeType = '{FOLDER_MIME_TYPE}' and trashed = false")
        }
        ListQuery::ChildrenOf(parent) => {
            format!("'{}' in parents and trashed = false", parent.as_str())
        }
    }
}

/// Parses Drive's string-encoded byte size
fn parse_size(file_id: &str, size: Option<&str>) -> Option<u64> {
    let raw = size?;
    match raw.parse::<u64>() {
        Ok(n) => Some(n),
        Err(_) => {
            warn!(file_id, size = raw, "Ignoring unparseable file size");
            None
        }
    }
}

/// Converts a Drive file resource into a remote object snapshot
pub fn to_remote_object(file: DriveFile) -> Result<RemoteObject> {
    let id = RemoteId::new(file.id.clone())
        .with_context(|| format!("Drive returned an invalid file id: {:?}", file.id))?;

    let parent_id = match file.parents.first() {
        Some(parent) => Some(
            RemoteId::new(parent.clone())
                .with_context(|| format!("Invalid parent id {parent:?} on file {}", file.id))?,
        ),
        None => None,
    };

    Ok(RemoteObject {
        size_bytes: parse_size(&file.id, file.size.as_deref()),
        kind: ObjectKind::from_mime_type(&file.mime_type),
        id,
        name: file.name,
        mime_type: file.mime_type,
        parent_id,
        modified_at: file.modified_time,
    })
}

fn to_metadata(file: DriveFile) -> RemoteMetadata {
    RemoteMetadata {
        size_bytes: parse_size(&file.id, file.size.as_deref()),
        name: file.name,
        mime_type: file.mime_type,
        modified_at: file.modified_time,
    }
}

/// Google Drive implementation of the [`IRemoteDrive`] port
pub struct GoogleDriveProvider {
    client: RwLock<DriveClient>,
    page_size: u32,
}

impl GoogleDriveProvider {
    /// Creates a provider around an already configured client
    pub fn new(client: DriveClient) -> Self {
        Self {
            client: RwLock::new(client),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Sets the listing page size (clamped to Drive's 1..=1000 range)
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.clamp(1, 1000);
        self
    }

    /// Returns the configured listing page size
    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Replaces the bearer token used for subsequent requests
    pub async fn set_access_token(&self, token: impl Into<String>) {
        self.client.write().await.set_access_token(token);
    }
}

#[async_trait::async_trait]
impl IRemoteDrive for GoogleDriveProvider {
    async fn list_objects(&self, query: &ListQuery, page_token: Option<&str>) -> Result<ObjectPage> {
        let q = drive_query(query);
        let list = self
            .client
            .read()
            .await
            .list_files(&q, self.page_size, page_token)
            .await
            .with_context(|| format!("Failed to list objects for query {q:?}"))?;

        let objects = list
            .files
            .into_iter()
            .map(to_remote_object)
            .collect::<Result<Vec<_>>>()?;

        Ok(ObjectPage {
            objects,
            next_page_token: list.next_page_token,
        })
    }

    async fn get_metadata(&self, id: &RemoteId) -> Result<Option<RemoteMetadata>> {
        let file = self
            .client
            .read()
            .await
            .get_file(id)
            .await
            .with_context(|| format!("Failed to fetch metadata for {id}"))?;
        Ok(file.map(to_metadata))
    }

    async fn get_content_stream(&self, id: &RemoteId) -> Result<ByteStream> {
        let response = self
            .client
            .read()
            .await
            .download(id)
            .await
            .with_context(|| format!("Failed to open content stream for {id}"))?;

        debug!(file_id = %id, content_length = ?response.content_length(), "Content stream opened");

        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.context("Error while reading content stream"));
        Ok(Box::pin(stream))
    }

    async fn check_connection(&self) -> Result<()> {
        self.client
            .read()
            .await
            .list_files(&drive_query(&ListQuery::AllFolders), 1, None)
            .await
            .context("Drive connectivity check failed")?;
        Ok(())
    }
}
