//! Remote drive port (driven/secondary port)
//!
//! The narrow interface the sync engine needs from a cloud drive: paged
//! listings, single-object metadata and a streamed content read. Nothing
//! else of the provider SDK leaks into the engine.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because errors at port boundaries are adapter-specific
//!   and the engine only distinguishes "absent" (`Ok(None)`) from "failed".
//! - Content is exposed as a stream of byte chunks so that large files are
//!   never held in memory.
//! - Rate limiting is the caller's concern: the engine acquires a token
//!   before every call it makes through this port.

use std::pin::Pin;

use bytes::Bytes;
use futures_util::Stream;

use crate::domain::{
    newtypes::RemoteId,
    remote_object::{RemoteMetadata, RemoteObject},
};

/// Streamed file content, chunk by chunk
pub type ByteStream = Pin<Box<dyn Stream<Item = anyhow::Result<Bytes>> + Send>>;

/// What a listing call should return
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ListQuery {
    /// Every folder-kind object that is not trashed
    AllFolders,
    /// Every immediate child (folders and files) of a folder that is not trashed
    ChildrenOf(RemoteId),
}

/// One page of a listing
#[derive(Debug, Clone, Default)]
pub struct ObjectPage {
    pub objects: Vec<RemoteObject>,
    /// Present when more pages follow
    pub next_page_token: Option<String>,
}

/// Port trait for read-only cloud drive access
#[async_trait::async_trait]
pub trait IRemoteDrive: Send + Sync {
    /// Lists one page of objects matching `query`
    ///
    /// # Arguments
    /// * `query` - Which objects to list
    /// * `page_token` - Token from the previous page, `None` for the first page
    async fn list_objects(
        &self,
        query: &ListQuery,
        page_token: Option<&str>,
    ) -> anyhow::Result<ObjectPage>;

    /// Fetches metadata for a single object
    ///
    /// # Returns
    /// `Ok(None)` when the object does not exist (or is not visible)
    async fn get_metadata(&self, id: &RemoteId) -> anyhow::Result<Option<RemoteMetadata>>;

    /// Opens a streamed read of a file's content
    async fn get_content_stream(&self, id: &RemoteId) -> anyhow::Result<ByteStream>;

    /// Cheap round-trip proving the drive is reachable with the current credentials
    ///
    /// The default issues a folder listing; adapters may override it with a
    /// smaller request.
    async fn check_connection(&self) -> anyhow::Result<()> {
        self.list_objects(&ListQuery::AllFolders, None).await?;
        Ok(())
    }
}
