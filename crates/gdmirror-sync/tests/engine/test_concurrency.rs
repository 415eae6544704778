//! Batch bounds on parallel content requests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use gdmirror_core::domain::{RemoteId, RemoteMetadata};
use gdmirror_core::ports::remote_drive::{ByteStream, IRemoteDrive, ListQuery, ObjectPage};
use gdmirror_sync::SyncEngine;

use crate::common::{test_config, valid_credentials, FakeDrive};

/// Wraps a `FakeDrive` and records how many content requests overlap
struct GaugeDrive {
    inner: FakeDrive,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

#[async_trait::async_trait]
impl IRemoteDrive for GaugeDrive {
    async fn list_objects(&self, query: &ListQuery, page_token: Option<&str>) -> Result<ObjectPage> {
        self.inner.list_objects(query, page_token).await
    }

    async fn get_metadata(&self, file_id: &RemoteId) -> Result<Option<RemoteMetadata>> {
        self.inner.get_metadata(file_id).await
    }

    async fn get_content_stream(&self, file_id: &RemoteId) -> Result<ByteStream> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.inner.get_content_stream(file_id).await
    }
}

#[tokio::test]
async fn test_content_requests_never_exceed_batch_size() {
    let dir = tempfile::tempdir().unwrap();
    let mut inner = FakeDrive::new().folder("fA", "A", None);
    for i in 0..12 {
        inner = inner.file(&format!("f{i:02}"), &format!("file{i:02}.txt"), "fA", b"0123456789");
    }
    let drive = Arc::new(GaugeDrive {
        inner,
        in_flight: AtomicUsize::new(0),
        peak: AtomicUsize::new(0),
    });
    let config = test_config(dir.path()).sync_batch_size(3).build();
    let engine = SyncEngine::new(config, drive.clone()).with_credentials(valid_credentials());

    engine.initialize().await.unwrap();
    let report = engine.sync().await.unwrap();

    assert_eq!(report.files_downloaded, 12);
    assert_eq!(report.roots[0].files.len(), 12);
    // Each batch is started together and settles before the next begins
    assert_eq!(drive.peak.load(Ordering::SeqCst), 3);
    assert_eq!(drive.inner.total_content_calls(), 12);
}
