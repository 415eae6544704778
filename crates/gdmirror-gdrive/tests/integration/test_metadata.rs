//! Metadata lookup tests

use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

use gdmirror_core::domain::newtypes::RemoteId;
use gdmirror_core::ports::remote_drive::IRemoteDrive;
use gdmirror_gdrive::client::METADATA_FIELDS;

use crate::common::setup_provider_mock;

#[tokio::test]
async fn test_get_metadata_parses_string_size() {
    let (server, provider) = setup_provider_mock(100).await;

    Mock::given(method("GET"))
        .and(path("/files/fileX"))
        .and(query_param("fields", METADATA_FIELDS))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "fileX",
            "name": "x.txt",
            "mimeType": "text/plain",
            "size": "10",
            "modifiedTime": "2024-03-02T08:30:00.000Z"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let id = RemoteId::new("fileX".to_string()).unwrap();
    let meta = provider
        .get_metadata(&id)
        .await
        .unwrap()
        .expect("metadata should be present");

    assert_eq!(meta.name, "x.txt");
    assert_eq!(meta.size_bytes, Some(10));
    assert_eq!(
        meta.modified_at.unwrap().to_rfc3339(),
        "2024-03-02T08:30:00+00:00"
    );
}

#[tokio::test]
async fn test_get_metadata_not_found_is_none() {
    let (server, provider) = setup_provider_mock(100).await;

    Mock::given(method("GET"))
        .and(path("/files/gone"))
        .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
            "error": { "code": 404, "message": "File not found: gone." }
        })))
        .mount(&server)
        .await;

    let id = RemoteId::new("gone".to_string()).unwrap();
    assert!(provider.get_metadata(&id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_get_metadata_forbidden_is_error() {
    let (server, provider) = setup_provider_mock(100).await;

    Mock::given(method("GET"))
        .and(path("/files/locked"))
        .respond_with(ResponseTemplate::new(403).set_body_json(serde_json::json!({
            "error": { "errors": [{ "reason": "insufficientFilePermissions" }], "code": 403 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let id = RemoteId::new("locked".to_string()).unwrap();
    assert!(provider.get_metadata(&id).await.is_err());
}
