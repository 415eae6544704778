//! Streamed download tests

use futures_util::StreamExt;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

use gdmirror_core::domain::newtypes::RemoteId;
use gdmirror_core::ports::remote_drive::IRemoteDrive;

use crate::common::setup_provider_mock;

#[tokio::test]
async fn test_content_stream_yields_full_body() {
    let (server, provider) = setup_provider_mock(100).await;
    let body: Vec<u8> = (0..64 * 1024).map(|i| (i % 251) as u8).collect();

    Mock::given(method("GET"))
        .and(path("/files/big"))
        .and(query_param("alt", "media"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
        .expect(1)
        .mount(&server)
        .await;

    let id = RemoteId::new("big".to_string()).unwrap();
    let mut stream = provider.get_content_stream(&id).await.unwrap();

    let mut received = Vec::new();
    while let Some(chunk) = stream.next().await {
        received.extend_from_slice(&chunk.unwrap());
    }
    assert_eq!(received, body);
}

#[tokio::test]
async fn test_content_stream_not_found_is_error() {
    let (server, provider) = setup_provider_mock(100).await;

    Mock::given(method("GET"))
        .and(path("/files/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let id = RemoteId::new("missing".to_string()).unwrap();
    assert!(provider.get_content_stream(&id).await.is_err());
}
