//! Throttle handling: 429 and rate-limited 403 responses are retried

use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use gdmirror_gdrive::DriveError;

use crate::common::{setup_drive_mock, FOLDERS_QUERY};

#[tokio::test]
async fn test_429_is_retried_after_retry_after() {
    let (server, client) = setup_drive_mock().await;

    Mock::given(method("GET"))
        .and(path("/files"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/files"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "files": [] })))
        .expect(1)
        .mount(&server)
        .await;

    let list = client.list_files(FOLDERS_QUERY, 10, None).await.unwrap();
    assert!(list.files.is_empty());
}

#[tokio::test]
async fn test_rate_limited_403_is_retried() {
    let (server, client) = setup_drive_mock().await;

    Mock::given(method("GET"))
        .and(path("/files"))
        .respond_with(ResponseTemplate::new(403).set_body_json(serde_json::json!({
            "error": { "errors": [{ "reason": "userRateLimitExceeded" }], "code": 403 }
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/files"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "files": [] })))
        .mount(&server)
        .await;

    assert!(client.list_files(FOLDERS_QUERY, 10, None).await.is_ok());
}

#[tokio::test]
async fn test_throttle_budget_exhausted() {
    let (server, client) = setup_drive_mock().await;

    // setup_drive_mock allows 3 retries, so 4 requests in total
    Mock::given(method("GET"))
        .and(path("/files"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
        .expect(4)
        .mount(&server)
        .await;

    let err = client.list_files(FOLDERS_QUERY, 10, None).await.unwrap_err();
    assert!(matches!(err, DriveError::TooManyRequests { .. }));
}
