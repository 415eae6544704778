//! Listing tests: query strings, partial-response fields and pagination

use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

use gdmirror_core::domain::newtypes::RemoteId;
use gdmirror_core::ports::remote_drive::{IRemoteDrive, ListQuery};
use gdmirror_gdrive::client::LIST_FIELDS;

use crate::common::{
    file_json, folder_json, mount_list_page, setup_provider_mock, FOLDERS_QUERY, TEST_TOKEN,
};

#[tokio::test]
async fn test_list_all_folders_sends_expected_query() {
    let (server, provider) = setup_provider_mock(50).await;

    Mock::given(method("GET"))
        .and(path("/files"))
        .and(query_param("q", FOLDERS_QUERY))
        .and(query_param("pageSize", "50"))
        .and(query_param("fields", LIST_FIELDS))
        .and(header("authorization", format!("Bearer {TEST_TOKEN}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "files": [folder_json("rootA", "A", None), folder_json("subB", "B", Some("rootA"))]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let page = provider
        .list_objects(&ListQuery::AllFolders, None)
        .await
        .expect("listing should succeed");

    assert_eq!(page.objects.len(), 2);
    assert!(page.next_page_token.is_none());
    assert!(page.objects.iter().all(|o| o.is_folder()));
    assert!(page.objects[0].parent_id.is_none());
    assert_eq!(page.objects[1].parent_id.as_ref().unwrap().as_str(), "rootA");
}

#[tokio::test]
async fn test_list_children_mixes_files_and_folders() {
    let (server, provider) = setup_provider_mock(100).await;

    mount_list_page(
        &server,
        "'rootA' in parents and trashed = false",
        serde_json::json!([
            file_json("fileX", "x.txt", 10, "rootA"),
            folder_json("subB", "B", Some("rootA"))
        ]),
    )
    .await;

    let parent = RemoteId::new("rootA".to_string()).unwrap();
    let page = provider
        .list_objects(&ListQuery::ChildrenOf(parent), None)
        .await
        .unwrap();

    assert_eq!(page.objects.len(), 2);
    let file = &page.objects[0];
    assert_eq!(file.name, "x.txt");
    assert_eq!(file.size_bytes, Some(10));
    assert!(file.modified_at.is_some());
    assert!(page.objects[1].is_folder());
}

#[tokio::test]
async fn test_page_token_is_forwarded() {
    let (server, provider) = setup_provider_mock(1).await;

    Mock::given(method("GET"))
        .and(path("/files"))
        .and(query_param("pageToken", "token-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "files": [folder_json("second", "Second", None)]
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/files"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "files": [folder_json("first", "First", None)],
            "nextPageToken": "token-2"
        })))
        .mount(&server)
        .await;

    let first = provider.list_objects(&ListQuery::AllFolders, None).await.unwrap();
    assert_eq!(first.objects[0].id.as_str(), "first");
    assert_eq!(first.next_page_token.as_deref(), Some("token-2"));

    let second = provider
        .list_objects(&ListQuery::AllFolders, first.next_page_token.as_deref())
        .await
        .unwrap();
    assert_eq!(second.objects[0].id.as_str(), "second");
    assert!(second.next_page_token.is_none());
}

#[tokio::test]
async fn test_listing_server_error_is_reported() {
    let (server, provider) = setup_provider_mock(100).await;

    Mock::given(method("GET"))
        .and(path("/files"))
        .respond_with(ResponseTemplate::new(500).set_body_string("backend down"))
        .mount(&server)
        .await;

    let err = provider
        .list_objects(&ListQuery::AllFolders, None)
        .await
        .unwrap_err();
    let chain = format!("{err:#}");
    assert!(chain.contains("Server error"), "unexpected error: {chain}");
}

#[tokio::test]
async fn test_check_connection_uses_single_item_page() {
    let (server, provider) = setup_provider_mock(100).await;

    Mock::given(method("GET"))
        .and(path("/files"))
        .and(query_param("pageSize", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "files": [] })))
        .expect(1)
        .mount(&server)
        .await;

    provider.check_connection().await.expect("connection check should pass");
}

#[tokio::test]
async fn test_check_connection_fails_on_unauthorized() {
    let (server, provider) = setup_provider_mock(100).await;

    Mock::given(method("GET"))
        .and(path("/files"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid token"))
        .mount(&server)
        .await;

    assert!(provider.check_connection().await.is_err());
}
