//! Thumbnail endpoint client tests against a mock server.

use bananalab_thumbnails::{ThumbnailClient, ThumbnailError};
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const THUMB: &str = "data:image/png;base64,iVBORw0KGgo=";

#[tokio::test]
async fn test_upload_page_posts_data_url() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/thumbnails/proj-1/page/page-2/single"))
        .and(body_json(serde_json::json!({ "thumbnail": THUMB })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": true,
            "message": "Thumbnail saved",
            "files": [
                { "name": "page-2_thumb.png", "url": "/storage/page-2_thumb.png", "quality": "thumb", "size": 5120 },
                { "name": "page-2_medium.png", "quality": "medium" }
            ]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client =
        ThumbnailClient::new(format!("{}/thumbnails/", mock_server.uri()), "proj-1").unwrap();
    let response = client.upload_page("page-2", THUMB).await.unwrap();

    assert!(response.success);
    assert_eq!(response.message.as_deref(), Some("Thumbnail saved"));
    assert_eq!(response.files.len(), 2);
    assert_eq!(response.files[0].size, Some(5120));
    assert_eq!(response.files[1].url, None);
}

#[tokio::test]
async fn test_page_status_reports_files() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/thumbnails/proj-1/page/page-2/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "page_id": "page-2",
            "files": [
                { "name": "page-2_thumb.png", "exists": true, "quality": "thumb" },
                { "name": "page-2_print.png", "exists": false }
            ]
        })))
        .mount(&mock_server)
        .await;

    let client =
        ThumbnailClient::new(format!("{}/thumbnails", mock_server.uri()), "proj-1").unwrap();
    let status = client.page_status("page-2").await.unwrap();

    assert_eq!(status.page_id, "page-2");
    assert!(status.files[0].exists);
    assert!(!status.files[1].exists);
    assert_eq!(status.files[1].quality, None);
}

#[tokio::test]
async fn test_non_success_status_is_an_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/thumbnails/proj-1/page/page-2/single"))
        .respond_with(ResponseTemplate::new(422).set_body_string("invalid thumbnail"))
        .mount(&mock_server)
        .await;

    let client =
        ThumbnailClient::new(format!("{}/thumbnails", mock_server.uri()), "proj-1").unwrap();
    let err = client.upload_page("page-2", "not-a-data-url").await.unwrap_err();

    match err {
        ThumbnailError::Status { status, body } => {
            assert_eq!(status, 422);
            assert_eq!(body, "invalid thumbnail");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}
