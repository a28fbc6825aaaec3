//! Contract tests for ListingClient.

use closet_client::{ClosetClient, ClosetConfig};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_client(mock_server: &MockServer) -> ClosetClient {
    let config = ClosetConfig::local_mock(&mock_server.uri()).unwrap();
    ClosetClient::new(&config).unwrap()
}

#[tokio::test]
async fn fetch_page_sends_page_and_limit() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/products"))
        .and(query_param("page", "2"))
        .and(query_param("limit", "6"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "items": [{ "_id": "a", "price": 499 }, { "_id": "b", "price": 999 }],
            "pagination": { "hasMore": true, "pages": 5, "page": 2 }
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let page = test_client(&mock_server).listing().fetch_page(2, 6).await.unwrap();
    assert_eq!(page.items.len(), 2);
    let pagination = page.pagination.unwrap();
    assert_eq!(pagination.has_more, Some(true));
    assert_eq!(pagination.pages, Some(5));
}

#[tokio::test]
async fn fetch_page_accepts_bare_array() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/products"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([{ "_id": "a" }])))
        .mount(&mock_server)
        .await;

    let page = test_client(&mock_server).listing().fetch_page(1, 6).await.unwrap();
    assert_eq!(page.items.len(), 1);
    assert!(page.pagination.is_none());
}

#[tokio::test]
async fn filters_are_forwarded() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/products"))
        .and(query_param("category", "shirts"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server).listing().with_filter("category", "shirts");
    let page = client.fetch_page(1, 6).await.unwrap();
    assert!(page.items.is_empty());
}

#[tokio::test]
async fn server_error_is_reported() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/products"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&mock_server)
        .await;

    let err = test_client(&mock_server).listing().fetch_page(1, 6).await.unwrap_err();
    assert!(err.to_string().contains("503"), "got: {err}");
}
