//! Tag pages, the JSON search API, health checks and response headers.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use storefinder_integration_tests::{MultipartForm, TestApp};

async fn app_with_stores() -> TestApp {
    let mut app = TestApp::new();
    app.sign_in_as_new_user().await;
    app.create_store(
        MultipartForm::store("Cafe Nero")
            .text("description", "Espresso and pastries")
            .text("tags", "Wifi")
            .text("tags", "Vegetarian"),
    )
    .await;
    app.create_store(
        MultipartForm::store("The Crown")
            .text("description", "Real ale and a coffee machine")
            .text("tags", "Wifi"),
    )
    .await;
    app.create_store(MultipartForm::store("Untagged Corner").text("description", "Quiet"))
        .await;
    app.get("/").await;
    app
}

#[tokio::test]
async fn test_tag_counts_sorted_by_popularity() {
    let app = app_with_stores().await;

    let tags = app.state().stores().list_tags().await.unwrap();
    let pairs: Vec<(&str, u64)> = tags.iter().map(|t| (t.tag.as_str(), t.count)).collect();
    assert_eq!(pairs, [("Wifi", 2), ("Vegetarian", 1)]);
}

#[tokio::test]
async fn test_tags_page_lists_tagged_stores() {
    let mut app = app_with_stores().await;

    let all = app.get("/tags").await;
    assert_eq!(all.status, StatusCode::OK);
    assert!(all.body.contains("Cafe Nero"));
    assert!(all.body.contains("The Crown"));
    assert!(!all.body.contains("Untagged Corner"));

    let vegetarian = app.get("/tags/Vegetarian").await;
    assert!(vegetarian.body.contains("Cafe Nero"));
    assert!(!vegetarian.body.contains("The Crown"));
    assert!(vegetarian.body.contains("tag__link--active"));
}

#[tokio::test]
async fn test_search_api_returns_best_matches() {
    let mut app = app_with_stores().await;

    let response = app.get("/api/search?q=coffee").await;
    assert_eq!(response.status, StatusCode::OK);
    let hits = response.json();
    let hits = hits.as_array().unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits.first().unwrap()["name"], "The Crown");
    assert_eq!(hits.first().unwrap()["url"], "/store/the-crown");

    let empty = app.get("/api/search?q=").await.json();
    assert_eq!(empty, serde_json::json!([]));
}

#[tokio::test]
async fn test_search_api_honors_limit() {
    let mut app = TestApp::new();
    app.sign_in_as_new_user().await;
    for _ in 0..4 {
        app.create_store(MultipartForm::store("Corner Shop")).await;
    }

    let hits = app.get("/api/search?q=corner&limit=2").await.json();
    assert_eq!(hits.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_health_endpoints() {
    let mut app = TestApp::new();
    let live = app.get("/health").await;
    assert_eq!(live.status, StatusCode::OK);
    assert_eq!(live.body, "ok");
    assert_eq!(app.get("/health/ready").await.status, StatusCode::OK);
}

#[tokio::test]
async fn test_responses_carry_security_headers_and_request_id() {
    let mut app = TestApp::new();
    let response = app.get("/stores").await;

    assert!(response.headers.contains_key("content-security-policy"));
    assert_eq!(response.headers["x-frame-options"], "DENY");
    assert!(response.headers.contains_key("x-request-id"));
}

#[tokio::test]
async fn test_static_assets_are_served() {
    let mut app = TestApp::new();
    let placeholder = app.get("/static/images/store.svg").await;
    assert_eq!(placeholder.status, StatusCode::OK);
    assert!(placeholder.body.contains("<svg"));
}
