//! Integration tests for the HTTP API.
//!
//! Drives the real router over an in-memory catalog with axum-test.

// Allow unwrap and panic in tests - these are standard for test code
#![allow(clippy::unwrap_used, clippy::panic)]

use axum::http::{HeaderName, HeaderValue, StatusCode, header::AUTHORIZATION};
use axum_test::TestServer;
use lostfound::api::{AppState, create_router};
use lostfound::config::ServerConfig;
use lostfound_core::Catalog;
use serde_json::{Value, json};

const API_KEY: &str = "test-admin-key";

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

fn server_with(config: ServerConfig) -> TestServer {
    let state = AppState::new(Catalog::in_memory(), config);
    TestServer::new(create_router(state)).unwrap()
}

fn server() -> TestServer {
    server_with(ServerConfig {
        api_key: Some(API_KEY.to_string()),
        public_url: "http://lost.test".to_string(),
        ..ServerConfig::default()
    })
}

fn user_header(id: u64) -> (HeaderName, HeaderValue) {
    (
        HeaderName::from_static("x-user-id"),
        HeaderValue::from_str(&id.to_string()).unwrap(),
    )
}

fn bearer(key: &str) -> HeaderValue {
    HeaderValue::from_str(&format!("Bearer {}", key)).unwrap()
}

async fn register(server: &TestServer, username: &str) -> u64 {
    let response = server
        .post("/api/users")
        .json(&json!({ "username": username, "email": format!("{}@campus.edu", username) }))
        .await;
    response.assert_status(StatusCode::CREATED);
    response.json::<Value>()["id"].as_u64().unwrap()
}

fn wallet_form() -> Value {
    json!({
        "name": "Black Wallet",
        "category": "accessories",
        "description": "Black leather wallet with credit cards and ID inside.",
        "location": "Gym Locker Room",
        "date": "2024-06-01",
        "contact_info": "desk@campus.edu"
    })
}

async fn report(server: &TestServer, user: u64, kind: &str, form: &Value) -> Value {
    let (name, value) = user_header(user);
    let response = server
        .post(&format!("/api/items/{}", kind))
        .add_header(name, value)
        .json(form)
        .await;
    response.assert_status(StatusCode::CREATED);
    response.json::<Value>()
}

async fn approve(server: &TestServer, item: u64) -> Value {
    let response = server
        .post(&format!("/api/admin/items/{}/moderate", item))
        .add_header(AUTHORIZATION, bearer(API_KEY))
        .json(&json!({ "decision": "approve" }))
        .await;
    response.assert_status_ok();
    response.json::<Value>()
}

// =============================================================================
// PUBLIC ROUTES
// =============================================================================

#[tokio::test]
async fn test_health() {
    let server = server();
    let response = server.get("/health").await;
    response.assert_status_ok();
    let body = response.json::<Value>();
    assert_eq!(body["status"], "ok");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_home_on_empty_catalog() {
    let server = server();
    let response = server.get("/api/home").await;
    response.assert_status_ok();
    let body = response.json::<Value>();
    assert!(body["welcome"].is_string());
    assert_eq!(body["recent_lost"], json!([]));
}

#[tokio::test]
async fn test_items_by_date_wraps_series_in_data() {
    let server = server();
    let response = server.get("/api/items-by-date?days=7").await;
    response.assert_status_ok();
    assert!(response.json::<Value>()["data"].is_array());
}

#[tokio::test]
async fn test_duplicate_username_conflicts() {
    let server = server();
    register(&server, "alice").await;
    let response = server
        .post("/api/users")
        .json(&json!({ "username": "ALICE" }))
        .await;
    response.assert_status(StatusCode::CONFLICT);
    assert_eq!(response.json::<Value>()["code"], "conflict");
}

// =============================================================================
// ITEM LIFECYCLE
// =============================================================================

#[tokio::test]
async fn test_report_moderate_claim_return() {
    let server = server();
    let alice = register(&server, "alice").await;
    let bob = register(&server, "bob").await;

    // Reported items stay hidden until approved
    let lost = report(&server, alice, "lost", &wallet_form()).await;
    let lost_id = lost["item"]["id"].as_u64().unwrap();
    assert_eq!(lost["item"]["status"], "pending");
    server
        .get(&format!("/api/items/{}", lost_id))
        .await
        .assert_status(StatusCode::NOT_FOUND);

    let approved = approve(&server, lost_id).await;
    assert_eq!(approved["status"], "approved");

    // A matching found report pairs with the approved lost item
    let found = report(&server, bob, "found", &wallet_form()).await;
    let matches = found["matches"].as_array().unwrap();
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0]["lost_item"], lost_id);

    // Bob claims, Alice approves
    let (name, value) = user_header(bob);
    let claim = server
        .post(&format!("/api/items/{}/claim", lost_id))
        .add_header(name, value)
        .await;
    claim.assert_status(StatusCode::CREATED);
    let claim_id = claim.json::<Value>()["id"].as_u64().unwrap();

    let (name, value) = user_header(alice);
    let dashboard = server.get("/api/dashboard").add_header(name, value).await;
    dashboard.assert_status_ok();
    assert_eq!(
        dashboard.json::<Value>()["item_claims"].as_array().unwrap().len(),
        1
    );

    let (name, value) = user_header(alice);
    server
        .post(&format!("/api/claims/{}/approve", claim_id))
        .add_header(name, value)
        .await
        .assert_status_ok();

    let (name, value) = user_header(bob);
    let returned = server
        .post(&format!("/api/items/{}/return", lost_id))
        .add_header(name, value)
        .await;
    returned.assert_status_ok();
    assert_eq!(returned.json::<Value>()["status"], "returned");
}

#[tokio::test]
async fn test_owner_rules() {
    let server = server();
    let alice = register(&server, "alice").await;
    let bob = register(&server, "bob").await;
    let item = report(&server, alice, "found", &wallet_form()).await;
    let id = item["item"]["id"].as_u64().unwrap();
    approve(&server, id).await;

    // Another user's item looks missing to edits
    let (name, value) = user_header(bob);
    server
        .put(&format!("/api/items/{}", id))
        .add_header(name, value)
        .json(&wallet_form())
        .await
        .assert_status(StatusCode::NOT_FOUND);

    // Claiming your own item is forbidden
    let (name, value) = user_header(alice);
    let response = server
        .post(&format!("/api/items/{}/claim", id))
        .add_header(name, value)
        .await;
    response.assert_status(StatusCode::FORBIDDEN);
    assert_eq!(response.json::<Value>()["code"], "forbidden");

    // The owner can delete
    let (name, value) = user_header(alice);
    server
        .delete(&format!("/api/items/{}", id))
        .add_header(name, value)
        .await
        .assert_status_ok();
    server
        .get(&format!("/api/items/{}/share", id))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_share_link_uses_public_url() {
    let server = server();
    let alice = register(&server, "alice").await;
    let item = report(&server, alice, "lost", &wallet_form()).await;
    let id = item["item"]["id"].as_u64().unwrap();

    let response = server.get(&format!("/api/items/{}/share", id)).await;
    response.assert_status_ok();
    let body = response.json::<Value>();
    assert_eq!(body["url"], format!("http://lost.test/api/items/{}", id));
    assert!(body["text"].as_str().unwrap().starts_with("Lost: Black Wallet"));
}

#[tokio::test]
async fn test_invalid_form_is_rejected() {
    let server = server();
    let alice = register(&server, "alice").await;
    let (name, value) = user_header(alice);

    let mut form = wallet_form();
    form["name"] = json!("   ");
    let response = server
        .post("/api/items/lost")
        .add_header(name.clone(), value.clone())
        .json(&form)
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["code"], "validation_failed");

    let response = server
        .post("/api/items/lost")
        .add_header(name, value)
        .json(&json!({ "name": "only a name" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["code"], "bad_request");
}

#[tokio::test]
async fn test_malformed_path_and_query_answer_json() {
    let server = server();

    let response = server.get("/api/items/abc").await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body = response.json::<Value>();
    assert_eq!(body["code"], "bad_request");
    assert!(body["error"].is_string());

    let response = server.get("/api/items-by-date?days=lots").await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["code"], "bad_request");
}

// =============================================================================
// SEARCH
// =============================================================================

#[tokio::test]
async fn test_search_relaxes_to_item_type() {
    let server = server();
    let alice = register(&server, "alice").await;
    let item = report(&server, alice, "lost", &wallet_form()).await;
    approve(&server, item["item"]["id"].as_u64().unwrap()).await;

    let strict = server.get("/api/items?search=wallet").await;
    strict.assert_status_ok();
    let body = strict.json::<Value>();
    assert_eq!(body["relaxed"], false);
    assert_eq!(body["page"]["total"], 1);

    let relaxed = server.get("/api/items?search=zzzz&item_type=lost").await;
    relaxed.assert_status_ok();
    let body = relaxed.json::<Value>();
    assert_eq!(body["relaxed"], true);
    assert_eq!(body["tier"]["tier"], "item_type");
    assert!(body["message"].is_string());
    assert_eq!(body["page"]["items"][0]["name"], "Black Wallet");
}

#[tokio::test]
async fn test_search_rejects_bad_filters() {
    let server = server();
    let response = server.get("/api/items?date_from=yesterday").await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["code"], "validation_failed");
}

// =============================================================================
// AUTHENTICATION AND LIMITS
// =============================================================================

#[tokio::test]
async fn test_identity_is_required() {
    let server = server();
    let response = server.get("/api/dashboard").await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(response.json::<Value>()["code"], "unauthorized");

    let (name, value) = user_header(42);
    server
        .get("/api/dashboard")
        .add_header(name, value)
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_requires_api_key() {
    let server = server();
    server
        .post("/api/admin/matching/run")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
    server
        .post("/api/admin/matching/run")
        .add_header(AUTHORIZATION, bearer("wrong"))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    let response = server
        .post("/api/admin/matching/run")
        .add_header(AUTHORIZATION, bearer(API_KEY))
        .await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["pairs_examined"], 0);
}

#[tokio::test]
async fn test_admin_disabled_without_key() {
    let server = server_with(ServerConfig::default());
    server
        .get("/api/admin/items/pending")
        .add_header(AUTHORIZATION, bearer(API_KEY))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_rate_limit() {
    let server = server_with(ServerConfig {
        rate_limit: 1,
        ..ServerConfig::default()
    });
    server.get("/health").await.assert_status_ok();
    let response = server.get("/health").await;
    response.assert_status(StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(response.json::<Value>()["code"], "rate_limited");
}
