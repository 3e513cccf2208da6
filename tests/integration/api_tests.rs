//! API integration tests
//!
//! These run against a live server with a migrated database.

use reqwest::Client;
use serde_json::{json, Value};

const BASE_URL: &str = "http://localhost:8080/api/v1";

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_health_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/health", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
#[ignore]
async fn test_create_and_get_asset() {
    let client = Client::new();

    let response = client
        .post(format!("{}/assets", BASE_URL))
        .header("x-acting-user", "admin")
        .json(&json!({
            "name": "ThinkPad T14",
            "specification": "Core i5, 16GB",
            "installed_date": "2024-01-15",
            "category_id": 1,
            "location_id": 1
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 201);

    let created: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(created["state"], "AVAILABLE");
    assert_eq!(created["version"], 0);
    assert_eq!(created["created_by"], "admin");

    let id = created["id"].as_str().expect("No id in response");
    let response = client
        .get(format!("{}/assets/{}", BASE_URL, id))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());
    let fetched: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(fetched["code"], created["code"]);
}

#[tokio::test]
#[ignore]
async fn test_stale_update_returns_conflict() {
    let client = Client::new();

    let response = client
        .post(format!("{}/assets", BASE_URL))
        .header("x-acting-user", "admin")
        .json(&json!({
            "name": "Dell U2723",
            "specification": "27 inch",
            "installed_date": "2024-01-15",
            "category_id": 2,
            "location_id": 1
        }))
        .send()
        .await
        .expect("Failed to send request");
    let created: Value = response.json().await.expect("Failed to parse response");
    let id = created["id"].as_str().expect("No id in response");

    let update = json!({
        "name": "Dell U2723 (renamed)",
        "specification": "27 inch",
        "installed_date": "2024-01-15",
        "state": "AVAILABLE",
        "version": 0
    });

    let response = client
        .put(format!("{}/assets/{}", BASE_URL, id))
        .header("x-acting-user", "admin")
        .json(&update)
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    // Same version again: someone else got there first
    let response = client
        .put(format!("{}/assets/{}", BASE_URL, id))
        .header("x-acting-user", "admin")
        .json(&update)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 409);

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["error"], "CONFLICT");
}

#[tokio::test]
#[ignore]
async fn test_list_assets_excludes_recycled_by_default() {
    let client = Client::new();

    let response = client
        .get(format!("{}/assets?size=100", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    for item in body["items"].as_array().expect("No items in response") {
        assert_ne!(item["state"], "RECYCLED");
        assert_ne!(item["state"], "WAITING_FOR_RECYCLING");
    }
}
