//! Integration tests for accounts and sessions.
//!
//! These tests require:
//! - A migrated `PostgreSQL` database (task db:start, dfj-cli migrate)
//! - The storefront server running (cargo run -p dryfruit-storefront)
//!
//! Run with: cargo test -p dryfruit-integration-tests -- --ignored

use dryfruit_integration_tests::{
    TEST_PASSWORD, api, base_url, client, data, register_shopper, unique_email,
};
use reqwest::StatusCode;
use serde_json::{Value, json};

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_health() {
    let resp = client()
        .get(format!("{}/health", base_url()))
        .send()
        .await
        .expect("Failed to reach server");
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers().contains_key("x-request-id"));
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_register_then_profile() {
    let (client, email) = register_shopper().await;

    let resp = client
        .get(api("/auth/profile"))
        .send()
        .await
        .expect("Failed to get profile");
    let profile = data(resp, StatusCode::OK).await;

    assert_eq!(profile["email"], email);
    assert_eq!(profile["role"], "user");
    assert!(profile.get("passwordHash").is_none());
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_duplicate_registration_conflicts() {
    let (_, email) = register_shopper().await;

    let resp = client()
        .post(api("/auth/register"))
        .json(&json!({
            "firstName": "Again",
            "lastName": "Shopper",
            "email": email.to_uppercase(),
            "password": TEST_PASSWORD,
        }))
        .send()
        .await
        .expect("Failed to register");

    assert_eq!(resp.status(), StatusCode::CONFLICT);
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_wrong_password_is_rejected() {
    let (_, email) = register_shopper().await;

    let resp = client()
        .post(api("/auth/login"))
        .json(&json!({ "email": email, "password": "not-the-password" }))
        .send()
        .await
        .expect("Failed to log in");

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = resp.json().await.expect("Response was not JSON");
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Invalid email or password");
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_logout_ends_session() {
    let (client, _) = register_shopper().await;

    let resp = client
        .post(api("/auth/logout"))
        .send()
        .await
        .expect("Failed to log out");
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = client
        .get(api("/cart"))
        .send()
        .await
        .expect("Failed to get cart");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_short_password_is_rejected() {
    let resp = client()
        .post(api("/auth/register"))
        .json(&json!({
            "firstName": "Short",
            "lastName": "Password",
            "email": unique_email(),
            "password": "abc",
        }))
        .send()
        .await
        .expect("Failed to register");

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_shopper_cannot_list_users() {
    let (client, _) = register_shopper().await;

    let resp = client
        .get(api("/users"))
        .send()
        .await
        .expect("Failed to list users");

    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}
