//! Integration test helpers for the storefront API.
//!
//! # Running Tests
//!
//! ```bash
//! # Start the database and apply migrations
//! task db:start
//! cargo run -p dryfruit-cli -- migrate
//!
//! # Start the server, then run the ignored tests
//! cargo run -p dryfruit-storefront &
//! cargo test -p dryfruit-integration-tests -- --ignored
//! ```
//!
//! `STOREFRONT_TEST_URL` points at the server (default `http://localhost:5000`).
//! `STOREFRONT_DATABASE_URL` is used to promote test accounts to staff roles,
//! since the public API only creates shoppers.

#![allow(clippy::missing_panics_doc)]

use dryfruit_core::Role;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use uuid::Uuid;

/// Password used for every test account.
pub const TEST_PASSWORD: &str = "almond-cashew-walnut-42";

/// Base URL for the storefront API.
#[must_use]
pub fn base_url() -> String {
    std::env::var("STOREFRONT_TEST_URL").unwrap_or_else(|_| "http://localhost:5000".to_string())
}

/// `{base_url}/api{path}`.
#[must_use]
pub fn api(path: &str) -> String {
    format!("{}/api{path}", base_url())
}

/// A client that keeps the session cookie between requests.
///
/// Each client presents its own forwarded address so the per-IP rate limits
/// don't throttle a whole test run.
#[must_use]
pub fn client() -> Client {
    let [a, b, c, ..] = *Uuid::new_v4().as_bytes();
    let mut headers = HeaderMap::new();
    headers.insert(
        "x-forwarded-for",
        HeaderValue::from_str(&format!("10.{a}.{b}.{c}")).expect("valid header value"),
    );

    Client::builder()
        .cookie_store(true)
        .default_headers(headers)
        .build()
        .expect("Failed to create HTTP client")
}

/// A unique throwaway email address.
#[must_use]
pub fn unique_email() -> String {
    format!("test-{}@example.com", Uuid::new_v4().simple())
}

/// Read a `{success, data}` envelope, asserting the status first.
pub async fn data(resp: reqwest::Response, expected: StatusCode) -> Value {
    let status = resp.status();
    let body: Value = resp.json().await.expect("Response was not JSON");
    assert_eq!(status, expected, "unexpected status, body: {body}");
    body.get("data").cloned().unwrap_or(body)
}

/// Register a new shopper and return the logged-in client with its email.
pub async fn register_shopper() -> (Client, String) {
    let client = client();
    let email = unique_email();
    let resp = client
        .post(api("/auth/register"))
        .json(&json!({
            "firstName": "Test",
            "lastName": "Shopper",
            "email": email,
            "password": TEST_PASSWORD,
        }))
        .send()
        .await
        .expect("Failed to register");
    assert_eq!(resp.status(), StatusCode::CREATED);
    (client, email)
}

/// Register an account, give it `role`, and log in again so the session
/// carries the new role.
pub async fn staff_client(role: Role) -> Client {
    let (client, email) = register_shopper().await;

    dotenvy::dotenv().ok();
    let database_url = std::env::var("STOREFRONT_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .expect("STOREFRONT_DATABASE_URL not set");
    let pool = sqlx::PgPool::connect(&database_url)
        .await
        .expect("Failed to connect to database");
    sqlx::query("UPDATE storefront.user SET role = $1::storefront.user_role WHERE email = $2")
        .bind(role.to_string())
        .bind(&email)
        .execute(&pool)
        .await
        .expect("Failed to set role");

    let resp = client
        .post(api("/auth/login"))
        .json(&json!({ "email": email, "password": TEST_PASSWORD }))
        .send()
        .await
        .expect("Failed to log in");
    assert_eq!(resp.status(), StatusCode::OK);
    client
}

/// Create a product with one variant per `(weight, price)` pair.
pub async fn create_product(admin: &Client, variants: &[(&str, u32)]) -> Value {
    let name = format!("Test Almonds {}", Uuid::new_v4().simple());
    let variants: Vec<Value> = variants
        .iter()
        .map(|(weight, price)| json!({ "weight": weight, "price": price, "stock": 50 }))
        .collect();
    let resp = admin
        .post(api("/products"))
        .json(&json!({
            "name": name,
            "category": "Premium",
            "description": "Whole California almonds.",
            "variants": variants,
        }))
        .send()
        .await
        .expect("Failed to create product");
    data(resp, StatusCode::CREATED).await
}

/// Minimal valid shipping details.
#[must_use]
pub fn shipping_info() -> Value {
    json!({
        "name": "Test Shopper",
        "email": "shopper@example.com",
        "phone": "9876543210",
        "pincode": "560001",
        "address": "12 MG Road",
        "city": "Bengaluru",
    })
}

/// The numeric value of a JSON price.
#[must_use]
pub fn price(value: &Value) -> f64 {
    value
        .as_f64()
        .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
        .expect("price was not a number")
}
