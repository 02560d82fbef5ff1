//! Integration tests for Souq.
//!
//! The tests talk HTTP to running services and are `#[ignore]`d by default.
//!
//! # Running Tests
//!
//! ```bash
//! # Database with migrations applied
//! cargo run -p souq-cli -- migrate
//!
//! # Both services (storefront without WEBHOOK_SECRET)
//! cargo run -p souq-storefront &
//! cargo run -p souq-admin &
//!
//! # An admin account for the admin tests
//! SOUQ_ADMIN_PASSWORD=... cargo run -p souq-cli -- admin create -e ... -n ... -r admin
//!
//! cargo test -p souq-integration-tests -- --ignored
//! ```
//!
//! # Environment Variables
//!
//! - `STOREFRONT_URL` - default `http://localhost:3000`
//! - `ADMIN_URL` - default `http://localhost:3001`
//! - `ADMIN_TEST_EMAIL`, `ADMIN_TEST_PASSWORD` - credentials for admin tests
//! - `TEST_PRODUCT_ID` - a product the catalog backend knows, for cart tests

#![allow(clippy::missing_panics_doc, clippy::expect_used)]

use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use uuid::Uuid;

/// Base URL for the storefront API.
#[must_use]
pub fn storefront_url() -> String {
    std::env::var("STOREFRONT_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
}

/// Base URL for the back-office API.
#[must_use]
pub fn admin_url() -> String {
    std::env::var("ADMIN_URL").unwrap_or_else(|_| "http://localhost:3001".to_string())
}

/// A client that keeps session cookies between requests.
#[must_use]
pub fn client() -> Client {
    Client::builder()
        .cookie_store(true)
        .build()
        .expect("Failed to create HTTP client")
}

/// An address no other test run will use.
#[must_use]
pub fn unique_email() -> String {
    format!("it-{}@souq.test", Uuid::new_v4().simple())
}

/// Register a fresh customer and return the signed-in client with its email.
pub async fn registered_customer() -> (Client, String) {
    let client = client();
    let email = unique_email();

    let resp = client
        .post(format!("{}/api/auth/register", storefront_url()))
        .json(&json!({
            "email": email,
            "password": "integration-pass-1",
            "full_name": "Integration Customer",
        }))
        .send()
        .await
        .expect("Failed to register");
    assert_eq!(resp.status(), StatusCode::CREATED);

    (client, email)
}

/// Sign in to the back-office with the test admin account.
pub async fn admin_client() -> Client {
    let email = std::env::var("ADMIN_TEST_EMAIL").expect("ADMIN_TEST_EMAIL not set");
    let password = std::env::var("ADMIN_TEST_PASSWORD").expect("ADMIN_TEST_PASSWORD not set");

    let client = client();
    let resp = client
        .post(format!("{}/api/auth/login", admin_url()))
        .json(&json!({ "email": email, "password": password }))
        .send()
        .await
        .expect("Failed to sign in");
    assert_eq!(resp.status(), StatusCode::OK);

    client
}

/// Deliver an unsigned order webhook and return the status and body.
pub async fn deliver_webhook(source: &str, topic: &str, payload: &Value) -> (StatusCode, Value) {
    let resp = Client::new()
        .post(format!("{}/webhooks/{source}/orders", storefront_url()))
        .header("x-shopify-topic", topic)
        .json(payload)
        .send()
        .await
        .expect("Failed to deliver webhook");

    let status = resp.status();
    let body = resp.json().await.unwrap_or(Value::Null);
    (status, body)
}

/// GET a JSON document with the given client.
pub async fn get_json(client: &Client, url: &str) -> (StatusCode, Value) {
    let resp = client.get(url).send().await.expect("Request failed");
    let status = resp.status();
    let body = resp.json().await.unwrap_or(Value::Null);
    (status, body)
}
