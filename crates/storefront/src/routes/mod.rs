//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                          - Liveness
//! GET    /health/ready                    - Readiness (database ping)
//!
//! # Catalog
//! GET    /api/products                    - Product listing (?category&search&page&after)
//! GET    /api/products/{id}               - Product detail
//! GET    /api/products/by-slug/{slug}     - Product detail by slug/handle
//! GET    /api/products/{id}/related       - Related products
//! GET    /api/categories                  - Category listing
//!
//! # Cart (session)
//! GET    /api/cart                        - Cart with totals
//! POST   /api/cart/items                  - Add a product
//! PATCH  /api/cart/items                  - Set a line's quantity (<= 0 removes)
//! DELETE /api/cart/items                  - Remove a line
//! DELETE /api/cart                        - Empty the cart
//! GET    /api/cart/remote                 - Backend copy of the cart (REST only)
//! POST   /api/checkout                    - Place the order
//!
//! # Auth
//! POST   /api/auth/register               - Create an account
//! POST   /api/auth/login                  - Sign in
//! POST   /api/auth/logout                 - Sign out
//! GET    /api/auth/me                     - Current user
//!
//! # Account (requires auth)
//! GET    /api/account                     - Profile
//! PATCH  /api/account                     - Update name/phone
//! GET    /api/account/loyalty             - Balance and ledger
//! POST   /api/account/loyalty/redeem      - Spend points
//! GET    /api/account/orders              - Mirrored orders
//! GET    /api/account/orders/remote       - Orders from the catalog backend
//! GET    /api/account/orders/{id}         - Mirrored order with items
//! GET    /api/account/addresses           - Address book
//! POST   /api/account/addresses           - Add an address
//! PATCH  /api/account/addresses/{id}      - Update an address
//! DELETE /api/account/addresses/{id}      - Delete an address
//!
//! # Notifications
//! GET    /api/notifications               - Bell contents (requires auth)
//! POST   /api/notifications/{id}/read     - Mark read
//! POST   /api/notifications/{id}/unread   - Mark unread
//! POST   /api/notifications/read-all      - Mark all read
//! POST   /api/notifications/email         - Send a templated notice (bearer key)
//!
//! # Wishlist (DB for customers, session for guests)
//! GET    /api/wishlist                    - List
//! POST   /api/wishlist                    - Save a product
//! DELETE /api/wishlist/{product_id}       - Remove a product
//!
//! # Context
//! GET    /api/preferences                 - Currency and language
//! PUT    /api/preferences                 - Change currency and/or language
//! GET    /api/context/events              - Server-sent context changes
//!
//! # Webhooks
//! POST   /webhooks/{source}/orders        - Order events (storefront | catalog)
//! ```

pub mod account;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod notifications;
pub mod preferences;
pub mod webhooks;
pub mod wishlist;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use serde::Serialize;

use crate::middleware::{api_rate_limiter, auth_rate_limiter};
use crate::state::AppState;

/// Create the catalog routes router.
pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(catalog::index))
        .route("/products/by-slug/{slug}", get(catalog::by_slug))
        .route("/products/{id}", get(catalog::show))
        .route("/products/{id}/related", get(catalog::related))
        .route("/categories", get(catalog::categories))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show).delete(cart::clear))
        .route(
            "/items",
            post(cart::add).patch(cart::update).delete(cart::remove),
        )
        .route("/remote", get(cart::remote))
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .layer(auth_rate_limiter())
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me))
}

/// Create the account routes router.
pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(account::profile).patch(account::update_profile))
        .route("/loyalty", get(account::loyalty))
        .route("/loyalty/redeem", post(account::redeem))
        .route("/orders", get(account::orders))
        .route("/orders/remote", get(account::remote_orders))
        .route("/orders/{id}", get(account::order))
        .route(
            "/addresses",
            get(account::addresses).post(account::create_address),
        )
        .route(
            "/addresses/{id}",
            axum::routing::patch(account::update_address).delete(account::delete_address),
        )
}

/// Create the notification routes router.
pub fn notification_routes() -> Router<AppState> {
    Router::new()
        .route("/email", post(notifications::send_email))
        .layer(api_rate_limiter())
        .route("/", get(notifications::index))
        .route("/read-all", post(notifications::mark_all_read))
        .route("/{id}/read", post(notifications::mark_read))
        .route("/{id}/unread", post(notifications::mark_unread))
}

/// Create the wishlist routes router.
pub fn wishlist_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(wishlist::index).post(wishlist::add))
        .route("/{product_id}", axum::routing::delete(wishlist::remove))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .nest("/api", catalog_routes())
        .nest("/api/cart", cart_routes())
        .route(
            "/api/checkout",
            post(checkout::submit).layer(api_rate_limiter()),
        )
        .nest("/api/auth", auth_routes())
        .nest("/api/account", account_routes())
        .nest("/api/notifications", notification_routes())
        .nest("/api/wishlist", wishlist_routes())
        .route(
            "/api/preferences",
            get(preferences::show).put(preferences::update),
        )
        .route("/api/context/events", get(preferences::events))
        .route("/webhooks/{source}/orders", post(webhooks::orders))
}

/// Liveness body.
#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub backend: &'static str,
}

/// Liveness health check endpoint.
///
/// Does not check dependencies.
async fn health(State(state): State<AppState>) -> Json<Health> {
    Json(Health {
        status: "ok",
        backend: state.catalog().backend_name(),
    })
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the database is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1").fetch_one(state.pool()).await {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use axum::body::Body;
    use axum::http::Request;
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;
    use tower_sessions::{MemoryStore, SessionManagerLayer};

    use super::*;
    use crate::config::StorefrontConfig;

    const STRONG: &str = "aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6vE8";

    /// State with a pool that never connects; only routes that stop before
    /// the database are exercised here.
    fn state(extra: &[(&str, &str)]) -> AppState {
        let mut vars: HashMap<String, String> = [
            ("DATABASE_URL", "postgres://localhost/souq"),
            ("STOREFRONT_BASE_URL", "https://souq.test"),
            ("STOREFRONT_SESSION_SECRET", STRONG),
            ("CATALOG_BACKEND", "rest"),
            ("REST_CATALOG_URL", "https://catalog.test/wp-json/wc/v3"),
            ("REST_CATALOG_KEY", "ck_live"),
            ("REST_CATALOG_SECRET", STRONG),
        ]
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
        for (k, v) in extra {
            vars.insert((*k).to_string(), (*v).to_string());
        }

        let config = StorefrontConfig::from_source(&|key| vars.get(key).cloned()).unwrap();
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/souq")
            .unwrap();
        AppState::new(config, pool).unwrap()
    }

    fn app(extra: &[(&str, &str)]) -> Router {
        routes().with_state(state(extra))
    }

    /// Routes behind an in-memory session store, for session-only handlers.
    fn session_app() -> Router {
        routes()
            .layer(SessionManagerLayer::new(MemoryStore::default()))
            .with_state(state(&[]))
    }

    fn cart_patch(body: &str) -> Request<Body> {
        Request::patch("/api/cart/items")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    fn webhook(source: &str, topic: Option<&str>) -> Request<Body> {
        let mut builder = Request::post(format!("/webhooks/{source}/orders"))
            .header("content-type", "application/json");
        if let Some(topic) = topic {
            builder = builder.header("x-shopify-topic", topic);
        }
        builder
            .body(Body::from(r#"{"id": 1, "order_number": 1001}"#))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_reports_backend() {
        let (status, body) = send(app(&[]), Request::get("/health").body(Body::empty()).unwrap()).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["backend"], "rest");
    }

    #[tokio::test]
    async fn test_webhook_unknown_topic_is_acknowledged() {
        let (status, body) = send(app(&[]), webhook("storefront", Some("products/update"))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["result"], "ignored");
    }

    #[tokio::test]
    async fn test_webhook_unknown_source_is_not_found() {
        let (status, _) = send(app(&[]), webhook("marketplace", Some("orders/create"))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_webhook_without_topic_is_rejected() {
        let (status, _) = send(app(&[]), webhook("catalog", None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_webhook_bad_signature_is_unauthorized() {
        let app = app(&[("WEBHOOK_SECRET", STRONG)]);
        let (status, body) = send(app, webhook("storefront", Some("orders/create"))).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Invalid webhook signature");
    }

    #[tokio::test]
    async fn test_notification_email_requires_bearer_key() {
        let app = app(&[("NOTIFY_API_KEY", "k3y")]);
        let request = Request::post("/api/notifications/email")
            .header("content-type", "application/json")
            .header("x-forwarded-for", "203.0.113.9")
            .header("authorization", "Bearer wrong")
            .body(Body::from(
                r#"{"type":"welcome","email":"customer@example.com","customerName":"A"}"#,
            ))
            .unwrap();

        let (status, _) = send(app, request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_cart_zero_quantity_for_absent_line_is_noop() {
        let request = cart_patch(r#"{"product_id": "missing", "quantity": 0}"#);
        let (status, body) = send(session_app(), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["item_count"], 0);
    }

    #[tokio::test]
    async fn test_cart_positive_quantity_for_absent_line_is_not_found() {
        let request = cart_patch(r#"{"product_id": "missing", "quantity": 3}"#);
        let (status, _) = send(session_app(), request).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
