//! HTTP route handlers for the back-office.
//!
//! Every `/api` route except login requires an admin session. Reads need
//! any role; writes need `super_admin` or `admin`.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                          - Liveness
//! GET    /health/ready                    - Readiness (database ping)
//!
//! POST   /api/auth/login                  - Sign in
//! POST   /api/auth/logout                 - Sign out
//! GET    /api/auth/me                     - Current admin
//! GET    /api/admin-users                 - Admin accounts (super admin)
//! GET    /api/dashboard                   - Counts
//!
//! GET    /api/products                    - List (?search&page)
//! POST   /api/products                    - Create
//! GET    /api/products/{id}               - Detail with images
//! PUT    /api/products/{id}               - Update
//! DELETE /api/products/{id}               - Delete (with image files)
//! POST   /api/products/{id}/images        - Upload (multipart: main, additional)
//! DELETE /api/products/{id}/images/{iid}  - Delete one image
//!
//! GET    /api/orders                      - List (?status&search&page)
//! GET    /api/orders/{id}                 - Detail with items
//! PUT    /api/orders/{id}/status          - Change status
//!
//! GET    /api/customers                   - List (?search&page)
//! GET    /api/customers/{id}              - Detail with ledger
//! POST   /api/customers/{id}/points       - Award (+) or deduct (-) points
//!
//! GET    /api/hero-slides                 - List in display order
//! POST   /api/hero-slides                 - Create
//! PUT    /api/hero-slides/order           - Reorder
//! PUT    /api/hero-slides/{id}            - Update
//! DELETE /api/hero-slides/{id}            - Delete
//!
//! GET    /api/settings                    - All settings
//! GET    /api/settings/{key}              - One setting
//! PUT    /api/settings/{key}              - Set (any JSON)
//! DELETE /api/settings/{key}              - Remove
//! ```

pub mod auth;
pub mod customers;
pub mod dashboard;
pub mod hero_slides;
pub mod orders;
pub mod products;
pub mod settings;

use axum::{
    Router,
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    routing::{get, post, put},
};
use serde::Deserialize;

use crate::config::AdminConfig;
use crate::state::AppState;

/// Rows per list page.
pub const PAGE_SIZE: i64 = 50;

/// Most images one upload request may carry at full size.
const MAX_IMAGES_PER_REQUEST: usize = 10;

/// Offset for a 1-based page number. Missing or non-positive pages are the
/// first page.
#[must_use]
pub fn page_offset(page: Option<i64>) -> i64 {
    (page.unwrap_or(1).max(1) - 1).saturating_mul(PAGE_SIZE)
}

/// `?search=&page=` for simple lists.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub page: Option<i64>,
}

impl ListQuery {
    /// Trimmed search term, if any.
    #[must_use]
    pub fn search(&self) -> Option<&str> {
        self.search.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    #[must_use]
    pub fn offset(&self) -> i64 {
        page_offset(self.page)
    }
}

/// Create the product routes router.
pub fn product_routes(config: &AdminConfig) -> Router<AppState> {
    let upload_limit = config
        .uploads
        .max_bytes
        .saturating_mul(MAX_IMAGES_PER_REQUEST);

    Router::new()
        .route("/", get(products::index).post(products::create))
        .route(
            "/{id}",
            get(products::show)
                .put(products::update)
                .delete(products::delete),
        )
        .route(
            "/{id}/images",
            post(products::upload_images).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route(
            "/{id}/images/{image_id}",
            axum::routing::delete(products::delete_image),
        )
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::index))
        .route("/{id}", get(orders::show))
        .route("/{id}/status", put(orders::update_status))
}

/// Create the customer routes router.
pub fn customer_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(customers::index))
        .route("/{id}", get(customers::show))
        .route("/{id}/points", post(customers::adjust_points))
}

/// Create the content routes router (hero slides and settings).
pub fn content_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/hero-slides",
            get(hero_slides::index).post(hero_slides::create),
        )
        .route("/hero-slides/order", put(hero_slides::reorder))
        .route(
            "/hero-slides/{id}",
            put(hero_slides::update).delete(hero_slides::delete),
        )
        .route("/settings", get(settings::index))
        .route(
            "/settings/{key}",
            get(settings::show)
                .put(settings::put)
                .delete(settings::delete),
        )
}

/// Create all routes for the back-office.
pub fn routes(config: &AdminConfig) -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/me", get(auth::me))
        .route("/api/admin-users", get(auth::admin_users))
        .route("/api/dashboard", get(dashboard::index))
        .nest("/api/products", product_routes(config))
        .nest("/api/orders", order_routes())
        .nest("/api/customers", customer_routes())
        .nest("/api", content_routes())
}

/// Liveness health check endpoint.
async fn health() -> &'static str {
    "ok"
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
