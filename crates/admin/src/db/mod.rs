//! Database operations for the back-office.
//!
//! # Schema: `shop` (shared with the storefront)
//!
//! - `admin_users` - Back-office accounts (argon2 password hashes)
//! - `products`, `product_images`, `categories` - Managed catalog
//! - `orders`, `order_items` - Webhook-mirrored orders
//! - `profiles`, `loyalty_transactions` - Customers and their points
//! - `hero_slides`, `site_settings` - Site content
//!
//! Admin sessions live in `tower_sessions.admin_session`.
//!
//! # Migrations
//!
//! The schema is owned by `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p souq-cli -- migrate
//! ```

pub mod admin_users;
pub mod customers;
pub mod dashboard;
pub mod hero_slides;
pub mod orders;
pub mod products;
pub mod settings;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use admin_users::AdminUserRepository;
pub use customers::CustomerRepository;
pub use dashboard::{DashboardCounts, DashboardRepository};
pub use hero_slides::HeroSlideRepository;
pub use orders::{OrderListQuery, OrderRepository};
pub use products::ProductRepository;
pub use settings::SettingsRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Map a unique violation to `Conflict`, anything else to `Database`.
    pub(crate) fn from_insert(err: sqlx::Error, conflict: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = err
            && db_err.is_unique_violation()
        {
            return Self::Conflict(conflict.to_owned());
        }
        Self::Database(err)
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(5)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
