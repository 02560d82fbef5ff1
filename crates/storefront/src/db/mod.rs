//! Database operations for the storefront.
//!
//! # Schema: `shop`
//!
//! - `profiles` - Customers and their loyalty balance
//! - `user_passwords` - Argon2 password hashes
//! - `orders`, `order_items` - Local mirror of backend orders
//! - `loyalty_transactions` - Append-only points ledger
//! - `notifications` - In-app notification bell
//! - `addresses`, `wishlist_items` - Account features
//!
//! Session data lives in `tower_sessions.session`.
//!
//! Queries are checked at runtime (`sqlx::query_as` + `FromRow`); typed IDs,
//! statuses and emails decode directly.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p souq-cli -- migrate
//! ```

pub mod addresses;
pub mod loyalty;
pub mod notifications;
pub mod orders;
pub mod profiles;
pub mod wishlist;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use addresses::AddressRepository;
pub use loyalty::LoyaltyRepository;
pub use notifications::NotificationRepository;
pub use orders::OrderRepository;
pub use profiles::ProfileRepository;
pub use wishlist::WishlistRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

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
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
