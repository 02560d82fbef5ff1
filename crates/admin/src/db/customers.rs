//! Customer and loyalty repository for the back-office.
//!
//! Point adjustments go through the same stored functions the webhook uses,
//! so the balance is never read-modify-written.

use sqlx::PgPool;

use souq_core::UserId;

use super::RepositoryError;
use crate::models::{Customer, LoyaltyEntry};

const CUSTOMER_SELECT: &str = r"
    SELECT p.id, p.email, p.full_name, p.phone, p.loyalty_points, p.created_at,
           (SELECT COUNT(*) FROM shop.orders o WHERE o.user_id = p.id) AS order_count
    FROM shop.profiles p
";

/// Repository for customer profiles.
pub struct CustomerRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CustomerRepository<'a> {
    /// Create a new customer repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List customers, newest first, optionally matching email, name or phone.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        search: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Customer>, RepositoryError> {
        let pattern = search.map(|s| format!("%{}%", s.trim()));
        let rows = sqlx::query_as::<_, Customer>(&format!(
            r"
            {CUSTOMER_SELECT}
            WHERE $1::text IS NULL OR p.email ILIKE $1 OR p.full_name ILIKE $1 OR p.phone ILIKE $1
            ORDER BY p.created_at DESC, p.id DESC
            LIMIT $2 OFFSET $3
            "
        ))
        .bind(pattern)
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Get one customer.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the customer does not exist.
    pub async fn get(&self, id: UserId) -> Result<Customer, RepositoryError> {
        sqlx::query_as::<_, Customer>(&format!("{CUSTOMER_SELECT} WHERE p.id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    /// A customer's ledger, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn ledger(&self, id: UserId, limit: i64) -> Result<Vec<LoyaltyEntry>, RepositoryError> {
        let rows = sqlx::query_as::<_, LoyaltyEntry>(
            r"
            SELECT id, kind, points, description, order_id, created_at
            FROM shop.loyalty_transactions
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2
            ",
        )
        .bind(id)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Credit points. Returns the new balance.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the function call fails.
    pub async fn award(&self, id: UserId, points: i32, reason: &str) -> Result<i32, RepositoryError> {
        let balance = sqlx::query_scalar("SELECT shop.award_loyalty_points($1, NULL, $2, $3)")
            .bind(id)
            .bind(points)
            .bind(reason)
            .fetch_one(self.pool)
            .await?;
        Ok(balance)
    }

    /// Take back points, flooring the balance at zero. Returns the new balance.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the function call fails.
    pub async fn deduct(&self, id: UserId, points: i32, reason: &str) -> Result<i32, RepositoryError> {
        let balance = sqlx::query_scalar("SELECT shop.deduct_loyalty_points($1, NULL, $2, $3)")
            .bind(id)
            .bind(points)
            .bind(reason)
            .fetch_one(self.pool)
            .await?;
        Ok(balance)
    }
}
