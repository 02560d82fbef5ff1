//! Loyalty ledger repository.
//!
//! Balance changes go through the `award_loyalty_points`,
//! `deduct_loyalty_points` and `redeem_loyalty_points` stored functions, which
//! update the profile and append the ledger row in one statement each.
//! Awards are credited by `OrderRepository::insert_if_absent`, inside the
//! order insert.

use sqlx::PgPool;

use souq_core::{OrderId, UserId};

use super::RepositoryError;
use crate::models::{LoyaltyTransaction, OrderPointsState};

/// Repository for the points ledger.
pub struct LoyaltyRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> LoyaltyRepository<'a> {
    /// Create a new loyalty repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Take back points (floored at zero) and append a `deducted` row.
    /// Returns the new balance.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the function call fails.
    pub async fn deduct(
        &self,
        user_id: UserId,
        order_id: Option<OrderId>,
        points: i32,
        description: &str,
    ) -> Result<i32, RepositoryError> {
        let balance = sqlx::query_scalar("SELECT shop.deduct_loyalty_points($1, $2, $3, $4)")
            .bind(user_id)
            .bind(order_id)
            .bind(points)
            .bind(description)
            .fetch_one(self.pool)
            .await?;
        Ok(balance)
    }

    /// Spend points if the balance covers them.
    ///
    /// Returns `false` when the balance is insufficient.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the function call fails.
    pub async fn redeem(
        &self,
        user_id: UserId,
        order_id: Option<OrderId>,
        points: i32,
        description: &str,
    ) -> Result<bool, RepositoryError> {
        let redeemed = sqlx::query_scalar("SELECT shop.redeem_loyalty_points($1, $2, $3, $4)")
            .bind(user_id)
            .bind(order_id)
            .bind(points)
            .bind(description)
            .fetch_one(self.pool)
            .await?;
        Ok(redeemed)
    }

    /// Which ledger rows exist for an order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn order_state(&self, order_id: OrderId) -> Result<OrderPointsState, RepositoryError> {
        let state = sqlx::query_as::<_, OrderPointsState>(
            r"
            SELECT
                bool_or(kind = 'earned') IS TRUE AS earned,
                bool_or(kind = 'deducted') IS TRUE AS deducted
            FROM shop.loyalty_transactions
            WHERE order_id = $1
            ",
        )
        .bind(order_id)
        .fetch_one(self.pool)
        .await?;
        Ok(state)
    }

    /// A user's ledger, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn history(
        &self,
        user_id: UserId,
        limit: i64,
    ) -> Result<Vec<LoyaltyTransaction>, RepositoryError> {
        let rows = sqlx::query_as::<_, LoyaltyTransaction>(
            r"
            SELECT id, user_id, kind, points, description, order_id, created_at
            FROM shop.loyalty_transactions
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2
            ",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }
}
