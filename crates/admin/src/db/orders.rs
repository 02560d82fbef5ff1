//! Order repository for the back-office.

use serde::Deserialize;
use sqlx::PgPool;

use souq_core::{OrderId, OrderStatus};

use super::RepositoryError;
use crate::models::{AdminOrder, AdminOrderItem};

const ORDER_COLUMNS: &str = "id, source, external_order_number, user_id, email, status, \
     payment_method, payment_status, total, currency, billing_address, shipping_address, \
     tracking_number, created_at, updated_at";

/// Order list filters.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderListQuery {
    #[serde(default)]
    pub status: Option<OrderStatus>,
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub page: Option<i64>,
}

/// Repository for mirrored orders.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List orders, newest first.
    ///
    /// `search` matches the order number or customer email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        status: Option<OrderStatus>,
        search: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<AdminOrder>, RepositoryError> {
        let pattern = search.map(|s| format!("%{}%", s.trim()));
        let rows = sqlx::query_as::<_, AdminOrder>(&format!(
            r"
            SELECT {ORDER_COLUMNS} FROM shop.orders
            WHERE ($1::shop.order_status IS NULL OR status = $1)
              AND ($2::text IS NULL OR external_order_number ILIKE $2 OR email ILIKE $2)
            ORDER BY created_at DESC, id DESC
            LIMIT $3 OFFSET $4
            "
        ))
        .bind(status)
        .bind(pattern)
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// An order and its items.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist.
    pub async fn get(&self, id: OrderId) -> Result<(AdminOrder, Vec<AdminOrderItem>), RepositoryError> {
        let order = sqlx::query_as::<_, AdminOrder>(&format!(
            "SELECT {ORDER_COLUMNS} FROM shop.orders WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        let items = sqlx::query_as::<_, AdminOrderItem>(
            "SELECT id, order_id, product_id, variant_id, title, quantity, unit_price \
             FROM shop.order_items WHERE order_id = $1 ORDER BY id",
        )
        .bind(id)
        .fetch_all(self.pool)
        .await?;

        Ok((order, items))
    }

    /// Set an order's status, and its tracking number when one is given.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist.
    pub async fn update_status(
        &self,
        id: OrderId,
        status: OrderStatus,
        tracking_number: Option<&str>,
    ) -> Result<AdminOrder, RepositoryError> {
        sqlx::query_as::<_, AdminOrder>(&format!(
            r"
            UPDATE shop.orders
               SET status = $2, tracking_number = COALESCE($3, tracking_number)
             WHERE id = $1
            RETURNING {ORDER_COLUMNS}
            "
        ))
        .bind(id)
        .bind(status)
        .bind(tracking_number)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }
}
