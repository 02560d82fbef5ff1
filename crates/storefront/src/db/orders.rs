//! Order mirror repository.

use sqlx::PgPool;

use souq_core::{OrderId, OrderSource, UserId};

use super::RepositoryError;
use crate::models::{NewOrder, Order, OrderAward, OrderItem, OrderUpdate};

const ORDER_COLUMNS: &str = "id, source, external_order_number, user_id, email, status, \
     payment_method, payment_status, total, currency, billing_address, shipping_address, \
     tracking_number, created_at, updated_at";

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

    /// Find an order by its idempotency key.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_by_external(
        &self,
        source: OrderSource,
        external_order_number: &str,
    ) -> Result<Option<Order>, RepositoryError> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM shop.orders WHERE source = $1 AND external_order_number = $2"
        ))
        .bind(source)
        .bind(external_order_number)
        .fetch_optional(self.pool)
        .await?;
        Ok(order)
    }

    /// Insert an order and its items unless the idempotency key exists, and
    /// credit `award` in the same transaction.
    ///
    /// Returns `None` when another delivery inserted the same order first.
    /// If the award fails nothing is committed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the transaction fails.
    pub async fn insert_if_absent(
        &self,
        new: &NewOrder,
        award: Option<&OrderAward>,
    ) -> Result<Option<Order>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query_as::<_, Order>(&format!(
            r"
            INSERT INTO shop.orders (
                source, external_order_number, user_id, email, status, payment_method,
                payment_status, total, currency, billing_address, shipping_address, tracking_number
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT (source, external_order_number) DO NOTHING
            RETURNING {ORDER_COLUMNS}
            "
        ))
        .bind(new.source)
        .bind(&new.external_order_number)
        .bind(new.user_id)
        .bind(&new.email)
        .bind(new.status)
        .bind(new.payment_method)
        .bind(new.payment_status)
        .bind(new.total)
        .bind(&new.currency)
        .bind(&new.billing_address)
        .bind(&new.shipping_address)
        .bind(&new.tracking_number)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(order) = inserted else {
            tx.rollback().await?;
            return Ok(None);
        };

        for item in &new.items {
            sqlx::query(
                r"
                INSERT INTO shop.order_items (order_id, product_id, variant_id, title, quantity, unit_price)
                VALUES ($1, $2, $3, $4, $5, $6)
                ",
            )
            .bind(order.id)
            .bind(&item.product_id)
            .bind(&item.variant_id)
            .bind(&item.title)
            .bind(item.quantity)
            .bind(item.unit_price)
            .execute(&mut *tx)
            .await?;
        }

        if let Some(award) = award {
            sqlx::query_scalar::<_, i32>("SELECT shop.award_loyalty_points($1, $2, $3, $4)")
                .bind(award.user_id)
                .bind(order.id)
                .bind(award.points)
                .bind(&award.description)
                .fetch_one(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(Some(order))
    }

    /// Apply status, payment status and tracking changes.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist.
    pub async fn update_progress(
        &self,
        id: OrderId,
        update: &OrderUpdate,
    ) -> Result<Order, RepositoryError> {
        sqlx::query_as::<_, Order>(&format!(
            r"
            UPDATE shop.orders
               SET status = $2, payment_status = $3, tracking_number = $4
             WHERE id = $1
            RETURNING {ORDER_COLUMNS}
            "
        ))
        .bind(id)
        .bind(update.status)
        .bind(update.payment_status)
        .bind(&update.tracking_number)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// Orders belonging to a user, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let orders = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM shop.orders WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;
        Ok(orders)
    }

    /// One of a user's orders with its items.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist or
    /// belongs to someone else.
    pub async fn get_for_user(
        &self,
        user_id: UserId,
        id: OrderId,
    ) -> Result<(Order, Vec<OrderItem>), RepositoryError> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM shop.orders WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        let items = sqlx::query_as::<_, OrderItem>(
            "SELECT id, order_id, product_id, variant_id, title, quantity, unit_price \
             FROM shop.order_items WHERE order_id = $1 ORDER BY id",
        )
        .bind(id)
        .fetch_all(self.pool)
        .await?;

        Ok((order, items))
    }
}
