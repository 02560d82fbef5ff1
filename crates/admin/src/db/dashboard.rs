//! Dashboard counts.

use std::collections::BTreeMap;

use serde::Serialize;
use sqlx::PgPool;

use souq_core::OrderStatus;

use super::RepositoryError;

/// Headline numbers for the back-office home.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardCounts {
    /// Orders per status. Statuses with no orders are reported as zero.
    pub orders_by_status: BTreeMap<String, i64>,
    pub orders: i64,
    pub customers: i64,
    pub products: i64,
    pub active_products: i64,
}

impl DashboardCounts {
    fn from_rows(rows: Vec<(OrderStatus, i64)>, customers: i64, products: (i64, i64)) -> Self {
        let mut orders_by_status: BTreeMap<String, i64> = OrderStatus::ALL
            .iter()
            .map(|s| (s.as_str().to_string(), 0))
            .collect();
        let mut orders = 0;
        for (status, count) in rows {
            orders += count;
            orders_by_status.insert(status.as_str().to_string(), count);
        }

        Self {
            orders_by_status,
            orders,
            customers,
            products: products.0,
            active_products: products.1,
        }
    }
}

/// Read-only aggregate queries.
pub struct DashboardRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> DashboardRepository<'a> {
    /// Create a new dashboard repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Current counts.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn counts(&self) -> Result<DashboardCounts, RepositoryError> {
        let rows: Vec<(OrderStatus, i64)> =
            sqlx::query_as("SELECT status, COUNT(*) FROM shop.orders GROUP BY status")
                .fetch_all(self.pool)
                .await?;
        let customers: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM shop.profiles")
            .fetch_one(self.pool)
            .await?;
        let products: (i64, i64) = sqlx::query_as(
            "SELECT COUNT(*), COUNT(*) FILTER (WHERE is_active) FROM shop.products",
        )
        .fetch_one(self.pool)
        .await?;

        Ok(DashboardCounts::from_rows(rows, customers, products))
    }
}
