//! `OrderLedger` over the relational backend.

use sqlx::PgPool;

use souq_core::{Email, OrderId, OrderSource, UserId};

use super::OrderLedger;
use crate::db::{LoyaltyRepository, OrderRepository, ProfileRepository, RepositoryError};
use crate::models::{NewOrder, Order, OrderAward, OrderPointsState, OrderUpdate, Profile};

pub struct PgLedger<'a> {
    pool: &'a PgPool,
}

impl<'a> PgLedger<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }
}

impl OrderLedger for PgLedger<'_> {
    async fn find_order(
        &self,
        source: OrderSource,
        number: &str,
    ) -> Result<Option<Order>, RepositoryError> {
        OrderRepository::new(self.pool)
            .find_by_external(source, number)
            .await
    }

    async fn insert_order(
        &self,
        new: &NewOrder,
        award: Option<&OrderAward>,
    ) -> Result<Option<Order>, RepositoryError> {
        OrderRepository::new(self.pool)
            .insert_if_absent(new, award)
            .await
    }

    async fn update_order(
        &self,
        id: OrderId,
        update: &OrderUpdate,
    ) -> Result<Order, RepositoryError> {
        OrderRepository::new(self.pool)
            .update_progress(id, update)
            .await
    }

    async fn find_profile(&self, email: &Email) -> Result<Option<Profile>, RepositoryError> {
        ProfileRepository::new(self.pool).get_by_email(email).await
    }

    async fn deduct_points(
        &self,
        user_id: UserId,
        order_id: OrderId,
        points: i32,
        description: &str,
    ) -> Result<i32, RepositoryError> {
        LoyaltyRepository::new(self.pool)
            .deduct(user_id, Some(order_id), points, description)
            .await
    }

    async fn points_state(&self, order_id: OrderId) -> Result<OrderPointsState, RepositoryError> {
        LoyaltyRepository::new(self.pool).order_state(order_id).await
    }
}
