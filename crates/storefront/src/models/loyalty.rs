//! Loyalty ledger entries.

use chrono::{DateTime, Utc};
use serde::Serialize;

use souq_core::{LoyaltyKind, LoyaltyTransactionId, OrderId, UserId};

/// One append-only ledger row. Redemptions and deductions are negative.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct LoyaltyTransaction {
    pub id: LoyaltyTransactionId,
    pub user_id: UserId,
    pub kind: LoyaltyKind,
    pub points: i32,
    pub description: String,
    pub order_id: Option<OrderId>,
    pub created_at: DateTime<Utc>,
}

/// Which ledger rows exist for an order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, sqlx::FromRow)]
pub struct OrderPointsState {
    pub earned: bool,
    pub deducted: bool,
}

impl OrderPointsState {
    /// Points were granted and not yet taken back.
    #[must_use]
    pub const fn needs_reversal(self) -> bool {
        self.earned && !self.deducted
    }
}

/// Points credited together with a newly mirrored order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderAward {
    pub user_id: UserId,
    pub points: i32,
    pub description: String,
}
