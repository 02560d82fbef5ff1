//! Customers and their loyalty ledgers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use souq_core::{LoyaltyKind, LoyaltyTransactionId, OrderId, UserId};

/// A customer profile with order count.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Customer {
    pub id: UserId,
    pub email: String,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub loyalty_points: i32,
    pub order_count: i64,
    pub created_at: DateTime<Utc>,
}

/// One loyalty ledger row.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct LoyaltyEntry {
    pub id: LoyaltyTransactionId,
    pub kind: LoyaltyKind,
    pub points: i32,
    pub description: String,
    pub order_id: Option<OrderId>,
    pub created_at: DateTime<Utc>,
}

/// A customer with their ledger, newest first.
#[derive(Debug, Clone, Serialize)]
pub struct CustomerDetail {
    #[serde(flatten)]
    pub customer: Customer,
    pub transactions: Vec<LoyaltyEntry>,
}

/// Manual point adjustment. Positive awards, negative deducts.
#[derive(Debug, Clone, Deserialize)]
pub struct PointsAdjustment {
    pub points: i32,
    pub reason: String,
}
