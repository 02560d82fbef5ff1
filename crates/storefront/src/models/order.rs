//! Local order mirror.
//!
//! Orders are created on external backends; webhooks mirror them here keyed
//! by `(source, external_order_number)`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use souq_core::{OrderId, OrderItemId, OrderSource, OrderStatus, PaymentMethod, PaymentStatus, UserId};

/// A mirrored order. `total` is written once at insert.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Order {
    pub id: OrderId,
    pub source: OrderSource,
    pub external_order_number: String,
    pub user_id: Option<UserId>,
    pub email: String,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub total: Decimal,
    pub currency: String,
    pub billing_address: serde_json::Value,
    pub shipping_address: serde_json::Value,
    pub tracking_number: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One line of a mirrored order.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: Option<String>,
    pub variant_id: Option<String>,
    pub title: String,
    pub quantity: i32,
    pub unit_price: Decimal,
}

/// Data for inserting a mirrored order with its items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub source: OrderSource,
    pub external_order_number: String,
    pub user_id: Option<UserId>,
    pub email: String,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub total: Decimal,
    pub currency: String,
    pub billing_address: serde_json::Value,
    pub shipping_address: serde_json::Value,
    pub tracking_number: Option<String>,
    pub items: Vec<NewOrderItem>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrderItem {
    pub product_id: Option<String>,
    pub variant_id: Option<String>,
    pub title: String,
    pub quantity: i32,
    pub unit_price: Decimal,
}

/// Fields a later webhook delivery may change on an existing order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderUpdate {
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub tracking_number: Option<String>,
}

impl OrderUpdate {
    /// Whether applying this update would change the order.
    #[must_use]
    pub fn changes(&self, order: &Order) -> bool {
        self.status != order.status
            || self.payment_status != order.payment_status
            || self.tracking_number != order.tracking_number
    }
}
