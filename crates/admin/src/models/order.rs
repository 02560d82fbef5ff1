//! Mirrored orders as seen by the back-office.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use souq_core::{OrderId, OrderItemId, OrderSource, OrderStatus, PaymentMethod, PaymentStatus, UserId};

/// An order row.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct AdminOrder {
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

/// One order line.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct AdminOrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: Option<String>,
    pub variant_id: Option<String>,
    pub title: String,
    pub quantity: i32,
    pub unit_price: Decimal,
}

/// An order with its lines.
#[derive(Debug, Clone, Serialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: AdminOrder,
    pub items: Vec<AdminOrderItem>,
}
