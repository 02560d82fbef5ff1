//! Order webhook payloads.
//!
//! Platforms disagree on whether identifiers are strings or numbers and on
//! whether empty collections are `[]` or `null`, so those fields are
//! deserialized leniently.

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use souq_core::{Email, OrderSource, OrderStatus, PaymentMethod, PaymentStatus, UserId};

use crate::models::{NewOrder, NewOrderItem};

/// Webhook topics that carry an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topic {
    Created,
    Paid,
    Fulfilled,
    Cancelled,
}

impl Topic {
    /// Parse an `X-Shopify-Topic` value. Unknown topics return `None`.
    #[must_use]
    pub fn parse(topic: &str) -> Option<Self> {
        match topic.trim() {
            "orders/create" => Some(Self::Created),
            "orders/paid" => Some(Self::Paid),
            "orders/fulfilled" => Some(Self::Fulfilled),
            "orders/cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

/// An order as delivered by a webhook.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderPayload {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub order_number: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub contact_email: Option<String>,
    #[serde(default)]
    pub total_price: Option<Decimal>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub financial_status: Option<String>,
    #[serde(default)]
    pub fulfillment_status: Option<String>,
    #[serde(default)]
    pub gateway: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub payment_gateway_names: Vec<String>,
    #[serde(default)]
    pub billing_address: Option<Value>,
    #[serde(default)]
    pub shipping_address: Option<Value>,
    #[serde(default)]
    pub customer: Option<PayloadCustomer>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub line_items: Vec<PayloadLine>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub fulfillments: Vec<PayloadFulfillment>,
    #[serde(default)]
    pub cancelled_at: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PayloadCustomer {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PayloadLine {
    #[serde(default, deserialize_with = "string_or_number")]
    pub product_id: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub variant_id: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub variant_title: Option<String>,
    #[serde(default)]
    pub quantity: i32,
    #[serde(default)]
    pub price: Decimal,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PayloadFulfillment {
    #[serde(default)]
    pub tracking_number: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub tracking_numbers: Vec<String>,
}

impl OrderPayload {
    /// The platform's customer-facing order number.
    ///
    /// Falls back to the `#1001` style name, then to the raw ID.
    #[must_use]
    pub fn external_number(&self) -> Option<String> {
        self.order_number
            .clone()
            .or_else(|| {
                self.name
                    .as_deref()
                    .map(|n| n.trim().trim_start_matches('#').to_string())
            })
            .or_else(|| self.id.clone())
            .filter(|n| !n.trim().is_empty())
    }

    /// First well-formed customer email in the payload.
    #[must_use]
    pub fn customer_email(&self) -> Option<Email> {
        [
            self.email.as_deref(),
            self.contact_email.as_deref(),
            self.customer.as_ref().and_then(|c| c.email.as_deref()),
        ]
        .into_iter()
        .flatten()
        .find_map(|e| Email::parse(e).ok())
    }

    /// Name to greet the customer with.
    #[must_use]
    pub fn customer_name(&self) -> Option<String> {
        let customer = self.customer.as_ref()?;
        let name = [customer.first_name.as_deref(), customer.last_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        (!name.is_empty()).then_some(name)
    }

    /// Most recent tracking number across fulfillments.
    #[must_use]
    pub fn tracking_number(&self) -> Option<String> {
        self.fulfillments.iter().rev().find_map(|f| {
            f.tracking_number
                .clone()
                .or_else(|| f.tracking_numbers.first().cloned())
                .filter(|t| !t.trim().is_empty())
        })
    }

    /// Payment method label derived from the gateway name.
    #[must_use]
    pub fn payment_method(&self) -> PaymentMethod {
        PaymentMethod::from_gateway(
            self.gateway
                .as_deref()
                .or_else(|| self.payment_gateway_names.first().map(String::as_str)),
        )
    }

    /// Whether the platform marked the order cancelled.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        self.cancelled_at.is_some()
    }

    /// Local status for this delivery.
    #[must_use]
    pub fn order_status(&self, topic: Topic) -> OrderStatus {
        if topic == Topic::Cancelled || self.is_cancelled() {
            OrderStatus::Cancelled
        } else {
            OrderStatus::from_fulfillment(self.fulfillment_status.as_deref())
        }
    }

    /// Local payment status for this delivery.
    #[must_use]
    pub fn payment_status(&self) -> PaymentStatus {
        PaymentStatus::from_financial(self.financial_status.as_deref())
    }

    /// The mirror row and its items.
    #[must_use]
    pub fn to_new_order(
        &self,
        source: OrderSource,
        external_order_number: String,
        email: &Email,
        user_id: Option<UserId>,
        status: OrderStatus,
    ) -> NewOrder {
        let items = self
            .line_items
            .iter()
            .map(|line| NewOrderItem {
                product_id: line.product_id.clone(),
                variant_id: line.variant_id.clone(),
                title: match line.variant_title.as_deref().filter(|v| !v.trim().is_empty()) {
                    Some(variant) => format!("{} - {variant}", line.title),
                    None => line.title.clone(),
                },
                quantity: line.quantity.max(1),
                unit_price: line.price,
            })
            .collect();

        NewOrder {
            source,
            external_order_number,
            user_id,
            email: email.as_str().to_string(),
            status,
            payment_method: self.payment_method(),
            payment_status: self.payment_status(),
            total: self.total_price.unwrap_or_default(),
            currency: self
                .currency
                .clone()
                .unwrap_or_else(|| "USD".to_string())
                .to_ascii_uppercase(),
            billing_address: self.billing_address.clone().unwrap_or(Value::Null),
            shipping_address: self.shipping_address.clone().unwrap_or(Value::Null),
            tracking_number: self.tracking_number(),
            items,
        }
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn parse(value: serde_json::Value) -> OrderPayload {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_numeric_identifiers() {
        let payload = parse(serde_json::json!({
            "id": 820_982_911_946_154_508_u64,
            "order_number": 1001,
            "line_items": [{ "product_id": 632_910_392, "variant_id": "808950810", "title": "Tee", "quantity": 2, "price": "19.50" }]
        }));
        assert_eq!(payload.external_number().as_deref(), Some("1001"));
        assert_eq!(payload.line_items[0].product_id.as_deref(), Some("632910392"));
        assert_eq!(payload.line_items[0].variant_id.as_deref(), Some("808950810"));
    }

    #[test]
    fn test_number_falls_back_to_name_then_id() {
        let payload = parse(serde_json::json!({ "id": 5, "name": "#1042" }));
        assert_eq!(payload.external_number().as_deref(), Some("1042"));

        let payload = parse(serde_json::json!({ "id": 5 }));
        assert_eq!(payload.external_number().as_deref(), Some("5"));

        let payload = parse(serde_json::json!({}));
        assert_eq!(payload.external_number(), None);
    }

    #[test]
    fn test_null_collections() {
        let payload = parse(serde_json::json!({
            "line_items": null,
            "fulfillments": null,
            "payment_gateway_names": null
        }));
        assert!(payload.line_items.is_empty());
        assert!(payload.tracking_number().is_none());
    }

    #[test]
    fn test_email_prefers_first_valid() {
        let payload = parse(serde_json::json!({
            "email": "",
            "contact_email": "Sara@Example.com",
            "customer": { "email": "other@example.com" }
        }));
        assert_eq!(payload.customer_email().unwrap().as_str(), "sara@example.com");
    }

    #[test]
    fn test_tracking_number_uses_latest_fulfillment() {
        let payload = parse(serde_json::json!({
            "fulfillments": [
                { "tracking_number": "OLD" },
                { "tracking_number": null, "tracking_numbers": ["NEW-1", "NEW-2"] }
            ]
        }));
        assert_eq!(payload.tracking_number().as_deref(), Some("NEW-1"));
    }

    #[test]
    fn test_cancelled_at_forces_cancelled() {
        let payload = parse(serde_json::json!({
            "fulfillment_status": "fulfilled",
            "cancelled_at": "2026-01-02T10:00:00Z"
        }));
        assert_eq!(payload.order_status(Topic::Paid), OrderStatus::Cancelled);

        let payload = parse(serde_json::json!({ "fulfillment_status": "partial" }));
        assert_eq!(payload.order_status(Topic::Fulfilled), OrderStatus::Processing);
        assert_eq!(payload.order_status(Topic::Cancelled), OrderStatus::Cancelled);
    }

    #[test]
    fn test_unknown_topic() {
        assert_eq!(Topic::parse("orders/create"), Some(Topic::Created));
        assert_eq!(Topic::parse("products/update"), None);
    }

    #[test]
    fn test_new_order_items() {
        let payload = parse(serde_json::json!({
            "total_price": "130.00",
            "currency": "egp",
            "gateway": "Cash on Delivery (COD)",
            "financial_status": "paid",
            "line_items": [
                { "title": "Abaya", "variant_title": "L", "quantity": 1, "price": "130.00" },
                { "title": "Gift card", "variant_title": "", "quantity": 0, "price": "0" }
            ]
        }));
        let email = Email::parse("a@example.com").unwrap();
        let new = payload.to_new_order(
            OrderSource::Storefront,
            "1".to_string(),
            &email,
            None,
            OrderStatus::Pending,
        );

        assert_eq!(new.total, Decimal::new(13000, 2));
        assert_eq!(new.currency, "EGP");
        assert_eq!(new.payment_status, PaymentStatus::Paid);
        assert_eq!(new.payment_method, PaymentMethod::CashOnDelivery);
        assert_eq!(new.items[0].title, "Abaya - L");
        assert_eq!(new.items[1].title, "Gift card");
        assert_eq!(new.items[1].quantity, 1);
    }
}
