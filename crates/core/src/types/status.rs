//! Status enums for orders, payments, loyalty and notifications.
//!
//! Values coming from external commerce platforms are mapped onto these closed
//! sets at the boundary. Unknown strings never leak past the mapping functions:
//! they fall back to the `Pending` variant so status filters and badges only
//! ever see known values.

use serde::{Deserialize, Serialize};

/// Local order status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "shop.order_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Processing,
    Shipped,
    Fulfilled,
    Cancelled,
}

impl OrderStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [Self; 5] = [
        Self::Pending,
        Self::Processing,
        Self::Shipped,
        Self::Fulfilled,
        Self::Cancelled,
    ];

    /// Map a platform fulfillment status onto a local order status.
    ///
    /// `fulfilled` → `Fulfilled`, `partial` → `Processing`, anything else
    /// (including `unfulfilled`, `null` and unknown values) → `Pending`.
    #[must_use]
    pub fn from_fulfillment(status: Option<&str>) -> Self {
        match status.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("fulfilled") => Self::Fulfilled,
            Some("partial") => Self::Processing,
            _ => Self::Pending,
        }
    }

    /// The snake-case name used in URLs and JSON.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Fulfilled => "fulfilled",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("invalid order status: {s}"))
    }
}

/// Payment status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "shop.payment_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Authorized,
    Paid,
    PartiallyRefunded,
    Refunded,
    Voided,
}

impl PaymentStatus {
    /// Map a platform financial status; unknown or missing values are `Pending`.
    #[must_use]
    pub fn from_financial(status: Option<&str>) -> Self {
        match status.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("paid") => Self::Paid,
            Some("authorized") => Self::Authorized,
            Some("partially_refunded") => Self::PartiallyRefunded,
            Some("refunded") => Self::Refunded,
            Some("voided") => Self::Voided,
            _ => Self::Pending,
        }
    }
}

/// How the customer chose to pay at checkout.
///
/// This is a label only. No payment gateway is integrated: every method
/// produces the same order-creation call with a different label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "shop.payment_method", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    CashOnDelivery,
    MobileWallet,
    BankTransfer,
}

impl PaymentMethod {
    /// Map a platform gateway name onto a payment method label.
    #[must_use]
    pub fn from_gateway(gateway: Option<&str>) -> Self {
        let Some(gateway) = gateway.map(str::to_ascii_lowercase) else {
            return Self::CashOnDelivery;
        };
        if gateway.contains("wallet") {
            Self::MobileWallet
        } else if gateway.contains("bank") || gateway.contains("transfer") {
            Self::BankTransfer
        } else {
            Self::CashOnDelivery
        }
    }

    /// Identifier sent to catalog backends.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CashOnDelivery => "cash_on_delivery",
            Self::MobileWallet => "mobile_wallet",
            Self::BankTransfer => "bank_transfer",
        }
    }

    /// Human readable title.
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::CashOnDelivery => "Cash on delivery",
            Self::MobileWallet => "Mobile wallet",
            Self::BankTransfer => "Bank transfer",
        }
    }
}

/// Kind of loyalty ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "shop.loyalty_kind", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum LoyaltyKind {
    /// Points granted for a paid order.
    Earned,
    /// Points spent by the customer.
    Redeemed,
    /// Points taken back after a cancellation or by an admin.
    Deducted,
}

/// Kind of notification. Each kind has exactly one email template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "shop.notification_kind", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    OrderConfirmation,
    OrderFulfilled,
    OrderCancelled,
    PointsEarned,
    Welcome,
}

/// Which external system an order mirror came from.
///
/// Order numbers are only unique per source, so the pair
/// `(source, external_order_number)` is the idempotency key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "shop.order_source", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum OrderSource {
    /// The headless storefront platform.
    #[default]
    Storefront,
    /// The REST catalog/order service.
    Catalog,
}

impl std::str::FromStr for OrderSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "storefront" => Ok(Self::Storefront),
            "catalog" => Ok(Self::Catalog),
            _ => Err(format!("invalid order source: {s}")),
        }
    }
}

/// Admin role with different permission levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "shop.admin_role", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum AdminRole {
    /// Full access, including admin user management.
    SuperAdmin,
    /// Full access to store management.
    Admin,
    /// Read-only access.
    Viewer,
}

impl AdminRole {
    /// Whether this role may change data.
    #[must_use]
    pub const fn can_write(self) -> bool {
        matches!(self, Self::SuperAdmin | Self::Admin)
    }
}

impl std::fmt::Display for AdminRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SuperAdmin => write!(f, "super_admin"),
            Self::Admin => write!(f, "admin"),
            Self::Viewer => write!(f, "viewer"),
        }
    }
}

impl std::str::FromStr for AdminRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "super_admin" => Ok(Self::SuperAdmin),
            "admin" => Ok(Self::Admin),
            "viewer" => Ok(Self::Viewer),
            _ => Err(format!("invalid admin role: {s}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_fulfillment_mapping_recognized_values() {
        assert_eq!(
            OrderStatus::from_fulfillment(Some("fulfilled")),
            OrderStatus::Fulfilled
        );
        assert_eq!(
            OrderStatus::from_fulfillment(Some("partial")),
            OrderStatus::Processing
        );
        assert_eq!(
            OrderStatus::from_fulfillment(Some("unfulfilled")),
            OrderStatus::Pending
        );
        assert_eq!(OrderStatus::from_fulfillment(None), OrderStatus::Pending);
    }

    #[test]
    fn test_fulfillment_mapping_unknown_values_are_pending() {
        for raw in ["restocked", "on_hold", "", "FULFILLED?", "shipped", "cancelled"] {
            assert_eq!(
                OrderStatus::from_fulfillment(Some(raw)),
                OrderStatus::Pending,
                "{raw:?} should map to pending"
            );
        }
    }

    #[test]
    fn test_fulfillment_mapping_ignores_case() {
        assert_eq!(
            OrderStatus::from_fulfillment(Some(" Fulfilled ")),
            OrderStatus::Fulfilled
        );
    }

    #[test]
    fn test_financial_mapping() {
        assert_eq!(PaymentStatus::from_financial(Some("paid")), PaymentStatus::Paid);
        assert_eq!(
            PaymentStatus::from_financial(Some("partially_paid")),
            PaymentStatus::Pending
        );
        assert_eq!(PaymentStatus::from_financial(None), PaymentStatus::Pending);
    }

    #[test]
    fn test_order_status_round_trips_through_str() {
        for status in OrderStatus::ALL {
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), status);
        }
        assert!("lost".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_payment_method_from_gateway() {
        assert_eq!(
            PaymentMethod::from_gateway(Some("Vodafone Wallet")),
            PaymentMethod::MobileWallet
        );
        assert_eq!(
            PaymentMethod::from_gateway(Some("Bank Deposit")),
            PaymentMethod::BankTransfer
        );
        assert_eq!(
            PaymentMethod::from_gateway(Some("manual")),
            PaymentMethod::CashOnDelivery
        );
        assert_eq!(PaymentMethod::from_gateway(None), PaymentMethod::CashOnDelivery);
    }

    #[test]
    fn test_admin_role_permissions() {
        assert!(AdminRole::SuperAdmin.can_write());
        assert!(AdminRole::Admin.can_write());
        assert!(!AdminRole::Viewer.can_write());
        assert_eq!("viewer".parse::<AdminRole>().unwrap(), AdminRole::Viewer);
    }
}
