//! Loyalty point arithmetic.
//!
//! Customers earn one point per 100 currency units of a paid order, truncated
//! toward zero. A cancelled order takes back exactly the points it granted,
//! computed again from the order's original total, and a balance never goes
//! below zero.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

/// Currency units needed to earn one point.
pub const CURRENCY_UNITS_PER_POINT: i64 = 100;

/// Points earned by an order total: `floor(total / 100)`.
///
/// Zero and negative totals earn nothing.
///
/// ```
/// use rust_decimal::Decimal;
/// use souq_core::loyalty::points_for_total;
///
/// assert_eq!(points_for_total(Decimal::from(250)), 2);
/// assert_eq!(points_for_total(Decimal::from(99)), 0);
/// ```
#[must_use]
pub fn points_for_total(total: Decimal) -> i32 {
    if total <= Decimal::ZERO {
        return 0;
    }
    (total / Decimal::from(CURRENCY_UNITS_PER_POINT))
        .trunc()
        .to_i32()
        .unwrap_or(i32::MAX)
}

/// Balance after taking back `points`, floored at zero.
#[must_use]
pub const fn balance_after_deduction(balance: i32, points: i32) -> i32 {
    let remaining = balance.saturating_sub(points);
    if remaining < 0 { 0 } else { remaining }
}

/// Ledger description for points earned on an order.
#[must_use]
pub fn earned_description(order_number: &str) -> String {
    format!("Points earned for order #{order_number}")
}

/// Ledger description for points taken back after a cancellation.
#[must_use]
pub fn cancellation_description(order_number: &str) -> String {
    format!("Points reversed for cancelled order #{order_number}")
}

/// Ledger description for points spent on an order.
#[must_use]
pub fn redemption_description(order_number: Option<&str>) -> String {
    order_number.map_or_else(
        || "Points redeemed".to_string(),
        |n| format!("Points redeemed on order #{n}"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_points_truncate_toward_zero() {
        assert_eq!(points_for_total(Decimal::from(250)), 2);
        assert_eq!(points_for_total(Decimal::from(99)), 0);
        assert_eq!(points_for_total(Decimal::from(100)), 1);
        assert_eq!(points_for_total(Decimal::new(19_999, 2)), 1);
        assert_eq!(points_for_total(Decimal::new(99_999, 2)), 9);
    }

    #[test]
    fn test_points_for_non_positive_totals() {
        assert_eq!(points_for_total(Decimal::ZERO), 0);
        assert_eq!(points_for_total(Decimal::from(-500)), 0);
    }

    #[test]
    fn test_deduction_floors_at_zero() {
        assert_eq!(balance_after_deduction(10, 2), 8);
        assert_eq!(balance_after_deduction(1, 2), 0);
        assert_eq!(balance_after_deduction(0, 2), 0);
        assert_eq!(balance_after_deduction(i32::MIN, 1), 0);
    }

    #[test]
    fn test_descriptions_name_the_order() {
        assert_eq!(earned_description("1042"), "Points earned for order #1042");
        assert_eq!(
            cancellation_description("1042"),
            "Points reversed for cancelled order #1042"
        );
        assert_eq!(redemption_description(None), "Points redeemed");
    }
}
