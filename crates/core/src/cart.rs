//! Cart aggregation.
//!
//! One generic [`CartStore`] serves every catalog backend. A backend only has
//! to produce lines implementing [`LineItem`]; identity, merging, removal and
//! totals live here.
//!
//! # Invariants
//!
//! - Every stored line has `quantity >= 1`. Setting a quantity of zero or less
//!   removes the line instead.
//! - At most one line exists per [`LineKey`]. Adding a line whose key is
//!   already present sums the quantities.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Identity of a cart line: the same product, variant and size merge.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LineKey {
    pub product_id: String,
    #[serde(default)]
    pub variant_id: Option<String>,
    #[serde(default)]
    pub size: Option<String>,
}

impl LineKey {
    /// Build a key, treating blank variant/size strings as absent.
    #[must_use]
    pub fn new(
        product_id: impl Into<String>,
        variant_id: Option<String>,
        size: Option<String>,
    ) -> Self {
        let non_blank = |s: String| (!s.trim().is_empty()).then_some(s);
        Self {
            product_id: product_id.into(),
            variant_id: variant_id.and_then(non_blank),
            size: size.and_then(non_blank),
        }
    }
}

/// A line that can live in a [`CartStore`].
pub trait LineItem {
    /// The identity used for merging and lookup.
    fn key(&self) -> LineKey;

    /// Price of a single unit.
    fn unit_price(&self) -> Decimal;

    /// Current quantity (always at least 1 while stored).
    fn quantity(&self) -> u32;

    /// Overwrite the quantity.
    fn set_quantity(&mut self, quantity: u32);

    /// `unit_price * quantity`.
    fn line_total(&self) -> Decimal {
        self.unit_price() * Decimal::from(self.quantity())
    }
}

/// The line type used by the storefront for every catalog backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: String,
    #[serde(default)]
    pub variant_id: Option<String>,
    #[serde(default)]
    pub size: Option<String>,
    /// Product title at the time it was added.
    pub title: String,
    #[serde(default)]
    pub image_url: Option<String>,
    pub unit_price: Decimal,
    pub quantity: u32,
}

impl LineItem for CartLine {
    fn key(&self) -> LineKey {
        LineKey {
            product_id: self.product_id.clone(),
            variant_id: self.variant_id.clone(),
            size: self.size.clone(),
        }
    }

    fn unit_price(&self) -> Decimal {
        self.unit_price
    }

    fn quantity(&self) -> u32 {
        self.quantity
    }

    fn set_quantity(&mut self, quantity: u32) {
        self.quantity = quantity;
    }
}

/// An ordered collection of cart lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CartStore<L> {
    lines: Vec<L>,
}

impl<L> Default for CartStore<L> {
    fn default() -> Self {
        Self { lines: Vec::new() }
    }
}

impl<L: LineItem> CartStore<L> {
    /// An empty cart.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a cart from persisted lines, dropping zero-quantity lines and
    /// merging duplicate keys so a hand-edited payload cannot break the
    /// invariants.
    #[must_use]
    pub fn from_lines(lines: impl IntoIterator<Item = L>) -> Self {
        let mut cart = Self::new();
        for line in lines {
            cart.add_item(line);
        }
        cart
    }

    /// Add a line, merging with an existing line of the same key.
    ///
    /// A line with quantity 0 is ignored.
    pub fn add_item(&mut self, line: L) {
        if line.quantity() == 0 {
            return;
        }
        let key = line.key();
        if let Some(existing) = self.lines.iter_mut().find(|l| l.key() == key) {
            let merged = existing.quantity().saturating_add(line.quantity());
            existing.set_quantity(merged);
        } else {
            self.lines.push(line);
        }
    }

    /// Set a line's quantity. Zero or negative removes the line.
    ///
    /// Returns `false` if no line has this key.
    pub fn update_quantity(&mut self, key: &LineKey, quantity: i64) -> bool {
        if quantity <= 0 {
            return self.remove_item(key);
        }
        let quantity = u32::try_from(quantity).unwrap_or(u32::MAX);
        match self.lines.iter_mut().find(|l| l.key() == *key) {
            Some(line) => {
                line.set_quantity(quantity);
                true
            }
            None => false,
        }
    }

    /// Remove a line. Returns whether a line was removed.
    pub fn remove_item(&mut self, key: &LineKey) -> bool {
        let before = self.lines.len();
        self.lines.retain(|l| l.key() != *key);
        self.lines.len() != before
    }

    /// Remove every line.
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// The line with this key, if any.
    #[must_use]
    pub fn get(&self, key: &LineKey) -> Option<&L> {
        self.lines.iter().find(|l| l.key() == *key)
    }

    /// All lines in insertion order.
    #[must_use]
    pub fn lines(&self) -> &[L] {
        &self.lines
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Number of distinct lines.
    #[must_use]
    pub fn item_count(&self) -> usize {
        self.lines.len()
    }

    /// Sum of all line quantities (the badge count).
    #[must_use]
    pub fn total_quantity(&self) -> u64 {
        self.lines.iter().map(|l| u64::from(l.quantity())).sum()
    }

    /// Sum of `unit_price * quantity` over all lines.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.lines.iter().map(|l| l.line_total()).sum()
    }
}

/// Shipping and tax rules applied on top of a cart subtotal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingPolicy {
    /// Subtotals at or above this ship free.
    pub free_shipping_threshold: Decimal,
    /// Fee charged below the threshold.
    pub flat_shipping_fee: Decimal,
    /// Tax as a fraction of the subtotal (`0.14` for 14%).
    pub tax_rate: Decimal,
}

impl PricingPolicy {
    /// Shipping fee for a subtotal. An empty cart ships free.
    #[must_use]
    pub fn shipping_for(&self, subtotal: Decimal) -> Decimal {
        if subtotal <= Decimal::ZERO || subtotal >= self.free_shipping_threshold {
            Decimal::ZERO
        } else {
            self.flat_shipping_fee
        }
    }

    /// Tax for a subtotal, rounded half-up to two places.
    #[must_use]
    pub fn tax_for(&self, subtotal: Decimal) -> Decimal {
        (subtotal * self.tax_rate).round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    }

    /// How much more the customer must spend to ship free.
    #[must_use]
    pub fn remaining_for_free_shipping(&self, subtotal: Decimal) -> Decimal {
        (self.free_shipping_threshold - subtotal).max(Decimal::ZERO)
    }
}

/// Derived cart totals. Presentation only; never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    pub subtotal: Decimal,
    pub shipping: Decimal,
    pub tax: Decimal,
    pub grand_total: Decimal,
    pub remaining_for_free_shipping: Decimal,
}

impl Totals {
    /// Compute totals for a subtotal under a pricing policy.
    #[must_use]
    pub fn compute(subtotal: Decimal, policy: &PricingPolicy) -> Self {
        let shipping = policy.shipping_for(subtotal);
        let tax = policy.tax_for(subtotal);
        Self {
            subtotal,
            shipping,
            tax,
            grand_total: subtotal + shipping + tax,
            remaining_for_free_shipping: policy.remaining_for_free_shipping(subtotal),
        }
    }

    /// Totals for a whole cart.
    #[must_use]
    pub fn for_cart<L: LineItem>(cart: &CartStore<L>, policy: &PricingPolicy) -> Self {
        Self::compute(cart.total(), policy)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn line(product: &str, variant: Option<&str>, size: Option<&str>, price: i64, qty: u32) -> CartLine {
        CartLine {
            product_id: product.to_string(),
            variant_id: variant.map(String::from),
            size: size.map(String::from),
            title: format!("Product {product}"),
            image_url: None,
            unit_price: Decimal::from(price),
            quantity: qty,
        }
    }

    fn policy() -> PricingPolicy {
        PricingPolicy {
            free_shipping_threshold: Decimal::from(100),
            flat_shipping_fee: Decimal::from(15),
            tax_rate: Decimal::new(14, 2),
        }
    }

    #[test]
    fn test_same_key_merges_quantities() {
        let mut cart = CartStore::new();
        cart.add_item(line("p1", Some("v1"), Some("M"), 50, 2));
        cart.add_item(line("p1", Some("v1"), Some("M"), 50, 3));

        assert_eq!(cart.item_count(), 1);
        assert_eq!(cart.lines()[0].quantity, 5);
    }

    #[test]
    fn test_different_size_is_a_different_line() {
        let mut cart = CartStore::new();
        cart.add_item(line("p1", Some("v1"), Some("M"), 50, 1));
        cart.add_item(line("p1", Some("v1"), Some("L"), 50, 1));
        cart.add_item(line("p1", None, Some("L"), 50, 1));

        assert_eq!(cart.item_count(), 3);
    }

    #[test]
    fn test_zero_quantity_add_is_ignored() {
        let mut cart = CartStore::new();
        cart.add_item(line("p1", None, None, 50, 0));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_update_to_zero_or_negative_removes_one_line() {
        let mut cart = CartStore::new();
        cart.add_item(line("p1", None, None, 50, 4));
        cart.add_item(line("p2", None, None, 30, 7));
        cart.add_item(line("p3", None, None, 20, 1));

        let key = LineKey::new("p2", None, None);
        assert!(cart.update_quantity(&key, 0));
        assert_eq!(cart.item_count(), 2);
        assert!(cart.get(&key).is_none());

        let key = LineKey::new("p1", None, None);
        assert!(cart.update_quantity(&key, -3));
        assert_eq!(cart.item_count(), 1);
    }

    #[test]
    fn test_update_sets_quantity_directly() {
        let mut cart = CartStore::new();
        cart.add_item(line("p1", None, None, 50, 4));
        let key = LineKey::new("p1", None, None);

        assert!(cart.update_quantity(&key, 9));
        assert_eq!(cart.get(&key).unwrap().quantity, 9);
        assert!(!cart.update_quantity(&LineKey::new("missing", None, None), 2));
    }

    #[test]
    fn test_remove_missing_line_is_noop() {
        let mut cart = CartStore::new();
        cart.add_item(line("p1", None, None, 50, 1));
        assert!(!cart.remove_item(&LineKey::new("p9", None, None)));
        assert_eq!(cart.item_count(), 1);
    }

    #[test]
    fn test_total_computation() {
        let mut cart = CartStore::new();
        cart.add_item(line("p1", None, None, 50, 2));
        cart.add_item(line("p2", None, None, 30, 1));
        assert_eq!(cart.total(), Decimal::from(130));

        cart.add_item(line("p3", None, None, 20, 1));
        assert_eq!(cart.total(), Decimal::from(150));
        assert_eq!(cart.total_quantity(), 4);
    }

    #[test]
    fn test_free_shipping_threshold() {
        let policy = policy();
        assert_eq!(policy.shipping_for(Decimal::from(99)), Decimal::from(15));
        assert_eq!(policy.shipping_for(Decimal::from(100)), Decimal::ZERO);
        assert_eq!(policy.shipping_for(Decimal::from(250)), Decimal::ZERO);
        assert_eq!(policy.shipping_for(Decimal::ZERO), Decimal::ZERO);
    }

    #[test]
    fn test_totals_include_tax_and_shipping() {
        let totals = Totals::compute(Decimal::from(99), &policy());
        assert_eq!(totals.shipping, Decimal::from(15));
        assert_eq!(totals.tax, Decimal::new(1386, 2));
        assert_eq!(totals.grand_total, Decimal::new(12786, 2));
        assert_eq!(totals.remaining_for_free_shipping, Decimal::from(1));
    }

    #[test]
    fn test_blank_variant_and_size_normalize_to_none() {
        let key = LineKey::new("p1", Some("  ".to_string()), Some(String::new()));
        assert_eq!(key, LineKey::new("p1", None, None));
    }

    #[test]
    fn test_from_lines_restores_invariants() {
        let cart = CartStore::from_lines(vec![
            line("p1", None, None, 10, 1),
            line("p1", None, None, 10, 2),
            line("p2", None, None, 10, 0),
        ]);
        assert_eq!(cart.item_count(), 1);
        assert_eq!(cart.lines()[0].quantity, 3);
    }

    #[test]
    fn test_serialized_form_is_a_plain_array() {
        let mut cart = CartStore::new();
        cart.add_item(line("p1", None, None, 10, 1));
        let json = serde_json::to_value(&cart).unwrap();
        assert!(json.is_array());

        let back: CartStore<CartLine> = serde_json::from_value(json).unwrap();
        assert_eq!(back, cart);
    }
}
