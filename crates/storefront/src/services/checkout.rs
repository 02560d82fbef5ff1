//! Checkout submission.
//!
//! Validates the cart and the form locally, then makes exactly one
//! `create_order` call on the active backend. The cart is cleared only after
//! the backend accepted the order; on any failure it is left as it was.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::instrument;

use souq_core::cart::{CartLine, CartStore};
use souq_core::{CurrencyCode, Email, PaymentMethod};

use crate::catalog::{CatalogError, OrderLine, OrderRequest, OrderSink, PostalAddress};

/// Errors that can occur during checkout.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Nothing to order.
    #[error("your cart is empty")]
    EmptyCart,

    /// The form is incomplete or malformed.
    #[error("{0}")]
    Validation(String),

    /// The backend refused or failed to create the order.
    #[error("order could not be placed: {0}")]
    Backend(#[from] CatalogError),
}

/// Checkout form as submitted by the client.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutForm {
    pub email: String,
    pub billing: PostalAddress,
    /// Defaults to the billing address.
    #[serde(default)]
    pub shipping: Option<PostalAddress>,
    pub payment_method: PaymentMethod,
}

/// What the customer sees after a successful checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderConfirmation {
    pub order_id: String,
    pub order_number: Option<String>,
    pub total: Decimal,
    /// Hosted page where the customer finishes the order, for backends that have one.
    pub checkout_url: Option<String>,
}

/// Build the order request for a cart, validating everything first.
///
/// # Errors
///
/// Returns `CheckoutError::EmptyCart` or `CheckoutError::Validation`.
pub fn build_request(
    cart: &CartStore<CartLine>,
    form: &CheckoutForm,
    currency: CurrencyCode,
) -> Result<OrderRequest, CheckoutError> {
    if cart.is_empty() {
        return Err(CheckoutError::EmptyCart);
    }

    let email = Email::parse(&form.email)
        .map_err(|e| CheckoutError::Validation(format!("email: {e}")))?;

    let billing = form.billing.clone();
    let shipping = form.shipping.clone().unwrap_or_else(|| billing.clone());
    for (label, address) in [("billing", &billing), ("shipping", &shipping)] {
        let missing = address.missing_fields();
        if !missing.is_empty() {
            return Err(CheckoutError::Validation(format!(
                "{label} address is missing: {}",
                missing.join(", ")
            )));
        }
    }

    let lines = cart
        .lines()
        .iter()
        .map(|line| OrderLine {
            product_id: line.product_id.clone(),
            variant_id: line.variant_id.clone(),
            quantity: line.quantity,
        })
        .collect();

    Ok(OrderRequest {
        lines,
        billing,
        shipping,
        payment_method: form.payment_method,
        email,
        currency,
    })
}

/// Submit the cart as an order.
///
/// # Errors
///
/// Returns validation errors before any network call, or
/// `CheckoutError::Backend` if the backend failed. The cart is unchanged in
/// both cases.
#[instrument(skip(sink, cart, form), fields(lines = cart.item_count()))]
pub async fn submit<S: OrderSink>(
    sink: &S,
    cart: &mut CartStore<CartLine>,
    form: &CheckoutForm,
    currency: CurrencyCode,
) -> Result<OrderConfirmation, CheckoutError> {
    let request = build_request(cart, form, currency)?;

    let placed = sink.create_order(&request).await.map_err(|e| {
        tracing::error!(error = %e, "Order creation failed");
        CheckoutError::Backend(e)
    })?;

    cart.clear();
    tracing::info!(order_id = %placed.order_id, "Order placed");

    Ok(OrderConfirmation {
        order_id: placed.order_id,
        order_number: placed.order_number,
        total: placed.total,
        checkout_url: placed.checkout_url,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::catalog::PlacedOrder;

    struct FakeSink {
        calls: AtomicUsize,
        fail: bool,
    }

    impl FakeSink {
        const fn new(fail: bool) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail,
            }
        }
    }

    impl OrderSink for FakeSink {
        async fn create_order(&self, request: &OrderRequest) -> Result<PlacedOrder, CatalogError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(CatalogError::Status {
                    status: 503,
                    body: "maintenance".to_string(),
                });
            }
            let total = request
                .lines
                .iter()
                .map(|l| Decimal::from(l.quantity) * Decimal::from(50))
                .sum();
            Ok(PlacedOrder {
                order_id: "981".to_string(),
                order_number: Some("981".to_string()),
                total,
                checkout_url: None,
            })
        }
    }

    fn address() -> PostalAddress {
        PostalAddress {
            first_name: "Nour".to_string(),
            last_name: "Haddad".to_string(),
            address1: "12 Tahrir St".to_string(),
            address2: None,
            city: "Cairo".to_string(),
            state: None,
            postcode: Some("11511".to_string()),
            country: "EG".to_string(),
            phone: None,
        }
    }

    fn form() -> CheckoutForm {
        CheckoutForm {
            email: "nour@example.com".to_string(),
            billing: address(),
            shipping: None,
            payment_method: PaymentMethod::CashOnDelivery,
        }
    }

    fn cart() -> CartStore<CartLine> {
        let mut cart = CartStore::new();
        cart.add_item(CartLine {
            product_id: "10".to_string(),
            variant_id: Some("11".to_string()),
            size: Some("M".to_string()),
            title: "Linen shirt".to_string(),
            image_url: None,
            unit_price: Decimal::from(50),
            quantity: 2,
        });
        cart
    }

    #[tokio::test]
    async fn test_success_clears_cart() {
        let sink = FakeSink::new(false);
        let mut cart = cart();

        let confirmation = submit(&sink, &mut cart, &form(), CurrencyCode::EGP)
            .await
            .unwrap();

        assert_eq!(confirmation.order_id, "981");
        assert_eq!(confirmation.total, Decimal::from(100));
        assert!(cart.is_empty());
        assert_eq!(sink.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_backend_failure_leaves_cart_untouched() {
        let sink = FakeSink::new(true);
        let mut cart = cart();
        let before = serde_json::to_string(&cart).unwrap();

        let result = submit(&sink, &mut cart, &form(), CurrencyCode::EGP).await;

        assert!(matches!(result, Err(CheckoutError::Backend(_))));
        assert_eq!(serde_json::to_string(&cart).unwrap(), before);
        assert_eq!(sink.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_cart_makes_no_call() {
        let sink = FakeSink::new(false);
        let mut cart = CartStore::new();

        let result = submit(&sink, &mut cart, &form(), CurrencyCode::USD).await;

        assert!(matches!(result, Err(CheckoutError::EmptyCart)));
        assert_eq!(sink.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_invalid_email_makes_no_call() {
        let sink = FakeSink::new(false);
        let mut cart = cart();
        let mut form = form();
        form.email = "not-an-email".to_string();

        let result = submit(&sink, &mut cart, &form, CurrencyCode::USD).await;

        assert!(matches!(result, Err(CheckoutError::Validation(_))));
        assert_eq!(sink.calls.load(Ordering::SeqCst), 0);
        assert_eq!(cart.item_count(), 1);
    }

    #[test]
    fn test_missing_address_fields_are_named() {
        let mut form = form();
        form.billing.city = "  ".to_string();

        let err = build_request(&cart(), &form, CurrencyCode::USD).unwrap_err();
        assert_eq!(err.to_string(), "billing address is missing: city");
    }

    #[test]
    fn test_shipping_defaults_to_billing() {
        let request = build_request(&cart(), &form(), CurrencyCode::USD).unwrap();
        assert_eq!(request.shipping, request.billing);
        assert_eq!(request.lines.len(), 1);
        assert_eq!(request.lines[0].quantity, 2);
        assert_eq!(request.lines[0].variant_id.as_deref(), Some("11"));
    }
}
