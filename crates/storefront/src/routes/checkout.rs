//! Checkout handler.

use axum::{Json, extract::State};
use tracing::instrument;

use crate::context::ShopContext;
use crate::error::Result;
use crate::services::checkout::{self, CheckoutForm, OrderConfirmation};
use crate::state::AppState;

/// POST /api/checkout
///
/// On success the emptied cart is persisted. On failure nothing is written,
/// so the session cart is exactly what it was.
#[instrument(skip_all)]
pub async fn submit(
    State(state): State<AppState>,
    ctx: ShopContext,
    Json(form): Json<CheckoutForm>,
) -> Result<Json<OrderConfirmation>> {
    let mut cart = ctx.cart().await?;
    let currency = ctx.currency().await?;

    let confirmation = checkout::submit(state.catalog(), &mut cart, &form, currency).await?;

    ctx.set_cart(&cart).await?;
    Ok(Json(confirmation))
}
