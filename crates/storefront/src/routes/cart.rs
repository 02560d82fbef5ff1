//! Cart handlers.
//!
//! The session cart is the source of truth until checkout. Every mutation
//! goes through `ShopContext`, which persists it and publishes the new
//! snapshot. With the REST backend, added lines are also mirrored to the
//! backend's cart sub-API on a best-effort basis.

use axum::{Json, extract::State};
use serde::Deserialize;
use tracing::instrument;

use souq_core::cart::{CartLine, LineKey};

use crate::catalog::{CatalogAdapter, CatalogError};
use crate::context::{CartSnapshot, ShopContext};
use crate::error::{AppError, Result};
use crate::state::AppState;

/// Body for adding a product.
#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub product_id: String,
    #[serde(default)]
    pub variant_id: Option<String>,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default = "one")]
    pub quantity: u32,
}

const fn one() -> u32 {
    1
}

/// Body identifying a line, with an optional new quantity.
#[derive(Debug, Deserialize)]
pub struct LineRequest {
    pub product_id: String,
    #[serde(default)]
    pub variant_id: Option<String>,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub quantity: i64,
}

impl LineRequest {
    fn key(&self) -> LineKey {
        LineKey::new(
            self.product_id.clone(),
            self.variant_id.clone(),
            self.size.clone(),
        )
    }
}

/// GET /api/cart
pub async fn show(ctx: ShopContext) -> Result<Json<CartSnapshot>> {
    let cart = ctx.cart().await?;
    Ok(Json(ctx.snapshot(&cart).await?))
}

/// POST /api/cart/items
///
/// Prices and titles come from the catalog, never from the client.
#[instrument(skip(state, ctx))]
pub async fn add(
    State(state): State<AppState>,
    ctx: ShopContext,
    Json(body): Json<AddItemRequest>,
) -> Result<Json<CartSnapshot>> {
    if body.quantity == 0 {
        return Err(AppError::BadRequest("quantity must be at least 1".to_string()));
    }

    let product = state.catalog().get_product(&body.product_id).await?;
    let line = product.cart_line(
        body.variant_id.as_deref().filter(|v| !v.trim().is_empty()),
        body.size.as_deref().filter(|s| !s.trim().is_empty()),
        body.quantity,
    )?;

    let mut cart = ctx.cart().await?;
    cart.add_item(line.clone());
    let snapshot = ctx.set_cart(&cart).await?;

    mirror_remote(&state, ctx.client_id(), &line).await;

    Ok(Json(snapshot))
}

/// PATCH /api/cart/items
///
/// A quantity of zero or less removes the line, like DELETE, so an absent
/// line is not an error. Setting a positive quantity needs an existing line.
pub async fn update(ctx: ShopContext, Json(body): Json<LineRequest>) -> Result<Json<CartSnapshot>> {
    let mut cart = ctx.cart().await?;
    if !cart.update_quantity(&body.key(), body.quantity) && body.quantity > 0 {
        return Err(AppError::NotFound("cart line".to_string()));
    }
    Ok(Json(ctx.set_cart(&cart).await?))
}

/// DELETE /api/cart/items
///
/// Removing a line that is not in the cart is not an error.
pub async fn remove(ctx: ShopContext, Json(body): Json<LineRequest>) -> Result<Json<CartSnapshot>> {
    let mut cart = ctx.cart().await?;
    cart.remove_item(&body.key());
    Ok(Json(ctx.set_cart(&cart).await?))
}

/// DELETE /api/cart
pub async fn clear(ctx: ShopContext) -> Result<Json<CartSnapshot>> {
    let mut cart = ctx.cart().await?;
    cart.clear();
    Ok(Json(ctx.set_cart(&cart).await?))
}

/// GET /api/cart/remote
///
/// The backend's copy of this session's cart (REST backend only).
pub async fn remote(
    State(state): State<AppState>,
    ctx: ShopContext,
) -> Result<Json<serde_json::Value>> {
    let rest = state
        .catalog()
        .as_rest()
        .ok_or(CatalogError::Unsupported("remote carts"))?;
    Ok(Json(rest.remote_cart(ctx.client_id()).await?))
}

async fn mirror_remote(state: &AppState, cart_key: &str, line: &CartLine) {
    let Some(rest) = state.catalog().as_rest() else {
        return;
    };
    match rest.add_remote_cart_item(cart_key, line).await {
        Ok(()) | Err(CatalogError::Unsupported(_)) => {}
        Err(e) => tracing::warn!(error = %e, "Remote cart mirror failed"),
    }
}
