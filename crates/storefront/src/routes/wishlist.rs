//! Wishlist handlers.
//!
//! Signed-in customers keep their wishlist in the database; guests keep it
//! in the session until they sign in.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;
use tracing::instrument;

use crate::catalog::CatalogAdapter;
use crate::context::ShopContext;
use crate::db::WishlistRepository;
use crate::error::Result;
use crate::middleware::OptionalAuth;
use crate::models::WishlistEntry;
use crate::state::AppState;

/// Body for saving a product.
#[derive(Debug, Deserialize)]
pub struct AddRequest {
    pub product_id: String,
}

/// GET /api/wishlist
pub async fn index(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    ctx: ShopContext,
) -> Result<Json<Vec<WishlistEntry>>> {
    let entries = match user {
        Some(user) => WishlistRepository::new(state.pool())
            .list(user.id)
            .await?
            .into_iter()
            .map(WishlistEntry::from)
            .collect(),
        None => ctx.wishlist().await?,
    };
    Ok(Json(entries))
}

/// POST /api/wishlist
///
/// Title, image and price are snapshotted from the catalog.
#[instrument(skip(state, user, ctx))]
pub async fn add(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    ctx: ShopContext,
    Json(body): Json<AddRequest>,
) -> Result<Json<Vec<WishlistEntry>>> {
    let product = state.catalog().get_product(&body.product_id).await?;
    let entry = WishlistEntry::from(&product);

    if let Some(user) = user {
        let repo = WishlistRepository::new(state.pool());
        repo.add(user.id, &entry).await?;
        let entries = repo
            .list(user.id)
            .await?
            .into_iter()
            .map(WishlistEntry::from)
            .collect();
        return Ok(Json(entries));
    }

    let mut entries = ctx.wishlist().await?;
    if !entries.iter().any(|e| e.product_id == entry.product_id) {
        entries.push(entry);
        ctx.set_wishlist(&entries).await?;
    }
    Ok(Json(entries))
}

/// DELETE /api/wishlist/{product_id}
///
/// Removing a product that was never saved is not an error.
pub async fn remove(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    ctx: ShopContext,
    Path(product_id): Path<String>,
) -> Result<Json<Vec<WishlistEntry>>> {
    if let Some(user) = user {
        let repo = WishlistRepository::new(state.pool());
        repo.remove(user.id, &product_id).await?;
        let entries = repo
            .list(user.id)
            .await?
            .into_iter()
            .map(WishlistEntry::from)
            .collect();
        return Ok(Json(entries));
    }

    let mut entries = ctx.wishlist().await?;
    let before = entries.len();
    entries.retain(|e| e.product_id != product_id);
    if entries.len() != before {
        ctx.set_wishlist(&entries).await?;
    }
    Ok(Json(entries))
}
