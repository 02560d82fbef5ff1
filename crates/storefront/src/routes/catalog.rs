//! Catalog browsing handlers.
//!
//! Thin JSON wrappers over the active catalog backend.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use tracing::instrument;

use crate::catalog::{CatalogAdapter, Category, Product, ProductPage, ProductQuery};
use crate::error::Result;
use crate::state::AppState;

/// GET /api/products
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> Result<Json<ProductPage>> {
    let query = ProductQuery {
        page: query.page.max(1),
        search: query.search.filter(|s| !s.trim().is_empty()),
        category: query.category.filter(|c| !c.trim().is_empty()),
        ..query
    };
    Ok(Json(state.catalog().list_products(&query).await?))
}

/// GET /api/products/{id}
#[instrument(skip(state))]
pub async fn show(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Product>> {
    Ok(Json(state.catalog().get_product(&id).await?))
}

/// GET /api/products/by-slug/{slug}
#[instrument(skip(state))]
pub async fn by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<Product>> {
    Ok(Json(state.catalog().get_product_by_slug(&slug).await?))
}

/// GET /api/products/{id}/related
#[instrument(skip(state))]
pub async fn related(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Product>>> {
    Ok(Json(state.catalog().related_products(&id).await?))
}

/// GET /api/categories
#[instrument(skip(state))]
pub async fn categories(State(state): State<AppState>) -> Result<Json<Vec<Category>>> {
    Ok(Json(state.catalog().list_categories().await?))
}
