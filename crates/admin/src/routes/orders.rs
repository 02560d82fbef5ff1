//! Order management route handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use tracing::instrument;

use souq_core::{OrderId, OrderStatus};

use super::{PAGE_SIZE, page_offset};
use crate::db::{OrderListQuery, OrderRepository};
use crate::error::Result;
use crate::middleware::{RequireAdmin, RequireWriter};
use crate::models::{AdminOrder, OrderDetail};
use crate::state::AppState;

/// GET /api/orders?status=&search=&page=
pub async fn index(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(query): Query<OrderListQuery>,
) -> Result<Json<Vec<AdminOrder>>> {
    let search = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let orders = OrderRepository::new(state.pool())
        .list(query.status, search, PAGE_SIZE, page_offset(query.page))
        .await?;
    Ok(Json(orders))
}

/// GET /api/orders/{id}
pub async fn show(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<OrderId>,
) -> Result<Json<OrderDetail>> {
    let (order, items) = OrderRepository::new(state.pool()).get(id).await?;
    Ok(Json(OrderDetail { order, items }))
}

/// Status change body. Only the closed status set deserializes.
#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: OrderStatus,
    #[serde(default)]
    pub tracking_number: Option<String>,
}

/// PUT /api/orders/{id}/status
#[instrument(skip(state, admin, body), fields(admin_id = %admin.id, status = %body.status))]
pub async fn update_status(
    State(state): State<AppState>,
    RequireWriter(admin): RequireWriter,
    Path(id): Path<OrderId>,
    Json(body): Json<StatusUpdate>,
) -> Result<Json<AdminOrder>> {
    let tracking = body
        .tracking_number
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());

    let order = OrderRepository::new(state.pool())
        .update_status(id, body.status, tracking)
        .await?;

    tracing::info!(order_id = %id, "Order status updated");
    Ok(Json(order))
}
