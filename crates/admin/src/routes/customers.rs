//! Customer and loyalty route handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Serialize;
use tracing::instrument;

use souq_core::UserId;

use super::{ListQuery, PAGE_SIZE};
use crate::db::CustomerRepository;
use crate::error::{AppError, Result};
use crate::middleware::{RequireAdmin, RequireWriter};
use crate::models::{Customer, CustomerDetail, PointsAdjustment};
use crate::state::AppState;

/// Ledger rows shown on the customer page.
const LEDGER_LIMIT: i64 = 100;

/// GET /api/customers?search=&page=
pub async fn index(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Customer>>> {
    let customers = CustomerRepository::new(state.pool())
        .list(query.search(), PAGE_SIZE, query.offset())
        .await?;
    Ok(Json(customers))
}

/// GET /api/customers/{id}
pub async fn show(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<UserId>,
) -> Result<Json<CustomerDetail>> {
    let repo = CustomerRepository::new(state.pool());
    let customer = repo.get(id).await?;
    let transactions = repo.ledger(id, LEDGER_LIMIT).await?;
    Ok(Json(CustomerDetail {
        customer,
        transactions,
    }))
}

/// Balance after an adjustment.
#[derive(Debug, Serialize)]
pub struct Balance {
    pub balance: i32,
}

/// POST /api/customers/{id}/points
///
/// Positive points are awarded, negative points deducted (floored at zero).
#[instrument(skip(state, admin, body), fields(admin_id = %admin.id, points = body.points))]
pub async fn adjust_points(
    State(state): State<AppState>,
    RequireWriter(admin): RequireWriter,
    Path(id): Path<UserId>,
    Json(body): Json<PointsAdjustment>,
) -> Result<Json<Balance>> {
    let reason = body.reason.trim();
    if reason.is_empty() {
        return Err(AppError::BadRequest("A reason is required".to_string()));
    }

    let repo = CustomerRepository::new(state.pool());
    repo.get(id).await?;

    let balance = match body.points {
        0 => return Err(AppError::BadRequest("Points must not be zero".to_string())),
        points if points > 0 => repo.award(id, points, reason).await?,
        points => {
            let points = points
                .checked_neg()
                .ok_or_else(|| AppError::BadRequest("Points out of range".to_string()))?;
            repo.deduct(id, points, reason).await?
        }
    };

    tracing::info!(user_id = %id, balance, "Loyalty points adjusted");
    Ok(Json(Balance { balance }))
}
