//! Dashboard route handler.

use axum::{Json, extract::State};

use crate::db::{DashboardCounts, DashboardRepository};
use crate::error::Result;
use crate::middleware::RequireAdmin;
use crate::state::AppState;

/// GET /api/dashboard
pub async fn index(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<DashboardCounts>> {
    let counts = DashboardRepository::new(state.pool()).counts().await?;
    Ok(Json(counts))
}
