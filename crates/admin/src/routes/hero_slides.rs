//! Hero slide route handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use tracing::instrument;

use souq_core::HeroSlideId;

use crate::db::HeroSlideRepository;
use crate::error::{AppError, Result};
use crate::middleware::{RequireAdmin, RequireWriter};
use crate::models::{HeroSlide, HeroSlideInput};
use crate::state::AppState;

/// GET /api/hero-slides
pub async fn index(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<Vec<HeroSlide>>> {
    Ok(Json(HeroSlideRepository::new(state.pool()).list().await?))
}

/// POST /api/hero-slides
#[instrument(skip(state, admin, input), fields(admin_id = %admin.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireWriter(admin): RequireWriter,
    Json(input): Json<HeroSlideInput>,
) -> Result<(StatusCode, Json<HeroSlide>)> {
    validate(&input)?;
    let slide = HeroSlideRepository::new(state.pool()).create(&input).await?;
    Ok((StatusCode::CREATED, Json(slide)))
}

/// PUT /api/hero-slides/{id}
#[instrument(skip(state, admin, input), fields(admin_id = %admin.id))]
pub async fn update(
    State(state): State<AppState>,
    RequireWriter(admin): RequireWriter,
    Path(id): Path<HeroSlideId>,
    Json(input): Json<HeroSlideInput>,
) -> Result<Json<HeroSlide>> {
    validate(&input)?;
    let slide = HeroSlideRepository::new(state.pool()).update(id, &input).await?;
    Ok(Json(slide))
}

/// DELETE /api/hero-slides/{id}
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn delete(
    State(state): State<AppState>,
    RequireWriter(admin): RequireWriter,
    Path(id): Path<HeroSlideId>,
) -> Result<StatusCode> {
    HeroSlideRepository::new(state.pool()).delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// New display order, first to last.
#[derive(Debug, Deserialize)]
pub struct Reorder {
    pub ids: Vec<HeroSlideId>,
}

/// PUT /api/hero-slides/order
#[instrument(skip(state, admin, body), fields(admin_id = %admin.id))]
pub async fn reorder(
    State(state): State<AppState>,
    RequireWriter(admin): RequireWriter,
    Json(body): Json<Reorder>,
) -> Result<Json<Vec<HeroSlide>>> {
    let mut seen = std::collections::HashSet::new();
    if !body.ids.iter().all(|id| seen.insert(*id)) {
        return Err(AppError::BadRequest("Slide listed twice".to_string()));
    }
    Ok(Json(HeroSlideRepository::new(state.pool()).reorder(&body.ids).await?))
}

fn validate(input: &HeroSlideInput) -> Result<()> {
    if input.title.trim().is_empty() {
        return Err(AppError::BadRequest("title is required".to_string()));
    }
    if input.image_url.trim().is_empty() {
        return Err(AppError::BadRequest("image_url is required".to_string()));
    }
    if input.position.is_some_and(|p| p < 0) {
        return Err(AppError::BadRequest("position cannot be negative".to_string()));
    }
    Ok(())
}
