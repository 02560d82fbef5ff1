//! Product management route handlers.

use axum::{
    Json,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
};
use serde::Serialize;
use tracing::instrument;

use souq_core::{ProductId, ProductImageId};

use super::{ListQuery, PAGE_SIZE};
use crate::db::ProductRepository;
use crate::error::{AppError, Result};
use crate::middleware::{RequireAdmin, RequireWriter};
use crate::models::{ImageUpload, Product, ProductImage, ProductInput, ProductWithImages};
use crate::services::ImageStore;
use crate::state::AppState;

/// GET /api/products
pub async fn index(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Product>>> {
    let products = ProductRepository::new(state.pool())
        .list(query.search(), PAGE_SIZE, query.offset())
        .await?;
    Ok(Json(products))
}

/// GET /api/products/{id}
pub async fn show(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<ProductId>,
) -> Result<Json<ProductWithImages>> {
    let repo = ProductRepository::new(state.pool());
    let product = repo.get(id).await?;
    let images = repo.images(id).await?;
    Ok(Json(ProductWithImages { product, images }))
}

/// POST /api/products
#[instrument(skip(state, admin, input), fields(admin_id = %admin.id, slug = %input.slug))]
pub async fn create(
    State(state): State<AppState>,
    RequireWriter(admin): RequireWriter,
    Json(input): Json<ProductInput>,
) -> Result<(StatusCode, Json<Product>)> {
    validate(&input)?;
    let product = ProductRepository::new(state.pool()).create(&input).await?;
    tracing::info!(product_id = %product.id, "Product created");
    Ok((StatusCode::CREATED, Json(product)))
}

/// PUT /api/products/{id}
#[instrument(skip(state, admin, input), fields(admin_id = %admin.id))]
pub async fn update(
    State(state): State<AppState>,
    RequireWriter(admin): RequireWriter,
    Path(id): Path<ProductId>,
    Json(input): Json<ProductInput>,
) -> Result<Json<Product>> {
    validate(&input)?;
    let product = ProductRepository::new(state.pool()).update(id, &input).await?;
    Ok(Json(product))
}

/// DELETE /api/products/{id}
///
/// Image files are removed after the rows are gone.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn delete(
    State(state): State<AppState>,
    RequireWriter(admin): RequireWriter,
    Path(id): Path<ProductId>,
) -> Result<StatusCode> {
    let repo = ProductRepository::new(state.pool());
    let images = repo.images(id).await?;
    repo.delete(id).await?;

    for image in images {
        if let Err(e) = state.images().remove(&image.url).await {
            tracing::warn!(error = %e, url = %image.url, "Could not remove image file");
        }
    }

    tracing::info!(product_id = %id, "Product deleted");
    Ok(StatusCode::NO_CONTENT)
}

fn validate(input: &ProductInput) -> Result<()> {
    let problems = input.problems();
    if problems.is_empty() {
        Ok(())
    } else {
        Err(AppError::BadRequest(problems.join("; ")))
    }
}

// =============================================================================
// Images
// =============================================================================

/// Per-image results of an upload request.
#[derive(Debug, Serialize)]
pub struct UploadReport {
    pub product_id: ProductId,
    pub stored: usize,
    pub failed: usize,
    pub uploads: Vec<ImageUpload>,
}

impl UploadReport {
    fn new(product_id: ProductId, uploads: Vec<ImageUpload>) -> Self {
        let stored = uploads.iter().filter(|u| u.succeeded()).count();
        Self {
            product_id,
            stored,
            failed: uploads.len() - stored,
            uploads,
        }
    }
}

/// Whether a multipart field carries the main image, a secondary one, or
/// something we do not accept.
fn is_main_field(name: &str) -> Option<bool> {
    match name {
        "main" => Some(true),
        "additional" | "additional[]" => Some(false),
        _ => None,
    }
}

/// POST /api/products/{id}/images
///
/// Multipart with one optional `main` part and any number of `additional`
/// parts. Every part is stored on its own: a failure is reported for that
/// part and never undoes parts already stored.
#[instrument(skip(state, admin, multipart), fields(admin_id = %admin.id))]
pub async fn upload_images(
    State(state): State<AppState>,
    RequireWriter(admin): RequireWriter,
    Path(id): Path<ProductId>,
    mut multipart: Multipart,
) -> Result<Json<UploadReport>> {
    let repo = ProductRepository::new(state.pool());
    repo.get(id).await?;

    let mut uploads = Vec::new();
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                // The stream is unreadable past this point; keep what we have.
                tracing::warn!(error = %e, "Multipart stream failed");
                uploads.push(ImageUpload {
                    field: "request".to_string(),
                    file_name: None,
                    image: None,
                    error: Some(e.body_text()),
                });
                break;
            }
        };

        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(String::from);
        let content_type = field.content_type().map(String::from);

        let Some(is_main) = is_main_field(&name) else {
            uploads.push(ImageUpload {
                field: name,
                file_name,
                image: None,
                error: Some("unexpected field".to_string()),
            });
            continue;
        };

        let outcome = match field.bytes().await {
            Ok(bytes) => {
                store_image(&repo, state.images(), id, is_main, content_type.as_deref(), &bytes)
                    .await
            }
            Err(e) => Err(e.body_text()),
        };

        match outcome {
            Ok(image) => uploads.push(ImageUpload {
                field: name,
                file_name,
                image: Some(image),
                error: None,
            }),
            Err(error) => {
                tracing::warn!(field = %name, error = %error, "Image upload failed");
                uploads.push(ImageUpload {
                    field: name,
                    file_name,
                    image: None,
                    error: Some(error),
                });
            }
        }
    }

    if uploads.is_empty() {
        return Err(AppError::BadRequest(
            "Expected a `main` or `additional` image".to_string(),
        ));
    }

    let report = UploadReport::new(id, uploads);
    tracing::info!(stored = report.stored, failed = report.failed, "Images uploaded");
    Ok(Json(report))
}

/// Write one file, then record it. A file whose row cannot be written is
/// removed again.
async fn store_image(
    repo: &ProductRepository<'_>,
    images: &ImageStore,
    product_id: ProductId,
    is_main: bool,
    content_type: Option<&str>,
    bytes: &[u8],
) -> std::result::Result<ProductImage, String> {
    let url = images
        .save(product_id, content_type, bytes)
        .await
        .map_err(|e| e.to_string())?;

    match repo.add_image(product_id, &url, is_main).await {
        Ok(image) => Ok(image),
        Err(e) => {
            tracing::error!(error = %e, "Could not record product image");
            if let Err(e) = images.remove(&url).await {
                tracing::warn!(error = %e, url = %url, "Could not remove orphaned image file");
            }
            Err("could not save image".to_string())
        }
    }
}

/// DELETE /api/products/{id}/images/{image_id}
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn delete_image(
    State(state): State<AppState>,
    RequireWriter(admin): RequireWriter,
    Path((id, image_id)): Path<(ProductId, ProductImageId)>,
) -> Result<StatusCode> {
    let image = ProductRepository::new(state.pool())
        .delete_image(id, image_id)
        .await?;

    if let Err(e) = state.images().remove(&image.url).await {
        tracing::warn!(error = %e, url = %image.url, "Could not remove image file");
    }

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_fields() {
        assert_eq!(is_main_field("main"), Some(true));
        assert_eq!(is_main_field("additional"), Some(false));
        assert_eq!(is_main_field("additional[]"), Some(false));
        assert_eq!(is_main_field("avatar"), None);
    }

    #[test]
    fn test_report_counts() {
        let failed = ImageUpload {
            field: "additional".to_string(),
            file_name: Some("b.pdf".to_string()),
            image: None,
            error: Some("unsupported image type: application/pdf".to_string()),
        };
        let report = UploadReport::new(ProductId::new(3), vec![failed.clone(), failed]);
        assert_eq!(report.stored, 0);
        assert_eq!(report.failed, 2);
    }
}
