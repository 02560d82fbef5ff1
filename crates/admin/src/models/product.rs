//! Back-office managed products and their images.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use souq_core::{CategoryId, ProductId, ProductImageId};

/// A product row.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Product {
    pub id: ProductId,
    pub slug: String,
    pub title: String,
    pub title_ar: Option<String>,
    pub description: String,
    pub price: Decimal,
    pub compare_at_price: Option<Decimal>,
    pub category_id: Option<CategoryId>,
    pub sizes: Vec<String>,
    pub stock: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A stored product image.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ProductImage {
    pub id: ProductImageId,
    pub product_id: ProductId,
    pub url: String,
    pub is_main: bool,
    pub position: i32,
    pub created_at: DateTime<Utc>,
}

/// A product with its images, main first.
#[derive(Debug, Clone, Serialize)]
pub struct ProductWithImages {
    #[serde(flatten)]
    pub product: Product,
    pub images: Vec<ProductImage>,
}

/// Create/update payload for a product.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductInput {
    pub slug: String,
    pub title: String,
    #[serde(default)]
    pub title_ar: Option<String>,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    #[serde(default)]
    pub compare_at_price: Option<Decimal>,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    #[serde(default)]
    pub sizes: Vec<String>,
    #[serde(default)]
    pub stock: i32,
    #[serde(default = "active")]
    pub is_active: bool,
}

const fn active() -> bool {
    true
}

impl ProductInput {
    /// Problems that make the input unusable, empty when valid.
    #[must_use]
    pub fn problems(&self) -> Vec<&'static str> {
        let mut problems = Vec::new();
        if self.title.trim().is_empty() {
            problems.push("title is required");
        }
        if !is_valid_slug(&self.slug) {
            problems.push("slug must be lowercase letters, digits and dashes");
        }
        if self.price.is_sign_negative() {
            problems.push("price cannot be negative");
        }
        if self.compare_at_price.is_some_and(|p| p.is_sign_negative()) {
            problems.push("compare-at price cannot be negative");
        }
        if self.stock < 0 {
            problems.push("stock cannot be negative");
        }
        problems
    }
}

fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && !slug.starts_with('-')
        && !slug.ends_with('-')
        && slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

/// Outcome of storing one uploaded image.
#[derive(Debug, Clone, Serialize)]
pub struct ImageUpload {
    /// Multipart field the file came from (`main` or `additional`).
    pub field: String,
    pub file_name: Option<String>,
    pub image: Option<ProductImage>,
    pub error: Option<String>,
}

impl ImageUpload {
    /// Whether this image was stored.
    #[must_use]
    pub const fn succeeded(&self) -> bool {
        self.image.is_some()
    }
}
