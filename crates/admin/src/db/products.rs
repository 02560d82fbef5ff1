//! Product and product image repository.

use sqlx::PgPool;

use souq_core::{ProductId, ProductImageId};

use super::RepositoryError;
use crate::models::{Product, ProductImage, ProductInput};

const PRODUCT_COLUMNS: &str = "id, slug, title, title_ar, description, price, compare_at_price, \
     category_id, sizes, stock, is_active, created_at, updated_at";

const IMAGE_COLUMNS: &str = "id, product_id, url, is_main, position, created_at";

/// Repository for managed products.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List products, newest first, optionally filtered by title or slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        search: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Product>, RepositoryError> {
        let pattern = search.map(|s| format!("%{}%", s.trim()));
        let rows = sqlx::query_as::<_, Product>(&format!(
            r"
            SELECT {PRODUCT_COLUMNS} FROM shop.products
            WHERE $1::text IS NULL OR title ILIKE $1 OR slug ILIKE $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "
        ))
        .bind(pattern)
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Get a product by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    pub async fn get(&self, id: ProductId) -> Result<Product, RepositoryError> {
        sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM shop.products WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// Create a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug is taken.
    pub async fn create(&self, input: &ProductInput) -> Result<Product, RepositoryError> {
        sqlx::query_as::<_, Product>(&format!(
            r"
            INSERT INTO shop.products (
                slug, title, title_ar, description, price, compare_at_price,
                category_id, sizes, stock, is_active
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(&input.slug)
        .bind(input.title.trim())
        .bind(&input.title_ar)
        .bind(&input.description)
        .bind(input.price)
        .bind(input.compare_at_price)
        .bind(input.category_id)
        .bind(&input.sizes)
        .bind(input.stock)
        .bind(input.is_active)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_insert(e, "slug already exists"))
    }

    /// Replace a product's fields.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist, or
    /// `RepositoryError::Conflict` if the new slug is taken.
    pub async fn update(
        &self,
        id: ProductId,
        input: &ProductInput,
    ) -> Result<Product, RepositoryError> {
        sqlx::query_as::<_, Product>(&format!(
            r"
            UPDATE shop.products
               SET slug = $2, title = $3, title_ar = $4, description = $5, price = $6,
                   compare_at_price = $7, category_id = $8, sizes = $9, stock = $10,
                   is_active = $11
             WHERE id = $1
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(id)
        .bind(&input.slug)
        .bind(input.title.trim())
        .bind(&input.title_ar)
        .bind(&input.description)
        .bind(input.price)
        .bind(input.compare_at_price)
        .bind(input.category_id)
        .bind(&input.sizes)
        .bind(input.stock)
        .bind(input.is_active)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| RepositoryError::from_insert(e, "slug already exists"))?
        .ok_or(RepositoryError::NotFound)
    }

    /// Delete a product. Its image rows go with it.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    pub async fn delete(&self, id: ProductId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM shop.products WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    // =========================================================================
    // Images
    // =========================================================================

    /// A product's images, main first, then by position.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn images(&self, product_id: ProductId) -> Result<Vec<ProductImage>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductImage>(&format!(
            r"
            SELECT {IMAGE_COLUMNS} FROM shop.product_images
            WHERE product_id = $1
            ORDER BY is_main DESC, position, id
            "
        ))
        .bind(product_id)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Record one stored image. A new main image demotes the previous one.
    ///
    /// Each call is its own transaction, so one image failing never undoes
    /// another.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the transaction fails.
    pub async fn add_image(
        &self,
        product_id: ProductId,
        url: &str,
        is_main: bool,
    ) -> Result<ProductImage, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        if is_main {
            sqlx::query(
                "UPDATE shop.product_images SET is_main = false WHERE product_id = $1 AND is_main",
            )
            .bind(product_id)
            .execute(&mut *tx)
            .await?;
        }

        let image = sqlx::query_as::<_, ProductImage>(&format!(
            r"
            INSERT INTO shop.product_images (product_id, url, is_main, position)
            VALUES (
                $1, $2, $3,
                (SELECT COALESCE(MAX(position) + 1, 0) FROM shop.product_images WHERE product_id = $1)
            )
            RETURNING {IMAGE_COLUMNS}
            "
        ))
        .bind(product_id)
        .bind(url)
        .bind(is_main)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(image)
    }

    /// Delete one image row and return it, so the caller can remove the file.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the image does not belong to
    /// the product.
    pub async fn delete_image(
        &self,
        product_id: ProductId,
        id: ProductImageId,
    ) -> Result<ProductImage, RepositoryError> {
        sqlx::query_as::<_, ProductImage>(&format!(
            "DELETE FROM shop.product_images WHERE id = $1 AND product_id = $2 RETURNING {IMAGE_COLUMNS}"
        ))
        .bind(id)
        .bind(product_id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }
}
