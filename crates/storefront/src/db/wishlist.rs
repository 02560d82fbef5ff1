//! Wishlist repository for signed-in users.

use sqlx::PgPool;

use souq_core::UserId;

use super::RepositoryError;
use crate::models::{WishlistEntry, WishlistItem};

/// Repository for saved products.
pub struct WishlistRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> WishlistRepository<'a> {
    /// Create a new wishlist repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// A user's wishlist, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, user_id: UserId) -> Result<Vec<WishlistItem>, RepositoryError> {
        let items = sqlx::query_as::<_, WishlistItem>(
            "SELECT id, user_id, product_id, title, image_url, price, created_at \
             FROM shop.wishlist_items WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;
        Ok(items)
    }

    /// Save a product. Saving it twice keeps one row.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn add(&self, user_id: UserId, entry: &WishlistEntry) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO shop.wishlist_items (user_id, product_id, title, image_url, price)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (user_id, product_id) DO NOTHING
            ",
        )
        .bind(user_id)
        .bind(&entry.product_id)
        .bind(&entry.title)
        .bind(&entry.image_url)
        .bind(entry.price)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// Remove a product. Returns whether a row was removed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn remove(&self, user_id: UserId, product_id: &str) -> Result<bool, RepositoryError> {
        let result =
            sqlx::query("DELETE FROM shop.wishlist_items WHERE user_id = $1 AND product_id = $2")
                .bind(user_id)
                .bind(product_id)
                .execute(self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }
}
