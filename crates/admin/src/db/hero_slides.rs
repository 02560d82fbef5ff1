//! Hero slide repository.

use sqlx::PgPool;

use souq_core::HeroSlideId;

use super::RepositoryError;
use crate::models::{HeroSlide, HeroSlideInput};

const SLIDE_COLUMNS: &str =
    "id, title, subtitle, image_url, link_url, position, is_active, created_at, updated_at";

/// Repository for homepage hero slides.
pub struct HeroSlideRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> HeroSlideRepository<'a> {
    /// Create a new hero slide repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All slides in display order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<HeroSlide>, RepositoryError> {
        let rows = sqlx::query_as::<_, HeroSlide>(&format!(
            "SELECT {SLIDE_COLUMNS} FROM shop.hero_slides ORDER BY position, id"
        ))
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Create a slide. Without a position it goes last.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(&self, input: &HeroSlideInput) -> Result<HeroSlide, RepositoryError> {
        let slide = sqlx::query_as::<_, HeroSlide>(&format!(
            r"
            INSERT INTO shop.hero_slides (title, subtitle, image_url, link_url, position, is_active)
            VALUES (
                $1, $2, $3, $4,
                COALESCE($5, (SELECT COALESCE(MAX(position) + 1, 0) FROM shop.hero_slides)),
                $6
            )
            RETURNING {SLIDE_COLUMNS}
            "
        ))
        .bind(&input.title)
        .bind(&input.subtitle)
        .bind(&input.image_url)
        .bind(&input.link_url)
        .bind(input.position)
        .bind(input.is_active)
        .fetch_one(self.pool)
        .await?;
        Ok(slide)
    }

    /// Replace a slide's fields. Without a position it keeps its place.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the slide does not exist.
    pub async fn update(
        &self,
        id: HeroSlideId,
        input: &HeroSlideInput,
    ) -> Result<HeroSlide, RepositoryError> {
        sqlx::query_as::<_, HeroSlide>(&format!(
            r"
            UPDATE shop.hero_slides
               SET title = $2, subtitle = $3, image_url = $4, link_url = $5,
                   position = COALESCE($6, position), is_active = $7
             WHERE id = $1
            RETURNING {SLIDE_COLUMNS}
            "
        ))
        .bind(id)
        .bind(&input.title)
        .bind(&input.subtitle)
        .bind(&input.image_url)
        .bind(&input.link_url)
        .bind(input.position)
        .bind(input.is_active)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// Rewrite positions to follow the given order. Slides not listed keep
    /// their position.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the transaction fails.
    pub async fn reorder(&self, ids: &[HeroSlideId]) -> Result<Vec<HeroSlide>, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        for (position, id) in (0_i32..).zip(ids) {
            sqlx::query("UPDATE shop.hero_slides SET position = $2 WHERE id = $1")
                .bind(id)
                .bind(position)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        self.list().await
    }

    /// Delete a slide.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the slide does not exist.
    pub async fn delete(&self, id: HeroSlideId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM shop.hero_slides WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
