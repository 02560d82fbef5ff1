//! Site settings: one JSON value per key.

use serde_json::Value as JsonValue;
use sqlx::PgPool;

use super::RepositoryError;
use crate::models::Setting;

/// Repository for `shop.site_settings`.
pub struct SettingsRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> SettingsRepository<'a> {
    /// Create a new settings repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All settings, by key.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Setting>, RepositoryError> {
        let rows = sqlx::query_as::<_, Setting>(
            "SELECT key, value, updated_at FROM shop.site_settings ORDER BY key",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Get a setting value.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the key is not set.
    pub async fn get(&self, key: &str) -> Result<Setting, RepositoryError> {
        sqlx::query_as::<_, Setting>(
            "SELECT key, value, updated_at FROM shop.site_settings WHERE key = $1",
        )
        .bind(key)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// Set a setting value, creating the key if needed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the upsert fails.
    pub async fn put(&self, key: &str, value: &JsonValue) -> Result<Setting, RepositoryError> {
        let row = sqlx::query_as::<_, Setting>(
            r"
            INSERT INTO shop.site_settings (key, value)
            VALUES ($1, $2)
            ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = now()
            RETURNING key, value, updated_at
            ",
        )
        .bind(key)
        .bind(value)
        .fetch_one(self.pool)
        .await?;
        Ok(row)
    }

    /// Remove a setting.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the key is not set.
    pub async fn delete(&self, key: &str) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM shop.site_settings WHERE key = $1")
            .bind(key)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
