//! Profile repository: customers and their passwords.

use sqlx::PgPool;

use souq_core::{Email, UserId};

use super::RepositoryError;
use crate::models::Profile;

const PROFILE_COLUMNS: &str =
    "id, email, full_name, phone, loyalty_points, created_at, updated_at";

/// Repository for customer profiles.
pub struct ProfileRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProfileRepository<'a> {
    /// Create a new profile repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a profile by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<Profile>, RepositoryError> {
        let profile = sqlx::query_as::<_, Profile>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM shop.profiles WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(profile)
    }

    /// Get a profile by (normalized) email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_email(&self, email: &Email) -> Result<Option<Profile>, RepositoryError> {
        let profile = sqlx::query_as::<_, Profile>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM shop.profiles WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(self.pool)
        .await?;
        Ok(profile)
    }

    /// Create a profile together with its password hash.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email already exists.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create_with_password(
        &self,
        email: &Email,
        full_name: Option<&str>,
        password_hash: &str,
    ) -> Result<Profile, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let profile = sqlx::query_as::<_, Profile>(&format!(
            "INSERT INTO shop.profiles (email, full_name) VALUES ($1, $2) RETURNING {PROFILE_COLUMNS}"
        ))
        .bind(email)
        .bind(full_name)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| RepositoryError::from_insert(e, "email already exists"))?;

        sqlx::query("INSERT INTO shop.user_passwords (user_id, password_hash) VALUES ($1, $2)")
            .bind(profile.id)
            .bind(password_hash)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(profile)
    }

    /// Get a profile and its password hash by email.
    ///
    /// Returns `None` if the profile doesn't exist or has no password set.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_with_password(
        &self,
        email: &Email,
    ) -> Result<Option<(Profile, String)>, RepositoryError> {
        let Some(profile) = self.get_by_email(email).await? else {
            return Ok(None);
        };

        let hash: Option<String> =
            sqlx::query_scalar("SELECT password_hash FROM shop.user_passwords WHERE user_id = $1")
                .bind(profile.id)
                .fetch_optional(self.pool)
                .await?;

        Ok(hash.map(|h| (profile, h)))
    }

    /// Update name and phone.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the profile does not exist.
    pub async fn update_details(
        &self,
        id: UserId,
        full_name: Option<&str>,
        phone: Option<&str>,
    ) -> Result<Profile, RepositoryError> {
        sqlx::query_as::<_, Profile>(&format!(
            "UPDATE shop.profiles SET full_name = $2, phone = $3 WHERE id = $1 RETURNING {PROFILE_COLUMNS}"
        ))
        .bind(id)
        .bind(full_name)
        .bind(phone)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }
}
