//! Notification repository.

use sqlx::PgPool;

use souq_core::{NotificationId, UserId};

use super::RepositoryError;
use crate::models::{NewNotification, Notification};

const NOTIFICATION_COLUMNS: &str = "id, user_id, kind, title, message, is_read, data, created_at";

/// Repository for in-app notifications.
pub struct NotificationRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> NotificationRepository<'a> {
    /// Create a new notification repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert a notification.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(&self, new: &NewNotification) -> Result<Notification, RepositoryError> {
        let notification = sqlx::query_as::<_, Notification>(&format!(
            r"
            INSERT INTO shop.notifications (user_id, kind, title, message, data)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {NOTIFICATION_COLUMNS}
            "
        ))
        .bind(new.user_id)
        .bind(new.kind)
        .bind(&new.title)
        .bind(&new.message)
        .bind(&new.data)
        .fetch_one(self.pool)
        .await?;
        Ok(notification)
    }

    /// A user's notifications, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, user_id: UserId, limit: i64) -> Result<Vec<Notification>, RepositoryError> {
        let rows = sqlx::query_as::<_, Notification>(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM shop.notifications \
             WHERE user_id = $1 ORDER BY created_at DESC, id DESC LIMIT $2"
        ))
        .bind(user_id)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Number of unread notifications.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn unread_count(&self, user_id: UserId) -> Result<i64, RepositoryError> {
        let count = sqlx::query_scalar(
            "SELECT COUNT(*) FROM shop.notifications WHERE user_id = $1 AND NOT is_read",
        )
        .bind(user_id)
        .fetch_one(self.pool)
        .await?;
        Ok(count)
    }

    /// Set the read flag on one of the user's notifications.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the notification does not
    /// exist or belongs to someone else.
    pub async fn set_read(
        &self,
        user_id: UserId,
        id: NotificationId,
        is_read: bool,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE shop.notifications SET is_read = $3 WHERE id = $1 AND user_id = $2",
        )
        .bind(id)
        .bind(user_id)
        .bind(is_read)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Mark every notification read. Returns how many changed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn mark_all_read(&self, user_id: UserId) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            "UPDATE shop.notifications SET is_read = true WHERE user_id = $1 AND NOT is_read",
        )
        .bind(user_id)
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}
