//! CLI command implementations.

pub mod admin;
pub mod migrate;

use secrecy::SecretString;
use thiserror::Error;

/// Errors shared by all commands.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration failed.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Invalid command input.
    #[error("{0}")]
    Invalid(String),

    /// Admin repository or auth error.
    #[error("{0}")]
    Admin(String),
}

/// The database URL, preferring `ADMIN_DATABASE_URL` over `DATABASE_URL`.
///
/// The CLI runs with owner privileges, like the back-office.
pub(crate) fn database_url(
    lookup: &dyn Fn(&str) -> Option<String>,
) -> Result<SecretString, CommandError> {
    lookup("ADMIN_DATABASE_URL")
        .or_else(|| lookup("DATABASE_URL"))
        .filter(|v| !v.trim().is_empty())
        .map(SecretString::from)
        .ok_or(CommandError::MissingEnvVar("DATABASE_URL"))
}
