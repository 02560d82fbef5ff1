//! Admin user management commands.
//!
//! # Usage
//!
//! ```bash
//! SOUQ_ADMIN_PASSWORD='...' souq-cli admin create -e admin@example.com -n "Admin Name" -r super_admin
//! ```
//!
//! # Environment Variables
//!
//! - `ADMIN_DATABASE_URL` or `DATABASE_URL` - `PostgreSQL` connection string
//! - `SOUQ_ADMIN_PASSWORD` - Password for the new account (never a flag, so
//!   it stays out of shell history)

use secrecy::{ExposeSecret, SecretString};
use sqlx::PgPool;

use souq_admin::db::{AdminUserRepository, RepositoryError};
use souq_admin::services::hash_password;
use souq_core::{AdminRole, AdminUserId, Email};

use super::{CommandError, database_url};

/// Environment variable holding the new admin's password.
pub const PASSWORD_VAR: &str = "SOUQ_ADMIN_PASSWORD";

/// Validated input for a new admin account.
#[derive(Debug)]
pub struct NewAdmin {
    pub email: Email,
    pub name: String,
    pub role: AdminRole,
    pub password: SecretString,
}

impl NewAdmin {
    /// Validate command arguments and the password variable.
    ///
    /// # Errors
    ///
    /// Returns `CommandError::Invalid` for a bad email, name or role, or
    /// `CommandError::MissingEnvVar` if no password is set.
    pub fn parse(
        email: &str,
        name: &str,
        role: &str,
        lookup: &dyn Fn(&str) -> Option<String>,
    ) -> Result<Self, CommandError> {
        let email =
            Email::parse(email).map_err(|e| CommandError::Invalid(format!("Invalid email: {e}")))?;
        let name = name.trim();
        if name.is_empty() {
            return Err(CommandError::Invalid("Name must not be empty".to_string()));
        }
        let role: AdminRole = role.parse().map_err(|_| {
            CommandError::Invalid(format!(
                "Invalid role: {role}. Valid roles: super_admin, admin, viewer"
            ))
        })?;
        let password = lookup(PASSWORD_VAR)
            .filter(|p| !p.is_empty())
            .map(SecretString::from)
            .ok_or(CommandError::MissingEnvVar(PASSWORD_VAR))?;

        Ok(Self {
            email,
            name: name.to_string(),
            role,
            password,
        })
    }
}

/// Create a new admin user.
///
/// # Returns
///
/// The ID of the created admin user.
///
/// # Errors
///
/// Returns `CommandError` if validation fails, the email is taken, or the
/// database is unreachable.
pub async fn create_user(email: &str, name: &str, role: &str) -> Result<AdminUserId, CommandError> {
    let lookup = |key: &str| std::env::var(key).ok();
    let input = NewAdmin::parse(email, name, role, &lookup)?;
    let hash = hash_password(input.password.expose_secret())
        .map_err(|e| CommandError::Invalid(e.to_string()))?;

    let database_url = database_url(&lookup)?;
    tracing::info!("Connecting to database...");
    let pool = PgPool::connect(database_url.expose_secret()).await?;

    tracing::info!("Creating admin user: {} ({})", input.email, input.role);
    let user = AdminUserRepository::new(&pool)
        .create(&input.email, &input.name, input.role, &hash)
        .await
        .map_err(|e| match e {
            RepositoryError::Conflict(_) => CommandError::Admin(format!(
                "Admin user already exists with email: {}",
                input.email
            )),
            other => CommandError::Admin(other.to_string()),
        })?;

    tracing::info!(
        "Admin user created successfully! ID: {}, Email: {}, Role: {}",
        user.id,
        user.email,
        user.role
    );

    Ok(user.id)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn with_password(key: &str) -> Option<String> {
        (key == PASSWORD_VAR).then(|| "correct horse battery".to_string())
    }

    #[test]
    fn test_parse_valid() {
        let input = NewAdmin::parse("ops@souq.test", " Mona ", "viewer", &with_password).unwrap();
        assert_eq!(input.name, "Mona");
        assert_eq!(input.role, AdminRole::Viewer);
    }

    #[test]
    fn test_parse_rejects_bad_role() {
        let err = NewAdmin::parse("ops@souq.test", "Mona", "owner", &with_password).unwrap_err();
        assert!(err.to_string().contains("Invalid role: owner"));
    }

    #[test]
    fn test_parse_requires_password() {
        assert!(matches!(
            NewAdmin::parse("ops@souq.test", "Mona", "admin", &|_| None),
            Err(CommandError::MissingEnvVar(PASSWORD_VAR))
        ));
    }

    #[test]
    fn test_parse_rejects_bad_email() {
        assert!(matches!(
            NewAdmin::parse("not-an-email", "Mona", "admin", &with_password),
            Err(CommandError::Invalid(_))
        ));
    }
}
