//! Administrator role management.
//!
//! Accounts are created through `/api/v1/auth/register`; these commands only
//! change the role of an account that already exists.
//!
//! # Usage
//!
//! ```bash
//! ecommerce-cli admin grant -e admin@example.com
//! ecommerce-cli admin revoke -e admin@example.com
//! ```
//!
//! # Environment Variables
//!
//! - `ECOMMERCE_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)

use ecommerce_api::config::{ConfigError, database_url_from_env};
use ecommerce_api::db::{RepositoryError, UserRepository, create_pool};
use ecommerce_core::{Email, EmailError, Role};
use thiserror::Error;

/// Errors that can occur during admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    /// Database URL is not configured.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    /// Invalid email.
    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// No account has that email.
    #[error("No registered user with email: {0}")]
    UnknownUser(String),

    /// Repository error.
    #[error("Repository error: {0}")]
    Repository(RepositoryError),
}

/// Set the role of the account registered with `email`.
///
/// # Errors
///
/// Returns `AdminError::UnknownUser` if nobody registered with that email.
pub async fn set_role(email: &str, role: Role) -> Result<(), AdminError> {
    let email = Email::parse(email)?;
    let database_url = database_url_from_env()?;

    tracing::info!("Connecting to database...");
    let pool = create_pool(&database_url).await?;

    let user = UserRepository::new(&pool)
        .set_role(&email, role)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => AdminError::UnknownUser(email.to_string()),
            other => AdminError::Repository(other),
        })?;

    tracing::info!(
        "Role updated! ID: {}, Email: {}, Role: {}",
        user.id,
        user.email,
        user.role
    );
    Ok(())
}
