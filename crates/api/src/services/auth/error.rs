//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::token::TokenError;

/// Errors that can occur during authentication operations.
///
/// The display text of client-facing variants is the message sent back in
/// the response body.
#[derive(Debug, Error)]
pub enum AuthError {
    /// A required field is missing or blank.
    #[error("{0}")]
    MissingField(&'static str),

    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] ecommerce_core::EmailError),

    /// Password too short.
    #[error("{0}")]
    WeakPassword(&'static str),

    /// Email is already registered.
    #[error("Already registered, please login")]
    UserAlreadyExists,

    /// Email is taken by another account.
    #[error("Email is already in use")]
    EmailInUse,

    /// Login email has no account.
    #[error("Email is not registered")]
    EmailNotRegistered,

    /// Login password does not match.
    #[error("Invalid password")]
    InvalidPassword,

    /// Reset email or security answer does not match.
    #[error("Email or Answer is wrong!")]
    WrongAnswer,

    /// User not found.
    #[error("user not found")]
    UserNotFound,

    /// Token could not be issued.
    #[error("token error: {0}")]
    Token(#[from] TokenError),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}
