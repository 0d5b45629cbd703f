//! Payment gateway error types.

use thiserror::Error;

/// Errors from the payment gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The gateway refused the charge (card declined, invalid nonce, ...).
    #[error("{0}")]
    Declined(String),

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The gateway answered with a non-success status.
    #[error("gateway returned HTTP {status}")]
    Status {
        /// HTTP status code.
        status: u16,
    },

    /// GraphQL query returned errors.
    #[error("GraphQL errors: {0}")]
    GraphQL(String),

    /// Response did not have the expected shape.
    #[error("unexpected gateway response: {0}")]
    InvalidResponse(String),
}

impl GatewayError {
    /// Whether the charge was refused, as opposed to the gateway failing.
    #[must_use]
    pub const fn is_decline(&self) -> bool {
        matches!(self, Self::Declined(_))
    }
}
