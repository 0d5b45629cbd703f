//! Payment gateway integration.
//!
//! [`PaymentGateway`] is the seam between the payment service and the card
//! processor. [`BraintreeClient`] talks to the Braintree GraphQL API; tests
//! substitute a scripted implementation.

mod braintree;
mod error;

pub use braintree::BraintreeClient;
pub use error::GatewayError;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Serialize;

/// A settled gateway transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transaction {
    /// Gateway transaction ID.
    pub id: String,
    /// Gateway status label (e.g. `SUBMITTED_FOR_SETTLEMENT`).
    pub status: String,
    /// Amount charged.
    pub amount: Decimal,
}

/// A card processor able to tokenize clients and capture payments.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Obtain a token the client-side payment form uses to tokenize a card.
    async fn client_token(&self) -> Result<String, GatewayError>;

    /// Charge `amount` to the payment method behind `nonce`, submitting it
    /// for settlement immediately.
    ///
    /// A refused charge is reported as [`GatewayError::Declined`].
    async fn charge(&self, amount: Decimal, nonce: &str) -> Result<Transaction, GatewayError>;
}
