//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::ApiConfig;
use crate::db::{PgStore, Store};
use crate::gateway::{BraintreeClient, GatewayError, PaymentGateway};
use crate::services::TokenCodec;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc`. The store and the payment
/// gateway are trait objects so tests can inject in-memory versions.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    store: Arc<dyn Store>,
    gateway: Arc<dyn PaymentGateway>,
    tokens: TokenCodec,
}

impl AppState {
    /// Create application state from its parts.
    #[must_use]
    pub fn new(
        store: Arc<dyn Store>,
        gateway: Arc<dyn PaymentGateway>,
        tokens: TokenCodec,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                store,
                gateway,
                tokens,
            }),
        }
    }

    /// Production state: `PostgreSQL` store and the Braintree client.
    ///
    /// # Errors
    ///
    /// Returns an error if the gateway HTTP client cannot be built.
    pub fn postgres(config: &ApiConfig, pool: PgPool) -> Result<Self, GatewayError> {
        let gateway = BraintreeClient::new(&config.braintree)?;
        Ok(Self::new(
            Arc::new(PgStore::new(pool)),
            Arc::new(gateway),
            TokenCodec::new(&config.jwt_secret),
        ))
    }

    /// Get a reference to the store.
    #[must_use]
    pub fn store(&self) -> &dyn Store {
        self.inner.store.as_ref()
    }

    /// Get a reference to the payment gateway.
    #[must_use]
    pub fn gateway(&self) -> &dyn PaymentGateway {
        self.inner.gateway.as_ref()
    }

    /// Get a reference to the token codec.
    #[must_use]
    pub fn tokens(&self) -> &TokenCodec {
        &self.inner.tokens
    }
}
