//! Order ledger service.

use thiserror::Error;
use tracing::instrument;

use ecommerce_core::{OrderId, OrderStatus, UserId};

use crate::db::{OrderStore, RepositoryError, Store};
use crate::models::Order;

/// Errors from order operations.
#[derive(Debug, Error)]
pub enum OrderError {
    /// No order with that ID.
    #[error("Order not found")]
    NotFound,

    /// The transition table forbids the change.
    #[error("Cannot change order status from {from} to {to}")]
    IllegalTransition {
        from: OrderStatus,
        to: OrderStatus,
    },

    /// Another request changed the status first.
    #[error("Order status was changed by another request, please retry")]
    Concurrent,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Order ledger service.
pub struct OrderService<'a> {
    store: &'a dyn Store,
}

impl<'a> OrderService<'a> {
    /// Create a new order service.
    #[must_use]
    pub const fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    /// Orders placed by `buyer`, newest first.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Repository` if the store fails.
    #[instrument(skip(self))]
    pub async fn list_for_buyer(&self, buyer: UserId) -> Result<Vec<Order>, OrderError> {
        Ok(self.store.orders_for_buyer(buyer).await?)
    }

    /// Every order, newest first.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Repository` if the store fails.
    #[instrument(skip(self))]
    pub async fn list_all(&self) -> Result<Vec<Order>, OrderError> {
        Ok(self.store.all_orders().await?)
    }

    /// Move an order to `next` if the transition table allows it.
    ///
    /// Setting the current status again returns the order unchanged.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotFound` for an unknown order,
    /// `OrderError::IllegalTransition` for a forbidden change, and
    /// `OrderError::Concurrent` if the status moved underneath us.
    #[instrument(skip(self))]
    pub async fn set_status(&self, id: OrderId, next: OrderStatus) -> Result<Order, OrderError> {
        let order = self
            .store
            .order_by_id(id)
            .await?
            .ok_or(OrderError::NotFound)?;

        if order.status == next {
            return Ok(order);
        }
        if !order.status.can_transition_to(next) {
            return Err(OrderError::IllegalTransition {
                from: order.status,
                to: next,
            });
        }

        let updated = self
            .store
            .compare_and_set_status(id, order.status, next)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => OrderError::NotFound,
                RepositoryError::Conflict(_) => OrderError::Concurrent,
                other => OrderError::Repository(other),
            })?;

        tracing::info!(order_id = %id, from = %order.status, to = %next, "Order status changed");
        Ok(updated)
    }
}
