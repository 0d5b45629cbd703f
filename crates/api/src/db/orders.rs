//! Order repository for database operations.

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;
use sqlx::types::Json;

use ecommerce_core::{OrderId, OrderStatus, UserId};

use super::RepositoryError;
use crate::models::{Buyer, CartItem, NewOrder, Order};

macro_rules! order_select {
    ($from:literal) => {
        concat!(
            "SELECT o.id, o.products, o.payment, o.buyer_id, u.name AS buyer_name, ",
            "o.status, o.created_at, o.updated_at FROM ",
            $from,
            " o JOIN market.user u ON u.id = o.buyer_id"
        )
    };
}

const ORDER_SELECT: &str = order_select!("market.order");

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    products: Json<Vec<CartItem>>,
    payment: Json<Value>,
    buyer_id: UserId,
    buyer_name: String,
    status: OrderStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<OrderRow> for Order {
    fn from(row: OrderRow) -> Self {
        Self {
            id: row.id,
            products: row.products.0,
            payment: row.payment.0,
            buyer: Buyer {
                id: row.buyer_id,
                name: row.buyer_name,
            },
            status: row.status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Repository for order database operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Record a paid order with status `not_processed`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(&self, order: &NewOrder) -> Result<Order, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(concat!(
            "WITH o AS (INSERT INTO market.order (products, payment, buyer_id) ",
            "VALUES ($1, $2, $3) RETURNING *) ",
            order_select!("o")
        ))
        .bind(Json(&order.products))
        .bind(Json(&order.payment))
        .bind(order.buyer)
        .fetch_one(self.pool)
        .await?;
        Ok(row.into())
    }

    /// Orders placed by a buyer, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_buyer(&self, buyer: UserId) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "{ORDER_SELECT} WHERE o.buyer_id = $1 ORDER BY o.created_at DESC, o.id DESC"
        ))
        .bind(buyer)
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(Order::from).collect())
    }

    /// All orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(&self) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "{ORDER_SELECT} ORDER BY o.created_at DESC, o.id DESC"
        ))
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(Order::from).collect())
    }

    /// Get an order by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!("{ORDER_SELECT} WHERE o.id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(row.map(Order::from))
    }

    /// Move an order from `expected` to `next` in one statement.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist.
    /// Returns `RepositoryError::Conflict` if its status is no longer `expected`.
    pub async fn compare_and_set_status(
        &self,
        id: OrderId,
        expected: OrderStatus,
        next: OrderStatus,
    ) -> Result<Order, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(concat!(
            "WITH o AS (UPDATE market.order SET status = $3, updated_at = NOW() ",
            "WHERE id = $1 AND status = $2 RETURNING *) ",
            order_select!("o")
        ))
        .bind(id)
        .bind(expected)
        .bind(next)
        .fetch_optional(self.pool)
        .await?;

        if let Some(row) = row {
            return Ok(row.into());
        }
        match self.get(id).await? {
            Some(current) => Err(RepositoryError::Conflict(format!(
                "order {id} is now {}",
                current.status
            ))),
            None => Err(RepositoryError::NotFound),
        }
    }
}
