//! Persistence for the storefront API.
//!
//! # Database
//!
//! All tables live in the `market` schema:
//!
//! - `market.user` - Accounts, hashed secrets, role
//! - `market.category` - Product categories (unique name)
//! - `market.product` - Catalog entries with optional photo bytes
//! - `market.order` - Purchases: cart snapshot, payment result, status
//!
//! Handlers and services depend on the [`Store`] trait, not on a concrete
//! backend. [`PgStore`] is used in production; [`MemoryStore`] mirrors the
//! same constraints in process for tests.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/api/migrations/` and run via:
//! ```bash
//! cargo run -p ecommerce-cli -- migrate
//! ```

mod catalog;
mod memory;
mod orders;
mod postgres;
mod users;

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use ecommerce_core::{CategoryId, Email, OrderId, OrderStatus, ProductId, Role, UserId};

use crate::models::{
    Category, NewOrder, NewUser, Order, Photo, Product, ProductDraft, ProductFilter,
    ProfileChanges, User,
};

pub use catalog::{CategoryRepository, ProductRepository};
pub use memory::MemoryStore;
pub use orders::OrderRepository;
pub use postgres::PgStore;
pub use users::UserRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email, row still referenced).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// A referenced row does not exist (e.g., unknown category).
    #[error("missing reference: {0}")]
    MissingReference(String),
}

/// Account persistence.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a new user.
    ///
    /// Fails with `Conflict` when the email is taken.
    async fn insert_user(&self, user: NewUser) -> Result<User, RepositoryError>;

    async fn user_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError>;

    async fn user_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError>;

    /// Overwrite the password hash.
    async fn set_password_hash(&self, id: UserId, hash: &str) -> Result<(), RepositoryError>;

    /// Apply a partial update and return the stored result.
    ///
    /// Fails with `Conflict` when the new email belongs to someone else.
    async fn update_profile(
        &self,
        id: UserId,
        changes: ProfileChanges,
    ) -> Result<User, RepositoryError>;

    /// Change the role of the account with `email`.
    async fn set_role(&self, email: &Email, role: Role) -> Result<User, RepositoryError>;
}

/// Category persistence.
#[async_trait]
pub trait CategoryStore: Send + Sync {
    /// Fails with `Conflict` when the name is taken.
    async fn insert_category(&self, name: &str, slug: &str) -> Result<Category, RepositoryError>;

    async fn update_category(
        &self,
        id: CategoryId,
        name: &str,
        slug: &str,
    ) -> Result<Category, RepositoryError>;

    /// All categories, ordered by name.
    async fn list_categories(&self) -> Result<Vec<Category>, RepositoryError>;

    async fn category_by_slug(&self, slug: &str) -> Result<Option<Category>, RepositoryError>;

    async fn category_by_name(&self, name: &str) -> Result<Option<Category>, RepositoryError>;

    /// Fails with `Conflict` while products still reference the category.
    async fn delete_category(&self, id: CategoryId) -> Result<(), RepositoryError>;
}

/// Product persistence.
#[async_trait]
pub trait ProductStore: Send + Sync {
    /// Fails with `MissingReference` when the category does not exist.
    async fn insert_product(&self, draft: ProductDraft) -> Result<Product, RepositoryError>;

    /// Replace a product's fields; a draft without a photo keeps the stored one.
    async fn update_product(
        &self,
        id: ProductId,
        draft: ProductDraft,
    ) -> Result<Product, RepositoryError>;

    async fn delete_product(&self, id: ProductId) -> Result<(), RepositoryError>;

    /// Newest products first.
    async fn latest_products(&self, limit: i64) -> Result<Vec<Product>, RepositoryError>;

    async fn product_by_slug(&self, slug: &str) -> Result<Option<Product>, RepositoryError>;

    /// `None` when the product is unknown or has no photo.
    async fn product_photo(&self, id: ProductId) -> Result<Option<Photo>, RepositoryError>;

    async fn filter_products(
        &self,
        filter: &ProductFilter,
    ) -> Result<Vec<Product>, RepositoryError>;

    async fn count_products(&self) -> Result<i64, RepositoryError>;

    /// Products ordered by id, skipping `offset`.
    async fn product_page(&self, offset: i64, limit: i64)
    -> Result<Vec<Product>, RepositoryError>;

    /// Case-insensitive literal substring match on name or description.
    async fn search_products(&self, keyword: &str) -> Result<Vec<Product>, RepositoryError>;

    /// Other products in `category`, excluding `product`.
    async fn related_products(
        &self,
        product: ProductId,
        category: CategoryId,
        limit: i64,
    ) -> Result<Vec<Product>, RepositoryError>;

    async fn products_in_category(
        &self,
        category: CategoryId,
    ) -> Result<Vec<Product>, RepositoryError>;
}

/// Order persistence.
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn insert_order(&self, order: NewOrder) -> Result<Order, RepositoryError>;

    /// Orders placed by `buyer`, newest first.
    async fn orders_for_buyer(&self, buyer: UserId) -> Result<Vec<Order>, RepositoryError>;

    /// Every order, newest first.
    async fn all_orders(&self) -> Result<Vec<Order>, RepositoryError>;

    async fn order_by_id(&self, id: OrderId) -> Result<Option<Order>, RepositoryError>;

    /// Set the status only if it still equals `expected`.
    ///
    /// Fails with `NotFound` for an unknown order and `Conflict` when the
    /// status changed since it was read.
    async fn compare_and_set_status(
        &self,
        id: OrderId,
        expected: OrderStatus,
        next: OrderStatus,
    ) -> Result<Order, RepositoryError>;
}

/// Everything the API persists.
#[async_trait]
pub trait Store: UserStore + CategoryStore + ProductStore + OrderStore {
    /// Check that the backend is reachable.
    async fn ping(&self) -> Result<(), RepositoryError>;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Map an insert/update error, turning unique violations into `Conflict`.
pub(crate) fn map_unique_violation(e: sqlx::Error, what: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(format!("{what} already exists"));
    }
    RepositoryError::Database(e)
}
