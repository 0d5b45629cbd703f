//! `PostgreSQL`-backed [`Store`].

use async_trait::async_trait;
use sqlx::PgPool;

use ecommerce_core::{CategoryId, Email, OrderId, OrderStatus, ProductId, Role, UserId};

use super::{
    CategoryRepository, CategoryStore, OrderRepository, OrderStore, ProductRepository,
    ProductStore, RepositoryError, Store, UserRepository, UserStore,
};
use crate::models::{
    Category, NewOrder, NewUser, Order, Photo, Product, ProductDraft, ProductFilter,
    ProfileChanges, User,
};

/// Store over a `PostgreSQL` pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Wrap a connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn insert_user(&self, user: NewUser) -> Result<User, RepositoryError> {
        UserRepository::new(&self.pool).create(&user).await
    }

    async fn user_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        UserRepository::new(&self.pool).get_by_id(id).await
    }

    async fn user_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        UserRepository::new(&self.pool).get_by_email(email).await
    }

    async fn set_password_hash(&self, id: UserId, hash: &str) -> Result<(), RepositoryError> {
        UserRepository::new(&self.pool)
            .set_password_hash(id, hash)
            .await
    }

    async fn update_profile(
        &self,
        id: UserId,
        changes: ProfileChanges,
    ) -> Result<User, RepositoryError> {
        UserRepository::new(&self.pool)
            .update_profile(id, &changes)
            .await
    }

    async fn set_role(&self, email: &Email, role: Role) -> Result<User, RepositoryError> {
        UserRepository::new(&self.pool).set_role(email, role).await
    }
}

#[async_trait]
impl CategoryStore for PgStore {
    async fn insert_category(&self, name: &str, slug: &str) -> Result<Category, RepositoryError> {
        CategoryRepository::new(&self.pool).create(name, slug).await
    }

    async fn update_category(
        &self,
        id: CategoryId,
        name: &str,
        slug: &str,
    ) -> Result<Category, RepositoryError> {
        CategoryRepository::new(&self.pool)
            .update(id, name, slug)
            .await
    }

    async fn list_categories(&self) -> Result<Vec<Category>, RepositoryError> {
        CategoryRepository::new(&self.pool).list().await
    }

    async fn category_by_slug(&self, slug: &str) -> Result<Option<Category>, RepositoryError> {
        CategoryRepository::new(&self.pool).get_by_slug(slug).await
    }

    async fn category_by_name(&self, name: &str) -> Result<Option<Category>, RepositoryError> {
        CategoryRepository::new(&self.pool).get_by_name(name).await
    }

    async fn delete_category(&self, id: CategoryId) -> Result<(), RepositoryError> {
        CategoryRepository::new(&self.pool).delete(id).await
    }
}

#[async_trait]
impl ProductStore for PgStore {
    async fn insert_product(&self, draft: ProductDraft) -> Result<Product, RepositoryError> {
        ProductRepository::new(&self.pool).create(&draft).await
    }

    async fn update_product(
        &self,
        id: ProductId,
        draft: ProductDraft,
    ) -> Result<Product, RepositoryError> {
        ProductRepository::new(&self.pool).update(id, &draft).await
    }

    async fn delete_product(&self, id: ProductId) -> Result<(), RepositoryError> {
        ProductRepository::new(&self.pool).delete(id).await
    }

    async fn latest_products(&self, limit: i64) -> Result<Vec<Product>, RepositoryError> {
        ProductRepository::new(&self.pool).latest(limit).await
    }

    async fn product_by_slug(&self, slug: &str) -> Result<Option<Product>, RepositoryError> {
        ProductRepository::new(&self.pool).get_by_slug(slug).await
    }

    async fn product_photo(&self, id: ProductId) -> Result<Option<Photo>, RepositoryError> {
        ProductRepository::new(&self.pool).photo(id).await
    }

    async fn filter_products(
        &self,
        filter: &ProductFilter,
    ) -> Result<Vec<Product>, RepositoryError> {
        ProductRepository::new(&self.pool).filter(filter).await
    }

    async fn count_products(&self) -> Result<i64, RepositoryError> {
        ProductRepository::new(&self.pool).count().await
    }

    async fn product_page(
        &self,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Product>, RepositoryError> {
        ProductRepository::new(&self.pool).page(offset, limit).await
    }

    async fn search_products(&self, keyword: &str) -> Result<Vec<Product>, RepositoryError> {
        ProductRepository::new(&self.pool).search(keyword).await
    }

    async fn related_products(
        &self,
        product: ProductId,
        category: CategoryId,
        limit: i64,
    ) -> Result<Vec<Product>, RepositoryError> {
        ProductRepository::new(&self.pool)
            .related(product, category, limit)
            .await
    }

    async fn products_in_category(
        &self,
        category: CategoryId,
    ) -> Result<Vec<Product>, RepositoryError> {
        ProductRepository::new(&self.pool).in_category(category).await
    }
}

#[async_trait]
impl OrderStore for PgStore {
    async fn insert_order(&self, order: NewOrder) -> Result<Order, RepositoryError> {
        OrderRepository::new(&self.pool).create(&order).await
    }

    async fn orders_for_buyer(&self, buyer: UserId) -> Result<Vec<Order>, RepositoryError> {
        OrderRepository::new(&self.pool).list_for_buyer(buyer).await
    }

    async fn all_orders(&self) -> Result<Vec<Order>, RepositoryError> {
        OrderRepository::new(&self.pool).list_all().await
    }

    async fn order_by_id(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        OrderRepository::new(&self.pool).get(id).await
    }

    async fn compare_and_set_status(
        &self,
        id: OrderId,
        expected: OrderStatus,
        next: OrderStatus,
    ) -> Result<Order, RepositoryError> {
        OrderRepository::new(&self.pool)
            .compare_and_set_status(id, expected, next)
            .await
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
