//! In-memory [`Store`] implementation.
//!
//! [`MemoryStore`] enforces the same constraints as the `PostgreSQL` schema
//! (unique emails and category names, the product to category foreign key
//! with `RESTRICT` on delete, compare-and-set status updates), so services
//! and routes behave identically against it. It is intended for tests and
//! local experimentation.
//!
//! # Cloning
//!
//! `MemoryStore` is cheaply cloneable via [`Arc`]. All clones share the same
//! tables.
//!
//! # Limitations
//!
//! - Data is not persisted; all data is lost when the process exits
//! - Every operation takes a single table-wide lock

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use serde_json::Value;

use ecommerce_core::{CategoryId, Email, OrderId, OrderStatus, ProductId, Role, UserId};

use super::{CategoryStore, OrderStore, ProductStore, RepositoryError, Store, UserStore};
use crate::models::{
    Buyer, CartItem, Category, NewOrder, NewUser, Order, Photo, Product, ProductDraft,
    ProductFilter, ProfileChanges, User,
};

#[derive(Clone)]
struct ProductRecord {
    id: ProductId,
    name: String,
    slug: String,
    description: String,
    price: Decimal,
    quantity: i32,
    shipping: bool,
    category_id: CategoryId,
    photo: Option<Photo>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Clone)]
struct OrderRecord {
    id: OrderId,
    products: Vec<CartItem>,
    payment: Value,
    buyer: UserId,
    status: OrderStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Default)]
struct Tables {
    next_id: i32,
    users: BTreeMap<UserId, User>,
    categories: BTreeMap<CategoryId, Category>,
    products: BTreeMap<ProductId, ProductRecord>,
    orders: BTreeMap<OrderId, OrderRecord>,
}

impl Tables {
    fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }

    fn email_taken(&self, email: &Email, except: Option<UserId>) -> bool {
        self.users
            .values()
            .any(|u| &u.email == email && Some(u.id) != except)
    }

    fn name_taken(&self, name: &str, except: Option<CategoryId>) -> bool {
        self.categories
            .values()
            .any(|c| c.name == name && Some(c.id) != except)
    }

    fn product(&self, record: &ProductRecord) -> Result<Product, RepositoryError> {
        let category = self
            .categories
            .get(&record.category_id)
            .cloned()
            .ok_or_else(|| {
                RepositoryError::DataCorruption(format!(
                    "product {} references missing category {}",
                    record.id, record.category_id
                ))
            })?;

        Ok(Product {
            id: record.id,
            name: record.name.clone(),
            slug: record.slug.clone(),
            description: record.description.clone(),
            price: record.price,
            quantity: record.quantity,
            shipping: record.shipping,
            category,
            has_photo: record.photo.is_some(),
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }

    fn materialize<'a>(
        &self,
        records: impl IntoIterator<Item = &'a ProductRecord>,
    ) -> Result<Vec<Product>, RepositoryError> {
        records.into_iter().map(|r| self.product(r)).collect()
    }

    fn newest_products(&self) -> Vec<&ProductRecord> {
        let mut records: Vec<_> = self.products.values().collect();
        records.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        records
    }

    fn order(&self, record: &OrderRecord) -> Result<Order, RepositoryError> {
        let name = self
            .users
            .get(&record.buyer)
            .map(|u| u.name.clone())
            .ok_or_else(|| {
                RepositoryError::DataCorruption(format!(
                    "order {} references missing user {}",
                    record.id, record.buyer
                ))
            })?;

        Ok(Order {
            id: record.id,
            products: record.products.clone(),
            payment: record.payment.clone(),
            buyer: Buyer {
                id: record.buyer,
                name,
            },
            status: record.status,
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }

    fn newest_orders<'a>(
        &self,
        records: impl Iterator<Item = &'a OrderRecord>,
    ) -> Result<Vec<Order>, RepositoryError> {
        let mut records: Vec<_> = records.collect();
        records.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        records.into_iter().map(|r| self.order(r)).collect()
    }
}

/// In-memory store backed by ordered maps.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored orders.
    #[must_use]
    pub fn order_count(&self) -> usize {
        self.tables.read().orders.len()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert_user(&self, user: NewUser) -> Result<User, RepositoryError> {
        let mut tables = self.tables.write();
        if tables.email_taken(&user.email, None) {
            return Err(RepositoryError::Conflict("email already exists".to_owned()));
        }

        let now = Utc::now();
        let id = UserId::new(tables.next_id());
        let user = User {
            id,
            name: user.name,
            email: user.email,
            phone: user.phone,
            address: user.address,
            role: Role::User,
            password_hash: user.password_hash,
            answer_hash: user.answer_hash,
            created_at: now,
            updated_at: now,
        };
        tables.users.insert(id, user.clone());
        Ok(user)
    }

    async fn user_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        Ok(self.tables.read().users.get(&id).cloned())
    }

    async fn user_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        Ok(self
            .tables
            .read()
            .users
            .values()
            .find(|u| &u.email == email)
            .cloned())
    }

    async fn set_password_hash(&self, id: UserId, hash: &str) -> Result<(), RepositoryError> {
        let mut tables = self.tables.write();
        let user = tables.users.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        hash.clone_into(&mut user.password_hash);
        user.updated_at = Utc::now();
        Ok(())
    }

    async fn update_profile(
        &self,
        id: UserId,
        changes: ProfileChanges,
    ) -> Result<User, RepositoryError> {
        let mut tables = self.tables.write();
        if let Some(email) = &changes.email
            && tables.email_taken(email, Some(id))
        {
            return Err(RepositoryError::Conflict("email already exists".to_owned()));
        }

        let user = tables.users.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        changes.apply_to(user);
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn set_role(&self, email: &Email, role: Role) -> Result<User, RepositoryError> {
        let mut tables = self.tables.write();
        let user = tables
            .users
            .values_mut()
            .find(|u| &u.email == email)
            .ok_or(RepositoryError::NotFound)?;
        user.role = role;
        user.updated_at = Utc::now();
        Ok(user.clone())
    }
}

#[async_trait]
impl CategoryStore for MemoryStore {
    async fn insert_category(&self, name: &str, slug: &str) -> Result<Category, RepositoryError> {
        let mut tables = self.tables.write();
        if tables.name_taken(name, None) {
            return Err(RepositoryError::Conflict("category already exists".to_owned()));
        }

        let category = Category {
            id: CategoryId::new(tables.next_id()),
            name: name.to_owned(),
            slug: slug.to_owned(),
        };
        tables.categories.insert(category.id, category.clone());
        Ok(category)
    }

    async fn update_category(
        &self,
        id: CategoryId,
        name: &str,
        slug: &str,
    ) -> Result<Category, RepositoryError> {
        let mut tables = self.tables.write();
        if !tables.categories.contains_key(&id) {
            return Err(RepositoryError::NotFound);
        }
        if tables.name_taken(name, Some(id)) {
            return Err(RepositoryError::Conflict("category already exists".to_owned()));
        }

        let category = tables
            .categories
            .get_mut(&id)
            .ok_or(RepositoryError::NotFound)?;
        name.clone_into(&mut category.name);
        slug.clone_into(&mut category.slug);
        Ok(category.clone())
    }

    async fn list_categories(&self) -> Result<Vec<Category>, RepositoryError> {
        let mut categories: Vec<_> = self.tables.read().categories.values().cloned().collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn category_by_slug(&self, slug: &str) -> Result<Option<Category>, RepositoryError> {
        Ok(self
            .tables
            .read()
            .categories
            .values()
            .find(|c| c.slug == slug)
            .cloned())
    }

    async fn category_by_name(&self, name: &str) -> Result<Option<Category>, RepositoryError> {
        Ok(self
            .tables
            .read()
            .categories
            .values()
            .find(|c| c.name == name)
            .cloned())
    }

    async fn delete_category(&self, id: CategoryId) -> Result<(), RepositoryError> {
        let mut tables = self.tables.write();
        if !tables.categories.contains_key(&id) {
            return Err(RepositoryError::NotFound);
        }
        if tables.products.values().any(|p| p.category_id == id) {
            return Err(RepositoryError::Conflict(
                "category still has products".to_owned(),
            ));
        }
        tables.categories.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl ProductStore for MemoryStore {
    async fn insert_product(&self, draft: ProductDraft) -> Result<Product, RepositoryError> {
        let mut tables = self.tables.write();
        if !tables.categories.contains_key(&draft.category_id) {
            return Err(RepositoryError::MissingReference(
                "category does not exist".to_owned(),
            ));
        }

        let now = Utc::now();
        let record = ProductRecord {
            id: ProductId::new(tables.next_id()),
            name: draft.name,
            slug: draft.slug,
            description: draft.description,
            price: draft.price,
            quantity: draft.quantity,
            shipping: draft.shipping,
            category_id: draft.category_id,
            photo: draft.photo,
            created_at: now,
            updated_at: now,
        };
        let product = tables.product(&record)?;
        tables.products.insert(record.id, record);
        Ok(product)
    }

    async fn update_product(
        &self,
        id: ProductId,
        draft: ProductDraft,
    ) -> Result<Product, RepositoryError> {
        let mut tables = self.tables.write();
        if !tables.products.contains_key(&id) {
            return Err(RepositoryError::NotFound);
        }
        if !tables.categories.contains_key(&draft.category_id) {
            return Err(RepositoryError::MissingReference(
                "category does not exist".to_owned(),
            ));
        }

        let record = tables
            .products
            .get_mut(&id)
            .ok_or(RepositoryError::NotFound)?;
        record.name = draft.name;
        record.slug = draft.slug;
        record.description = draft.description;
        record.price = draft.price;
        record.quantity = draft.quantity;
        record.shipping = draft.shipping;
        record.category_id = draft.category_id;
        if let Some(photo) = draft.photo {
            record.photo = Some(photo);
        }
        record.updated_at = Utc::now();

        let record = record.clone();
        tables.product(&record)
    }

    async fn delete_product(&self, id: ProductId) -> Result<(), RepositoryError> {
        self.tables
            .write()
            .products
            .remove(&id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }

    async fn latest_products(&self, limit: i64) -> Result<Vec<Product>, RepositoryError> {
        let tables = self.tables.read();
        let newest = tables.newest_products();
        tables.materialize(newest.into_iter().take(to_usize(limit)))
    }

    async fn product_by_slug(&self, slug: &str) -> Result<Option<Product>, RepositoryError> {
        let tables = self.tables.read();
        tables
            .products
            .values()
            .find(|p| p.slug == slug)
            .map(|p| tables.product(p))
            .transpose()
    }

    async fn product_photo(&self, id: ProductId) -> Result<Option<Photo>, RepositoryError> {
        Ok(self
            .tables
            .read()
            .products
            .get(&id)
            .and_then(|p| p.photo.clone()))
    }

    async fn filter_products(
        &self,
        filter: &ProductFilter,
    ) -> Result<Vec<Product>, RepositoryError> {
        let tables = self.tables.read();
        let newest = tables.newest_products();
        let products = tables.materialize(newest)?;
        Ok(products.into_iter().filter(|p| filter.matches(p)).collect())
    }

    async fn count_products(&self) -> Result<i64, RepositoryError> {
        let count = self.tables.read().products.len();
        i64::try_from(count).map_err(|e| RepositoryError::DataCorruption(e.to_string()))
    }

    async fn product_page(
        &self,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Product>, RepositoryError> {
        let tables = self.tables.read();
        tables.materialize(
            tables
                .products
                .values()
                .skip(to_usize(offset))
                .take(to_usize(limit)),
        )
    }

    async fn search_products(&self, keyword: &str) -> Result<Vec<Product>, RepositoryError> {
        let needle = keyword.to_lowercase();
        let tables = self.tables.read();
        tables.materialize(tables.products.values().filter(|p| {
            p.name.to_lowercase().contains(&needle)
                || p.description.to_lowercase().contains(&needle)
        }))
    }

    async fn related_products(
        &self,
        product: ProductId,
        category: CategoryId,
        limit: i64,
    ) -> Result<Vec<Product>, RepositoryError> {
        let tables = self.tables.read();
        tables.materialize(
            tables
                .products
                .values()
                .filter(|p| p.category_id == category && p.id != product)
                .take(to_usize(limit)),
        )
    }

    async fn products_in_category(
        &self,
        category: CategoryId,
    ) -> Result<Vec<Product>, RepositoryError> {
        let tables = self.tables.read();
        tables.materialize(
            tables
                .products
                .values()
                .filter(|p| p.category_id == category),
        )
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn insert_order(&self, order: NewOrder) -> Result<Order, RepositoryError> {
        let mut tables = self.tables.write();
        let now = Utc::now();
        let record = OrderRecord {
            id: OrderId::new(tables.next_id()),
            products: order.products,
            payment: order.payment,
            buyer: order.buyer,
            status: OrderStatus::NotProcessed,
            created_at: now,
            updated_at: now,
        };
        let order = tables.order(&record)?;
        tables.orders.insert(record.id, record);
        Ok(order)
    }

    async fn orders_for_buyer(&self, buyer: UserId) -> Result<Vec<Order>, RepositoryError> {
        let tables = self.tables.read();
        tables.newest_orders(tables.orders.values().filter(|o| o.buyer == buyer))
    }

    async fn all_orders(&self) -> Result<Vec<Order>, RepositoryError> {
        let tables = self.tables.read();
        tables.newest_orders(tables.orders.values())
    }

    async fn order_by_id(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let tables = self.tables.read();
        tables.orders.get(&id).map(|o| tables.order(o)).transpose()
    }

    async fn compare_and_set_status(
        &self,
        id: OrderId,
        expected: OrderStatus,
        next: OrderStatus,
    ) -> Result<Order, RepositoryError> {
        let mut tables = self.tables.write();
        let record = tables.orders.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        if record.status != expected {
            return Err(RepositoryError::Conflict(format!(
                "order {id} is now {}",
                record.status
            )));
        }
        record.status = next;
        record.updated_at = Utc::now();

        let record = record.clone();
        tables.order(&record)
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}

fn to_usize(n: i64) -> usize {
    usize::try_from(n).unwrap_or(0)
}
