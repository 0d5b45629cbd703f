//! Catalog types: categories and products.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use ecommerce_core::{CategoryId, ProductId};

/// A product category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
}

/// A catalog product, without photo bytes.
#[derive(Debug, Clone, Serialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub slug: String,
    pub description: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub quantity: i32,
    pub shipping: bool,
    pub category: Category,
    /// Whether `/photo-product/{id}` has bytes to serve.
    pub has_photo: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Binary product photo.
#[derive(Clone, PartialEq, Eq)]
pub struct Photo {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

impl Photo {
    /// Largest accepted photo, in bytes.
    pub const MAX_BYTES: usize = 1_000_000;
}

impl std::fmt::Debug for Photo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Photo")
            .field("len", &self.bytes.len())
            .field("content_type", &self.content_type)
            .finish()
    }
}

/// Validated product fields for create and update.
///
/// On update, `photo: None` keeps the stored photo.
#[derive(Debug, Clone)]
pub struct ProductDraft {
    pub name: String,
    pub slug: String,
    pub description: String,
    pub price: Decimal,
    pub quantity: i32,
    pub shipping: bool,
    pub category_id: CategoryId,
    pub photo: Option<Photo>,
}

/// Catalog filter: category membership AND inclusive price range.
///
/// An empty `categories` list and a `None` range both match everything.
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub categories: Vec<CategoryId>,
    pub price_range: Option<(Decimal, Decimal)>,
}

impl ProductFilter {
    /// Whether a product passes the filter.
    #[must_use]
    pub fn matches(&self, product: &Product) -> bool {
        let in_category =
            self.categories.is_empty() || self.categories.contains(&product.category.id);
        let in_range = self
            .price_range
            .is_none_or(|(min, max)| min <= product.price && product.price <= max);
        in_category && in_range
    }
}
