//! Category and product repositories.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, QueryBuilder};

use ecommerce_core::{CategoryId, ProductId};

use super::{RepositoryError, map_unique_violation};
use crate::models::{Category, Photo, Product, ProductDraft, ProductFilter};

/// Product columns joined with their category. `FROM` is parameterized so
/// the same projection works over a CTE.
macro_rules! product_select {
    ($from:literal) => {
        concat!(
            "SELECT p.id, p.name, p.slug, p.description, p.price, p.quantity, p.shipping, ",
            "c.id AS category_id, c.name AS category_name, c.slug AS category_slug, ",
            "(p.photo IS NOT NULL) AS has_photo, p.created_at, p.updated_at ",
            "FROM ",
            $from,
            " p JOIN market.category c ON c.id = p.category_id"
        )
    };
}

const PRODUCT_SELECT: &str = product_select!("market.product");

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: ProductId,
    name: String,
    slug: String,
    description: String,
    price: Decimal,
    quantity: i32,
    shipping: bool,
    category_id: CategoryId,
    category_name: String,
    category_slug: String,
    has_photo: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            slug: row.slug,
            description: row.description,
            price: row.price,
            quantity: row.quantity,
            shipping: row.shipping,
            category: Category {
                id: row.category_id,
                name: row.category_name,
                slug: row.category_slug,
            },
            has_photo: row.has_photo,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct PhotoRow {
    photo: Option<Vec<u8>>,
    photo_content_type: Option<String>,
}

fn map_product_write(e: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_foreign_key_violation()
    {
        return RepositoryError::MissingReference("category does not exist".to_owned());
    }
    RepositoryError::Database(e)
}

/// Repository for category database operations.
pub struct CategoryRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CategoryRepository<'a> {
    /// Create a new category repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Create a category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the name already exists.
    pub async fn create(&self, name: &str, slug: &str) -> Result<Category, RepositoryError> {
        sqlx::query_as::<_, Category>(
            "INSERT INTO market.category (name, slug) VALUES ($1, $2) RETURNING id, name, slug",
        )
        .bind(name)
        .bind(slug)
        .fetch_one(self.pool)
        .await
        .map_err(|e| map_unique_violation(e, "category"))
    }

    /// Rename a category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the category does not exist.
    /// Returns `RepositoryError::Conflict` if the new name is taken.
    pub async fn update(
        &self,
        id: CategoryId,
        name: &str,
        slug: &str,
    ) -> Result<Category, RepositoryError> {
        sqlx::query_as::<_, Category>(
            "UPDATE market.category SET name = $2, slug = $3 WHERE id = $1 RETURNING id, name, slug",
        )
        .bind(id)
        .bind(name)
        .bind(slug)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| map_unique_violation(e, "category"))?
        .ok_or(RepositoryError::NotFound)
    }

    /// List all categories by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Category>, RepositoryError> {
        let rows = sqlx::query_as::<_, Category>(
            "SELECT id, name, slug FROM market.category ORDER BY name",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Get the first category with `slug`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Category>, RepositoryError> {
        let row = sqlx::query_as::<_, Category>(
            "SELECT id, name, slug FROM market.category WHERE slug = $1 ORDER BY id LIMIT 1",
        )
        .bind(slug)
        .fetch_optional(self.pool)
        .await?;
        Ok(row)
    }

    /// Get a category by its exact name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_name(&self, name: &str) -> Result<Option<Category>, RepositoryError> {
        let row = sqlx::query_as::<_, Category>(
            "SELECT id, name, slug FROM market.category WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(self.pool)
        .await?;
        Ok(row)
    }

    /// Delete a category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the category does not exist.
    /// Returns `RepositoryError::Conflict` if products still reference it.
    pub async fn delete(&self, id: CategoryId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM market.category WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(ref db_err) = e
                    && db_err.is_foreign_key_violation()
                {
                    return RepositoryError::Conflict("category still has products".to_owned());
                }
                RepositoryError::Database(e)
            })?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

/// Repository for product database operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::MissingReference` if the category does not exist.
    pub async fn create(&self, draft: &ProductDraft) -> Result<Product, RepositoryError> {
        let (photo, content_type) = split_photo(draft.photo.as_ref());
        let row = sqlx::query_as::<_, ProductRow>(concat!(
            "WITH p AS (",
            "INSERT INTO market.product ",
            "(name, slug, description, price, quantity, shipping, category_id, photo, photo_content_type) ",
            "VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING *) ",
            product_select!("p")
        ))
        .bind(&draft.name)
        .bind(&draft.slug)
        .bind(&draft.description)
        .bind(draft.price)
        .bind(draft.quantity)
        .bind(draft.shipping)
        .bind(draft.category_id)
        .bind(photo)
        .bind(content_type)
        .fetch_one(self.pool)
        .await
        .map_err(map_product_write)?;
        Ok(row.into())
    }

    /// Replace a product's fields. Without a new photo the stored one is kept.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    /// Returns `RepositoryError::MissingReference` if the category does not exist.
    pub async fn update(
        &self,
        id: ProductId,
        draft: &ProductDraft,
    ) -> Result<Product, RepositoryError> {
        let (photo, content_type) = split_photo(draft.photo.as_ref());
        let row = sqlx::query_as::<_, ProductRow>(concat!(
            "WITH p AS (",
            "UPDATE market.product SET name = $2, slug = $3, description = $4, price = $5, ",
            "quantity = $6, shipping = $7, category_id = $8, ",
            "photo = COALESCE($9, photo), photo_content_type = COALESCE($10, photo_content_type), ",
            "updated_at = NOW() WHERE id = $1 RETURNING *) ",
            product_select!("p")
        ))
        .bind(id)
        .bind(&draft.name)
        .bind(&draft.slug)
        .bind(&draft.description)
        .bind(draft.price)
        .bind(draft.quantity)
        .bind(draft.shipping)
        .bind(draft.category_id)
        .bind(photo)
        .bind(content_type)
        .fetch_optional(self.pool)
        .await
        .map_err(map_product_write)?
        .ok_or(RepositoryError::NotFound)?;
        Ok(row.into())
    }

    /// Delete a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    pub async fn delete(&self, id: ProductId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM market.product WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Newest products first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn latest(&self, limit: i64) -> Result<Vec<Product>, RepositoryError> {
        self.fetch(
            sqlx::query_as::<_, ProductRow>(&format!(
                "{PRODUCT_SELECT} ORDER BY p.created_at DESC, p.id DESC LIMIT $1"
            ))
            .bind(limit),
        )
        .await
    }

    /// Get a product by slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "{PRODUCT_SELECT} WHERE p.slug = $1 ORDER BY p.id LIMIT 1"
        ))
        .bind(slug)
        .fetch_optional(self.pool)
        .await?;
        Ok(row.map(Product::from))
    }

    /// Get the photo of a product, if it has one.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::DataCorruption` if bytes are stored without a content type.
    pub async fn photo(&self, id: ProductId) -> Result<Option<Photo>, RepositoryError> {
        let row = sqlx::query_as::<_, PhotoRow>(
            "SELECT photo, photo_content_type FROM market.product WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        match row {
            Some(PhotoRow {
                photo: Some(bytes),
                photo_content_type: Some(content_type),
            }) => Ok(Some(Photo {
                bytes,
                content_type,
            })),
            Some(PhotoRow {
                photo: Some(_),
                photo_content_type: None,
            }) => Err(RepositoryError::DataCorruption(format!(
                "product {id} has a photo without a content type"
            ))),
            _ => Ok(None),
        }
    }

    /// Products matching a category/price filter, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn filter(&self, filter: &ProductFilter) -> Result<Vec<Product>, RepositoryError> {
        let mut qb: QueryBuilder<'_, Postgres> = QueryBuilder::new(PRODUCT_SELECT);
        qb.push(" WHERE TRUE");

        if !filter.categories.is_empty() {
            let ids: Vec<i32> = filter.categories.iter().map(CategoryId::as_i32).collect();
            qb.push(" AND p.category_id = ANY(").push_bind(ids).push(")");
        }
        if let Some((min, max)) = filter.price_range {
            qb.push(" AND p.price BETWEEN ")
                .push_bind(min)
                .push(" AND ")
                .push_bind(max);
        }
        qb.push(" ORDER BY p.created_at DESC, p.id DESC");

        let rows = qb
            .build_query_as::<ProductRow>()
            .fetch_all(self.pool)
            .await?;
        Ok(rows.into_iter().map(Product::from).collect())
    }

    /// Total number of products.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count(&self) -> Result<i64, RepositoryError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM market.product")
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }

    /// One page of products in id order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn page(&self, offset: i64, limit: i64) -> Result<Vec<Product>, RepositoryError> {
        self.fetch(
            sqlx::query_as::<_, ProductRow>(&format!(
                "{PRODUCT_SELECT} ORDER BY p.id LIMIT $1 OFFSET $2"
            ))
            .bind(limit)
            .bind(offset),
        )
        .await
    }

    /// Case-insensitive literal substring search over name and description.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn search(&self, keyword: &str) -> Result<Vec<Product>, RepositoryError> {
        self.fetch(
            sqlx::query_as::<_, ProductRow>(&format!(
                "{PRODUCT_SELECT} WHERE strpos(lower(p.name), lower($1)) > 0 \
                 OR strpos(lower(p.description), lower($1)) > 0 ORDER BY p.id"
            ))
            .bind(keyword),
        )
        .await
    }

    /// Other products in the same category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn related(
        &self,
        product: ProductId,
        category: CategoryId,
        limit: i64,
    ) -> Result<Vec<Product>, RepositoryError> {
        self.fetch(
            sqlx::query_as::<_, ProductRow>(&format!(
                "{PRODUCT_SELECT} WHERE p.category_id = $1 AND p.id <> $2 ORDER BY p.id LIMIT $3"
            ))
            .bind(category)
            .bind(product)
            .bind(limit),
        )
        .await
    }

    /// All products in a category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn in_category(&self, category: CategoryId) -> Result<Vec<Product>, RepositoryError> {
        self.fetch(
            sqlx::query_as::<_, ProductRow>(&format!(
                "{PRODUCT_SELECT} WHERE p.category_id = $1 ORDER BY p.id"
            ))
            .bind(category),
        )
        .await
    }

    async fn fetch(
        &self,
        query: sqlx::query::QueryAs<'_, Postgres, ProductRow, sqlx::postgres::PgArguments>,
    ) -> Result<Vec<Product>, RepositoryError> {
        let rows = query.fetch_all(self.pool).await?;
        Ok(rows.into_iter().map(Product::from).collect())
    }
}

fn split_photo(photo: Option<&Photo>) -> (Option<&[u8]>, Option<&str>) {
    photo.map_or((None, None), |p| {
        (Some(p.bytes.as_slice()), Some(p.content_type.as_str()))
    })
}
