//! Product catalog routes.
//!
//! Create and update take `multipart/form-data` so the photo can travel with
//! the text fields. Responses never carry photo bytes; clients fetch them from
//! `/photo-product/{id}`.

use axum::{
    Json,
    extract::{Multipart, State, multipart::MultipartRejection},
    http::{StatusCode, header},
    response::IntoResponse,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;

use ecommerce_core::{CategoryId, ProductId, slugify};

use crate::db::{CategoryStore, ProductStore, RepositoryError};
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::{Photo, ProductDraft, ProductFilter};
use crate::routes::{ApiJson, ApiPath};
use crate::state::AppState;

/// Products on the landing list.
const LATEST_LIMIT: i64 = 12;

/// Products per page of `/product-list/{page}`.
const PAGE_SIZE: i64 = 3;

/// Related products shown next to a product.
const RELATED_LIMIT: i64 = 2;

const PHOTO_MESSAGE: &str = "Photo is required and photo size should be less than 1MB";

fn bad_request(message: &str) -> AppError {
    AppError::BadRequest(message.to_owned())
}

fn product_not_found(err: RepositoryError) -> AppError {
    match err {
        RepositoryError::NotFound => AppError::NotFound("Product not found".into()),
        other => other.into(),
    }
}

/// Raw multipart fields of a product form.
#[derive(Debug, Default)]
struct ProductForm {
    name: Option<String>,
    description: Option<String>,
    price: Option<String>,
    quantity: Option<String>,
    category: Option<String>,
    shipping: Option<String>,
    photo: Option<Photo>,
    photo_too_large: bool,
}

impl ProductForm {
    /// Drain the multipart stream. Unknown fields are skipped.
    async fn read(mut multipart: Multipart) -> Result<Self> {
        let mut form = Self::default();

        while let Some(mut field) = multipart.next_field().await? {
            let Some(name) = field.name().map(str::to_owned) else {
                continue;
            };

            if name == "photo" {
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_owned();
                let mut bytes = Vec::new();
                while let Some(chunk) = field.chunk().await? {
                    if bytes.len() + chunk.len() > Photo::MAX_BYTES {
                        form.photo_too_large = true;
                        break;
                    }
                    bytes.extend_from_slice(&chunk);
                }
                // Browsers send an empty part when no file was chosen.
                if !form.photo_too_large && !bytes.is_empty() {
                    form.photo = Some(Photo {
                        bytes,
                        content_type,
                    });
                }
                continue;
            }

            let value = field.text().await?;
            let slot = match name.as_str() {
                "name" => &mut form.name,
                "description" => &mut form.description,
                "price" => &mut form.price,
                "quantity" => &mut form.quantity,
                "category" => &mut form.category,
                "shipping" => &mut form.shipping,
                _ => continue,
            };
            *slot = Some(value);
        }

        Ok(form)
    }

    /// Validate in field order; the first failure is reported.
    fn into_draft(self) -> Result<ProductDraft> {
        let name = required(self.name, "Name is required!")?;
        let description = required(self.description, "Description is required!")?;

        let price: Decimal = required(self.price, "Price is required!")?
            .parse()
            .map_err(|_| bad_request("Price must be a number"))?;
        if price < Decimal::ZERO {
            return Err(bad_request("Price cannot be negative"));
        }

        let quantity: i32 = required(self.quantity, "Quantity is required!")?
            .parse()
            .map_err(|_| bad_request("Quantity must be a whole number"))?;
        if quantity < 0 {
            return Err(bad_request("Quantity cannot be negative"));
        }

        let category_id: CategoryId = required(self.category, "Category is required!")?
            .parse()
            .map_err(|_| bad_request("Category is invalid"))?;

        if self.photo_too_large {
            return Err(bad_request(PHOTO_MESSAGE));
        }

        let shipping = self.shipping.as_deref().is_some_and(is_truthy);

        Ok(ProductDraft {
            slug: slugify(&name),
            name,
            description,
            price,
            quantity,
            shipping,
            category_id,
            photo: self.photo,
        })
    }
}

fn required(value: Option<String>, message: &str) -> Result<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| bad_request(message))
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Create a product.
///
/// POST /api/v1/product/create-product
pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse> {
    let draft = ProductForm::read(multipart?).await?.into_draft()?;
    let product = state.store().insert_product(draft).await?;

    tracing::info!(product_id = %product.id, "Product created");
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Product successfully created!",
            "product": product,
        })),
    ))
}

/// Replace a product's fields. Without a new photo the stored one is kept.
///
/// PUT /api/v1/product/update-product/{id}
pub async fn update(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    ApiPath(id): ApiPath<ProductId>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse> {
    let draft = ProductForm::read(multipart?).await?.into_draft()?;
    let product = state
        .store()
        .update_product(id, draft)
        .await
        .map_err(product_not_found)?;

    tracing::info!(product_id = %product.id, "Product updated");
    Ok(Json(json!({
        "success": true,
        "message": "Product successfully updated!",
        "product": product,
    })))
}

/// The newest products.
///
/// GET /api/v1/product/list-product
pub async fn list(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let products = state.store().latest_products(LATEST_LIMIT).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Successfully listed all products!",
        "total": products.len(),
        "products": products,
    })))
}

/// GET /api/v1/product/single-product/{slug}
pub async fn single(
    State(state): State<AppState>,
    ApiPath(slug): ApiPath<String>,
) -> Result<impl IntoResponse> {
    let product = state
        .store()
        .product_by_slug(&slug)
        .await?
        .ok_or_else(|| AppError::NotFound("Product not found".into()))?;

    Ok(Json(json!({
        "success": true,
        "message": "Successfully listed single product!",
        "product": product,
    })))
}

/// Raw photo bytes with their stored content type.
///
/// GET /api/v1/product/photo-product/{id}
pub async fn photo(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ProductId>,
) -> Result<impl IntoResponse> {
    let photo = state
        .store()
        .product_photo(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Photo not found".into()))?;

    Ok(([(header::CONTENT_TYPE, photo.content_type)], photo.bytes))
}

/// DELETE /api/v1/product/delete-product/{id}
pub async fn remove(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    ApiPath(id): ApiPath<ProductId>,
) -> Result<impl IntoResponse> {
    state
        .store()
        .delete_product(id)
        .await
        .map_err(product_not_found)?;

    tracing::info!(product_id = %id, "Product deleted");
    Ok(Json(json!({
        "success": true,
        "message": "Successfully deleted product!",
    })))
}

/// Body of `/product-filters`: checked category ids and a `[min, max]` price range.
#[derive(Debug, Default, Deserialize)]
pub struct FilterForm {
    #[serde(default)]
    pub checked: Vec<CategoryId>,
    #[serde(default)]
    pub radio: Vec<Decimal>,
}

impl TryFrom<FilterForm> for ProductFilter {
    type Error = AppError;

    fn try_from(form: FilterForm) -> Result<Self> {
        let price_range = match form.radio.as_slice() {
            [] => None,
            [min, max] => Some((*min, *max)),
            _ => {
                return Err(bad_request(
                    "radio must contain exactly two values: [min, max]",
                ));
            }
        };

        Ok(Self {
            categories: form.checked,
            price_range,
        })
    }
}

/// POST /api/v1/product/product-filters
pub async fn filters(
    State(state): State<AppState>,
    ApiJson(form): ApiJson<FilterForm>,
) -> Result<impl IntoResponse> {
    let filter = ProductFilter::try_from(form)?;
    let products = state.store().filter_products(&filter).await?;
    Ok(Json(json!({
        "success": true,
        "products": products,
    })))
}

/// GET /api/v1/product/product-count
pub async fn count(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let total = state.store().count_products().await?;
    Ok(Json(json!({
        "success": true,
        "total": total,
    })))
}

/// Fixed-size pages, first page is 1.
///
/// GET /api/v1/product/product-list/{page}
pub async fn page(
    State(state): State<AppState>,
    ApiPath(page): ApiPath<i64>,
) -> Result<impl IntoResponse> {
    if page < 1 {
        return Err(bad_request("Page must be at least 1"));
    }
    let offset = (page - 1)
        .checked_mul(PAGE_SIZE)
        .ok_or_else(|| bad_request("Page is out of range"))?;

    let products = state.store().product_page(offset, PAGE_SIZE).await?;
    Ok(Json(json!({
        "success": true,
        "products": products,
    })))
}

/// GET /api/v1/product/product-search/{keyword}
pub async fn search(
    State(state): State<AppState>,
    ApiPath(keyword): ApiPath<String>,
) -> Result<impl IntoResponse> {
    let products = state.store().search_products(&keyword).await?;
    Ok(Json(json!({
        "success": true,
        "products": products,
    })))
}

/// GET /api/v1/product/product-related/{pid}/{cid}
pub async fn related(
    State(state): State<AppState>,
    ApiPath((pid, cid)): ApiPath<(ProductId, CategoryId)>,
) -> Result<impl IntoResponse> {
    let products = state
        .store()
        .related_products(pid, cid, RELATED_LIMIT)
        .await?;
    Ok(Json(json!({
        "success": true,
        "products": products,
    })))
}

/// A category together with its products.
///
/// GET /api/v1/product/product-category/{slug}
pub async fn by_category(
    State(state): State<AppState>,
    ApiPath(slug): ApiPath<String>,
) -> Result<impl IntoResponse> {
    let category = state
        .store()
        .category_by_slug(&slug)
        .await?
        .ok_or_else(|| AppError::NotFound("Category not found".into()))?;
    let products = state.store().products_in_category(category.id).await?;

    Ok(Json(json!({
        "success": true,
        "category": category,
        "products": products,
    })))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn form() -> ProductForm {
        ProductForm {
            name: Some("Blue Shirt".into()),
            description: Some("Cotton".into()),
            price: Some("19.99".into()),
            quantity: Some("5".into()),
            category: Some("1".into()),
            ..ProductForm::default()
        }
    }

    fn message(form: ProductForm) -> String {
        form.into_draft().unwrap_err().client_message()
    }

    #[test]
    fn test_valid_form_derives_slug() {
        let draft = form().into_draft().unwrap();
        assert_eq!(draft.slug, "Blue-Shirt");
        assert_eq!(draft.price, Decimal::new(1999, 2));
        assert!(!draft.shipping);
        assert!(draft.photo.is_none());
    }

    #[test]
    fn test_first_missing_field_wins() {
        let mut f = form();
        f.description = None;
        f.price = None;
        assert_eq!(message(f), "Description is required!");

        let mut f = form();
        f.name = Some("   ".into());
        f.category = None;
        assert_eq!(message(f), "Name is required!");

        let mut f = form();
        f.quantity = None;
        assert_eq!(message(f), "Quantity is required!");
    }

    #[test]
    fn test_photo_size_checked_after_fields() {
        let mut f = form();
        f.photo_too_large = true;
        assert_eq!(message(f), PHOTO_MESSAGE);

        let mut f = form();
        f.photo_too_large = true;
        f.category = None;
        assert_eq!(message(f), "Category is required!");
    }

    #[test]
    fn test_bad_numbers() {
        let mut f = form();
        f.price = Some("cheap".into());
        assert_eq!(message(f), "Price must be a number");

        let mut f = form();
        f.price = Some("-1".into());
        assert_eq!(message(f), "Price cannot be negative");

        let mut f = form();
        f.quantity = Some("2.5".into());
        assert_eq!(message(f), "Quantity must be a whole number");
    }

    #[test]
    fn test_shipping_flag() {
        for (raw, expected) in [("1", true), ("true", true), ("0", false), ("", false)] {
            let mut f = form();
            f.shipping = Some(raw.into());
            assert_eq!(f.into_draft().unwrap().shipping, expected, "{raw}");
        }
    }

    #[test]
    fn test_filter_radio_must_be_pair() {
        let filter = ProductFilter::try_from(FilterForm {
            checked: vec![CategoryId::new(1)],
            radio: vec![Decimal::ZERO, Decimal::from(20)],
        })
        .unwrap();
        assert_eq!(filter.price_range, Some((Decimal::ZERO, Decimal::from(20))));

        let open = ProductFilter::try_from(FilterForm::default()).unwrap();
        assert!(open.price_range.is_none());

        let err = ProductFilter::try_from(FilterForm {
            checked: vec![],
            radio: vec![Decimal::ZERO],
        })
        .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }
}
