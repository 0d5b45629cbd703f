//! Category routes. Reads are public, mutations require an administrator.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;

use ecommerce_core::{CategoryId, slugify};

use crate::db::{CategoryStore, RepositoryError};
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::routes::{ApiJson, ApiPath};
use crate::state::AppState;

/// Body of the create and update requests.
#[derive(Debug, Default, Deserialize)]
pub struct CategoryForm {
    pub name: Option<String>,
}

impl CategoryForm {
    fn name(self) -> Result<String> {
        self.name
            .map(|n| n.trim().to_owned())
            .filter(|n| !n.is_empty())
            .ok_or_else(|| AppError::BadRequest("Name is required!".into()))
    }
}

fn category_not_found(err: RepositoryError) -> AppError {
    match err {
        RepositoryError::NotFound => AppError::NotFound("Category not found".into()),
        other => other.into(),
    }
}

/// Create a category. An existing name is reported, not duplicated.
///
/// POST /api/v1/category/create-category
pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    ApiJson(form): ApiJson<CategoryForm>,
) -> Result<impl IntoResponse> {
    let name = form.name()?;
    let exists = || {
        (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "message": "Category already exists!",
            })),
        )
    };

    if state.store().category_by_name(&name).await?.is_some() {
        return Ok(exists());
    }

    match state.store().insert_category(&name, &slugify(&name)).await {
        Ok(category) => {
            tracing::info!(category_id = %category.id, "Category created");
            Ok((
                StatusCode::CREATED,
                Json(json!({
                    "success": true,
                    "message": "Category successfully created",
                    "category": category,
                })),
            ))
        }
        // Lost a race with a concurrent create of the same name.
        Err(RepositoryError::Conflict(_)) => Ok(exists()),
        Err(err) => Err(err.into()),
    }
}

/// Rename a category and re-derive its slug.
///
/// PUT /api/v1/category/update-category/{id}
pub async fn update(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    ApiPath(id): ApiPath<CategoryId>,
    ApiJson(form): ApiJson<CategoryForm>,
) -> Result<impl IntoResponse> {
    let name = form.name()?;
    let category = state
        .store()
        .update_category(id, &name, &slugify(&name))
        .await
        .map_err(category_not_found)?;

    Ok(Json(json!({
        "success": true,
        "message": "Category successfully updated",
        "category": category,
    })))
}

/// GET /api/v1/category/list-category
pub async fn list(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let categories = state.store().list_categories().await?;
    Ok(Json(json!({
        "success": true,
        "message": "List of categories",
        "category": categories,
    })))
}

/// GET /api/v1/category/single-category/{slug}
pub async fn single(
    State(state): State<AppState>,
    ApiPath(slug): ApiPath<String>,
) -> Result<impl IntoResponse> {
    let category = state
        .store()
        .category_by_slug(&slug)
        .await?
        .ok_or_else(|| AppError::NotFound("Category not found".into()))?;

    Ok(Json(json!({
        "success": true,
        "message": "Successfully getting single category",
        "category": category,
    })))
}

/// Delete a category that no product references.
///
/// DELETE /api/v1/category/delete-category/{id}
pub async fn remove(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    ApiPath(id): ApiPath<CategoryId>,
) -> Result<impl IntoResponse> {
    state
        .store()
        .delete_category(id)
        .await
        .map_err(category_not_found)?;

    tracing::info!(category_id = %id, "Category deleted");
    Ok(Json(json!({
        "success": true,
        "message": "Successfully deleted category",
    })))
}
