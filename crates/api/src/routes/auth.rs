//! Account, session token, and order-ledger routes.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use ecommerce_core::{OrderId, OrderStatus};

use crate::error::{AppError, Result};
use crate::middleware::{RequireAdmin, RequireAuth};
use crate::models::{Order, PublicProfile};
use crate::routes::{ApiJson, ApiPath};
use crate::services::auth::{Credentials, PasswordReset, ProfileUpdate, Registration};
use crate::services::{AuthService, OrderService};
use crate::state::AppState;

/// Response for a successful login.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub message: &'static str,
    pub user: PublicProfile,
    pub token: String,
}

/// Response carrying a list of orders.
#[derive(Debug, Serialize)]
pub struct OrdersResponse {
    pub success: bool,
    pub orders: Vec<Order>,
}

impl OrdersResponse {
    const fn new(orders: Vec<Order>) -> Self {
        Self {
            success: true,
            orders,
        }
    }
}

/// Body of `PUT /order-status/{orderId}`.
#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: Option<OrderStatus>,
}

/// Create an account.
///
/// POST /api/v1/auth/register
pub async fn register(
    State(state): State<AppState>,
    ApiJson(form): ApiJson<Registration>,
) -> Result<impl IntoResponse> {
    let user = AuthService::new(state.store(), state.tokens())
        .register(form)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "User Register Successfully!",
            "user": PublicProfile::from(&user),
        })),
    ))
}

/// Exchange credentials for a token.
///
/// POST /api/v1/auth/login
pub async fn login(
    State(state): State<AppState>,
    ApiJson(form): ApiJson<Credentials>,
) -> Result<Json<LoginResponse>> {
    let login = AuthService::new(state.store(), state.tokens())
        .login(form)
        .await?;

    Ok(Json(LoginResponse {
        success: true,
        message: "Login successfully",
        user: PublicProfile::from(&login.user),
        token: login.token,
    }))
}

/// Reset a password with the security answer.
///
/// POST /api/v1/auth/forgot-password
pub async fn forgot_password(
    State(state): State<AppState>,
    ApiJson(form): ApiJson<PasswordReset>,
) -> Result<impl IntoResponse> {
    AuthService::new(state.store(), state.tokens())
        .reset_password(form)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Password reset successfully!",
    })))
}

/// GET /api/v1/auth/test
pub async fn admin_test(RequireAdmin(_): RequireAdmin) -> &'static str {
    "Protected routes"
}

/// Lets the frontend check that its token is still good.
///
/// GET /api/v1/auth/user-auth
pub async fn user_auth(RequireAuth(_): RequireAuth) -> impl IntoResponse {
    Json(json!({ "ok": true }))
}

/// GET /api/v1/auth/admin-auth
pub async fn admin_auth(RequireAdmin(_): RequireAdmin) -> impl IntoResponse {
    Json(json!({ "ok": true }))
}

/// Update the caller's own profile.
///
/// PUT /api/v1/auth/profile
pub async fn update_profile(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiJson(form): ApiJson<ProfileUpdate>,
) -> Result<impl IntoResponse> {
    let updated = AuthService::new(state.store(), state.tokens())
        .update_profile(user.id, form)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "User profile updated successfully",
        "updatedUser": PublicProfile::from(&updated),
    })))
}

/// The caller's orders, newest first.
///
/// GET /api/v1/auth/orders
pub async fn orders(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<OrdersResponse>> {
    let orders = OrderService::new(state.store())
        .list_for_buyer(user.id)
        .await?;
    Ok(Json(OrdersResponse::new(orders)))
}

/// Every order, newest first.
///
/// GET /api/v1/auth/all-orders
pub async fn all_orders(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
) -> Result<Json<OrdersResponse>> {
    let orders = OrderService::new(state.store()).list_all().await?;
    Ok(Json(OrdersResponse::new(orders)))
}

/// Move an order to a new status.
///
/// PUT /api/v1/auth/order-status/{orderId}
pub async fn order_status(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiPath(order_id): ApiPath<OrderId>,
    ApiJson(update): ApiJson<StatusUpdate>,
) -> Result<impl IntoResponse> {
    let status = update
        .status
        .ok_or_else(|| AppError::BadRequest("Status is required".into()))?;

    let order = OrderService::new(state.store())
        .set_status(order_id, status)
        .await?;

    tracing::info!(admin_id = %admin.id, order_id = %order.id, status = %order.status, "Order status set");

    Ok(Json(json!({
        "success": true,
        "message": "Order status updated",
        "order": order,
    })))
}
