//! Braintree checkout routes.

use axum::{Json, extract::State, response::IntoResponse};
use serde::Deserialize;
use serde_json::json;

use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::models::CartItem;
use crate::routes::ApiJson;
use crate::services::PaymentService;
use crate::state::AppState;

/// Body of `/braintree/payment`.
#[derive(Debug, Default, Deserialize)]
pub struct CheckoutForm {
    pub nonce: Option<String>,
    #[serde(default)]
    pub cart: Vec<CartItem>,
}

/// Client token for the browser drop-in payment form.
///
/// GET /api/v1/product/braintree/token
pub async fn client_token(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let token = PaymentService::new(state.store(), state.gateway())
        .client_token()
        .await?;

    Ok(Json(json!({
        "success": true,
        "clientToken": token,
    })))
}

/// Charge the cart total and record the order.
///
/// POST /api/v1/product/braintree/payment
pub async fn checkout(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiJson(form): ApiJson<CheckoutForm>,
) -> Result<impl IntoResponse> {
    let order = PaymentService::new(state.store(), state.gateway())
        .capture(user.id, form.cart, form.nonce)
        .await?;

    tracing::info!(order_id = %order.id, buyer = %user.id, "Order placed");
    Ok(Json(json!({ "ok": true })))
}
