//! Checkout and the order ledger over HTTP.

#![allow(clippy::unwrap_used)]

use ecommerce_integration_tests::{GatewayScript, TestApp};
use reqwest::StatusCode;
use rust_decimal::Decimal;
use serde_json::{Value, json};

async fn checkout(app: &TestApp, token: &str, cart: &Value) -> reqwest::Response {
    app.post_json(
        "/api/v1/product/braintree/payment",
        Some(token),
        &json!({ "nonce": "fake-valid-nonce", "cart": cart }),
    )
    .await
}

fn cart() -> Value {
    json!([
        { "_id": "a", "name": "Tee", "price": 10 },
        { "_id": "b", "name": "Cap", "price": 15 },
        { "_id": "c", "name": "Mug", "price": 20 },
    ])
}

// =============================================================================
// Checkout
// =============================================================================

#[tokio::test]
async fn test_client_token_is_public() {
    let app = TestApp::spawn().await;

    let body: Value = app
        .get("/api/v1/product/braintree/token", None)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(body["clientToken"], "sandbox-client-token");
}

#[tokio::test]
async fn test_checkout_charges_total_and_records_one_order() {
    let app = TestApp::spawn().await;
    let token = app.user_token("buyer@example.com").await;

    let response = checkout(&app, &token, &cart()).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["ok"], true);

    assert_eq!(app.gateway.charges(), [Decimal::from(45)]);
    assert_eq!(app.store.order_count(), 1);

    let orders: Value = app
        .get("/api/v1/auth/orders", Some(&token))
        .await
        .json()
        .await
        .unwrap();
    let order = &orders["orders"][0];
    assert_eq!(order["status"], "not_processed");
    assert_eq!(order["buyer"]["name"], "Shopper");
    assert_eq!(order["products"][1]["name"], "Cap");
    assert_eq!(order["payment"]["success"], true);
    assert_eq!(order["payment"]["transaction"]["id"], "txn_1");
}

#[tokio::test]
async fn test_declined_charge_records_nothing() {
    let app = TestApp::spawn().await;
    let token = app.user_token("buyer@example.com").await;
    app.gateway.set_script(GatewayScript::Decline);

    let response = checkout(&app, &token, &cart()).await;
    assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);

    assert_eq!(app.gateway.charges().len(), 1);
    assert_eq!(app.store.order_count(), 0);
}

#[tokio::test]
async fn test_gateway_outage_is_bad_gateway() {
    let app = TestApp::spawn().await;
    let token = app.user_token("buyer@example.com").await;
    app.gateway.set_script(GatewayScript::Outage);

    let response = checkout(&app, &token, &cart()).await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(app.store.order_count(), 0);

    let token_response = app.get("/api/v1/product/braintree/token", None).await;
    assert_eq!(token_response.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_checkout_validates_before_charging() {
    let app = TestApp::spawn().await;
    let token = app.user_token("buyer@example.com").await;

    let empty = checkout(&app, &token, &json!([])).await;
    assert_eq!(empty.status(), StatusCode::BAD_REQUEST);

    let negative = checkout(&app, &token, &json!([{ "price": -5 }])).await;
    assert_eq!(negative.status(), StatusCode::BAD_REQUEST);

    let no_nonce = app
        .post_json(
            "/api/v1/product/braintree/payment",
            Some(&token),
            &json!({ "cart": cart() }),
        )
        .await;
    assert_eq!(no_nonce.status(), StatusCode::BAD_REQUEST);

    assert!(app.gateway.charges().is_empty());
    assert_eq!(app.store.order_count(), 0);
}

#[tokio::test]
async fn test_checkout_requires_token() {
    let app = TestApp::spawn().await;

    let response = app
        .post_json(
            "/api/v1/product/braintree/payment",
            None,
            &json!({ "nonce": "n", "cart": cart() }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(app.gateway.charges().is_empty());
}

// =============================================================================
// Ledger
// =============================================================================

#[tokio::test]
async fn test_buyers_only_see_their_own_orders() {
    let app = TestApp::spawn().await;
    let alice = app.user_token("alice@example.com").await;
    let bob = app.user_token("bob@example.com").await;
    let admin = app.admin_token("admin@example.com").await;

    checkout(&app, &alice, &cart()).await;
    checkout(&app, &bob, &cart()).await;
    checkout(&app, &bob, &cart()).await;

    let mine: Value = app
        .get("/api/v1/auth/orders", Some(&alice))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(mine["orders"].as_array().unwrap().len(), 1);

    let all: Value = app
        .get("/api/v1/auth/all-orders", Some(&admin))
        .await
        .json()
        .await
        .unwrap();
    let all = all["orders"].as_array().unwrap();
    assert_eq!(all.len(), 3);
    assert!(all[0]["id"].as_i64().unwrap() > all[2]["id"].as_i64().unwrap());
}

#[tokio::test]
async fn test_order_status_follows_transition_table() {
    let app = TestApp::spawn().await;
    let buyer = app.user_token("buyer@example.com").await;
    let admin = app.admin_token("admin@example.com").await;
    checkout(&app, &buyer, &cart()).await;

    let orders: Value = app
        .get("/api/v1/auth/all-orders", Some(&admin))
        .await
        .json()
        .await
        .unwrap();
    let id = orders["orders"][0]["id"].as_i64().unwrap();
    let path = format!("/api/v1/auth/order-status/{id}");

    let skip = app
        .put_json(&path, Some(&admin), &json!({ "status": "delivered" }))
        .await;
    assert_eq!(skip.status(), StatusCode::CONFLICT);

    for status in ["processing", "shipped", "delivered"] {
        let response = app
            .put_json(&path, Some(&admin), &json!({ "status": status }))
            .await;
        assert_eq!(response.status(), StatusCode::OK, "{status}");
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["order"]["status"], status);
    }

    let back = app
        .put_json(&path, Some(&admin), &json!({ "status": "cancelled" }))
        .await;
    assert_eq!(back.status(), StatusCode::CONFLICT);

    let missing = app
        .put_json(&path, Some(&admin), &json!({}))
        .await;
    assert_eq!(missing.status(), StatusCode::BAD_REQUEST);

    let bogus = app
        .put_json(&path, Some(&admin), &json!({ "status": "teleported" }))
        .await;
    assert_eq!(bogus.status(), StatusCode::BAD_REQUEST);

    let unknown = app
        .put_json(
            "/api/v1/auth/order-status/9999",
            Some(&admin),
            &json!({ "status": "processing" }),
        )
        .await;
    assert_eq!(unknown.status(), StatusCode::NOT_FOUND);

    let as_buyer = app
        .put_json(&path, Some(&buyer), &json!({ "status": "processing" }))
        .await;
    assert_eq!(as_buyer.status(), StatusCode::FORBIDDEN);
}
