//! Health checks and request correlation.

#![allow(clippy::unwrap_used)]

use ecommerce_integration_tests::TestApp;
use reqwest::StatusCode;

#[tokio::test]
async fn test_liveness_and_readiness() {
    let app = TestApp::spawn().await;

    let live = app.get("/health", None).await;
    assert_eq!(live.status(), StatusCode::OK);
    assert_eq!(live.text().await.unwrap(), "ok");

    let ready = app.get("/health/ready", None).await;
    assert_eq!(ready.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_request_id_is_echoed_or_generated() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .get(app.url("/health"))
        .header("x-request-id", "edge-1234")
        .send()
        .await
        .unwrap();
    assert_eq!(response.headers()["x-request-id"], "edge-1234");

    let response = app.get("/health", None).await;
    let generated = response.headers()["x-request-id"].to_str().unwrap();
    assert_eq!(generated.len(), 36);
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let app = TestApp::spawn().await;
    let response = app.get("/api/v1/nope", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
