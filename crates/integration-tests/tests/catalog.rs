//! Category and product endpoints over HTTP.

#![allow(clippy::unwrap_used)]

use ecommerce_integration_tests::TestApp;
use reqwest::{
    StatusCode,
    multipart::{Form, Part},
};
use serde_json::{Value, json};

fn product_form(name: &str, category: i64) -> Form {
    Form::new()
        .text("name", name.to_owned())
        .text("description", "Soft cotton")
        .text("price", "19.99")
        .text("quantity", "4")
        .text("category", category.to_string())
}

// =============================================================================
// Categories
// =============================================================================

#[tokio::test]
async fn test_category_lifecycle() {
    let app = TestApp::spawn().await;
    let admin = app.admin_token("admin@example.com").await;

    let created = app
        .post_json(
            "/api/v1/category/create-category",
            Some(&admin),
            &json!({ "name": "Summer Shirts" }),
        )
        .await;
    assert_eq!(created.status(), StatusCode::CREATED);
    let body: Value = created.json().await.unwrap();
    assert_eq!(body["category"]["slug"], "Summer-Shirts");
    let id = body["category"]["id"].as_i64().unwrap();

    let again = app
        .post_json(
            "/api/v1/category/create-category",
            Some(&admin),
            &json!({ "name": "Summer Shirts" }),
        )
        .await;
    assert_eq!(again.status(), StatusCode::OK);
    let body: Value = again.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Category already exists!");

    let renamed = app
        .put_json(
            &format!("/api/v1/category/update-category/{id}"),
            Some(&admin),
            &json!({ "name": "Winter Coats" }),
        )
        .await;
    assert_eq!(renamed.status(), StatusCode::OK);

    let single: Value = app
        .get("/api/v1/category/single-category/Winter-Coats", None)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(single["category"]["id"], id);

    let list: Value = app
        .get("/api/v1/category/list-category", None)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(list["message"], "List of categories");
    assert_eq!(list["category"].as_array().unwrap().len(), 1);

    let deleted = app
        .delete(&format!("/api/v1/category/delete-category/{id}"), Some(&admin))
        .await;
    assert_eq!(deleted.status(), StatusCode::OK);

    let missing = app
        .get("/api/v1/category/single-category/Winter-Coats", None)
        .await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_category_mutations_require_admin() {
    let app = TestApp::spawn().await;
    let user = app.user_token("user@example.com").await;

    let response = app
        .post_json(
            "/api/v1/category/create-category",
            Some(&user),
            &json!({ "name": "Hats" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .post_json("/api/v1/category/create-category", None, &json!({ "name": "Hats" }))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .delete("/api/v1/category/delete-category/1", Some(&user))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app.delete("/api/v1/category/delete-category/1", None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .client
        .post(app.url("/api/v1/product/create-product"))
        .header("Authorization", &user)
        .multipart(product_form("Tee", 1))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .client
        .post(app.url("/api/v1/product/create-product"))
        .multipart(product_form("Tee", 1))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_category_in_use_cannot_be_deleted() {
    let app = TestApp::spawn().await;
    let admin = app.admin_token("admin@example.com").await;
    let category = app.create_category(&admin, "Shirts").await;
    app.create_product(&admin, "Tee", "10", category).await;

    let response = app
        .delete(
            &format!("/api/v1/category/delete-category/{category}"),
            Some(&admin),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let unknown = app
        .delete("/api/v1/category/delete-category/9999", Some(&admin))
        .await;
    assert_eq!(unknown.status(), StatusCode::NOT_FOUND);
}

// =============================================================================
// Product writes
// =============================================================================

#[tokio::test]
async fn test_create_product_validates_in_order() {
    let app = TestApp::spawn().await;
    let admin = app.admin_token("admin@example.com").await;

    let form = Form::new().text("price", "5").text("quantity", "1");
    let response = app
        .client
        .post(app.url("/api/v1/product/create-product"))
        .header("Authorization", &admin)
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Name is required!");
}

#[tokio::test]
async fn test_unknown_category_is_a_bad_request() {
    let app = TestApp::spawn().await;
    let admin = app.admin_token("admin@example.com").await;

    let response = app
        .client
        .post(app.url("/api/v1/product/create-product"))
        .header("Authorization", &admin)
        .multipart(product_form("Tee", 42))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_oversized_photo_is_rejected() {
    let app = TestApp::spawn().await;
    let admin = app.admin_token("admin@example.com").await;
    let category = app.create_category(&admin, "Shirts").await;

    let photo = Part::bytes(vec![0_u8; 1_000_001])
        .file_name("big.png")
        .mime_str("image/png")
        .unwrap();
    let response = app
        .client
        .post(app.url("/api/v1/product/create-product"))
        .header("Authorization", &admin)
        .multipart(product_form("Tee", category).part("photo", photo))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Photo is required and photo size should be less than 1MB");

    let count: Value = app
        .get("/api/v1/product/product-count", None)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(count["total"], 0);
}

#[tokio::test]
async fn test_photo_round_trip_and_update_keeps_photo() {
    let app = TestApp::spawn().await;
    let admin = app.admin_token("admin@example.com").await;
    let category = app.create_category(&admin, "Shirts").await;

    let bytes = vec![0x89, b'P', b'N', b'G', 1, 2, 3];
    let photo = Part::bytes(bytes.clone())
        .file_name("tee.png")
        .mime_str("image/png")
        .unwrap();
    let created: Value = app
        .client
        .post(app.url("/api/v1/product/create-product"))
        .header("Authorization", &admin)
        .multipart(product_form("Tee", category).part("photo", photo))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let id = created["product"]["id"].as_i64().unwrap();
    assert_eq!(created["product"]["has_photo"], true);
    assert_eq!(created["message"], "Product successfully created!");
    assert_eq!(created["product"]["price"], json!(19.99));
    assert!(created["product"].get("photo").is_none());

    let updated = app
        .client
        .put(app.url(&format!("/api/v1/product/update-product/{id}")))
        .header("Authorization", &admin)
        .multipart(product_form("Tee Deluxe", category))
        .send()
        .await
        .unwrap();
    assert_eq!(updated.status(), StatusCode::OK);

    let response = app
        .get(&format!("/api/v1/product/photo-product/{id}"), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "image/png");
    assert_eq!(response.bytes().await.unwrap().to_vec(), bytes);

    let single: Value = app
        .get("/api/v1/product/single-product/Tee-Deluxe", None)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(single["product"]["category"]["name"], "Shirts");
}

#[tokio::test]
async fn test_delete_product() {
    let app = TestApp::spawn().await;
    let admin = app.admin_token("admin@example.com").await;
    let category = app.create_category(&admin, "Shirts").await;
    let product = app.create_product(&admin, "Tee", "10", category).await;
    let id = product["id"].as_i64().unwrap();

    let path = format!("/api/v1/product/delete-product/{id}");
    assert_eq!(app.delete(&path, Some(&admin)).await.status(), StatusCode::OK);
    assert_eq!(
        app.delete(&path, Some(&admin)).await.status(),
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        app.get(&format!("/api/v1/product/photo-product/{id}"), None)
            .await
            .status(),
        StatusCode::NOT_FOUND
    );
}

// =============================================================================
// Product reads
// =============================================================================

#[tokio::test]
async fn test_filters_combine_category_and_price() {
    let app = TestApp::spawn().await;
    let admin = app.admin_token("admin@example.com").await;
    let shirts = app.create_category(&admin, "Shirts").await;
    let hats = app.create_category(&admin, "Hats").await;
    app.create_product(&admin, "Cheap Tee", "5", shirts).await;
    app.create_product(&admin, "Fancy Tee", "50", shirts).await;
    app.create_product(&admin, "Cap", "15", hats).await;

    let body: Value = app
        .post_json(
            "/api/v1/product/product-filters",
            None,
            &json!({ "checked": [shirts], "radio": [0, 19.99] }),
        )
        .await
        .json()
        .await
        .unwrap();
    let names: Vec<&str> = body["products"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["Cheap Tee"]);

    let inclusive: Value = app
        .post_json(
            "/api/v1/product/product-filters",
            None,
            &json!({ "checked": [shirts], "radio": [10, 50] }),
        )
        .await
        .json()
        .await
        .unwrap();
    let products = inclusive["products"].as_array().unwrap();
    assert_eq!(products.len(), 1);
    assert_eq!(products[0]["name"], "Fancy Tee");

    let everything: Value = app
        .post_json("/api/v1/product/product-filters", None, &json!({}))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(everything["products"].as_array().unwrap().len(), 3);

    let bad = app
        .post_json(
            "/api/v1/product/product-filters",
            None,
            &json!({ "radio": [10] }),
        )
        .await;
    assert_eq!(bad.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_pagination_search_and_related() {
    let app = TestApp::spawn().await;
    let admin = app.admin_token("admin@example.com").await;
    let shirts = app.create_category(&admin, "Shirts").await;
    let hats = app.create_category(&admin, "Hats").await;

    let mut ids = Vec::new();
    for name in ["Red Tee", "Blue Tee", "Green Tee", "Tee 100%"] {
        let product = app.create_product(&admin, name, "10", shirts).await;
        ids.push(product["id"].as_i64().unwrap());
    }
    app.create_product(&admin, "Cap", "12", hats).await;

    let count: Value = app
        .get("/api/v1/product/product-count", None)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(count["total"], 5);

    let page1: Value = app
        .get("/api/v1/product/product-list/1", None)
        .await
        .json()
        .await
        .unwrap();
    let page2: Value = app
        .get("/api/v1/product/product-list/2", None)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(page1["products"].as_array().unwrap().len(), 3);
    assert_eq!(page2["products"].as_array().unwrap().len(), 2);
    assert_eq!(page1["products"][0]["id"], ids[0]);

    let zero = app.get("/api/v1/product/product-list/0", None).await;
    assert_eq!(zero.status(), StatusCode::BAD_REQUEST);

    let search: Value = app
        .get("/api/v1/product/product-search/TEE", None)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(search["products"].as_array().unwrap().len(), 4);

    // `%` is matched literally, not as a wildcard.
    let literal: Value = app
        .get("/api/v1/product/product-search/100%25", None)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(literal["products"].as_array().unwrap().len(), 1);

    let related: Value = app
        .get(
            &format!("/api/v1/product/product-related/{}/{shirts}", ids[0]),
            None,
        )
        .await
        .json()
        .await
        .unwrap();
    let related = related["products"].as_array().unwrap();
    assert_eq!(related.len(), 2);
    assert!(related.iter().all(|p| p["id"] != ids[0]));

    let by_category: Value = app
        .get("/api/v1/product/product-category/Hats", None)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(by_category["category"]["name"], "Hats");
    assert_eq!(by_category["products"].as_array().unwrap().len(), 1);

    let latest: Value = app
        .get("/api/v1/product/list-product", None)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(latest["total"], 5);
    assert_eq!(latest["products"][0]["name"], "Cap");
}
