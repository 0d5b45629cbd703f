//! HTTP route handlers for the storefront API.
//!
//! # Route Structure
//!
//! ```text
//! # Auth (/api/v1/auth)
//! POST /register                  - Create an account
//! POST /login                     - Exchange credentials for a token
//! POST /forgot-password           - Reset password with the security answer
//! GET  /test                      - Admin smoke test
//! GET  /user-auth                 - Token check (auth)
//! GET  /admin-auth                - Token check (admin)
//! PUT  /profile                   - Update own profile (auth)
//! GET  /orders                    - Own orders (auth)
//! GET  /all-orders                - Every order (admin)
//! PUT  /order-status/{orderId}    - Move an order through its lifecycle (admin)
//!
//! # Categories (/api/v1/category)
//! POST   /create-category         - Create (admin)
//! PUT    /update-category/{id}    - Rename (admin)
//! GET    /list-category           - All categories
//! GET    /single-category/{slug}  - One category
//! DELETE /delete-category/{id}    - Delete (admin)
//!
//! # Products (/api/v1/product)
//! POST   /create-product          - Multipart create (admin)
//! PUT    /update-product/{id}     - Multipart update (admin)
//! GET    /list-product            - Newest 12
//! GET    /single-product/{slug}   - One product
//! GET    /photo-product/{id}      - Raw photo bytes
//! DELETE /delete-product/{id}     - Delete (admin)
//! POST   /product-filters         - Filter by categories and price range
//! GET    /product-count           - Total product count
//! GET    /product-list/{page}     - Pages of 3, by id ascending
//! GET    /product-search/{keyword} - Name/description search
//! GET    /product-related/{pid}/{cid} - Two others from the category
//! GET    /product-category/{slug} - Category and its products
//! GET    /braintree/token         - Payment client token
//! POST   /braintree/payment       - Charge the cart and record an order (auth)
//! ```

pub mod auth;
pub mod category;
pub mod payment;
pub mod product;

use axum::{
    Router,
    extract::{DefaultBodyLimit, FromRequest, FromRequestParts},
    routing::{delete, get, post, put},
};

use crate::error::AppError;
use crate::state::AppState;

/// Body limit for product forms: a full-size photo plus the text fields.
///
/// Photos over [`crate::models::Photo::MAX_BYTES`] are rejected by the
/// handler with a readable message, so the transport limit sits above it.
const PRODUCT_BODY_LIMIT: usize = 4 * 1024 * 1024;

/// JSON body extractor whose rejections use the API error envelope.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Path extractor whose rejections use the API error envelope.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct ApiPath<T>(pub T);

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/forgot-password", post(auth::forgot_password))
        .route("/test", get(auth::admin_test))
        .route("/user-auth", get(auth::user_auth))
        .route("/admin-auth", get(auth::admin_auth))
        .route("/profile", put(auth::update_profile))
        .route("/orders", get(auth::orders))
        .route("/all-orders", get(auth::all_orders))
        .route("/order-status/{order_id}", put(auth::order_status))
}

/// Create the category routes router.
pub fn category_routes() -> Router<AppState> {
    Router::new()
        .route("/create-category", post(category::create))
        .route("/update-category/{id}", put(category::update))
        .route("/list-category", get(category::list))
        .route("/single-category/{slug}", get(category::single))
        .route("/delete-category/{id}", delete(category::remove))
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/create-product", post(product::create))
        .route("/update-product/{id}", put(product::update))
        .route("/list-product", get(product::list))
        .route("/single-product/{slug}", get(product::single))
        .route("/photo-product/{id}", get(product::photo))
        .route("/delete-product/{id}", delete(product::remove))
        .route("/product-filters", post(product::filters))
        .route("/product-count", get(product::count))
        .route("/product-list/{page}", get(product::page))
        .route("/product-search/{keyword}", get(product::search))
        .route("/product-related/{pid}/{cid}", get(product::related))
        .route("/product-category/{slug}", get(product::by_category))
        .route("/braintree/token", get(payment::client_token))
        .route("/braintree/payment", post(payment::checkout))
        .layer(DefaultBodyLimit::max(PRODUCT_BODY_LIMIT))
}

/// Create all API routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/api/v1/auth", auth_routes())
        .nest("/api/v1/category", category_routes())
        .nest("/api/v1/product", product_routes())
}
