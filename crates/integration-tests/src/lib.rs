//! Integration test harness for the ecommerce backend.
//!
//! [`TestApp::spawn`] serves the real router on an ephemeral port, backed by
//! the in-memory store and a scripted payment gateway, and talks to it over
//! HTTP with `reqwest`. No database or gateway credentials are needed.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p ecommerce-integration-tests
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]
#![allow(clippy::missing_panics_doc)]

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::{Client, Response};
use rust_decimal::Decimal;
use secrecy::SecretString;
use serde_json::{Value, json};

use ecommerce_api::db::{MemoryStore, UserStore};
use ecommerce_api::gateway::{GatewayError, PaymentGateway, Transaction};
use ecommerce_api::services::TokenCodec;
use ecommerce_api::state::AppState;
use ecommerce_core::{Email, Role};

/// Signing secret used by every test server.
const TEST_SECRET: &str = "integration-tests-signing-key-0123456789abcdef";

/// Password used by the account helpers.
pub const PASSWORD: &str = "hunter22";

/// How the scripted gateway answers charges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayScript {
    Approve,
    Decline,
    Outage,
}

/// Payment gateway that records charges and answers from a script.
#[derive(Debug)]
pub struct ScriptedGateway {
    script: Mutex<GatewayScript>,
    charges: Mutex<Vec<Decimal>>,
}

impl ScriptedGateway {
    fn new() -> Self {
        Self {
            script: Mutex::new(GatewayScript::Approve),
            charges: Mutex::new(Vec::new()),
        }
    }

    /// Change how later charges are answered.
    pub fn set_script(&self, script: GatewayScript) {
        *self.script.lock() = script;
    }

    /// Amounts of every charge attempted so far.
    pub fn charges(&self) -> Vec<Decimal> {
        self.charges.lock().clone()
    }
}

#[async_trait]
impl PaymentGateway for ScriptedGateway {
    async fn client_token(&self) -> Result<String, GatewayError> {
        match *self.script.lock() {
            GatewayScript::Outage => Err(GatewayError::Status { status: 503 }),
            _ => Ok("sandbox-client-token".to_owned()),
        }
    }

    async fn charge(&self, amount: Decimal, _nonce: &str) -> Result<Transaction, GatewayError> {
        let script = *self.script.lock();
        let mut charges = self.charges.lock();
        charges.push(amount);

        match script {
            GatewayScript::Approve => Ok(Transaction {
                id: format!("txn_{}", charges.len()),
                status: "SUBMITTED_FOR_SETTLEMENT".to_owned(),
                amount,
            }),
            GatewayScript::Decline => Err(GatewayError::Declined("Do Not Honor".to_owned())),
            GatewayScript::Outage => Err(GatewayError::Status { status: 503 }),
        }
    }
}

/// A running API server with direct access to its backing fakes.
pub struct TestApp {
    pub address: String,
    pub client: Client,
    pub store: Arc<MemoryStore>,
    pub gateway: Arc<ScriptedGateway>,
    pub tokens: TokenCodec,
}

impl TestApp {
    /// Serve the router on `127.0.0.1:0` in a background task.
    pub async fn spawn() -> Self {
        let store = Arc::new(MemoryStore::new());
        let gateway = Arc::new(ScriptedGateway::new());
        let secret = SecretString::from(TEST_SECRET);

        let state = AppState::new(store.clone(), gateway.clone(), TokenCodec::new(&secret));
        let app = ecommerce_api::app(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let address = format!(
            "http://{}",
            listener.local_addr().expect("Listener has no address")
        );

        tokio::spawn(async move {
            axum::serve(listener, app)
                .await
                .expect("Test server failed");
        });

        Self {
            address,
            client: Client::new(),
            store,
            gateway,
            tokens: TokenCodec::new(&secret),
        }
    }

    /// Absolute URL for `path`.
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.address)
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> Response {
        let mut request = self.client.get(self.url(path));
        if let Some(token) = token {
            request = request.header("Authorization", token);
        }
        request.send().await.expect("GET failed")
    }

    pub async fn post_json(&self, path: &str, token: Option<&str>, body: &Value) -> Response {
        let mut request = self.client.post(self.url(path)).json(body);
        if let Some(token) = token {
            request = request.header("Authorization", token);
        }
        request.send().await.expect("POST failed")
    }

    pub async fn put_json(&self, path: &str, token: Option<&str>, body: &Value) -> Response {
        let mut request = self.client.put(self.url(path)).json(body);
        if let Some(token) = token {
            request = request.header("Authorization", token);
        }
        request.send().await.expect("PUT failed")
    }

    pub async fn delete(&self, path: &str, token: Option<&str>) -> Response {
        let mut request = self.client.delete(self.url(path));
        if let Some(token) = token {
            request = request.header("Authorization", token);
        }
        request.send().await.expect("DELETE failed")
    }

    /// Register an account with every field filled in.
    pub async fn register(&self, name: &str, email: &str) -> Response {
        self.post_json(
            "/api/v1/auth/register",
            None,
            &json!({
                "name": name,
                "email": email,
                "password": PASSWORD,
                "phone": "555-0100",
                "address": "1 Main St",
                "answer": "blue",
            }),
        )
        .await
    }

    /// Log in and return the token.
    pub async fn login(&self, email: &str, password: &str) -> String {
        let body: Value = self
            .post_json(
                "/api/v1/auth/login",
                None,
                &json!({ "email": email, "password": password }),
            )
            .await
            .json()
            .await
            .expect("Login response is not JSON");
        body["token"]
            .as_str()
            .expect("Login response has no token")
            .to_owned()
    }

    /// Register a regular user and return its token.
    pub async fn user_token(&self, email: &str) -> String {
        self.register("Shopper", email).await;
        self.login(email, PASSWORD).await
    }

    /// Register a user, promote it to administrator, and return its token.
    pub async fn admin_token(&self, email: &str) -> String {
        self.register("Admin", email).await;
        self.store
            .set_role(&Email::parse(email).expect("Invalid admin email"), Role::Admin)
            .await
            .expect("Failed to promote admin");
        self.login(email, PASSWORD).await
    }

    /// Create a category as `admin` and return its id.
    pub async fn create_category(&self, admin: &str, name: &str) -> i64 {
        let body: Value = self
            .post_json(
                "/api/v1/category/create-category",
                Some(admin),
                &json!({ "name": name }),
            )
            .await
            .json()
            .await
            .expect("Category response is not JSON");
        body["category"]["id"]
            .as_i64()
            .expect("Category response has no id")
    }

    /// Create a product without a photo as `admin` and return its JSON.
    pub async fn create_product(&self, admin: &str, name: &str, price: &str, category: i64) -> Value {
        let form = reqwest::multipart::Form::new()
            .text("name", name.to_owned())
            .text("description", format!("{name} description"))
            .text("price", price.to_owned())
            .text("quantity", "10")
            .text("category", category.to_string())
            .text("shipping", "1");

        let response = self
            .client
            .post(self.url("/api/v1/product/create-product"))
            .header("Authorization", admin)
            .multipart(form)
            .send()
            .await
            .expect("Create product failed");
        let body: Value = response.json().await.expect("Product response is not JSON");
        body["product"].clone()
    }
}
