//! Braintree GraphQL API client.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::{Decimal, RoundingStrategy};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, de::DeserializeOwned};
use tracing::instrument;

use super::{GatewayError, PaymentGateway, Transaction};
use crate::config::BraintreeConfig;

/// API version pinned in the `Braintree-Version` header.
const API_VERSION: &str = "2019-01-01";

const CLIENT_TOKEN_MUTATION: &str = r"
mutation ClientToken {
  createClientToken {
    clientToken
  }
}";

const CHARGE_MUTATION: &str = r"
mutation Charge($input: ChargePaymentMethodInput!) {
  chargePaymentMethod(input: $input) {
    transaction {
      id
      status
      amount { value }
    }
  }
}";

/// Transaction statuses that mean the charge was refused.
const DECLINED_STATUSES: &[&str] = &[
    "FAILED",
    "GATEWAY_REJECTED",
    "PROCESSOR_DECLINED",
    "SETTLEMENT_DECLINED",
];

/// GraphQL response wrapper.
#[derive(Debug, Deserialize)]
struct GraphQLResponse<T> {
    data: Option<T>,
    errors: Option<Vec<GraphQLErrorResponse>>,
}

#[derive(Debug, Deserialize)]
struct GraphQLErrorResponse {
    message: String,
    #[serde(default)]
    extensions: Option<GraphQLErrorExtensions>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphQLErrorExtensions {
    error_class: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClientTokenData {
    create_client_token: ClientTokenPayload,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClientTokenPayload {
    client_token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChargeData {
    charge_payment_method: ChargePayload,
}

#[derive(Debug, Deserialize)]
struct ChargePayload {
    transaction: TransactionNode,
}

#[derive(Debug, Deserialize)]
struct TransactionNode {
    id: String,
    status: String,
    amount: AmountNode,
}

#[derive(Debug, Deserialize)]
struct AmountNode {
    value: String,
}

/// Braintree GraphQL API client.
///
/// Cheaply cloneable; clones share the HTTP connection pool.
#[derive(Clone)]
pub struct BraintreeClient {
    inner: Arc<BraintreeClientInner>,
}

struct BraintreeClientInner {
    client: reqwest::Client,
    endpoint: String,
    merchant_id: String,
    public_key: String,
    private_key: SecretString,
}

impl BraintreeClient {
    /// Create a client for the configured environment.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::Http` if the HTTP client cannot be built.
    pub fn new(config: &BraintreeConfig) -> Result<Self, GatewayError> {
        Self::with_endpoint(config, config.environment.graphql_url())
    }

    /// Create a client that talks to `endpoint` instead of the public API.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::Http` if the HTTP client cannot be built.
    pub fn with_endpoint(config: &BraintreeConfig, endpoint: &str) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            inner: Arc::new(BraintreeClientInner {
                client,
                endpoint: endpoint.to_owned(),
                merchant_id: config.merchant_id.clone(),
                public_key: config.public_key.clone(),
                private_key: config.private_key.clone(),
            }),
        })
    }

    /// Execute a GraphQL operation.
    async fn execute<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<T, GatewayError> {
        let body = serde_json::json!({
            "query": query,
            "variables": variables,
        });

        let response = self
            .inner
            .client
            .post(&self.inner.endpoint)
            .basic_auth(
                &self.inner.public_key,
                Some(self.inner.private_key.expose_secret()),
            )
            .header("Braintree-Version", API_VERSION)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::Status {
                status: status.as_u16(),
            });
        }

        let graphql_response: GraphQLResponse<T> = response.json().await?;
        if let Some(errors) = graphql_response.errors
            && !errors.is_empty()
        {
            return Err(classify_errors(errors));
        }

        graphql_response
            .data
            .ok_or_else(|| GatewayError::InvalidResponse("no data in response".to_owned()))
    }
}

impl std::fmt::Debug for BraintreeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BraintreeClient")
            .field("endpoint", &self.inner.endpoint)
            .field("merchant_id", &self.inner.merchant_id)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl PaymentGateway for BraintreeClient {
    #[instrument(skip(self), fields(merchant_id = %self.inner.merchant_id))]
    async fn client_token(&self) -> Result<String, GatewayError> {
        let data: ClientTokenData = self
            .execute(CLIENT_TOKEN_MUTATION, serde_json::Value::Null)
            .await?;
        Ok(data.create_client_token.client_token)
    }

    #[instrument(skip(self, nonce), fields(merchant_id = %self.inner.merchant_id, amount = %amount))]
    async fn charge(&self, amount: Decimal, nonce: &str) -> Result<Transaction, GatewayError> {
        let variables = serde_json::json!({
            "input": {
                "paymentMethodId": nonce,
                "transaction": { "amount": format_amount(amount) },
            }
        });

        let data: ChargeData = self.execute(CHARGE_MUTATION, variables).await?;
        let transaction = into_transaction(data.charge_payment_method.transaction)?;
        tracing::info!(transaction_id = %transaction.id, status = %transaction.status, "Charge settled");
        Ok(transaction)
    }
}

/// Format an amount the way the API expects: two decimal places.
fn format_amount(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    format!("{rounded:.2}")
}

/// Validation errors are refusals (bad nonce, amount rules); anything else
/// is a gateway failure.
fn classify_errors(errors: Vec<GraphQLErrorResponse>) -> GatewayError {
    let declined = errors.iter().any(|e| {
        e.extensions
            .as_ref()
            .and_then(|x| x.error_class.as_deref())
            == Some("VALIDATION")
    });
    let message = errors
        .into_iter()
        .map(|e| e.message)
        .collect::<Vec<_>>()
        .join("; ");

    if declined {
        GatewayError::Declined(message)
    } else {
        GatewayError::GraphQL(message)
    }
}

fn into_transaction(node: TransactionNode) -> Result<Transaction, GatewayError> {
    if DECLINED_STATUSES.contains(&node.status.as_str()) {
        return Err(GatewayError::Declined(format!(
            "Transaction {} was declined ({})",
            node.id, node.status
        )));
    }

    let amount = node.amount.value.parse::<Decimal>().map_err(|e| {
        GatewayError::InvalidResponse(format!("bad amount {:?}: {e}", node.amount.value))
    })?;

    Ok(Transaction {
        id: node.id,
        status: node.status,
        amount,
    })
}
