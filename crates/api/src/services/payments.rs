//! Payment bridge: charges a cart through the gateway and records the order.

use rust_decimal::Decimal;
use thiserror::Error;
use tracing::instrument;

use ecommerce_core::UserId;

use crate::db::{OrderStore, RepositoryError, Store};
use crate::gateway::{GatewayError, PaymentGateway};
use crate::models::{CartItem, NewOrder, Order};

/// Errors from payment operations.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// The cart has no items.
    #[error("Cart is empty")]
    EmptyCart,

    /// No payment nonce was supplied.
    #[error("Payment nonce is required")]
    MissingNonce,

    /// A cart item has a negative price.
    #[error("Cart item prices cannot be negative")]
    NegativePrice,

    /// The cart total does not fit in a decimal.
    #[error("Cart total is too large")]
    TotalOverflow,

    /// The gateway refused the charge.
    #[error("{0}")]
    Declined(String),

    /// The gateway could not be reached or failed.
    #[error("payment gateway error: {0}")]
    Gateway(GatewayError),

    /// The card was charged but the order could not be written.
    #[error("order for transaction {transaction_id} was not recorded: {source}")]
    OrderNotRecorded {
        transaction_id: String,
        source: RepositoryError,
    },
}

impl From<GatewayError> for PaymentError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Declined(message) => Self::Declined(message),
            other => Self::Gateway(other),
        }
    }
}

/// Sum the cart with exact decimal arithmetic.
///
/// # Errors
///
/// Returns `PaymentError::EmptyCart`, `PaymentError::NegativePrice`, or
/// `PaymentError::TotalOverflow`.
pub fn cart_total(cart: &[CartItem]) -> Result<Decimal, PaymentError> {
    if cart.is_empty() {
        return Err(PaymentError::EmptyCart);
    }
    cart.iter().try_fold(Decimal::ZERO, |total, item| {
        if item.price < Decimal::ZERO {
            return Err(PaymentError::NegativePrice);
        }
        total
            .checked_add(item.price)
            .ok_or(PaymentError::TotalOverflow)
    })
}

/// Payment bridge service.
pub struct PaymentService<'a> {
    store: &'a dyn Store,
    gateway: &'a dyn PaymentGateway,
}

impl<'a> PaymentService<'a> {
    /// Create a new payment service.
    #[must_use]
    pub const fn new(store: &'a dyn Store, gateway: &'a dyn PaymentGateway) -> Self {
        Self { store, gateway }
    }

    /// Fetch a client token for the browser payment form.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::Gateway` if the gateway fails.
    #[instrument(skip(self))]
    pub async fn client_token(&self) -> Result<String, PaymentError> {
        Ok(self.gateway.client_token().await?)
    }

    /// Charge the cart total and record exactly one order on success.
    ///
    /// Nothing is written when the charge fails.
    ///
    /// # Errors
    ///
    /// Returns a validation error before contacting the gateway,
    /// `PaymentError::Declined` or `PaymentError::Gateway` if the charge
    /// fails, and `PaymentError::OrderNotRecorded` if the card was charged
    /// but the order write failed.
    #[instrument(skip(self, cart, nonce), fields(items = cart.len()))]
    pub async fn capture(
        &self,
        buyer: UserId,
        cart: Vec<CartItem>,
        nonce: Option<String>,
    ) -> Result<Order, PaymentError> {
        let total = cart_total(&cart)?;
        let nonce = nonce
            .filter(|n| !n.trim().is_empty())
            .ok_or(PaymentError::MissingNonce)?;

        let transaction = self.gateway.charge(total, &nonce).await?;
        let payment = serde_json::json!({
            "success": true,
            "transaction": transaction,
        });

        self.store
            .insert_order(NewOrder {
                products: cart,
                payment,
                buyer,
            })
            .await
            .map_err(|source| {
                tracing::error!(
                    transaction_id = %transaction.id,
                    amount = %total,
                    buyer = %buyer,
                    error = %source,
                    "Charge settled but order write failed"
                );
                PaymentError::OrderNotRecorded {
                    transaction_id: transaction.id.clone(),
                    source,
                }
            })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::{MemoryStore, UserStore};
    use crate::gateway::Transaction;
    use crate::models::NewUser;
    use async_trait::async_trait;
    use ecommerce_core::Email;
    use parking_lot::Mutex;

    struct FakeGateway {
        decline: bool,
        charged: Mutex<Vec<Decimal>>,
    }

    impl FakeGateway {
        fn new(decline: bool) -> Self {
            Self {
                decline,
                charged: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl PaymentGateway for FakeGateway {
        async fn client_token(&self) -> Result<String, GatewayError> {
            Ok("client-token".to_owned())
        }

        async fn charge(&self, amount: Decimal, _nonce: &str) -> Result<Transaction, GatewayError> {
            self.charged.lock().push(amount);
            if self.decline {
                return Err(GatewayError::Declined("Do Not Honor".to_owned()));
            }
            Ok(Transaction {
                id: "txn_1".to_owned(),
                status: "SUBMITTED_FOR_SETTLEMENT".to_owned(),
                amount,
            })
        }
    }

    async fn buyer(store: &MemoryStore) -> UserId {
        store
            .insert_user(NewUser {
                name: "Kim".to_owned(),
                email: Email::parse("kim@example.com").unwrap(),
                phone: "1".to_owned(),
                address: "2".to_owned(),
                password_hash: "h".to_owned(),
                answer_hash: "a".to_owned(),
            })
            .await
            .unwrap()
            .id
    }

    fn cart(prices: &[i64]) -> Vec<CartItem> {
        prices.iter().map(|p| CartItem::priced(Decimal::from(*p))).collect()
    }

    #[test]
    fn test_cart_total() {
        assert_eq!(cart_total(&cart(&[10, 15, 20])).unwrap(), Decimal::from(45));
        let cents = vec![
            CartItem::priced("0.10".parse().unwrap()),
            CartItem::priced("0.20".parse().unwrap()),
        ];
        assert_eq!(cart_total(&cents).unwrap(), "0.30".parse::<Decimal>().unwrap());
        assert!(matches!(cart_total(&[]), Err(PaymentError::EmptyCart)));
        assert!(matches!(
            cart_total(&cart(&[5, -1])),
            Err(PaymentError::NegativePrice)
        ));
    }

    #[tokio::test]
    async fn test_capture_records_one_order() {
        let store = MemoryStore::new();
        let gateway = FakeGateway::new(false);
        let buyer = buyer(&store).await;

        let order = PaymentService::new(&store, &gateway)
            .capture(buyer, cart(&[10, 15, 20]), Some("fake-valid-nonce".to_owned()))
            .await
            .unwrap();

        assert_eq!(gateway.charged.lock().as_slice(), &[Decimal::from(45)]);
        assert_eq!(store.order_count(), 1);
        assert_eq!(order.products.len(), 3);
        assert_eq!(order.buyer.id, buyer);
        assert_eq!(order.payment["transaction"]["id"], "txn_1");
    }

    #[tokio::test]
    async fn test_declined_capture_records_nothing() {
        let store = MemoryStore::new();
        let gateway = FakeGateway::new(true);
        let buyer = buyer(&store).await;

        let err = PaymentService::new(&store, &gateway)
            .capture(buyer, cart(&[10]), Some("nonce".to_owned()))
            .await
            .unwrap_err();

        assert!(matches!(err, PaymentError::Declined(_)));
        assert_eq!(store.order_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_nonce_skips_gateway() {
        let store = MemoryStore::new();
        let gateway = FakeGateway::new(false);
        let buyer = buyer(&store).await;

        let err = PaymentService::new(&store, &gateway)
            .capture(buyer, cart(&[10]), Some("  ".to_owned()))
            .await
            .unwrap_err();

        assert!(matches!(err, PaymentError::MissingNonce));
        assert!(gateway.charged.lock().is_empty());
    }
}
