//! Order ledger types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use ecommerce_core::{OrderId, OrderStatus, UserId};

/// One line of a submitted cart.
///
/// Only `price` is interpreted; every other field the client sent is kept
/// verbatim so the order records the cart exactly as purchased.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

impl CartItem {
    /// Build an item from a price and no extra fields.
    #[must_use]
    pub fn priced(price: Decimal) -> Self {
        Self {
            price,
            rest: Map::new(),
        }
    }
}

/// The buyer as shown on an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Buyer {
    pub id: UserId,
    pub name: String,
}

/// A recorded purchase.
#[derive(Debug, Clone, Serialize)]
pub struct Order {
    pub id: OrderId,
    /// Cart snapshot at purchase time.
    pub products: Vec<CartItem>,
    /// Gateway transaction result.
    pub payment: Value,
    pub buyer: Buyer,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields for an order written after a successful charge.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub products: Vec<CartItem>,
    pub payment: Value,
    pub buyer: UserId,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_cart_item_keeps_unknown_fields() {
        let item: CartItem = serde_json::from_str(
            r#"{"_id":"p1","name":"Lamp","price":19.99,"quantity":3}"#,
        )
        .unwrap();
        assert_eq!(item.price, Decimal::from_str("19.99").unwrap());
        assert_eq!(item.rest.get("name").unwrap(), "Lamp");
        assert!(!item.rest.contains_key("price"));
    }

    #[test]
    fn test_cart_item_accepts_string_price() {
        let item: CartItem = serde_json::from_str(r#"{"price":"10"}"#).unwrap();
        assert_eq!(item.price, Decimal::from(10));
    }

    #[test]
    fn test_cart_item_price_serializes_as_number() {
        let item: CartItem = serde_json::from_str(r#"{"name":"Lamp","price":"19.99"}"#).unwrap();
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["price"], serde_json::json!(19.99));
        assert_eq!(json["name"], "Lamp");
    }

    #[test]
    fn test_cart_item_requires_price() {
        assert!(serde_json::from_str::<CartItem>(r#"{"name":"Lamp"}"#).is_err());
    }
}
