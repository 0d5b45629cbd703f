//! Domain models for the storefront API.
//!
//! These types are shared by the stores, the services, and the route
//! handlers. Request payloads live next to their handlers.

pub mod catalog;
pub mod order;
pub mod user;

pub use catalog::{Category, Photo, Product, ProductDraft, ProductFilter};
pub use order::{Buyer, CartItem, NewOrder, Order};
pub use user::{NewUser, ProfileChanges, PublicProfile, User};
