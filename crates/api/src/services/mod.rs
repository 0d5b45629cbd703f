//! Business logic services for the storefront API.
//!
//! # Services
//!
//! - `auth` - Registration, login, password reset, profile updates
//! - `token` - Signed identity tokens
//! - `orders` - Order listing and status transitions
//! - `payments` - Gateway charge plus order write

pub mod auth;
pub mod orders;
pub mod payments;
pub mod token;

pub use auth::{AuthError, AuthService};
pub use orders::{OrderError, OrderService};
pub use payments::{PaymentError, PaymentService};
pub use token::{TokenCodec, TokenError};
