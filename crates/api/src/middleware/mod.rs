//! HTTP middleware and extractors for the API.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, transaction tracing), added by the binary
//! 2. CORS
//! 3. `TraceLayer` (request span)
//! 4. Request ID (records the ID on the span opened by `TraceLayer`)
//!
//! Authentication is not a layer: protected handlers take a
//! [`RequireAuth`] or [`RequireAdmin`] extractor.

pub mod auth;
pub mod request_id;

pub use auth::{RequireAdmin, RequireAuth};
pub use request_id::{RequestId, request_id_middleware};
