//! HTTP middleware and extractors for the admin API.
//!
//! # Layer Order (outermost first)
//!
//! 1. Sentry layers (hub per request, HTTP transaction)
//! 2. `TraceLayer` (request span with status and latency)
//! 3. Extractors in `auth` (bearer verification per handler)

pub mod auth;

pub use auth::{Authenticated, Authorized};
