//! HTTP route handlers for the admin API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                 - Liveness check
//! GET  /health/ready           - Readiness check (store reachable)
//!
//! # Admin directory
//! GET  /admin/check            - Is the caller an admin?
//! GET  /admins?page&limit      - List admins (manageAdmins)
//! POST /admins                 - Grant admin access (manageAdmins, or no admins yet)
//! GET  /make-first-admin       - Self-bootstrap while no admin exists
//!
//! # Accounts
//! POST /users                  - Register the caller's account
//! GET  /users/{uid}            - Read an account (owner or manageUsers)
//! PUT  /users/{uid}            - Update a profile (owner or manageUsers)
//! ```

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};

use crate::state::AppState;

pub mod admins;
pub mod users;

/// API routes, without state or outer layers.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .route("/admin/check", get(admins::check))
        .route("/admins", get(admins::list).post(admins::create))
        .route("/make-first-admin", get(admins::make_first_admin))
        .route("/users", post(users::register))
        .route("/users/{uid}", get(users::show).put(users::update))
}

/// Routes bound to `state`, ready to serve.
pub fn router(state: AppState) -> Router {
    routes().with_state(state)
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the store is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.store().health_check().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, backend = state.store().backend(), "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
