//! Integration tests for the Gadget Pulse admin API.
//!
//! Tests drive the real router in-process with `tower::ServiceExt::oneshot`,
//! backed by the in-memory store and a static identity provider, so they need
//! neither a database nor network access.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p gadget-pulse-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `admin_directory` - Bootstrap, admin creation, listing, permission gates
//! - `accounts` - Registration and profile access rules

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use serde_json::Value;
use tower::ServiceExt;

use gadget_pulse_admin::db::InMemoryDirectoryStore;
use gadget_pulse_admin::identity::StaticIdentityProvider;
use gadget_pulse_admin::routes;
use gadget_pulse_admin::state::AppState;
use gadget_pulse_core::{Email, Uid};

/// A user known to the test identity provider.
#[derive(Debug, Clone, Copy)]
pub struct TestUser {
    pub token: &'static str,
    pub uid: &'static str,
    pub email: &'static str,
    pub name: Option<&'static str>,
}

pub const ALICE: TestUser = TestUser {
    token: "token-alice",
    uid: "u1",
    email: "a@x.com",
    name: Some("Alice"),
};

pub const BOB: TestUser = TestUser {
    token: "token-bob",
    uid: "u2",
    email: "b@x.com",
    name: None,
};

pub const CAROL: TestUser = TestUser {
    token: "token-carol",
    uid: "u3",
    email: "c@x.com",
    name: Some("Carol"),
};

pub const DAVE: TestUser = TestUser {
    token: "token-dave",
    uid: "u4",
    email: "d@x.com",
    name: Some("Dave"),
};

pub const ERIN: TestUser = TestUser {
    token: "token-erin",
    uid: "u5",
    email: "e@x.com",
    name: Some("Erin"),
};

pub const USERS: [TestUser; 5] = [ALICE, BOB, CAROL, DAVE, ERIN];

/// The router under test and direct access to its store.
#[derive(Clone)]
pub struct TestApp {
    pub router: Router,
    pub store: Arc<InMemoryDirectoryStore>,
}

impl TestApp {
    /// An app whose identity provider knows every user in [`USERS`].
    #[must_use]
    pub fn new() -> Self {
        let provider = USERS.iter().fold(StaticIdentityProvider::new(), |p, u| {
            p.with_user(
                u.token,
                Uid::parse(u.uid).unwrap(),
                Email::parse(u.email).unwrap(),
                u.name,
            )
        });
        Self::with_provider(provider)
    }

    #[must_use]
    pub fn with_provider(provider: StaticIdentityProvider) -> Self {
        let store = Arc::new(InMemoryDirectoryStore::new());
        let state = AppState::new(store.clone(), Arc::new(provider));
        Self {
            router: routes::router(state),
            store,
        }
    }

    /// Sends a request and returns the status and JSON body (`Null` if the
    /// body is empty or not JSON).
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .into_service()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        (status, read_json(response.into_body()).await)
    }

    pub async fn get(&self, uri: &str, user: TestUser) -> (StatusCode, Value) {
        self.request(Method::GET, uri, Some(user.token), None).await
    }

    pub async fn post(&self, uri: &str, user: TestUser, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, Some(user.token), Some(body))
            .await
    }

    pub async fn put(&self, uri: &str, user: TestUser, body: Value) -> (StatusCode, Value) {
        self.request(Method::PUT, uri, Some(user.token), Some(body))
            .await
    }

    /// Makes `user` the bootstrap admin.
    pub async fn bootstrap(&self, user: TestUser) -> Value {
        let (status, body) = self.get("/make-first-admin", user).await;
        assert_eq!(status, StatusCode::CREATED, "bootstrap failed: {body}");
        body
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

async fn read_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap_or(Value::Null)
}
