//! Integration tests for the account routes.

#![allow(clippy::unwrap_used)]

use axum::http::{Method, StatusCode};
use serde_json::json;

use gadget_pulse_admin::db::DirectoryStore;
use gadget_pulse_core::Uid;
use gadget_pulse_integration_tests::{ALICE, BOB, CAROL, TestApp};

#[tokio::test]
async fn test_register_creates_account_once() {
    let app = TestApp::new();

    let (status, body) = app.post("/users", BOB, json!({"photoURL": "https://img/b.png"})).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["user"]["uid"], "u2");
    assert_eq!(body["user"]["email"], "b@x.com");
    assert_eq!(body["user"]["displayName"], "b");
    assert_eq!(body["user"]["photoURL"], "https://img/b.png");
    assert_eq!(body["user"]["isAdmin"], false);

    let (status, body) = app
        .post("/users", BOB, json!({"displayName": "Someone Else"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["displayName"], "b");
}

#[tokio::test]
async fn test_register_accepts_empty_body() {
    let app = TestApp::new();
    let (status, body) = app
        .request(Method::POST, "/users", Some(ALICE.token), None)
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["user"]["displayName"], "Alice");
}

#[tokio::test]
async fn test_register_requires_token() {
    let app = TestApp::new();
    let (status, _) = app
        .request(Method::POST, "/users", None, Some(json!({})))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_profile_owner_access() {
    let app = TestApp::new();
    app.post("/users", ALICE, json!({})).await;
    app.post("/users", BOB, json!({})).await;

    let (status, body) = app.get("/users/u2", BOB).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["email"], "b@x.com");

    let (status, _) = app.get("/users/u1", BOB).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .put(
            "/users/u2",
            BOB,
            json!({"displayName": "  Bob  ", "bio": "hello", "phoneNumber": "555-0100"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["user"]["displayName"], "Bob");
    assert_eq!(body["user"]["bio"], "hello");
    assert_eq!(body["user"]["phoneNumber"], "555-0100");

    let (status, _) = app.put("/users/u1", BOB, json!({"bio": "pwned"})).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_profile_update_validation() {
    let app = TestApp::new();
    app.post("/users", BOB, json!({})).await;

    let (status, body) = app.put("/users/u2", BOB, json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "no update data provided");

    let (status, _) = app.put("/users/u2", BOB, json!({"displayName": "   "})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.put("/users/u2", BOB, json!({"isAdmin": true})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let account = app
        .store
        .find_account(&Uid::parse("u2").unwrap())
        .await
        .unwrap()
        .unwrap();
    assert!(!account.is_admin);
}

#[tokio::test]
async fn test_manage_users_admin_can_access_any_profile() {
    let app = TestApp::new();
    app.bootstrap(ALICE).await;
    app.post("/users", BOB, json!({})).await;

    let (status, body) = app.get("/users/u2", ALICE).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["uid"], "u2");

    let (status, body) = app.put("/users/u2", ALICE, json!({"bio": "verified"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["bio"], "verified");

    let (status, _) = app.get("/users/u9", ALICE).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // An admin without manageUsers is limited to their own profile.
    app.post(
        "/admins",
        ALICE,
        json!({"email": "c@x.com", "permissions": {"manageUsers": false}}),
    )
    .await;
    let (status, _) = app.get("/users/u2", CAROL).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
