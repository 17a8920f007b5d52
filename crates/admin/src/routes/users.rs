//! Account route handlers.

use axum::{
    Json,
    body::Bytes,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use gadget_pulse_core::Uid;

use crate::{
    error::AppError,
    middleware::{Authenticated, Authorized},
    models::{Account, ProfileUpdate},
    services::{RegisterOutcome, Registration},
    state::AppState,
};

/// Body of `POST /users`. Every field is optional and the body may be empty.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub display_name: Option<String>,
    #[serde(rename = "photoURL")]
    pub photo_url: Option<String>,
}

#[derive(Serialize)]
struct UserResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'static str>,
    user: Account,
}

/// Register the verified caller's account.
#[instrument(skip_all)]
pub async fn register(
    Authenticated(identity): Authenticated,
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Response, AppError> {
    let request: RegisterRequest = if body.iter().all(u8::is_ascii_whitespace) {
        RegisterRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| AppError::BadRequest(format!("invalid request body: {e}")))?
    };

    let outcome = state
        .accounts()
        .register(
            &identity,
            Registration {
                display_name: request.display_name,
                photo_url: request.photo_url,
            },
        )
        .await?;

    let (status, message, user) = match outcome {
        RegisterOutcome::Created(user) => (StatusCode::CREATED, "User created successfully", user),
        RegisterOutcome::Existing(user) => (StatusCode::OK, "User already exists", user),
    };
    Ok((
        status,
        Json(UserResponse {
            message: Some(message),
            user,
        }),
    )
        .into_response())
}

/// Read an account (owner or `manageUsers`).
#[instrument(skip_all)]
pub async fn show(
    Authorized(auth): Authorized,
    State(state): State<AppState>,
    Path(uid): Path<String>,
) -> Result<Json<impl Serialize>, AppError> {
    let uid = parse_uid(&uid)?;
    let user = state.accounts().get(&auth, &uid).await?;
    Ok(Json(UserResponse {
        message: None,
        user,
    }))
}

/// Update an account profile (owner or `manageUsers`).
#[instrument(skip_all)]
pub async fn update(
    Authorized(auth): Authorized,
    State(state): State<AppState>,
    Path(uid): Path<String>,
    body: Result<Json<ProfileUpdate>, JsonRejection>,
) -> Result<Json<impl Serialize>, AppError> {
    let uid = parse_uid(&uid)?;
    let Json(update) = body?;
    let user = state.accounts().update_profile(&auth, &uid, update).await?;
    Ok(Json(UserResponse {
        message: Some("Profile updated successfully"),
        user,
    }))
}

fn parse_uid(raw: &str) -> Result<Uid, AppError> {
    Uid::parse(raw).map_err(|e| AppError::BadRequest(format!("invalid uid: {e}")))
}
