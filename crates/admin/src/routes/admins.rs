//! Admin directory route handlers.

use axum::{
    Json,
    extract::{Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use gadget_pulse_core::{PageRequest, PermissionOverrides};

use crate::{
    error::AppError,
    middleware::{Authenticated, Authorized},
    models::AdminRecord,
    services::{BootstrapOutcome, NewAdmin},
    state::AppState,
};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CheckResponse<'a> {
    message: &'static str,
    is_admin: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    admin: Option<&'a AdminRecord>,
}

/// Admin status check.
///
/// 200 with the caller's record, or 403 with `isAdmin: false`.
#[instrument(skip_all)]
pub async fn check(Authorized(auth): Authorized, State(state): State<AppState>) -> Response {
    let Some(admin) = auth.admin() else {
        return (
            StatusCode::FORBIDDEN,
            Json(CheckResponse {
                message: "User is not an admin",
                is_admin: false,
                admin: None,
            }),
        )
            .into_response();
    };

    let mut admin = admin.clone();
    state.directory().record_login(&mut admin).await;

    Json(CheckResponse {
        message: "User is an admin",
        is_admin: true,
        admin: Some(&admin),
    })
    .into_response()
}

/// Raw pagination query; non-numeric values fall back to defaults.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Pagination {
    current_page: u32,
    total_pages: u64,
    total_admins: u64,
    limit: u32,
}

#[derive(Serialize)]
struct ListResponse {
    admins: Vec<AdminRecord>,
    pagination: Pagination,
}

/// Paginated admin list (`manageAdmins` only).
///
/// `limit` is capped at [`PageRequest::MAX_LIMIT`]; the capped value is the
/// one echoed in `pagination.limit` and used for `totalPages`.
#[instrument(skip_all)]
pub async fn list(
    Authorized(auth): Authorized,
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Response, AppError> {
    let page = PageRequest::from_query(query.page.as_deref(), query.limit.as_deref());
    let result = state.directory().list_admins(&auth, page).await?;

    Ok(Json(ListResponse {
        admins: result.admins,
        pagination: Pagination {
            current_page: result.page.current_page,
            total_pages: result.page.total_pages,
            total_admins: result.page.total,
            limit: result.page.limit,
        },
    })
    .into_response())
}

/// Body of `POST /admins`.
#[derive(Debug, Default, Deserialize)]
pub struct CreateAdminRequest {
    pub email: Option<String>,
    #[serde(default)]
    pub permissions: PermissionOverrides,
}

#[derive(Serialize)]
struct AdminResponse {
    message: &'static str,
    admin: AdminRecord,
}

/// Grant admin access (`manageAdmins`, unless no admin exists yet).
///
/// The permission gate runs before the body is looked at, so callers without
/// access get 403 whatever they send.
#[instrument(skip_all)]
pub async fn create(
    Authorized(auth): Authorized,
    State(state): State<AppState>,
    body: Result<Json<CreateAdminRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    state.directory().authorize_admin_creation(&auth).await?;
    let Json(body) = body?;
    let admin = state
        .directory()
        .create_admin(
            &auth,
            NewAdmin {
                email: body.email,
                permissions: body.permissions,
            },
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(AdminResponse {
            message: "Admin created successfully",
            admin,
        }),
    )
        .into_response())
}

/// Self-bootstrap of the first admin.
///
/// 201 when the caller became the first admin, 200 when they already were.
#[instrument(skip_all)]
pub async fn make_first_admin(
    Authenticated(identity): Authenticated,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    let outcome = state.directory().bootstrap_first_admin(&identity).await?;

    let (status, message) = match &outcome {
        BootstrapOutcome::Created(_) => (StatusCode::CREATED, "First admin created successfully"),
        BootstrapOutcome::Existing(_) => (StatusCode::OK, "User is already an admin"),
    };
    Ok((
        status,
        Json(AdminResponse {
            message,
            admin: outcome.into_record(),
        }),
    )
        .into_response())
}
