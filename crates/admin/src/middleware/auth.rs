//! Bearer-token extractors.
//!
//! Every protected handler takes one of these extractors; a request without a
//! verifiable `Authorization: Bearer <token>` header never reaches the
//! handler body.

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header, request::Parts},
};

use crate::error::{AppError, set_sentry_user};
use crate::identity::VerifiedIdentity;
use crate::services::Authorization;
use crate::state::AppState;

/// Extractor that requires a verified bearer token.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(Authenticated(identity): Authenticated) -> String {
///     identity.uid.to_string()
/// }
/// ```
pub struct Authenticated(pub VerifiedIdentity);

impl FromRequestParts<AppState> for Authenticated {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)?;
        let identity = state.directory().authenticate(token).await?;
        set_sentry_user(
            identity.uid.as_str(),
            identity.email.as_ref().map(|e| e.as_str()),
        );
        Ok(Self(identity))
    }
}

/// Extractor that verifies the bearer token and resolves the caller's admin
/// record, if any.
///
/// Does not reject non-admins; handlers decide which capability they need.
pub struct Authorized(pub Authorization);

impl FromRequestParts<AppState> for Authorized {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Authenticated(identity) = Authenticated::from_request_parts(parts, state).await?;
        let authorization = state.directory().authorize(identity).await?;
        Ok(Self(authorization))
    }
}

/// Extracts the token from an `Authorization: Bearer` header.
fn bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or_else(|| AppError::Unauthorized("no token provided".to_string()))?
        .to_str()
        .map_err(|_| AppError::Unauthorized("invalid authorization header".to_string()))?;

    let (scheme, token) = value
        .split_once(' ')
        .ok_or_else(|| AppError::Unauthorized("invalid authorization header".to_string()))?;
    let token = token.trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(AppError::Unauthorized(
            "invalid authorization header".to_string(),
        ));
    }
    Ok(token)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(&headers("Bearer abc.def")).unwrap(), "abc.def");
        assert_eq!(bearer_token(&headers("bearer  tok ")).unwrap(), "tok");
    }

    #[test]
    fn test_bearer_token_rejections() {
        assert!(matches!(
            bearer_token(&HeaderMap::new()),
            Err(AppError::Unauthorized(ref m)) if m == "no token provided"
        ));
        assert!(bearer_token(&headers("Basic dXNlcjpwYXNz")).is_err());
        assert!(bearer_token(&headers("Bearer")).is_err());
        assert!(bearer_token(&headers("Bearer   ")).is_err());
    }
}
