//! Firebase Authentication identity verifier.
//!
//! # Token verification
//!
//! ID tokens are RS256 JWTs signed by Google's secure-token service:
//!
//! 1. Reject anything but RS256 before touching the network.
//! 2. Resolve the `kid` against the cached JWKS, refetching once on a miss
//!    (key rotation).
//! 3. Validate signature, `exp`, `aud` (project id) and
//!    `iss` (`https://securetoken.google.com/<project id>`).
//! 4. Require a non-empty `sub` and an `auth_time`/`iat` that is not in the
//!    future.
//!
//! # Directory lookup
//!
//! Emails are resolved with the Identity Toolkit `accounts:lookup` endpoint,
//! authorized by a service-account access token.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header};
use moka::future::Cache;
use secrecy::ExposeSecret;
use serde::Deserialize;

use gadget_pulse_core::{Email, Uid};

use super::{
    DirectoryIdentity, IdentityError, IdentityVerifier, ServiceAccountTokens, VerifiedIdentity,
};
use crate::config::FirebaseConfig;

/// Public signing keys for Firebase ID tokens.
pub const GOOGLE_SECURE_TOKEN_JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";

/// Identity Toolkit REST API base URL.
pub const IDENTITY_TOOLKIT_URL: &str = "https://identitytoolkit.googleapis.com";

const ISSUER_PREFIX: &str = "https://securetoken.google.com/";
const CLOCK_SKEW_SECS: u64 = 60;
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);
const JWKS_CACHE_KEY: &str = "securetoken";

/// Claims read from a verified ID token.
#[derive(Debug, Deserialize)]
struct FirebaseClaims {
    sub: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    picture: Option<String>,
    #[serde(default)]
    auth_time: Option<i64>,
    #[serde(default)]
    iat: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Option<Vec<LookupUser>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupUser {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
}

/// [`IdentityVerifier`] for Firebase Authentication.
#[derive(Debug, Clone)]
pub struct FirebaseIdentity {
    client: reqwest::Client,
    project_id: String,
    jwks_url: String,
    lookup_url: String,
    validation: Validation,
    keys: Cache<&'static str, Arc<JwkSet>>,
    tokens: ServiceAccountTokens,
}

impl FirebaseIdentity {
    /// Creates a verifier for the configured project.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::Provider` if the HTTP client cannot be built or
    /// the service-account key is unusable.
    pub fn new(config: &FirebaseConfig) -> Result<Self, IdentityError> {
        let client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| IdentityError::Provider(format!("failed to build HTTP client: {e}")))?;
        let tokens = ServiceAccountTokens::new(config.service_account.clone(), client.clone())?;

        Ok(Self {
            lookup_url: format!(
                "{}/v1/projects/{}/accounts:lookup",
                config.identity_toolkit_url.trim_end_matches('/'),
                config.project_id
            ),
            validation: token_validation(&config.project_id),
            keys: Cache::builder()
                .max_capacity(1)
                .time_to_live(config.key_cache_ttl)
                .build(),
            jwks_url: config.jwks_url.clone(),
            project_id: config.project_id.clone(),
            client,
            tokens,
        })
    }

    /// Returns the project the verifier accepts tokens for.
    #[must_use]
    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    async fn cached_keys(&self) -> Result<Arc<JwkSet>, IdentityError> {
        if let Some(keys) = self.keys.get(JWKS_CACHE_KEY).await {
            return Ok(keys);
        }
        self.refresh_keys().await
    }

    async fn refresh_keys(&self) -> Result<Arc<JwkSet>, IdentityError> {
        let response = self.client.get(&self.jwks_url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(IdentityError::Provider(format!(
                "JWKS endpoint returned {status}"
            )));
        }
        let keys: Arc<JwkSet> = Arc::new(response.json().await?);
        self.keys.insert(JWKS_CACHE_KEY, Arc::clone(&keys)).await;
        tracing::debug!(keys = keys.keys.len(), "Refreshed identity signing keys");
        Ok(keys)
    }

    async fn decoding_key(&self, kid: &str) -> Result<DecodingKey, IdentityError> {
        let keys = self.cached_keys().await?;
        let keys = if keys.find(kid).is_some() {
            keys
        } else {
            self.refresh_keys().await?
        };
        let jwk = keys
            .find(kid)
            .ok_or_else(|| IdentityError::InvalidToken("unknown signing key".to_owned()))?;
        DecodingKey::from_jwk(jwk)
            .map_err(|e| IdentityError::Provider(format!("unusable signing key {kid}: {e}")))
    }

    #[cfg(test)]
    async fn seed_keys(&self, keys: JwkSet) {
        self.keys.insert(JWKS_CACHE_KEY, Arc::new(keys)).await;
    }
}

fn token_validation(project_id: &str) -> Validation {
    let mut validation = Validation::new(Algorithm::RS256);
    validation.set_audience(&[project_id]);
    validation.set_issuer(&[format!("{ISSUER_PREFIX}{project_id}")]);
    validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);
    validation.leeway = CLOCK_SKEW_SECS;
    validation
}

fn identity_from_claims(claims: FirebaseClaims, now: i64) -> Result<VerifiedIdentity, IdentityError> {
    let uid = Uid::parse(&claims.sub)
        .map_err(|e| IdentityError::InvalidToken(format!("invalid subject: {e}")))?;

    let latest_allowed = now.saturating_add_unsigned(CLOCK_SKEW_SECS);
    if claims.auth_time.is_some_and(|t| t > latest_allowed) {
        return Err(IdentityError::InvalidToken(
            "auth_time is in the future".to_owned(),
        ));
    }
    if claims.iat.is_some_and(|t| t > latest_allowed) {
        return Err(IdentityError::InvalidToken("iat is in the future".to_owned()));
    }

    let email = claims.email.and_then(|raw| match Email::parse(&raw) {
        Ok(email) => Some(email),
        Err(e) => {
            tracing::debug!(uid = %uid, error = %e, "Ignoring unparseable email claim");
            None
        }
    });

    Ok(VerifiedIdentity {
        uid,
        email,
        display_name: claims.name.filter(|n| !n.trim().is_empty()),
        picture: claims.picture.filter(|p| !p.is_empty()),
    })
}

fn directory_identity(
    response: LookupResponse,
    queried: &Email,
) -> Result<DirectoryIdentity, IdentityError> {
    let user = response
        .users
        .into_iter()
        .flatten()
        .next()
        .ok_or(IdentityError::NotFound)?;

    let uid = Uid::parse(&user.local_id)
        .map_err(|e| IdentityError::Provider(format!("lookup returned invalid uid: {e}")))?;
    let email = user
        .email
        .and_then(|raw| Email::parse(&raw).ok())
        .unwrap_or_else(|| queried.clone());

    Ok(DirectoryIdentity {
        uid,
        email,
        display_name: user.display_name.filter(|n| !n.trim().is_empty()),
    })
}

#[async_trait]
impl IdentityVerifier for FirebaseIdentity {
    async fn verify(&self, token: &str) -> Result<VerifiedIdentity, IdentityError> {
        let header =
            decode_header(token).map_err(|e| IdentityError::InvalidToken(e.to_string()))?;
        if header.alg != Algorithm::RS256 {
            return Err(IdentityError::InvalidToken(format!(
                "unsupported algorithm {:?}",
                header.alg
            )));
        }
        let kid = header
            .kid
            .ok_or_else(|| IdentityError::InvalidToken("missing key id".to_owned()))?;

        let key = self.decoding_key(&kid).await?;
        let data = decode::<FirebaseClaims>(token, &key, &self.validation)
            .map_err(|e| IdentityError::InvalidToken(e.to_string()))?;

        identity_from_claims(data.claims, Utc::now().timestamp())
    }

    async fn lookup_by_email(&self, email: &Email) -> Result<DirectoryIdentity, IdentityError> {
        let access_token = self.tokens.access_token().await?;
        let response = self
            .client
            .post(&self.lookup_url)
            .bearer_auth(access_token.expose_secret())
            .json(&serde_json::json!({ "email": [email.as_str()] }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(IdentityError::Provider(format!(
                "accounts:lookup returned {status}: {body}"
            )));
        }

        let body: LookupResponse = response.json().await?;
        directory_identity(body, email)
    }
}
