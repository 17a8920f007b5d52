//! Service-account credentials and OAuth2 access tokens.
//!
//! Directory lookups need an OAuth2 access token for the project. Tokens are
//! obtained with the JWT-bearer grant: an RS256 assertion signed with the
//! service-account private key is exchanged at the token endpoint. The
//! resulting token is cached until shortly before it expires.

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use moka::future::Cache;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::IdentityError;

/// Default OAuth2 token endpoint.
pub const GOOGLE_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Scope required by the Identity Toolkit admin API.
const IDENTITY_TOOLKIT_SCOPE: &str =
    "https://www.googleapis.com/auth/identitytoolkit https://www.googleapis.com/auth/cloud-platform";

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Assertions are valid for one hour, the maximum the token endpoint accepts.
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// Access tokens live for an hour; refresh ten minutes early.
const ACCESS_TOKEN_TTL: Duration = Duration::from_secs(50 * 60);

const ACCESS_TOKEN_CACHE_KEY: &str = "access_token";

/// Errors decoding a service-account key.
#[derive(Debug, Error)]
pub enum ServiceAccountKeyError {
    #[error("not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("not a valid service account JSON document: {0}")]
    Json(#[from] serde_json::Error),
    #[error("missing field: {0}")]
    MissingField(&'static str),
}

#[derive(Deserialize)]
struct RawServiceAccountKey {
    #[serde(default)]
    project_id: Option<String>,
    #[serde(default)]
    client_email: Option<String>,
    #[serde(default)]
    private_key: Option<String>,
    #[serde(default)]
    private_key_id: Option<String>,
    #[serde(default)]
    token_uri: Option<String>,
}

/// A service-account key as downloaded from the identity provider console.
///
/// Implements `Debug` manually to redact the private key.
#[derive(Clone)]
pub struct ServiceAccountKey {
    pub project_id: Option<String>,
    pub client_email: String,
    pub private_key_id: Option<String>,
    pub token_uri: String,
    private_key: SecretString,
}

impl std::fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("project_id", &self.project_id)
            .field("client_email", &self.client_email)
            .field("private_key_id", &self.private_key_id)
            .field("token_uri", &self.token_uri)
            .field("private_key", &"[REDACTED]")
            .finish()
    }
}

impl ServiceAccountKey {
    /// Parses the JSON key document.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is invalid or lacks `client_email` or
    /// `private_key`.
    pub fn from_json(json: &[u8]) -> Result<Self, ServiceAccountKeyError> {
        let raw: RawServiceAccountKey = serde_json::from_slice(json)?;
        let client_email = raw
            .client_email
            .filter(|s| !s.is_empty())
            .ok_or(ServiceAccountKeyError::MissingField("client_email"))?;
        let private_key = raw
            .private_key
            .filter(|s| !s.is_empty())
            .ok_or(ServiceAccountKeyError::MissingField("private_key"))?;

        Ok(Self {
            project_id: raw.project_id,
            client_email,
            private_key_id: raw.private_key_id,
            token_uri: raw
                .token_uri
                .unwrap_or_else(|| GOOGLE_TOKEN_URI.to_owned()),
            private_key: SecretString::from(private_key),
        })
    }

    /// Parses a base64-encoded JSON key document.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not base64 or not a valid key.
    pub fn from_base64(encoded: &str) -> Result<Self, ServiceAccountKeyError> {
        let json = STANDARD.decode(encoded.trim())?;
        Self::from_json(&json)
    }

    /// Returns the PEM-encoded private key.
    #[must_use]
    pub const fn private_key(&self) -> &SecretString {
        &self.private_key
    }
}

#[derive(Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Mints and caches OAuth2 access tokens for a service account.
#[derive(Clone)]
pub struct ServiceAccountTokens {
    key: ServiceAccountKey,
    signing_key: EncodingKey,
    client: reqwest::Client,
    cache: Cache<&'static str, SecretString>,
}

impl std::fmt::Debug for ServiceAccountTokens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountTokens")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

impl ServiceAccountTokens {
    /// Creates a token source for `key`.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::Provider` if the private key is not a valid
    /// RSA PEM.
    pub fn new(key: ServiceAccountKey, client: reqwest::Client) -> Result<Self, IdentityError> {
        let signing_key = EncodingKey::from_rsa_pem(key.private_key.expose_secret().as_bytes())
            .map_err(|e| IdentityError::Provider(format!("invalid service account key: {e}")))?;

        Ok(Self {
            key,
            signing_key,
            client,
            cache: Cache::builder()
                .max_capacity(1)
                .time_to_live(ACCESS_TOKEN_TTL)
                .build(),
        })
    }

    /// Returns a cached access token, minting a new one when needed.
    ///
    /// # Errors
    ///
    /// Returns an error if signing fails or the token endpoint rejects the
    /// assertion.
    pub async fn access_token(&self) -> Result<SecretString, IdentityError> {
        if let Some(token) = self.cache.get(ACCESS_TOKEN_CACHE_KEY).await {
            return Ok(token);
        }

        let assertion = self.signed_assertion(Utc::now().timestamp())?;
        let response = self
            .client
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(IdentityError::Provider(format!(
                "token endpoint returned {status}: {body}"
            )));
        }

        let body: TokenResponse = response.json().await?;
        let token = SecretString::from(body.access_token);
        self.cache
            .insert(ACCESS_TOKEN_CACHE_KEY, token.clone())
            .await;
        tracing::debug!(client_email = %self.key.client_email, "Minted service account access token");
        Ok(token)
    }

    fn signed_assertion(&self, now: i64) -> Result<String, IdentityError> {
        let claims = AssertionClaims {
            iss: &self.key.client_email,
            scope: IDENTITY_TOOLKIT_SCOPE,
            aud: &self.key.token_uri,
            iat: now,
            exp: now + ASSERTION_LIFETIME_SECS,
        };
        let mut header = Header::new(Algorithm::RS256);
        header.kid.clone_from(&self.key.private_key_id);

        encode(&header, &claims, &self.signing_key)
            .map_err(|e| IdentityError::Provider(format!("failed to sign assertion: {e}")))
    }
}
