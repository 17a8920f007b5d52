//! Identity verification.
//!
//! The directory never trusts a uid it did not get from a verified
//! credential. [`IdentityVerifier`] is the only way to turn a bearer token
//! into a [`VerifiedIdentity`], and the only way to resolve an email to a
//! provider identity when promoting someone.
//!
//! # Implementations
//!
//! - [`FirebaseIdentity`] - Firebase ID tokens (RS256, Google JWKS) and the
//!   Identity Toolkit `accounts:lookup` API
//! - [`StaticIdentityProvider`] - Fixed tables for tests and local runs

pub mod firebase;
pub mod service_account;
pub mod static_provider;

use async_trait::async_trait;
use thiserror::Error;

use gadget_pulse_core::{Email, Uid};

pub use firebase::FirebaseIdentity;
pub use service_account::{ServiceAccountKey, ServiceAccountTokens};
pub use static_provider::StaticIdentityProvider;

/// Errors from the identity provider.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// The bearer token is malformed, expired, or fails verification.
    #[error("invalid token: {0}")]
    InvalidToken(String),

    /// No provider identity matches the lookup.
    #[error("identity not found")]
    NotFound,

    /// The provider could not be reached or answered unexpectedly.
    #[error("identity provider error: {0}")]
    Provider(String),

    /// HTTP transport error.
    #[error("identity provider request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Identity established from a verified bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
    pub uid: Uid,
    pub email: Option<Email>,
    pub display_name: Option<String>,
    pub picture: Option<String>,
}

/// Identity resolved through the provider's user directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryIdentity {
    pub uid: Uid,
    pub email: Email,
    pub display_name: Option<String>,
}

/// Verifies bearer credentials and resolves emails to provider identities.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    /// Verifies a bearer token.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::InvalidToken` if verification fails, or a
    /// provider/transport error if signing keys cannot be fetched.
    async fn verify(&self, token: &str) -> Result<VerifiedIdentity, IdentityError>;

    /// Looks up a provider identity by email.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::NotFound` if no identity has this email.
    async fn lookup_by_email(&self, email: &Email) -> Result<DirectoryIdentity, IdentityError>;
}
