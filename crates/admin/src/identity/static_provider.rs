//! Fixed-table identity provider.

use std::collections::HashMap;

use async_trait::async_trait;

use gadget_pulse_core::{Email, Uid};

use super::{DirectoryIdentity, IdentityError, IdentityVerifier, VerifiedIdentity};

/// Identity provider with a fixed token table and user directory.
///
/// Every user added with [`StaticIdentityProvider::with_user`] is both
/// signed in (under the given token) and discoverable by email.
#[derive(Debug, Clone, Default)]
pub struct StaticIdentityProvider {
    tokens: HashMap<String, VerifiedIdentity>,
    directory: HashMap<Email, DirectoryIdentity>,
}

impl StaticIdentityProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a user reachable by `token` and by email lookup.
    #[must_use]
    pub fn with_user(
        mut self,
        token: impl Into<String>,
        uid: Uid,
        email: Email,
        display_name: Option<&str>,
    ) -> Self {
        self.tokens.insert(
            token.into(),
            VerifiedIdentity {
                uid: uid.clone(),
                email: Some(email.clone()),
                display_name: display_name.map(str::to_owned),
                picture: None,
            },
        );
        self.with_directory_entry(uid, email, display_name)
    }

    /// Adds a signed-in identity without an email (e.g. phone sign-in).
    #[must_use]
    pub fn with_emailless_user(mut self, token: impl Into<String>, uid: Uid) -> Self {
        self.tokens.insert(
            token.into(),
            VerifiedIdentity {
                uid,
                email: None,
                display_name: None,
                picture: None,
            },
        );
        self
    }

    /// Adds a user that can be found by email but has no token.
    #[must_use]
    pub fn with_directory_entry(
        mut self,
        uid: Uid,
        email: Email,
        display_name: Option<&str>,
    ) -> Self {
        self.directory.insert(
            email.clone(),
            DirectoryIdentity {
                uid,
                email,
                display_name: display_name.map(str::to_owned),
            },
        );
        self
    }
}

#[async_trait]
impl IdentityVerifier for StaticIdentityProvider {
    async fn verify(&self, token: &str) -> Result<VerifiedIdentity, IdentityError> {
        self.tokens
            .get(token)
            .cloned()
            .ok_or_else(|| IdentityError::InvalidToken("unknown token".to_owned()))
    }

    async fn lookup_by_email(&self, email: &Email) -> Result<DirectoryIdentity, IdentityError> {
        self.directory
            .get(email)
            .cloned()
            .ok_or(IdentityError::NotFound)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_verify_and_lookup() {
        let provider = StaticIdentityProvider::new().with_user(
            "tok-a",
            Uid::parse("u1").unwrap(),
            Email::parse("a@x.com").unwrap(),
            Some("Alice"),
        );

        let identity = provider.verify("tok-a").await.unwrap();
        assert_eq!(identity.uid.as_str(), "u1");
        assert!(matches!(
            provider.verify("nope").await,
            Err(IdentityError::InvalidToken(_))
        ));

        let found = provider
            .lookup_by_email(&Email::parse("A@x.com").unwrap())
            .await
            .unwrap();
        assert_eq!(found.display_name.as_deref(), Some("Alice"));
        assert!(matches!(
            provider
                .lookup_by_email(&Email::parse("z@x.com").unwrap())
                .await,
            Err(IdentityError::NotFound)
        ));
    }
}
