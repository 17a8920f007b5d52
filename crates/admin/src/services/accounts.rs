//! Account registration and profile management.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument};

use gadget_pulse_core::{Permission, Uid};

use super::{Authorization, DirectoryError};
use crate::db::{DirectoryStore, RepositoryError};
use crate::identity::VerifiedIdentity;
use crate::models::{Account, AccountSeed, ProfileUpdate};

/// Optional profile fields supplied at registration.
#[derive(Debug, Clone, Default)]
pub struct Registration {
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
}

/// Result of a registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegisterOutcome {
    Created(Account),
    /// The caller was already registered; nothing was written.
    Existing(Account),
}

/// Account registration and profile reads/updates.
#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn DirectoryStore>,
}

impl AccountService {
    #[must_use]
    pub fn new(store: Arc<dyn DirectoryStore>) -> Self {
        Self { store }
    }

    /// Creates the account for the verified caller.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` if the credential carries no email
    /// - `Conflict` if another account already uses the email
    /// - `StoreUnavailable` if the store fails
    #[instrument(skip(self, identity, registration), fields(uid = %identity.uid))]
    pub async fn register(
        &self,
        identity: &VerifiedIdentity,
        registration: Registration,
    ) -> Result<RegisterOutcome, DirectoryError> {
        if let Some(account) = self.store.find_account(&identity.uid).await? {
            return Ok(RegisterOutcome::Existing(account));
        }

        let email = identity
            .email
            .clone()
            .ok_or_else(|| DirectoryError::InvalidInput("email is required".to_owned()))?;

        let display_name = [
            registration.display_name.as_deref(),
            identity.display_name.as_deref(),
        ]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|name| !name.is_empty())
        .unwrap_or_else(|| email.local_part())
        .to_owned();

        let account = Account::new(
            AccountSeed {
                uid: identity.uid.clone(),
                email,
                display_name,
                photo_url: registration.photo_url.or_else(|| identity.picture.clone()),
            },
            Utc::now(),
        );

        match self.store.insert_account(&account).await {
            Ok(account) => {
                info!(uid = %account.uid, "Account registered");
                Ok(RegisterOutcome::Created(account))
            }
            Err(RepositoryError::Conflict(reason)) => self
                .store
                .find_account(&identity.uid)
                .await?
                .map(RegisterOutcome::Existing)
                .ok_or(DirectoryError::Conflict(reason)),
            Err(e) => Err(e.into()),
        }
    }

    /// Reads an account.
    ///
    /// # Errors
    ///
    /// Returns `Forbidden` unless the caller owns the account or holds
    /// `manageUsers`, and `NotFound` if the account does not exist.
    pub async fn get(&self, caller: &Authorization, uid: &Uid) -> Result<Account, DirectoryError> {
        ensure_may_access(caller, uid)?;
        self.store
            .find_account(uid)
            .await?
            .ok_or_else(account_not_found)
    }

    /// Applies a profile update.
    ///
    /// # Errors
    ///
    /// Returns `Forbidden` as for [`Self::get`], `InvalidInput` for an empty
    /// update or blank display name, and `NotFound` if the account does not
    /// exist.
    #[instrument(skip(self, caller, update), fields(caller = %caller.uid()))]
    pub async fn update_profile(
        &self,
        caller: &Authorization,
        uid: &Uid,
        update: ProfileUpdate,
    ) -> Result<Account, DirectoryError> {
        ensure_may_access(caller, uid)?;
        let update = update
            .normalized()
            .map_err(|message| DirectoryError::InvalidInput(message.to_owned()))?;

        let account = self
            .store
            .update_account_profile(uid, &update, Utc::now())
            .await?
            .ok_or_else(account_not_found)?;
        info!(%uid, "Profile updated");
        Ok(account)
    }
}

fn ensure_may_access(caller: &Authorization, uid: &Uid) -> Result<(), DirectoryError> {
    if caller.uid() == uid || caller.can(Permission::ManageUsers) {
        Ok(())
    } else {
        Err(DirectoryError::Forbidden(
            "not allowed to access this account".to_owned(),
        ))
    }
}

fn account_not_found() -> DirectoryError {
    DirectoryError::NotFound("account not found".to_owned())
}
