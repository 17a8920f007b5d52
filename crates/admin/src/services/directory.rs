//! Admin directory service.
//!
//! Owns every path that creates an admin record and the authorization
//! decision made on each admin request.
//!
//! # Promotion
//!
//! All promotion paths go through one operation that writes the admin record
//! first and the account's `isAdmin` flag second. The record alone decides
//! authorization, so a failed flag write is logged and left for the
//! self-healing fallback in [`AdminDirectory::authorize`] rather than
//! failing the request.
//!
//! # First admin
//!
//! While no admin record exists, any verified caller may claim the first
//! slot. The store inserts the first record atomically with its emptiness
//! check, so concurrent claims produce exactly one superadmin; losers reload
//! and report whatever record the store holds for them.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, info, instrument, warn};

use gadget_pulse_core::{
    AdminRole, Email, PageInfo, PageRequest, Permission, PermissionOverrides, Permissions, Uid,
};

use super::DirectoryError;
use crate::db::{DirectoryStore, RepositoryError};
use crate::identity::{IdentityError, IdentityVerifier, VerifiedIdentity};
use crate::models::{Account, AccountSeed, AdminRecord, DEFAULT_ADMIN_DISPLAY_NAME};

/// Result of a self-bootstrap or operator promotion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootstrapOutcome {
    /// A new record was written.
    Created(AdminRecord),
    /// The caller already held a record; nothing was written.
    Existing(AdminRecord),
}

impl BootstrapOutcome {
    /// The record, whether new or pre-existing.
    #[must_use]
    pub const fn record(&self) -> &AdminRecord {
        match self {
            Self::Created(record) | Self::Existing(record) => record,
        }
    }

    #[must_use]
    pub fn into_record(self) -> AdminRecord {
        match self {
            Self::Created(record) | Self::Existing(record) => record,
        }
    }

    #[must_use]
    pub const fn is_created(&self) -> bool {
        matches!(self, Self::Created(_))
    }
}

/// Request to grant admin access to another user.
#[derive(Debug, Clone, Default)]
pub struct NewAdmin {
    /// Target email, as supplied by the caller.
    pub email: Option<String>,
    /// Per-capability overrides on top of the defaults.
    pub permissions: PermissionOverrides,
}

/// One page of admin records.
#[derive(Debug, Clone)]
pub struct AdminPage {
    pub admins: Vec<AdminRecord>,
    pub page: PageInfo,
}

/// The authorization decision for one verified caller.
#[derive(Debug, Clone)]
pub struct Authorization {
    identity: VerifiedIdentity,
    admin: Option<AdminRecord>,
}

impl Authorization {
    #[must_use]
    pub const fn identity(&self) -> &VerifiedIdentity {
        &self.identity
    }

    #[must_use]
    pub const fn uid(&self) -> &Uid {
        &self.identity.uid
    }

    /// The caller's admin record, if any.
    #[must_use]
    pub const fn admin(&self) -> Option<&AdminRecord> {
        self.admin.as_ref()
    }

    #[must_use]
    pub const fn is_admin(&self) -> bool {
        self.admin.is_some()
    }

    /// Returns whether the caller holds `permission`. Non-admins hold none.
    #[must_use]
    pub fn can(&self, permission: Permission) -> bool {
        self.admin.as_ref().is_some_and(|a| a.can(permission))
    }

    /// Fails with `Forbidden` unless the caller holds `permission`.
    ///
    /// # Errors
    ///
    /// Returns `DirectoryError::Forbidden` naming the missing capability.
    pub fn require(&self, permission: Permission) -> Result<&AdminRecord, DirectoryError> {
        match &self.admin {
            Some(admin) if admin.can(permission) => Ok(admin),
            Some(_) => Err(DirectoryError::Forbidden(format!(
                "{permission} permission required"
            ))),
            None => Err(DirectoryError::Forbidden("admin access required".to_owned())),
        }
    }
}

/// Admin bootstrap, promotion, authorization and listing.
#[derive(Clone)]
pub struct AdminDirectory {
    store: Arc<dyn DirectoryStore>,
    identity: Arc<dyn IdentityVerifier>,
}

impl std::fmt::Debug for AdminDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminDirectory")
            .field("store", &self.store.backend())
            .finish_non_exhaustive()
    }
}

impl AdminDirectory {
    #[must_use]
    pub fn new(store: Arc<dyn DirectoryStore>, identity: Arc<dyn IdentityVerifier>) -> Self {
        Self { store, identity }
    }

    /// Verifies a bearer token.
    ///
    /// # Errors
    ///
    /// Returns `DirectoryError::Unauthenticated` for any verification
    /// failure, including an unreachable key endpoint.
    pub async fn authenticate(&self, token: &str) -> Result<VerifiedIdentity, DirectoryError> {
        match self.identity.verify(token).await {
            Ok(identity) => Ok(identity),
            Err(IdentityError::InvalidToken(reason)) => {
                debug!(%reason, "Rejected bearer token");
                Err(DirectoryError::Unauthenticated("invalid token".to_owned()))
            }
            Err(e) => {
                error!(error = %e, "Token verification failed");
                Err(DirectoryError::Unauthenticated(
                    "token could not be verified".to_owned(),
                ))
            }
        }
    }

    /// Resolves the caller's admin record.
    ///
    /// Falls back to the account's `isAdmin` flag when no record exists and
    /// recreates the missing record as a self-granted superadmin.
    ///
    /// # Errors
    ///
    /// Returns `DirectoryError::StoreUnavailable` if the store fails.
    #[instrument(skip(self, identity), fields(uid = %identity.uid))]
    pub async fn authorize(
        &self,
        identity: VerifiedIdentity,
    ) -> Result<Authorization, DirectoryError> {
        let admin = match self.store.find_admin(&identity.uid).await? {
            Some(record) => Some(record),
            None => self.heal_from_account(&identity.uid).await?,
        };
        Ok(Authorization { identity, admin })
    }

    async fn heal_from_account(&self, uid: &Uid) -> Result<Option<AdminRecord>, DirectoryError> {
        let Some(account) = self.store.find_account(uid).await? else {
            return Ok(None);
        };
        if !account.is_admin {
            return Ok(None);
        }

        warn!(%uid, "Account flagged admin without an admin record; restoring record");
        let record = AdminRecord::self_granted(
            account.uid.clone(),
            account.email.clone(),
            admin_display_name(Some(account.display_name.as_str())),
            Utc::now(),
        );
        match self.store.insert_admin(&record).await {
            Ok(record) => Ok(Some(record)),
            Err(RepositoryError::Conflict(reason)) => {
                let existing = self.store.find_admin(uid).await?;
                if existing.is_none() {
                    warn!(%uid, %reason, "Could not restore admin record; treating as non-admin");
                }
                Ok(existing)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Stamps `lastLogin` on the caller's record. Failures are logged only.
    pub async fn record_login(&self, admin: &mut AdminRecord) {
        let now = Utc::now();
        match self.store.touch_admin_login(&admin.uid, now).await {
            Ok(()) => admin.last_login = Some(now),
            Err(e) => warn!(uid = %admin.uid, error = %e, "Failed to record admin login"),
        }
    }

    /// Self-bootstrap: promotes the caller if no admin exists yet.
    ///
    /// Idempotent for a caller who already holds a record.
    ///
    /// # Errors
    ///
    /// - `Forbidden` if another admin already exists
    /// - `NotFound` if the caller has no account and no email to create one
    /// - `StoreUnavailable` if the store fails
    #[instrument(skip(self, identity), fields(uid = %identity.uid))]
    pub async fn bootstrap_first_admin(
        &self,
        identity: &VerifiedIdentity,
    ) -> Result<BootstrapOutcome, DirectoryError> {
        if let Some(record) = self.store.find_admin(&identity.uid).await? {
            return Ok(BootstrapOutcome::Existing(record));
        }
        if self.store.count_admins().await? > 0 {
            return Err(first_admin_taken());
        }

        let account = match self.store.find_account(&identity.uid).await? {
            Some(account) => account,
            None => {
                let email = identity
                    .email
                    .clone()
                    .ok_or_else(|| DirectoryError::NotFound("account not found".to_owned()))?;
                Account::new(
                    AccountSeed {
                        uid: identity.uid.clone(),
                        email,
                        display_name: identity.display_name.clone().unwrap_or_default(),
                        photo_url: identity.picture.clone(),
                    },
                    Utc::now(),
                )
            }
        };

        let record = AdminRecord::self_granted(
            account.uid.clone(),
            account.email.clone(),
            admin_display_name(
                identity
                    .display_name
                    .as_deref()
                    .or(Some(account.display_name.as_str())),
            ),
            Utc::now(),
        );

        match self.promote_first_admin(&record, &account).await {
            Ok(Some(record)) => {
                info!(uid = %record.uid, "First admin bootstrapped");
                Ok(BootstrapOutcome::Created(record))
            }
            Ok(None) | Err(DirectoryError::Conflict(_)) => self
                .store
                .find_admin(&identity.uid)
                .await?
                .map(BootstrapOutcome::Existing)
                .ok_or_else(first_admin_taken),
            Err(e) => Err(e),
        }
    }

    /// Checks that `caller` may create admins, without reading any input.
    ///
    /// Anyone may while the directory is empty; afterwards `manageAdmins` is
    /// required.
    ///
    /// # Errors
    ///
    /// - `Forbidden` if the caller lacks `manageAdmins`
    /// - `StoreUnavailable` if the store fails
    pub async fn authorize_admin_creation(
        &self,
        caller: &Authorization,
    ) -> Result<(), DirectoryError> {
        if self.store.count_admins().await? > 0 {
            caller.require(Permission::ManageAdmins)?;
        }
        Ok(())
    }

    /// Grants admin access to the user with the given email.
    ///
    /// The caller needs `manageAdmins`, unless no admin exists yet; the first
    /// admin created this way becomes a superadmin with every capability.
    ///
    /// # Errors
    ///
    /// - `Forbidden` if the caller lacks `manageAdmins`
    /// - `InvalidInput` if the email is missing or malformed
    /// - `NotFound` if no identity has the email
    /// - `Conflict` if the target is already an admin
    /// - `IdentityProvider` if the directory lookup fails
    /// - `StoreUnavailable` if the store fails
    #[instrument(skip(self, caller, request), fields(caller = %caller.uid()))]
    pub async fn create_admin(
        &self,
        caller: &Authorization,
        request: NewAdmin,
    ) -> Result<AdminRecord, DirectoryError> {
        let first = self.store.count_admins().await? == 0;
        if !first {
            caller.require(Permission::ManageAdmins)?;
        }

        let email = parse_target_email(request.email.as_deref())?;
        let target = match self.identity.lookup_by_email(&email).await {
            Ok(target) => target,
            Err(IdentityError::NotFound) => {
                return Err(DirectoryError::NotFound(
                    "user not found with this email".to_owned(),
                ));
            }
            Err(e) => {
                error!(error = %e, "Identity lookup failed");
                return Err(DirectoryError::IdentityProvider(e));
            }
        };

        if self.store.find_admin(&target.uid).await?.is_some() {
            return Err(already_admin());
        }

        let now = Utc::now();
        let display_name = admin_display_name(target.display_name.as_deref());
        let seed = AccountSeed {
            uid: target.uid.clone(),
            email: target.email.clone(),
            display_name: target.display_name.clone().unwrap_or_default(),
            photo_url: None,
        };

        if first {
            let record = AdminRecord::granted(
                target.uid.clone(),
                target.email.clone(),
                display_name.clone(),
                AdminRole::SuperAdmin,
                Permissions {
                    manage_admins: true,
                    ..Permissions::default().merged(&request.permissions)
                },
                target.uid.clone(),
                now,
            );
            let account = self.account_for(seed.clone()).await?;
            match self.promote_first_admin(&record, &account).await {
                Ok(Some(record)) => {
                    info!(uid = %record.uid, email = %record.email, "First admin created");
                    return Ok(record);
                }
                Ok(None) => {
                    // Someone else took the first slot; fall through to the
                    // governed path.
                    caller.require(Permission::ManageAdmins)?;
                }
                Err(DirectoryError::Conflict(_)) => return Err(already_admin()),
                Err(e) => return Err(e),
            }
        }

        let record = AdminRecord::granted(
            target.uid,
            target.email,
            display_name,
            AdminRole::Admin,
            Permissions::default().merged(&request.permissions),
            caller.uid().clone(),
            now,
        );
        match self.promote_to_admin(&record, seed).await {
            Ok(record) => {
                info!(
                    uid = %record.uid,
                    email = %record.email,
                    added_by = %record.added_by,
                    "Admin created"
                );
                Ok(record)
            }
            Err(DirectoryError::Conflict(_)) => Err(already_admin()),
            Err(e) => Err(e),
        }
    }

    /// Lists admin records newest first.
    ///
    /// # Errors
    ///
    /// Returns `Forbidden` if the caller lacks `manageAdmins`, or
    /// `StoreUnavailable` if the store fails.
    pub async fn list_admins(
        &self,
        caller: &Authorization,
        page: PageRequest,
    ) -> Result<AdminPage, DirectoryError> {
        caller.require(Permission::ManageAdmins)?;
        self.list_all(page).await
    }

    /// Lists admin records newest first, without a caller check. Operator
    /// tooling only.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` if the store fails.
    pub async fn list_all(&self, page: PageRequest) -> Result<AdminPage, DirectoryError> {
        let total = self.store.count_admins().await?;
        let admins = self.store.list_admins(page.offset(), page.limit()).await?;
        Ok(AdminPage {
            admins,
            page: page.info(total),
        })
    }

    /// Operator promotion of an existing account, bypassing the first-admin
    /// rule. The new record is a self-granted superadmin.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no account has the email, or
    /// `StoreUnavailable` if the store fails.
    #[instrument(skip(self))]
    pub async fn promote_account(&self, email: &Email) -> Result<BootstrapOutcome, DirectoryError> {
        let account = self
            .store
            .find_account_by_email(email)
            .await?
            .ok_or_else(|| DirectoryError::NotFound("account not found".to_owned()))?;

        if let Some(record) = self.store.find_admin(&account.uid).await? {
            if !account.is_admin {
                self.ensure_admin_account(&record, &account).await;
            }
            return Ok(BootstrapOutcome::Existing(record));
        }

        let record = AdminRecord::self_granted(
            account.uid.clone(),
            account.email.clone(),
            admin_display_name(Some(account.display_name.as_str())),
            Utc::now(),
        );
        let record = self.insert_then_flag(&record, &account).await?;
        info!(uid = %record.uid, "Account promoted by operator");
        Ok(BootstrapOutcome::Created(record))
    }

    /// Writes `record`, then marks the target's account as admin, creating
    /// the account from `seed` if needed.
    async fn promote_to_admin(
        &self,
        record: &AdminRecord,
        seed: AccountSeed,
    ) -> Result<AdminRecord, DirectoryError> {
        let account = self.account_for(seed).await?;
        self.insert_then_flag(record, &account).await
    }

    async fn insert_then_flag(
        &self,
        record: &AdminRecord,
        account: &Account,
    ) -> Result<AdminRecord, DirectoryError> {
        let stored = self.store.insert_admin(record).await?;
        self.ensure_admin_account(&stored, account).await;
        Ok(stored)
    }

    /// Like [`Self::insert_then_flag`], but only while no admin exists.
    /// Returns `None` when the first slot is already taken.
    async fn promote_first_admin(
        &self,
        record: &AdminRecord,
        account: &Account,
    ) -> Result<Option<AdminRecord>, DirectoryError> {
        let Some(stored) = self.store.insert_first_admin(record).await? else {
            return Ok(None);
        };
        self.ensure_admin_account(&stored, account).await;
        Ok(Some(stored))
    }

    async fn account_for(&self, seed: AccountSeed) -> Result<Account, DirectoryError> {
        Ok(match self.store.find_account(&seed.uid).await? {
            Some(account) => account,
            None => Account::new(seed, Utc::now()),
        })
    }

    /// Second half of a promotion: set the account flag, inserting the
    /// account if it does not exist. Never fails the promotion.
    async fn ensure_admin_account(&self, record: &AdminRecord, account: &Account) {
        let now = Utc::now();
        let result = match self.store.set_account_admin(&record.uid, true, now).await {
            Ok(true) => Ok(()),
            Ok(false) => {
                let mut account = account.clone();
                account.is_admin = true;
                account.updated_at = now;
                match self.store.insert_account(&account).await {
                    Ok(_) => Ok(()),
                    Err(RepositoryError::Conflict(_)) => self
                        .store
                        .set_account_admin(&record.uid, true, now)
                        .await
                        .map(|_| ()),
                    Err(e) => Err(e),
                }
            }
            Err(e) => Err(e),
        };

        if let Err(e) = result {
            warn!(
                uid = %record.uid,
                error = %e,
                "Admin record written but account flag update failed"
            );
        }
    }
}

fn parse_target_email(raw: Option<&str>) -> Result<Email, DirectoryError> {
    let raw = raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| DirectoryError::InvalidInput("email is required".to_owned()))?;
    Email::parse(raw).map_err(|e| DirectoryError::InvalidInput(format!("invalid email: {e}")))
}

fn admin_display_name(name: Option<&str>) -> String {
    name.map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or(DEFAULT_ADMIN_DISPLAY_NAME)
        .to_owned()
}

fn first_admin_taken() -> DirectoryError {
    DirectoryError::Forbidden("an admin already exists".to_owned())
}

fn already_admin() -> DirectoryError {
    DirectoryError::Conflict("user is already an admin".to_owned())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use async_trait::async_trait;
    use chrono::{DateTime, Duration};

    use super::*;
    use crate::db::InMemoryDirectoryStore;
    use crate::identity::StaticIdentityProvider;
    use crate::models::ProfileUpdate;

    fn uid(s: &str) -> Uid {
        Uid::parse(s).unwrap()
    }

    fn email(s: &str) -> Email {
        Email::parse(s).unwrap()
    }

    fn identity(u: &str, e: &str) -> VerifiedIdentity {
        VerifiedIdentity {
            uid: uid(u),
            email: Some(email(e)),
            display_name: None,
            picture: None,
        }
    }

    fn provider() -> StaticIdentityProvider {
        StaticIdentityProvider::new()
            .with_user("t1", uid("u1"), email("a@x.com"), Some("Alice"))
            .with_user("t2", uid("u2"), email("b@x.com"), None)
            .with_user("t3", uid("u3"), email("c@x.com"), Some("Carol"))
    }

    fn directory_with(store: Arc<dyn DirectoryStore>) -> AdminDirectory {
        AdminDirectory::new(store, Arc::new(provider()))
    }

    fn directory() -> (AdminDirectory, Arc<InMemoryDirectoryStore>) {
        let store = Arc::new(InMemoryDirectoryStore::new());
        (directory_with(store.clone()), store)
    }

    fn account(u: &str, e: &str, name: &str) -> Account {
        Account::new(
            AccountSeed {
                uid: uid(u),
                email: email(e),
                display_name: name.to_owned(),
                photo_url: None,
            },
            Utc::now(),
        )
    }

    async fn authorized(dir: &AdminDirectory, u: &str, e: &str) -> Authorization {
        dir.authorize(identity(u, e)).await.unwrap()
    }

    /// Store whose account-flag writes always fail.
    struct FlagFailingStore(InMemoryDirectoryStore);

    #[async_trait]
    impl DirectoryStore for FlagFailingStore {
        fn backend(&self) -> &'static str {
            "flag-failing"
        }
        async fn health_check(&self) -> Result<(), RepositoryError> {
            self.0.health_check().await
        }
        async fn count_admins(&self) -> Result<u64, RepositoryError> {
            self.0.count_admins().await
        }
        async fn find_admin(&self, uid: &Uid) -> Result<Option<AdminRecord>, RepositoryError> {
            self.0.find_admin(uid).await
        }
        async fn insert_admin(
            &self,
            record: &AdminRecord,
        ) -> Result<AdminRecord, RepositoryError> {
            self.0.insert_admin(record).await
        }
        async fn insert_first_admin(
            &self,
            record: &AdminRecord,
        ) -> Result<Option<AdminRecord>, RepositoryError> {
            self.0.insert_first_admin(record).await
        }
        async fn list_admins(
            &self,
            offset: u64,
            limit: u32,
        ) -> Result<Vec<AdminRecord>, RepositoryError> {
            self.0.list_admins(offset, limit).await
        }
        async fn touch_admin_login(
            &self,
            uid: &Uid,
            at: DateTime<Utc>,
        ) -> Result<(), RepositoryError> {
            self.0.touch_admin_login(uid, at).await
        }
        async fn find_account(&self, uid: &Uid) -> Result<Option<Account>, RepositoryError> {
            self.0.find_account(uid).await
        }
        async fn find_account_by_email(
            &self,
            email: &Email,
        ) -> Result<Option<Account>, RepositoryError> {
            self.0.find_account_by_email(email).await
        }
        async fn insert_account(&self, _account: &Account) -> Result<Account, RepositoryError> {
            Err(RepositoryError::DataCorruption("write refused".to_owned()))
        }
        async fn set_account_admin(
            &self,
            _uid: &Uid,
            _is_admin: bool,
            _at: DateTime<Utc>,
        ) -> Result<bool, RepositoryError> {
            Err(RepositoryError::DataCorruption("write refused".to_owned()))
        }
        async fn update_account_profile(
            &self,
            uid: &Uid,
            update: &ProfileUpdate,
            at: DateTime<Utc>,
        ) -> Result<Option<Account>, RepositoryError> {
            self.0.update_account_profile(uid, update, at).await
        }
    }

    #[tokio::test]
    async fn test_authenticate_rejects_unknown_token() {
        let (dir, _) = directory();
        let err = dir.authenticate("nope").await.unwrap_err();
        assert!(matches!(err, DirectoryError::Unauthenticated(_)));
        assert_eq!(dir.authenticate("t1").await.unwrap().uid, uid("u1"));
    }

    #[tokio::test]
    async fn test_bootstrap_on_empty_directory_creates_superadmin() {
        let (dir, store) = directory();
        let outcome = dir
            .bootstrap_first_admin(&identity("u1", "a@x.com"))
            .await
            .unwrap();

        assert!(outcome.is_created());
        let record = outcome.record();
        assert_eq!(record.uid, uid("u1"));
        assert_eq!(record.role, AdminRole::SuperAdmin);
        assert_eq!(record.added_by, uid("u1"));
        assert_eq!(record.permissions, Permissions::all());

        let account = store.find_account(&uid("u1")).await.unwrap().unwrap();
        assert!(account.is_admin);
    }

    #[tokio::test]
    async fn test_bootstrap_is_idempotent() {
        let (dir, store) = directory();
        let caller = identity("u1", "a@x.com");
        let first = dir.bootstrap_first_admin(&caller).await.unwrap();
        let second = dir.bootstrap_first_admin(&caller).await.unwrap();

        assert!(!second.is_created());
        assert_eq!(first.record(), second.record());
        assert_eq!(store.count_admins().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_bootstrap_rejected_once_an_admin_exists() {
        let (dir, store) = directory();
        dir.bootstrap_first_admin(&identity("u1", "a@x.com"))
            .await
            .unwrap();

        let err = dir
            .bootstrap_first_admin(&identity("u2", "b@x.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, DirectoryError::Forbidden(_)));
        assert!(store.find_admin(&uid("u2")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_bootstrap_without_account_or_email_is_not_found() {
        let (dir, _) = directory();
        let caller = VerifiedIdentity {
            email: None,
            ..identity("u9", "z@x.com")
        };
        let err = dir.bootstrap_first_admin(&caller).await.unwrap_err();
        assert!(matches!(err, DirectoryError::NotFound(ref m) if m == "account not found"));
    }

    #[tokio::test]
    async fn test_concurrent_bootstrap_yields_one_superadmin() {
        let (dir, store) = directory();
        let handles: Vec<_> = (0..6)
            .map(|i| {
                let dir = dir.clone();
                tokio::spawn(async move {
                    dir.bootstrap_first_admin(&identity(&format!("racer{i}"), &format!("r{i}@x.com")))
                        .await
                })
            })
            .collect();

        let mut created = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(outcome) if outcome.is_created() => created += 1,
                Ok(_) => {}
                Err(e) => assert!(matches!(e, DirectoryError::Forbidden(_))),
            }
        }
        assert_eq!(created, 1);
        assert_eq!(store.count_admins().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_create_admin_applies_overrides_and_defaults() {
        let (dir, store) = directory();
        dir.bootstrap_first_admin(&identity("u1", "a@x.com"))
            .await
            .unwrap();
        let caller = authorized(&dir, "u1", "a@x.com").await;

        let record = dir
            .create_admin(
                &caller,
                NewAdmin {
                    email: Some("b@x.com".to_owned()),
                    permissions: PermissionOverrides {
                        manage_admins: Some(false),
                        ..PermissionOverrides::default()
                    },
                },
            )
            .await
            .unwrap();

        assert_eq!(record.uid, uid("u2"));
        assert_eq!(record.role, AdminRole::Admin);
        assert_eq!(record.added_by, uid("u1"));
        assert_eq!(record.display_name, DEFAULT_ADMIN_DISPLAY_NAME);
        assert!(!record.permissions.manage_admins);
        assert!(record.permissions.create_products);
        assert!(record.permissions.edit_products);
        assert!(record.permissions.delete_products);
        assert!(record.permissions.manage_users);
        assert!(store.find_account(&uid("u2")).await.unwrap().unwrap().is_admin);
    }

    #[tokio::test]
    async fn test_create_admin_when_empty_makes_superadmin() {
        let (dir, _) = directory();
        let caller = authorized(&dir, "u3", "c@x.com").await;
        assert!(!caller.is_admin());

        let record = dir
            .create_admin(
                &caller,
                NewAdmin {
                    email: Some("A@X.com".to_owned()),
                    permissions: PermissionOverrides {
                        manage_admins: Some(false),
                        delete_products: Some(false),
                        ..PermissionOverrides::default()
                    },
                },
            )
            .await
            .unwrap();

        assert_eq!(record.uid, uid("u1"));
        assert_eq!(record.role, AdminRole::SuperAdmin);
        assert_eq!(record.added_by, uid("u1"));
        assert!(record.permissions.manage_admins);
        assert!(!record.permissions.delete_products);
        assert_eq!(record.display_name, "Alice");
    }

    #[tokio::test]
    async fn test_create_admin_errors() {
        let (dir, _) = directory();
        dir.bootstrap_first_admin(&identity("u1", "a@x.com"))
            .await
            .unwrap();
        let caller = authorized(&dir, "u1", "a@x.com").await;

        let missing = dir.create_admin(&caller, NewAdmin::default()).await;
        assert!(matches!(missing, Err(DirectoryError::InvalidInput(_))));

        let malformed = dir
            .create_admin(
                &caller,
                NewAdmin {
                    email: Some("not-an-email".to_owned()),
                    ..NewAdmin::default()
                },
            )
            .await;
        assert!(matches!(malformed, Err(DirectoryError::InvalidInput(_))));

        let unknown = dir
            .create_admin(
                &caller,
                NewAdmin {
                    email: Some("nobody@x.com".to_owned()),
                    ..NewAdmin::default()
                },
            )
            .await;
        assert!(matches!(unknown, Err(DirectoryError::NotFound(_))));

        let duplicate = dir
            .create_admin(
                &caller,
                NewAdmin {
                    email: Some("a@x.com".to_owned()),
                    ..NewAdmin::default()
                },
            )
            .await;
        assert!(matches!(duplicate, Err(DirectoryError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_permission_gate() {
        let (dir, _) = directory();
        dir.bootstrap_first_admin(&identity("u1", "a@x.com"))
            .await
            .unwrap();
        let root = authorized(&dir, "u1", "a@x.com").await;
        dir.create_admin(
            &root,
            NewAdmin {
                email: Some("b@x.com".to_owned()),
                ..NewAdmin::default()
            },
        )
        .await
        .unwrap();

        let limited = authorized(&dir, "u2", "b@x.com").await;
        assert!(limited.is_admin());
        assert!(!limited.can(Permission::ManageAdmins));
        assert!(matches!(
            dir.list_admins(&limited, PageRequest::default()).await,
            Err(DirectoryError::Forbidden(_))
        ));
        assert!(matches!(
            dir.create_admin(
                &limited,
                NewAdmin {
                    email: Some("c@x.com".to_owned()),
                    ..NewAdmin::default()
                }
            )
            .await,
            Err(DirectoryError::Forbidden(_))
        ));

        let outsider = authorized(&dir, "u3", "c@x.com").await;
        assert!(!outsider.is_admin());
        assert!(!outsider.can(Permission::CreateProducts));
        assert!(matches!(
            outsider.require(Permission::ManageUsers),
            Err(DirectoryError::Forbidden(_))
        ));

        let page = dir.list_admins(&root, PageRequest::default()).await.unwrap();
        assert_eq!(page.page.total, 2);
    }

    #[tokio::test]
    async fn test_authorize_admin_creation() {
        let (dir, _) = directory();
        let outsider = authorized(&dir, "u3", "c@x.com").await;
        dir.authorize_admin_creation(&outsider).await.unwrap();

        dir.bootstrap_first_admin(&identity("u1", "a@x.com"))
            .await
            .unwrap();
        let root = authorized(&dir, "u1", "a@x.com").await;
        dir.authorize_admin_creation(&root).await.unwrap();
        assert!(matches!(
            dir.authorize_admin_creation(&outsider).await,
            Err(DirectoryError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn test_list_admins_paginates_newest_first() {
        let (dir, store) = directory();
        let base = Utc::now();
        for i in 0..5 {
            let record = AdminRecord::self_granted(
                uid(&format!("u{i}")),
                email(&format!("u{i}@x.com")),
                "Admin".to_owned(),
                base + Duration::seconds(i),
            );
            store.insert_admin(&record).await.unwrap();
        }
        let caller = authorized(&dir, "u4", "u4@x.com").await;

        let page = dir
            .list_admins(&caller, PageRequest::from_query(Some("2"), Some("2")))
            .await
            .unwrap();
        let uids: Vec<_> = page.admins.iter().map(|a| a.uid.as_str()).collect();
        assert_eq!(uids, ["u2", "u1"]);
        assert_eq!(page.page.total_pages, 3);
        assert_eq!(page.page.total, 5);
        assert_eq!(page.page.current_page, 2);
    }

    #[tokio::test]
    async fn test_authorize_heals_flagged_account() {
        let (dir, store) = directory();
        let mut account = account("u1", "a@x.com", "Alice");
        account.is_admin = true;
        store.insert_account(&account).await.unwrap();

        let auth = authorized(&dir, "u1", "a@x.com").await;
        let admin = auth.admin().unwrap();
        assert_eq!(admin.role, AdminRole::SuperAdmin);
        assert_eq!(admin.added_by, uid("u1"));
        assert_eq!(admin.display_name, "Alice");
        assert!(store.find_admin(&uid("u1")).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_authorize_heal_conflict_denies() {
        let (dir, store) = directory();
        // Another admin already owns the email of the flagged account.
        store
            .insert_admin(&AdminRecord::self_granted(
                uid("u2"),
                email("a@x.com"),
                "Other".to_owned(),
                Utc::now(),
            ))
            .await
            .unwrap();
        let mut account = account("u1", "a@x.com", "");
        account.is_admin = true;
        store.insert_account(&account).await.unwrap();

        let auth = authorized(&dir, "u1", "a@x.com").await;
        assert!(!auth.is_admin());
    }

    #[tokio::test]
    async fn test_flag_failure_does_not_fail_promotion() {
        let store = Arc::new(FlagFailingStore(InMemoryDirectoryStore::new()));
        let dir = directory_with(store.clone());

        let outcome = dir
            .bootstrap_first_admin(&identity("u1", "a@x.com"))
            .await
            .unwrap();
        assert!(outcome.is_created());
        assert!(store.find_admin(&uid("u1")).await.unwrap().is_some());
        assert!(store.find_account(&uid("u1")).await.unwrap().is_none());

        let auth = authorized(&dir, "u1", "a@x.com").await;
        assert!(auth.can(Permission::ManageAdmins));
    }

    #[tokio::test]
    async fn test_record_login_sets_last_login() {
        let (dir, store) = directory();
        let mut record = dir
            .bootstrap_first_admin(&identity("u1", "a@x.com"))
            .await
            .unwrap()
            .into_record();
        assert!(record.last_login.is_none());

        dir.record_login(&mut record).await;
        assert!(record.last_login.is_some());
        let stored = store.find_admin(&uid("u1")).await.unwrap().unwrap();
        assert!(stored.last_login.is_some());
    }

    #[tokio::test]
    async fn test_promote_account_by_email() {
        let (dir, store) = directory();
        dir.bootstrap_first_admin(&identity("u1", "a@x.com"))
            .await
            .unwrap();
        store
            .insert_account(&account("u2", "b@x.com", "Bob"))
            .await
            .unwrap();

        let outcome = dir.promote_account(&email("b@x.com")).await.unwrap();
        assert!(outcome.is_created());
        assert_eq!(outcome.record().role, AdminRole::SuperAdmin);
        assert_eq!(outcome.record().display_name, "Bob");
        assert!(store.find_account(&uid("u2")).await.unwrap().unwrap().is_admin);

        let again = dir.promote_account(&email("b@x.com")).await.unwrap();
        assert!(!again.is_created());

        assert!(matches!(
            dir.promote_account(&email("ghost@x.com")).await,
            Err(DirectoryError::NotFound(_))
        ));
    }
}
