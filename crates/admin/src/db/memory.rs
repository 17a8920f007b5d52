//! In-memory directory store.
//!
//! Keeps accounts and admin records in maps behind a single
//! `tokio::sync::RwLock`, so every multi-step operation (uniqueness checks,
//! "insert only if empty") happens under one write guard. Data is lost on
//! restart; use it for tests and local runs.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use gadget_pulse_core::{Email, Uid};

use super::{DirectoryStore, RepositoryError};
use crate::models::{Account, AdminRecord, ProfileUpdate};

#[derive(Debug, Default)]
struct Directory {
    accounts: HashMap<Uid, Account>,
    admins: HashMap<Uid, AdminRecord>,
}

impl Directory {
    fn insert_admin(&mut self, record: &AdminRecord) -> Result<AdminRecord, RepositoryError> {
        if self.admins.contains_key(&record.uid) {
            return Err(RepositoryError::Conflict(
                "admin with this uid already exists".to_owned(),
            ));
        }
        if self.admins.values().any(|a| a.email == record.email) {
            return Err(RepositoryError::Conflict(
                "admin with this email already exists".to_owned(),
            ));
        }
        self.admins.insert(record.uid.clone(), record.clone());
        Ok(record.clone())
    }
}

/// [`DirectoryStore`] backed by process memory.
#[derive(Debug, Default)]
pub struct InMemoryDirectoryStore {
    inner: RwLock<Directory>,
}

impl InMemoryDirectoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DirectoryStore for InMemoryDirectoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn health_check(&self) -> Result<(), RepositoryError> {
        Ok(())
    }

    async fn count_admins(&self) -> Result<u64, RepositoryError> {
        let guard = self.inner.read().await;
        Ok(guard.admins.len() as u64)
    }

    async fn find_admin(&self, uid: &Uid) -> Result<Option<AdminRecord>, RepositoryError> {
        let guard = self.inner.read().await;
        Ok(guard.admins.get(uid).cloned())
    }

    async fn insert_admin(&self, record: &AdminRecord) -> Result<AdminRecord, RepositoryError> {
        let mut guard = self.inner.write().await;
        guard.insert_admin(record)
    }

    async fn insert_first_admin(
        &self,
        record: &AdminRecord,
    ) -> Result<Option<AdminRecord>, RepositoryError> {
        let mut guard = self.inner.write().await;
        if !guard.admins.is_empty() {
            return Ok(None);
        }
        guard.insert_admin(record).map(Some)
    }

    async fn list_admins(
        &self,
        offset: u64,
        limit: u32,
    ) -> Result<Vec<AdminRecord>, RepositoryError> {
        let guard = self.inner.read().await;
        let mut records: Vec<AdminRecord> = guard.admins.values().cloned().collect();
        records.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.uid.cmp(&b.uid))
        });
        let skip = usize::try_from(offset).unwrap_or(usize::MAX);
        Ok(records
            .into_iter()
            .skip(skip)
            .take(limit as usize)
            .collect())
    }

    async fn touch_admin_login(
        &self,
        uid: &Uid,
        at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let mut guard = self.inner.write().await;
        if let Some(record) = guard.admins.get_mut(uid) {
            record.last_login = Some(at);
        }
        Ok(())
    }

    async fn find_account(&self, uid: &Uid) -> Result<Option<Account>, RepositoryError> {
        let guard = self.inner.read().await;
        Ok(guard.accounts.get(uid).cloned())
    }

    async fn find_account_by_email(
        &self,
        email: &Email,
    ) -> Result<Option<Account>, RepositoryError> {
        let guard = self.inner.read().await;
        Ok(guard.accounts.values().find(|a| &a.email == email).cloned())
    }

    async fn insert_account(&self, account: &Account) -> Result<Account, RepositoryError> {
        let mut guard = self.inner.write().await;
        if guard.accounts.contains_key(&account.uid) {
            return Err(RepositoryError::Conflict(
                "account with this uid already exists".to_owned(),
            ));
        }
        if guard.accounts.values().any(|a| a.email == account.email) {
            return Err(RepositoryError::Conflict(
                "account with this email already exists".to_owned(),
            ));
        }
        guard.accounts.insert(account.uid.clone(), account.clone());
        Ok(account.clone())
    }

    async fn set_account_admin(
        &self,
        uid: &Uid,
        is_admin: bool,
        at: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        let mut guard = self.inner.write().await;
        Ok(guard.accounts.get_mut(uid).is_some_and(|account| {
            account.is_admin = is_admin;
            account.updated_at = at;
            true
        }))
    }

    async fn update_account_profile(
        &self,
        uid: &Uid,
        update: &ProfileUpdate,
        at: DateTime<Utc>,
    ) -> Result<Option<Account>, RepositoryError> {
        let mut guard = self.inner.write().await;
        Ok(guard.accounts.get_mut(uid).map(|account| {
            update.apply_to(account, at);
            account.clone()
        }))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use chrono::Duration;

    use super::*;
    use crate::models::AccountSeed;

    fn uid(s: &str) -> Uid {
        Uid::parse(s).unwrap()
    }

    fn email(s: &str) -> Email {
        Email::parse(s).unwrap()
    }

    fn record(u: &str, e: &str, at: DateTime<Utc>) -> AdminRecord {
        AdminRecord::self_granted(uid(u), email(e), u.to_owned(), at)
    }

    #[tokio::test]
    async fn test_admin_uid_and_email_are_unique() {
        let store = InMemoryDirectoryStore::new();
        let now = Utc::now();
        store.insert_admin(&record("u1", "a@x.com", now)).await.unwrap();

        let same_uid = store.insert_admin(&record("u1", "other@x.com", now)).await;
        assert!(matches!(same_uid, Err(RepositoryError::Conflict(_))));

        let same_email = store.insert_admin(&record("u2", "a@x.com", now)).await;
        assert!(matches!(same_email, Err(RepositoryError::Conflict(_))));

        assert_eq!(store.count_admins().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_insert_first_admin_only_when_empty() {
        let store = InMemoryDirectoryStore::new();
        let now = Utc::now();
        let first = store
            .insert_first_admin(&record("u1", "a@x.com", now))
            .await
            .unwrap();
        assert!(first.is_some());

        let second = store
            .insert_first_admin(&record("u2", "b@x.com", now))
            .await
            .unwrap();
        assert!(second.is_none());
        assert!(store.find_admin(&uid("u2")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_concurrent_first_admin_claims_admit_one() {
        let store = Arc::new(InMemoryDirectoryStore::new());
        let now = Utc::now();
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    store
                        .insert_first_admin(&record(&format!("u{i}"), &format!("{i}@x.com"), now))
                        .await
                        .unwrap()
                })
            })
            .collect();

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap().is_some() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
        assert_eq!(store.count_admins().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_list_orders_newest_first_and_paginates() {
        let store = InMemoryDirectoryStore::new();
        let base = Utc::now();
        for i in 0..5 {
            store
                .insert_admin(&record(
                    &format!("u{i}"),
                    &format!("{i}@x.com"),
                    base + Duration::seconds(i),
                ))
                .await
                .unwrap();
        }

        let page: Vec<String> = store
            .list_admins(2, 2)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.uid.into_inner())
            .collect();
        assert_eq!(page, vec!["u2", "u1"]);

        assert_eq!(store.list_admins(4, 2).await.unwrap().len(), 1);
        assert!(store.list_admins(10, 2).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_account_admin_flag_and_profile() {
        let store = InMemoryDirectoryStore::new();
        let now = Utc::now();
        let account = Account::new(
            AccountSeed {
                uid: uid("u1"),
                email: email("a@x.com"),
                display_name: "Alice".to_owned(),
                photo_url: None,
            },
            now,
        );
        store.insert_account(&account).await.unwrap();
        assert!(matches!(
            store.insert_account(&account).await,
            Err(RepositoryError::Conflict(_))
        ));

        assert!(store.set_account_admin(&uid("u1"), true, now).await.unwrap());
        assert!(!store.set_account_admin(&uid("missing"), true, now).await.unwrap());

        let update = ProfileUpdate {
            bio: Some("hello".to_owned()),
            ..ProfileUpdate::default()
        };
        let updated = store
            .update_account_profile(&uid("u1"), &update, now)
            .await
            .unwrap()
            .unwrap();
        assert!(updated.is_admin);
        assert_eq!(updated.bio, "hello");

        let by_email = store.find_account_by_email(&email("A@X.com")).await.unwrap();
        assert_eq!(by_email.map(|a| a.uid), Some(uid("u1")));
    }
}
