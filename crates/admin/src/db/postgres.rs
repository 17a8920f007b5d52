//! `PostgreSQL` directory store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use gadget_pulse_core::{Email, Uid};

use super::{AccountRepository, AdminRecordRepository, DirectoryStore, RepositoryError};
use crate::models::{Account, AdminRecord, ProfileUpdate};

/// [`DirectoryStore`] backed by a `PostgreSQL` pool.
#[derive(Debug, Clone)]
pub struct PgDirectoryStore {
    pool: PgPool,
}

impl PgDirectoryStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Returns the underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    const fn admins(&self) -> AdminRecordRepository<'_> {
        AdminRecordRepository::new(&self.pool)
    }

    const fn accounts(&self) -> AccountRepository<'_> {
        AccountRepository::new(&self.pool)
    }
}

#[async_trait]
impl DirectoryStore for PgDirectoryStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn health_check(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn count_admins(&self) -> Result<u64, RepositoryError> {
        self.admins().count().await
    }

    async fn find_admin(&self, uid: &Uid) -> Result<Option<AdminRecord>, RepositoryError> {
        self.admins().get_by_uid(uid).await
    }

    async fn insert_admin(&self, record: &AdminRecord) -> Result<AdminRecord, RepositoryError> {
        self.admins().create(record).await
    }

    async fn insert_first_admin(
        &self,
        record: &AdminRecord,
    ) -> Result<Option<AdminRecord>, RepositoryError> {
        self.admins().create_if_empty(record).await
    }

    async fn list_admins(
        &self,
        offset: u64,
        limit: u32,
    ) -> Result<Vec<AdminRecord>, RepositoryError> {
        self.admins().list(offset, limit).await
    }

    async fn touch_admin_login(
        &self,
        uid: &Uid,
        at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        self.admins().touch_last_login(uid, at).await
    }

    async fn find_account(&self, uid: &Uid) -> Result<Option<Account>, RepositoryError> {
        self.accounts().get_by_uid(uid).await
    }

    async fn find_account_by_email(
        &self,
        email: &Email,
    ) -> Result<Option<Account>, RepositoryError> {
        self.accounts().get_by_email(email).await
    }

    async fn insert_account(&self, account: &Account) -> Result<Account, RepositoryError> {
        self.accounts().create(account).await
    }

    async fn set_account_admin(
        &self,
        uid: &Uid,
        is_admin: bool,
        at: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        self.accounts().set_admin_flag(uid, is_admin, at).await
    }

    async fn update_account_profile(
        &self,
        uid: &Uid,
        update: &ProfileUpdate,
        at: DateTime<Utc>,
    ) -> Result<Option<Account>, RepositoryError> {
        self.accounts().update_profile(uid, update, at).await
    }
}

// Requires a database: `DATABASE_URL=... cargo test -p gadget-pulse-admin -- --ignored`
#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use gadget_pulse_core::AdminRole;

    use super::*;

    fn record(uid: &str, email: &str) -> AdminRecord {
        AdminRecord::self_granted(
            Uid::parse(uid).unwrap(),
            Email::parse(email).unwrap(),
            uid.to_owned(),
            Utc::now(),
        )
    }

    #[ignore = "requires PostgreSQL"]
    #[sqlx::test(migrations = "./migrations")]
    async fn test_insert_first_admin_has_one_winner(pool: PgPool) {
        let store = PgDirectoryStore::new(pool);
        let first = record("u1", "a@x.com");
        let second = record("u2", "b@x.com");

        let (a, b) = tokio::join!(
            store.insert_first_admin(&first),
            store.insert_first_admin(&second)
        );
        let winners = [a.unwrap(), b.unwrap()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>();
        assert_eq!(winners.len(), 1);
        assert_eq!(store.count_admins().await.unwrap(), 1);

        let stored = store.find_admin(&winners[0].uid).await.unwrap().unwrap();
        assert_eq!(stored.role, AdminRole::SuperAdmin);
        assert!(stored.permissions.manage_admins);
    }

    #[ignore = "requires PostgreSQL"]
    #[sqlx::test(migrations = "./migrations")]
    async fn test_insert_admin_rejects_duplicate_uid(pool: PgPool) {
        let store = PgDirectoryStore::new(pool);
        store.insert_admin(&record("u1", "a@x.com")).await.unwrap();
        assert!(matches!(
            store.insert_admin(&record("u1", "other@x.com")).await,
            Err(RepositoryError::Conflict(_))
        ));
        assert!(store.insert_first_admin(&record("u2", "b@x.com")).await.unwrap().is_none());
    }
}
