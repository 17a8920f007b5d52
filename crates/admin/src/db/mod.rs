//! Persistence for accounts and admin records.
//!
//! # Tables
//!
//! - `accounts` - User profiles keyed by identity-provider uid
//! - `admin_records` - Privileged accounts and their capability flags
//!
//! Both tables carry unique indexes on `uid` and `email`. The admin directory
//! relies on those indexes (not on application checks) to guarantee at most
//! one admin record per uid.
//!
//! # Backends
//!
//! - [`PgDirectoryStore`] - `PostgreSQL` via sqlx (production)
//! - [`InMemoryDirectoryStore`] - `tokio::sync::RwLock` maps (tests, local runs)
//!
//! # Migrations
//!
//! Migrations are stored in `crates/admin/migrations/` and run via:
//! ```bash
//! cargo run -p gadget-pulse-cli -- migrate
//! ```

pub mod accounts;
pub mod admin_records;
pub mod memory;
pub mod postgres;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use gadget_pulse_core::{Email, Uid};

use crate::models::{Account, AdminRecord, ProfileUpdate};

pub use accounts::AccountRepository;
pub use admin_records::AdminRecordRepository;
pub use memory::InMemoryDirectoryStore;
pub use postgres::PgDirectoryStore;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Unique constraint violation (uid or email already taken).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Storage operations the admin directory and account service need.
///
/// Implementations must enforce uid and email uniqueness for both entities
/// and report violations as [`RepositoryError::Conflict`].
#[async_trait]
pub trait DirectoryStore: Send + Sync {
    /// Short backend name for logs.
    fn backend(&self) -> &'static str;

    /// Verifies the backend is reachable.
    async fn health_check(&self) -> Result<(), RepositoryError>;

    /// Number of admin records.
    async fn count_admins(&self) -> Result<u64, RepositoryError>;

    /// Finds the admin record for a uid.
    async fn find_admin(&self, uid: &Uid) -> Result<Option<AdminRecord>, RepositoryError>;

    /// Inserts an admin record.
    async fn insert_admin(&self, record: &AdminRecord) -> Result<AdminRecord, RepositoryError>;

    /// Inserts an admin record only if no admin record exists yet.
    ///
    /// Returns `None` without writing when the collection is non-empty. The
    /// emptiness check and the insert are atomic with respect to every other
    /// admin insert.
    async fn insert_first_admin(
        &self,
        record: &AdminRecord,
    ) -> Result<Option<AdminRecord>, RepositoryError>;

    /// Lists admin records newest first (ties by uid), skipping `offset`.
    async fn list_admins(
        &self,
        offset: u64,
        limit: u32,
    ) -> Result<Vec<AdminRecord>, RepositoryError>;

    /// Records a successful admin check.
    async fn touch_admin_login(
        &self,
        uid: &Uid,
        at: DateTime<Utc>,
    ) -> Result<(), RepositoryError>;

    /// Finds the account for a uid.
    async fn find_account(&self, uid: &Uid) -> Result<Option<Account>, RepositoryError>;

    /// Finds the account with an email.
    async fn find_account_by_email(
        &self,
        email: &Email,
    ) -> Result<Option<Account>, RepositoryError>;

    /// Inserts an account.
    async fn insert_account(&self, account: &Account) -> Result<Account, RepositoryError>;

    /// Sets the `is_admin` flag. Returns `false` if no account exists.
    async fn set_account_admin(
        &self,
        uid: &Uid,
        is_admin: bool,
        at: DateTime<Utc>,
    ) -> Result<bool, RepositoryError>;

    /// Applies a profile update. Returns `None` if no account exists.
    async fn update_account_profile(
        &self,
        uid: &Uid,
        update: &ProfileUpdate,
        at: DateTime<Utc>,
    ) -> Result<Option<Account>, RepositoryError>;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Maps a unique violation to [`RepositoryError::Conflict`], naming the
/// column when the constraint is known.
pub(crate) fn map_unique_violation(e: sqlx::Error, entity: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        let field = match db_err.constraint() {
            Some(c) if c.contains("email") => "email",
            _ => "uid",
        };
        return RepositoryError::Conflict(format!("{entity} with this {field} already exists"));
    }
    RepositoryError::Database(e)
}

/// Converts a `u64` count or offset into the `BIGINT` sqlx binds.
pub(crate) fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
