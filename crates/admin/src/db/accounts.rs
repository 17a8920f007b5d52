//! Account repository for `PostgreSQL`.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use gadget_pulse_core::{Email, Uid};

use super::{RepositoryError, map_unique_violation};
use crate::models::{Account, ProfileUpdate};

const ACCOUNT_COLUMNS: &str = "uid, email, display_name, photo_url, bio, phone_number, \
     is_admin, created_at, updated_at";

/// Internal row type for `PostgreSQL` account queries.
#[derive(Debug, sqlx::FromRow)]
struct AccountRow {
    uid: String,
    email: String,
    display_name: String,
    photo_url: String,
    bio: String,
    phone_number: String,
    is_admin: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<AccountRow> for Account {
    type Error = RepositoryError;

    fn try_from(row: AccountRow) -> Result<Self, Self::Error> {
        let uid = Uid::parse(&row.uid)
            .map_err(|e| RepositoryError::DataCorruption(format!("invalid uid in database: {e}")))?;
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            uid,
            email,
            display_name: row.display_name,
            photo_url: row.photo_url,
            bio: row.bio,
            phone_number: row.phone_number,
            is_admin: row.is_admin,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Repository for account database operations.
pub struct AccountRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AccountRepository<'a> {
    /// Create a new account repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get an account by uid.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the data is invalid.
    pub async fn get_by_uid(&self, uid: &Uid) -> Result<Option<Account>, RepositoryError> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE uid = $1"
        ))
        .bind(uid)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Get an account by email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the data is invalid.
    pub async fn get_by_email(&self, email: &Email) -> Result<Option<Account>, RepositoryError> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Insert an account.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the uid or email already exists.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(&self, account: &Account) -> Result<Account, RepositoryError> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            "INSERT INTO accounts ({ACCOUNT_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING {ACCOUNT_COLUMNS}"
        ))
        .bind(&account.uid)
        .bind(&account.email)
        .bind(&account.display_name)
        .bind(&account.photo_url)
        .bind(&account.bio)
        .bind(&account.phone_number)
        .bind(account.is_admin)
        .bind(account.created_at)
        .bind(account.updated_at)
        .fetch_one(self.pool)
        .await
        .map_err(|e| map_unique_violation(e, "account"))?;

        row.try_into()
    }

    /// Set the admin flag. Returns `false` if no row matched.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn set_admin_flag(
        &self,
        uid: &Uid,
        is_admin: bool,
        at: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query("UPDATE accounts SET is_admin = $2, updated_at = $3 WHERE uid = $1")
            .bind(uid)
            .bind(is_admin)
            .bind(at)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Apply the set fields of a profile update.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the data is invalid.
    pub async fn update_profile(
        &self,
        uid: &Uid,
        update: &ProfileUpdate,
        at: DateTime<Utc>,
    ) -> Result<Option<Account>, RepositoryError> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            "UPDATE accounts SET \
                 display_name = COALESCE($2, display_name), \
                 bio = COALESCE($3, bio), \
                 phone_number = COALESCE($4, phone_number), \
                 photo_url = COALESCE($5, photo_url), \
                 updated_at = $6 \
             WHERE uid = $1 \
             RETURNING {ACCOUNT_COLUMNS}"
        ))
        .bind(uid)
        .bind(update.display_name.as_deref())
        .bind(update.bio.as_deref())
        .bind(update.phone_number.as_deref())
        .bind(update.photo_url.as_deref())
        .bind(at)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }
}
