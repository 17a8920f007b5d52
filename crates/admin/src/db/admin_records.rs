//! Admin record repository for `PostgreSQL`.
//!
//! Queries are built at runtime with `sqlx::query_as` so the crate compiles
//! without a live database or an offline query cache.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use gadget_pulse_core::{AdminRole, Email, Permissions, Uid};

use super::{RepositoryError, map_unique_violation, to_i64};
use crate::models::AdminRecord;

/// Advisory lock key serializing every admin insert.
///
/// Held for the duration of the inserting transaction so "insert only if
/// empty" cannot interleave with another insert.
const ADMIN_INSERT_LOCK_KEY: i64 = 0x6770_5f61_646d_696e;

const ADMIN_COLUMNS: &str = "id, uid, email, display_name, role, added_by, \
     create_products, edit_products, delete_products, manage_admins, manage_users, \
     created_at, last_login";

// =============================================================================
// Internal Row Types
// =============================================================================

/// Internal row type for `PostgreSQL` admin record queries.
#[derive(Debug, sqlx::FromRow)]
#[allow(clippy::struct_excessive_bools)]
struct AdminRecordRow {
    id: Uuid,
    uid: String,
    email: String,
    display_name: String,
    role: AdminRole,
    added_by: String,
    create_products: bool,
    edit_products: bool,
    delete_products: bool,
    manage_admins: bool,
    manage_users: bool,
    created_at: DateTime<Utc>,
    last_login: Option<DateTime<Utc>>,
}

impl TryFrom<AdminRecordRow> for AdminRecord {
    type Error = RepositoryError;

    fn try_from(row: AdminRecordRow) -> Result<Self, Self::Error> {
        let uid = Uid::parse(&row.uid)
            .map_err(|e| RepositoryError::DataCorruption(format!("invalid uid in database: {e}")))?;
        let added_by = Uid::parse(&row.added_by).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid added_by in database: {e}"))
        })?;
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            id: row.id,
            uid,
            email,
            display_name: row.display_name,
            role: row.role,
            added_by,
            permissions: Permissions {
                create_products: row.create_products,
                edit_products: row.edit_products,
                delete_products: row.delete_products,
                manage_admins: row.manage_admins,
                manage_users: row.manage_users,
            },
            created_at: row.created_at,
            last_login: row.last_login,
        })
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for admin record database operations.
pub struct AdminRecordRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AdminRecordRepository<'a> {
    /// Create a new admin record repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Count admin records.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count(&self) -> Result<u64, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM admin_records")
            .fetch_one(self.pool)
            .await?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    /// Get the admin record for a uid.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the data is invalid.
    pub async fn get_by_uid(&self, uid: &Uid) -> Result<Option<AdminRecord>, RepositoryError> {
        let row = sqlx::query_as::<_, AdminRecordRow>(&format!(
            "SELECT {ADMIN_COLUMNS} FROM admin_records WHERE uid = $1"
        ))
        .bind(uid)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// List admin records, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the data is invalid.
    pub async fn list(&self, offset: u64, limit: u32) -> Result<Vec<AdminRecord>, RepositoryError> {
        let rows = sqlx::query_as::<_, AdminRecordRow>(&format!(
            "SELECT {ADMIN_COLUMNS} FROM admin_records \
             ORDER BY created_at DESC, uid ASC \
             LIMIT $1 OFFSET $2"
        ))
        .bind(i64::from(limit))
        .bind(to_i64(offset))
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Insert an admin record.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the uid or email already exists.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(&self, record: &AdminRecord) -> Result<AdminRecord, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        lock_admin_inserts(&mut tx).await?;
        let created = insert_row(&mut tx, record).await?;
        tx.commit().await?;
        Ok(created)
    }

    /// Insert an admin record only if the table is empty.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the uid or email already exists.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create_if_empty(
        &self,
        record: &AdminRecord,
    ) -> Result<Option<AdminRecord>, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        lock_admin_inserts(&mut tx).await?;

        let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM admin_records")
            .fetch_one(&mut *tx)
            .await?;
        if existing > 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        let created = insert_row(&mut tx, record).await?;
        tx.commit().await?;
        Ok(Some(created))
    }

    /// Set `last_login` for a uid.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn touch_last_login(
        &self,
        uid: &Uid,
        at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE admin_records SET last_login = $2 WHERE uid = $1")
            .bind(uid)
            .bind(at)
            .execute(self.pool)
            .await?;
        Ok(())
    }
}

async fn lock_admin_inserts(conn: &mut PgConnection) -> Result<(), RepositoryError> {
    sqlx::query("SELECT pg_advisory_xact_lock($1)")
        .bind(ADMIN_INSERT_LOCK_KEY)
        .execute(conn)
        .await?;
    Ok(())
}

async fn insert_row(
    conn: &mut PgConnection,
    record: &AdminRecord,
) -> Result<AdminRecord, RepositoryError> {
    let row = sqlx::query_as::<_, AdminRecordRow>(&format!(
        "INSERT INTO admin_records ({ADMIN_COLUMNS}) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13) \
         RETURNING {ADMIN_COLUMNS}"
    ))
    .bind(record.id)
    .bind(&record.uid)
    .bind(&record.email)
    .bind(&record.display_name)
    .bind(record.role)
    .bind(&record.added_by)
    .bind(record.permissions.create_products)
    .bind(record.permissions.edit_products)
    .bind(record.permissions.delete_products)
    .bind(record.permissions.manage_admins)
    .bind(record.permissions.manage_users)
    .bind(record.created_at)
    .bind(record.last_login)
    .fetch_one(conn)
    .await
    .map_err(|e| map_unique_violation(e, "admin"))?;

    row.try_into()
}
