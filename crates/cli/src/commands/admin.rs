//! Admin management commands.
//!
//! # Usage
//!
//! ```bash
//! # Promote an existing account to superadmin
//! gp-cli admin promote -e admin@example.com
//!
//! # List admins
//! gp-cli admin list --page 1 --limit 20
//! ```
//!
//! # Environment Variables
//!
//! - `ADMIN_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)

use std::sync::Arc;

use gadget_pulse_admin::db::{self, PgDirectoryStore};
use gadget_pulse_admin::identity::StaticIdentityProvider;
use gadget_pulse_admin::services::{AdminDirectory, BootstrapOutcome, DirectoryError};
use gadget_pulse_core::{Email, PageRequest, Permission};
use thiserror::Error;

use super::database_url;

/// Errors that can occur during admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    /// Invalid email.
    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    /// Directory operation failed.
    #[error("{0}")]
    Directory(#[from] DirectoryError),
}

/// Connects to the admin database.
///
/// Operator commands never verify tokens or look up emails with the
/// identity provider, so an empty static provider stands in for it.
async fn connect() -> Result<AdminDirectory, AdminError> {
    let database_url = database_url().ok_or(AdminError::MissingEnvVar("ADMIN_DATABASE_URL"))?;

    tracing::info!("Connecting to admin database...");
    let pool = db::create_pool(&database_url).await?;

    Ok(AdminDirectory::new(
        Arc::new(PgDirectoryStore::new(pool)),
        Arc::new(StaticIdentityProvider::new()),
    ))
}

/// Promote the account with `email` to superadmin.
///
/// The account must already exist (the user has registered). Running the
/// command again for the same account changes nothing.
///
/// # Errors
///
/// Returns an error if the email is invalid, no account has it, or the
/// database fails.
pub async fn promote(email: &str) -> Result<(), AdminError> {
    let email = Email::parse(email).map_err(|e| AdminError::InvalidEmail(format!("{email}: {e}")))?;
    let directory = connect().await?;

    match directory.promote_account(&email).await? {
        BootstrapOutcome::Created(record) => tracing::info!(
            "Admin created! UID: {}, Email: {}, Role: {}",
            record.uid,
            record.email,
            record.role
        ),
        BootstrapOutcome::Existing(record) => tracing::info!(
            "{} is already an admin (role: {})",
            record.email,
            record.role
        ),
    }
    Ok(())
}

/// Print one page of admins, newest first.
///
/// # Errors
///
/// Returns an error if the database fails.
pub async fn list(page: u32, limit: u32) -> Result<(), AdminError> {
    let directory = connect().await?;
    let result = directory.list_all(PageRequest::new(page, limit)).await?;

    #[allow(clippy::print_stdout)]
    {
        println!(
            "Page {} of {} ({} admins)",
            result.page.current_page, result.page.total_pages, result.page.total
        );
        for admin in &result.admins {
            let permissions: Vec<&str> = admin
                .permissions
                .granted()
                .into_iter()
                .map(Permission::as_str)
                .collect();
            println!(
                "{:<30} {:<28} {:<10} added by {:<28} [{}]",
                admin.email.as_str(),
                admin.uid.as_str(),
                admin.role.as_str(),
                admin.added_by.as_str(),
                permissions.join(", ")
            );
        }
    }
    Ok(())
}
