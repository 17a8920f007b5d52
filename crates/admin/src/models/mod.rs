//! Domain models for the admin directory.
//!
//! - [`AdminRecord`] - A privileged account and its capability flags
//! - [`Account`] - A user profile keyed by identity-provider uid

pub mod account;
pub mod admin_record;

pub use account::{Account, AccountSeed, ProfileUpdate};
pub use admin_record::{AdminRecord, DEFAULT_ADMIN_DISPLAY_NAME};
