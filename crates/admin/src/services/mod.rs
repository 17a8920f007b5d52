//! Business logic services for admin.
//!
//! # Services
//!
//! - `directory` - Admin bootstrap, promotion, authorization and listing
//! - `accounts` - Account registration and profile management

pub mod accounts;
pub mod directory;
mod error;

pub use accounts::{AccountService, RegisterOutcome, Registration};
pub use directory::{AdminDirectory, AdminPage, Authorization, BootstrapOutcome, NewAdmin};
pub use error::DirectoryError;
