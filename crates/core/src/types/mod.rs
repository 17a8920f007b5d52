//! Core types for Gadget Pulse.
//!
//! This module provides type-safe wrappers for the admin directory's domain concepts.

pub mod email;
pub mod page;
pub mod permissions;
pub mod role;
pub mod uid;

pub use email::{Email, EmailError};
pub use page::{PageInfo, PageRequest};
pub use permissions::{Permission, PermissionOverrides, Permissions};
pub use role::{AdminRole, ParseAdminRoleError};
pub use uid::{Uid, UidError};
