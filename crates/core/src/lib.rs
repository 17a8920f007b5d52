//! Gadget Pulse Core - Shared domain types.
//!
//! This crate provides the types shared by every Gadget Pulse component:
//! - `admin` - Admin directory, account profiles and the HTTP API
//! - `cli` - Command-line tools for migrations and operator promotions
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP clients. Authorization decisions that only depend on data
//! (permission merging, capability lookup, pagination math) live here so they
//! can be tested without a runtime.
//!
//! # Modules
//!
//! - [`types`] - Identifiers, emails, admin roles, permissions and paging

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
