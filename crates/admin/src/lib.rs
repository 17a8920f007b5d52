//! Gadget Pulse admin library.
//!
//! This crate provides the admin API as a library, allowing it to be tested
//! and reused by the CLI.
//!
//! # Security
//!
//! This crate decides who is an admin:
//! - Bearer tokens are verified against the identity provider's signing keys
//! - Only the first admin may promote themselves; later admins are granted by
//!   an admin holding `manageAdmins`
//! - Operator promotion is only reachable through the CLI with database access

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod identity;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
