//! BookBazaar Core - Shared types library.
//!
//! This crate provides common types used across all BookBazaar components:
//! - `server` - The bookstore HTTP application
//! - `cli` - Command-line tools for migrations, mirror management, and seeding
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP clients. This keeps it lightweight and allows it to be used
//! anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, emails, roles, and order
//!   statuses, plus the role/action permission table

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
