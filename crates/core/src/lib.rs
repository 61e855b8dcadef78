//! FreshMall Core - Shared types library.
//!
//! This crate provides common types used across all FreshMall components:
//! - `storefront` - The customer-facing shop (web server)
//! - `worker` - Background task consumer (activation e-mail)
//! - `cli` - Command-line tools for migrations and catalogue management
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no I/O, no database access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, prices, emails, phones,
//!   statuses and pagination

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
