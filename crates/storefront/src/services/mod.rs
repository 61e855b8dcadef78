//! Business logic services for the shop.
//!
//! # Services
//!
//! - `auth` - Registration, login and activation
//! - `token` - Signed activation tokens
//! - `history` - Recently viewed SKUs (Redis)
//! - `email` - Activation email delivery (SMTP)

pub mod auth;
pub mod email;
pub mod history;
pub mod token;
