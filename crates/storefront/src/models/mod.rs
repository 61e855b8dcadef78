//! Domain models for the shop.
//!
//! These types represent validated domain objects separate from database
//! row types (see `crate::db`).

pub mod address;
pub mod goods;
pub mod order;
pub mod session;
pub mod user;

pub use address::Address;
pub use goods::GoodsSku;
pub use order::{Order, OrderLine};
pub use session::{CurrentUser, keys as session_keys};
pub use user::User;
