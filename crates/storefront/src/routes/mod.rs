//! HTTP route handlers for the shop.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                         - Index page (latest SKUs)
//! GET  /goods/{sku_id}           - SKU detail (records browsing history)
//!
//! # User
//! GET  /user/register            - Register page
//! POST /user/register            - Register action (queues activation email)
//! GET  /user/active/{token}      - Activate account from emailed link
//! GET  /user/login               - Login page
//! POST /user/login               - Login action
//! GET  /user/logout              - Logout
//!
//! # User centre (requires login)
//! GET  /user                     - Profile and recently viewed
//! GET  /user/address             - Default address
//! POST /user/address             - Add address
//! GET  /user/order               - Order list, first page
//! GET  /user/order/{page}        - Order list, given page
//! ```
//!
//! `/health` and `/health/ready` are mounted in `main.rs`.

pub mod goods;
pub mod user;

use axum::{
    Router,
    routing::{get, post},
};

use crate::middleware::form_rate_limiter;
use crate::state::AppState;

/// Create the user routes router.
pub fn user_routes() -> Router<AppState> {
    // Credential-handling POSTs get a per-IP rate limit
    let forms = Router::new()
        .route("/register", post(user::register))
        .route("/login", post(user::login))
        .route_layer(form_rate_limiter());

    Router::new()
        .route("/", get(user::info))
        .route("/register", get(user::register_page))
        .route("/active/{token}", get(user::activate))
        .route("/login", get(user::login_page))
        .route("/logout", get(user::logout))
        .route("/address", get(user::address_page).post(user::add_address))
        .route("/order", get(user::orders))
        .route("/order/{page}", get(user::orders_page))
        .merge(forms)
}

/// Create all routes for the shop.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(goods::index))
        .route("/goods/{sku_id}", get(goods::detail))
        .nest("/user", user_routes())
}
