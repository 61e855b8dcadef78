//! FreshMall shop library.
//!
//! The web server (`main.rs`), the background worker and the CLI all build
//! on this crate: configuration, repositories, services, the Redis task
//! queue and the media store live here.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod filters;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod storage;
pub mod tasks;
pub mod telemetry;
