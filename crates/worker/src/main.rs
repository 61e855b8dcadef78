//! FreshMall background worker.
//!
//! Pops tasks from the Redis broker, runs them and records the outcome in
//! the result backend. Failed tasks are retried a bounded number of times.
//!
//! Configuration comes from the same environment as the shop plus the
//! `SMTP_*` and `EMAIL_FROM` variables.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;

use tokio::sync::watch;

use freshmall_storefront::config::WorkerConfig;
use freshmall_storefront::services::email::EmailService;
use freshmall_storefront::tasks::{EmailTaskHandler, TaskQueue, Worker};
use freshmall_storefront::{cache, telemetry};

#[tokio::main]
async fn main() {
    let config = WorkerConfig::from_env().expect("Failed to load configuration");

    let _sentry_guard = telemetry::init_sentry(&config.sentry);
    telemetry::init_tracing("freshmall_worker=info,freshmall_storefront=info");

    let broker = cache::connect(&config.broker_url)
        .await
        .expect("Failed to connect to task broker");
    let results = cache::connect(&config.result_backend_url)
        .await
        .expect("Failed to connect to result backend");
    let queue = TaskQueue::new(broker, results);

    let email = EmailService::new(&config.email, &config.base_url)
        .expect("Failed to configure SMTP transport");
    let worker = Worker::new(
        queue,
        Arc::new(EmailTaskHandler::new(email)),
        config.concurrency,
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        telemetry::shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });

    worker.run(shutdown_rx).await;
}
