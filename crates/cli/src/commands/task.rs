//! Background task inspection.

use uuid::Uuid;

use freshmall_storefront::cache;
use freshmall_storefront::config;
use freshmall_storefront::tasks::TaskQueue;

/// Print the stored outcome of task `id`.
///
/// # Errors
///
/// Returns an error if Redis is unreachable or the stored result is invalid.
pub async fn status(id: Uuid) -> Result<(), Box<dyn std::error::Error>> {
    let (broker_url, result_url) = config::task_backend_urls();
    let queue = TaskQueue::new(
        cache::connect(&broker_url).await?,
        cache::connect(&result_url).await?,
    );

    let pending = queue.pending_count().await?;
    match queue.result(id).await? {
        Some(result) => {
            tracing::info!("Task {}", result.id);
            tracing::info!("  Name: {}", result.name);
            tracing::info!("  Status: {}", result.status);
            tracing::info!("  Retries: {}", result.retries);
            tracing::info!("  Done: {}", result.date_done);
            if let Some(error) = &result.error {
                tracing::info!("  Error: {error}");
            }
        }
        None => tracing::info!("No result for task {id} (pending or expired)"),
    }
    tracing::info!("Tasks waiting in queue: {pending}");

    Ok(())
}
