//! Task consumers.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{Instrument, error, info, info_span, warn};

use super::{MAX_RETRIES, Task, TaskError, TaskMessage, TaskQueue, TaskResult, TaskStatus};
use crate::services::email::EmailService;

/// How long an idle consumer waits before polling the queue again.
pub const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Executes tasks.
#[async_trait]
pub trait TaskHandler: Send + Sync {
    /// Run one task to completion.
    async fn handle(&self, task: &Task) -> Result<(), TaskError>;
}

/// Handles tasks by sending email.
pub struct EmailTaskHandler {
    email: EmailService,
}

impl EmailTaskHandler {
    #[must_use]
    pub const fn new(email: EmailService) -> Self {
        Self { email }
    }
}

#[async_trait]
impl TaskHandler for EmailTaskHandler {
    async fn handle(&self, task: &Task) -> Result<(), TaskError> {
        match task {
            Task::SendRegisterActiveEmail {
                email,
                username,
                token,
            } => {
                self.email
                    .send_register_active(email, username, token)
                    .await?;
            }
        }
        Ok(())
    }
}

/// What to do with a message after an attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settlement {
    /// Put the message back on the queue with its retry count bumped.
    Retry(TaskMessage),
    /// Record the final outcome.
    Done(TaskResult),
}

/// Decide the fate of a message given the outcome of an attempt.
#[must_use]
pub fn settle(mut message: TaskMessage, outcome: Result<(), String>, now: DateTime<Utc>) -> Settlement {
    let (status, error) = match outcome {
        Ok(()) => (TaskStatus::Success, None),
        Err(_) if message.retries < MAX_RETRIES => {
            message.retries += 1;
            return Settlement::Retry(message);
        }
        Err(e) => (TaskStatus::Failure, Some(e)),
    };

    Settlement::Done(TaskResult {
        id: message.id,
        name: message.task.name().to_string(),
        status,
        error,
        retries: message.retries,
        date_done: now,
    })
}

/// Pool of queue consumers.
#[derive(Clone)]
pub struct Worker {
    queue: TaskQueue,
    handler: Arc<dyn TaskHandler>,
    concurrency: usize,
}

impl Worker {
    #[must_use]
    pub fn new(queue: TaskQueue, handler: Arc<dyn TaskHandler>, concurrency: usize) -> Self {
        Self {
            queue,
            handler,
            concurrency: concurrency.max(1),
        }
    }

    /// Run the consumers until `shutdown` flips to `true`.
    ///
    /// Each consumer finishes its in-flight task before exiting.
    pub async fn run(self, shutdown: watch::Receiver<bool>) {
        let mut consumers = JoinSet::new();
        for consumer in 0..self.concurrency {
            let worker = self.clone();
            let shutdown = shutdown.clone();
            consumers.spawn(
                async move { worker.consume(shutdown).await }
                    .instrument(info_span!("consumer", consumer)),
            );
        }
        info!(concurrency = self.concurrency, "Worker started");

        while let Some(joined) = consumers.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "Consumer task panicked");
            }
        }
        info!("Worker stopped");
    }

    async fn consume(&self, mut shutdown: watch::Receiver<bool>) {
        loop {
            if *shutdown.borrow() {
                break;
            }

            match self.queue.pop().await {
                Ok(Some(message)) => self.process(message).await,
                Ok(None) => idle(&mut shutdown).await,
                Err(TaskError::Serialization(e)) => {
                    warn!(error = %e, "Dropping undecodable task message");
                }
                Err(e) => {
                    error!(error = %e, "Failed to poll task queue");
                    idle(&mut shutdown).await;
                }
            }
        }
    }

    async fn process(&self, message: TaskMessage) {
        let span = info_span!(
            "task",
            task_id = %message.id,
            task = message.task.name(),
            retries = message.retries
        );

        async {
            let outcome = self.handler.handle(&message.task).await.map_err(|e| {
                warn!(error = %e, "Task attempt failed");
                e.to_string()
            });

            let stored = match settle(message, outcome, Utc::now()) {
                Settlement::Retry(message) => {
                    info!(retries = message.retries, "Re-queueing task");
                    self.queue.push(&message).await
                }
                Settlement::Done(result) => {
                    if result.status == TaskStatus::Failure {
                        error!(
                            error = result.error.as_deref().unwrap_or_default(),
                            "Task failed permanently"
                        );
                    } else {
                        info!("Task succeeded");
                    }
                    self.queue.store_result(&result).await
                }
            };

            if let Err(e) = stored {
                error!(error = %e, "Failed to record task outcome");
            }
        }
        .instrument(span)
        .await;
    }
}

/// Sleep for one poll interval, waking early on shutdown.
async fn idle(shutdown: &mut watch::Receiver<bool>) {
    tokio::select! {
        () = tokio::time::sleep(POLL_INTERVAL) => {}
        _ = shutdown.changed() => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(retries: u32) -> TaskMessage {
        let mut message = TaskMessage::new(Task::SendRegisterActiveEmail {
            email: "alice@example.com".to_string(),
            username: "alice01".to_string(),
            token: "abc.def".to_string(),
        });
        message.retries = retries;
        message
    }

    #[test]
    fn test_success_is_recorded() {
        let msg = message(0);
        let id = msg.id;
        match settle(msg, Ok(()), Utc::now()) {
            Settlement::Done(result) => {
                assert_eq!(result.id, id);
                assert_eq!(result.status, TaskStatus::Success);
                assert_eq!(result.error, None);
                assert_eq!(result.name, "send_register_active_email");
            }
            Settlement::Retry(_) => panic!("successful task must not be retried"),
        }
    }

    #[test]
    fn test_failure_is_retried_until_limit() {
        for retries in 0..MAX_RETRIES {
            match settle(message(retries), Err("smtp down".to_string()), Utc::now()) {
                Settlement::Retry(msg) => assert_eq!(msg.retries, retries + 1),
                Settlement::Done(_) => panic!("attempt {retries} should be retried"),
            }
        }
    }

    #[test]
    fn test_failure_after_last_retry_is_recorded() {
        match settle(message(MAX_RETRIES), Err("smtp down".to_string()), Utc::now()) {
            Settlement::Done(result) => {
                assert_eq!(result.status, TaskStatus::Failure);
                assert_eq!(result.error.as_deref(), Some("smtp down"));
                assert_eq!(result.retries, MAX_RETRIES);
            }
            Settlement::Retry(_) => panic!("retry budget exhausted"),
        }
    }
}
