//! Redis list broker and result backend.

use redis::{AsyncCommands, aio::ConnectionManager};
use tracing::instrument;
use uuid::Uuid;

use super::{QUEUE_KEY, RESULT_TTL_SECS, Task, TaskError, TaskMessage, TaskResult, result_key};

/// Handle to the task broker and result backend.
#[derive(Clone)]
pub struct TaskQueue {
    broker: ConnectionManager,
    results: ConnectionManager,
}

impl TaskQueue {
    /// Create a queue over the broker and result backend connections.
    #[must_use]
    pub const fn new(broker: ConnectionManager, results: ConnectionManager) -> Self {
        Self { broker, results }
    }

    /// Queue a task and return its id.
    ///
    /// # Errors
    ///
    /// Returns `TaskError::Redis` if the broker is unavailable.
    #[instrument(skip(self, task), fields(task = task.name()))]
    pub async fn enqueue(&self, task: Task) -> Result<Uuid, TaskError> {
        let message = TaskMessage::new(task);
        self.push(&message).await?;
        tracing::info!(task_id = %message.id, "Task queued");
        Ok(message.id)
    }

    /// Put a message back on the queue, e.g. for a retry.
    ///
    /// # Errors
    ///
    /// Returns `TaskError::Redis` if the broker is unavailable.
    pub async fn push(&self, message: &TaskMessage) -> Result<(), TaskError> {
        let payload = serde_json::to_string(message)?;
        let mut conn = self.broker.clone();
        let _len: i64 = conn.lpush(QUEUE_KEY, payload).await?;
        Ok(())
    }

    /// Take the oldest message off the queue, if any.
    ///
    /// A message that cannot be decoded is removed from the queue and
    /// reported as `TaskError::Serialization`.
    ///
    /// # Errors
    ///
    /// Returns `TaskError::Redis` if the broker is unavailable.
    pub async fn pop(&self) -> Result<Option<TaskMessage>, TaskError> {
        let mut conn = self.broker.clone();
        let raw: Option<String> = redis::cmd("RPOP")
            .arg(QUEUE_KEY)
            .query_async(&mut conn)
            .await?;

        raw.map(|payload| serde_json::from_str(&payload))
            .transpose()
            .map_err(TaskError::from)
    }

    /// Number of messages waiting.
    ///
    /// # Errors
    ///
    /// Returns `TaskError::Redis` if the broker is unavailable.
    pub async fn pending_count(&self) -> Result<u64, TaskError> {
        let mut conn = self.broker.clone();
        let len: u64 = conn.llen(QUEUE_KEY).await?;
        Ok(len)
    }

    /// Store a task outcome in the result backend.
    ///
    /// # Errors
    ///
    /// Returns `TaskError::Redis` if the result backend is unavailable.
    pub async fn store_result(&self, result: &TaskResult) -> Result<(), TaskError> {
        let payload = serde_json::to_string(result)?;
        let mut conn = self.results.clone();
        let (): () = conn
            .set_ex(result_key(result.id), payload, RESULT_TTL_SECS)
            .await?;
        Ok(())
    }

    /// Look up a task outcome. `None` means the task is pending, unknown or
    /// its result has expired.
    ///
    /// # Errors
    ///
    /// Returns `TaskError::Redis` if the result backend is unavailable.
    pub async fn result(&self, id: Uuid) -> Result<Option<TaskResult>, TaskError> {
        let mut conn = self.results.clone();
        let raw: Option<String> = conn.get(result_key(id)).await?;

        Ok(raw.map(|payload| serde_json::from_str(&payload)).transpose()?)
    }

    /// Check both Redis connections respond.
    ///
    /// # Errors
    ///
    /// Returns `TaskError::Redis` if either database is unreachable.
    pub async fn ping(&self) -> Result<(), TaskError> {
        for conn in [&self.broker, &self.results] {
            let mut conn = conn.clone();
            let _pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        }
        Ok(())
    }
}
