//! Background tasks handed off to the worker process through Redis.
//!
//! The web tier pushes JSON [`TaskMessage`]s onto a Redis list in the broker
//! database; `freshmall-worker` pops and executes them and writes a
//! [`TaskResult`] to the result backend database.
//!
//! ```text
//! LPUSH freshmall:tasks <message>   (web)
//! RPOP  freshmall:tasks             (worker)
//! SET   freshmall:task-meta:<id> <result> EX 86400
//! ```

mod queue;
mod worker;

pub use queue::TaskQueue;
pub use worker::{EmailTaskHandler, Settlement, TaskHandler, Worker, settle};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::services::email::EmailError;

/// Redis list holding pending task messages.
pub const QUEUE_KEY: &str = "freshmall:tasks";

/// Seconds a task result is kept.
pub const RESULT_TTL_SECS: u64 = 24 * 60 * 60;

/// Times a failing task is re-queued before it is recorded as failed.
pub const MAX_RETRIES: u32 = 3;

/// Redis key of a task's result.
#[must_use]
pub fn result_key(id: Uuid) -> String {
    format!("freshmall:task-meta:{id}")
}

/// A unit of background work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum Task {
    /// Send the account activation email.
    SendRegisterActiveEmail {
        email: String,
        username: String,
        token: String,
    },
}

impl Task {
    /// Task name as it appears in messages and logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::SendRegisterActiveEmail { .. } => "send_register_active_email",
        }
    }
}

/// Envelope pushed onto the queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskMessage {
    pub id: Uuid,
    pub task: Task,
    /// How many times the task has already been re-queued after failing.
    pub retries: u32,
    pub enqueued_at: DateTime<Utc>,
}

impl TaskMessage {
    /// Wrap a task in a fresh envelope.
    #[must_use]
    pub fn new(task: Task) -> Self {
        Self {
            id: Uuid::new_v4(),
            task,
            retries: 0,
            enqueued_at: Utc::now(),
        }
    }
}

/// Final state of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Success,
    Failure,
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Success => "SUCCESS",
            Self::Failure => "FAILURE",
        })
    }
}

/// Outcome stored in the result backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskResult {
    pub id: Uuid,
    pub name: String,
    pub status: TaskStatus,
    /// Error of the last attempt, for failed tasks.
    pub error: Option<String>,
    pub retries: u32,
    pub date_done: DateTime<Utc>,
}

/// Errors raised while queueing or executing tasks.
#[derive(Debug, Error)]
pub enum TaskError {
    /// Broker or result backend unavailable.
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Message could not be encoded or decoded.
    #[error("invalid task message: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Sending the email failed.
    #[error("email error: {0}")]
    Email(#[from] EmailError),
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn activation_task() -> Task {
        Task::SendRegisterActiveEmail {
            email: "alice@example.com".to_string(),
            username: "alice01".to_string(),
            token: "abc.def".to_string(),
        }
    }

    #[test]
    fn test_task_wire_format() {
        let json = serde_json::to_value(activation_task()).unwrap();
        assert_eq!(json["name"], "send_register_active_email");
        assert_eq!(json["email"], "alice@example.com");
        assert_eq!(json["token"], "abc.def");
    }

    #[test]
    fn test_message_json_roundtrip() {
        let message = TaskMessage::new(activation_task());
        let json = serde_json::to_string(&message).unwrap();
        let parsed: TaskMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, message);
        assert_eq!(parsed.retries, 0);
    }

    #[test]
    fn test_result_status_serialization() {
        let result = TaskResult {
            id: Uuid::nil(),
            name: "send_register_active_email".to_string(),
            status: TaskStatus::Failure,
            error: Some("SMTP error".to_string()),
            retries: 3,
            date_done: Utc::now(),
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["status"], "FAILURE");
    }

    #[test]
    fn test_result_key() {
        assert_eq!(
            result_key(Uuid::nil()),
            "freshmall:task-meta:00000000-0000-0000-0000-000000000000"
        );
    }
}
