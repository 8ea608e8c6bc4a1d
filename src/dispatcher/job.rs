//! Job representation and the three named queues (spec.md §4.7).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// The three named queues, each with its own timeout and backoff policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueName {
    Io,
    Ai,
    Render,
}

impl QueueName {
    pub fn as_str(self) -> &'static str {
        match self {
            QueueName::Io => "io",
            QueueName::Ai => "ai",
            QueueName::Render => "render",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
    DeadLettered,
}

/// A durable unit of work: `(queue, handler_name, args)` dereferenced by
/// name at execution time rather than by callable identity (spec.md §9
/// "Handler registration by callable identity").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub queue: QueueName,
    pub handler_name: String,
    pub args: Value,
    pub status: JobStatus,
    pub attempt: u32,
    pub max_attempts: usize,
    pub next_attempt_at: DateTime<Utc>,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Job {
    pub fn new(queue: QueueName, handler_name: impl Into<String>, args: Value, max_attempts: usize) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            queue,
            handler_name: handler_name.into(),
            args,
            status: JobStatus::Pending,
            attempt: 0,
            max_attempts,
            next_attempt_at: now,
            last_error: None,
            created_at: now,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.attempt >= self.max_attempts as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_names_are_stable_strings() {
        assert_eq!(QueueName::Io.as_str(), "io");
        assert_eq!(QueueName::Ai.as_str(), "ai");
        assert_eq!(QueueName::Render.as_str(), "render");
    }

    #[test]
    fn exhaustion_respects_max_attempts() {
        let mut job = Job::new(QueueName::Io, "probe_item", Value::Null, 4);
        assert!(!job.is_exhausted());
        job.attempt = 4;
        assert!(job.is_exhausted());
    }
}
