//! PostJob entity — spec.md §3.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PostJobMode {
    Draft,
    Direct,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PostJobStatus {
    Queued,
    Uploading,
    Processing,
    Posted,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostJob {
    pub id: Uuid,
    pub clip_id: Uuid,
    pub mode: PostJobMode,
    pub status: PostJobStatus,
    pub external_publish_id: Option<String>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl PostJob {
    pub fn new(clip_id: Uuid, mode: PostJobMode) -> Self {
        Self {
            id: Uuid::new_v4(),
            clip_id,
            mode,
            status: PostJobStatus::Queued,
            external_publish_id: None,
            error_message: None,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_post_job_is_queued() {
        let job = PostJob::new(Uuid::new_v4(), PostJobMode::Draft);
        assert_eq!(job.status, PostJobStatus::Queued);
        assert!(job.external_publish_id.is_none());
    }
}
