//! Subscription (Channel) entity — spec.md §3.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Clip policy shared by a Subscription and overridable per-Item.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ClipPolicy {
    pub target_count: usize,
    pub min_clip_sec: f64,
    pub max_clip_sec: f64,
}

impl ClipPolicy {
    /// `min_clip_sec < max_clip_sec` is an invariant (spec.md §3, §8).
    pub fn is_valid(&self) -> bool {
        self.min_clip_sec < self.max_clip_sec
    }
}

impl Default for ClipPolicy {
    fn default() -> Self {
        Self {
            target_count: 5,
            min_clip_sec: 75.0,
            max_clip_sec: 180.0,
        }
    }
}

/// Forward-only baseline bookkeeping for a Subscription's feed (spec.md §4.11).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Baseline {
    pub baseline_set: bool,
    pub last_seen_item_id: Option<String>,
    pub last_seen_published_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub id: Uuid,
    pub external_feed_id: String,
    pub name: String,
    pub feed_url: String,
    pub active: bool,
    pub policy: ClipPolicy,
    pub baseline: Baseline,
    pub created_at: DateTime<Utc>,
}

impl Subscription {
    pub fn new(external_feed_id: impl Into<String>, name: impl Into<String>, feed_url: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            external_feed_id: external_feed_id.into(),
            name: name.into(),
            feed_url: feed_url.into(),
            active: true,
            policy: ClipPolicy::default(),
            baseline: Baseline::default(),
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_is_valid() {
        assert!(ClipPolicy::default().is_valid());
    }

    #[test]
    fn inverted_policy_is_invalid() {
        let p = ClipPolicy {
            target_count: 1,
            min_clip_sec: 120.0,
            max_clip_sec: 60.0,
        };
        assert!(!p.is_valid());
    }

    #[test]
    fn new_subscription_has_unset_baseline() {
        let sub = Subscription::new("UCabc", "Some Channel", "https://example.com/feed");
        assert!(!sub.baseline.baseline_set);
        assert!(sub.active);
    }
}
