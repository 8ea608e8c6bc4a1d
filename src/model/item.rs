//! Item (Video) entity — spec.md §3, §4.8.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::subscription::ClipPolicy;

/// Source of ingestion for an Item (spec.md §9 "Duplicate Subscription
/// synthetic Manual collection" — resolved by making `subscription_id`
/// nullable instead of inventing a sentinel row).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemSource {
    Feed,
    Manual,
}

/// Candidate-generation strategy actually used for an Item (spec.md §4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CandidateStrategy {
    Chapter,
    Silence,
    FixedInterval,
}

/// A chapter marker as reported by `MediaProbe` (spec.md §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chapter {
    pub title: String,
    pub start: f64,
    pub end: f64,
}

/// Ordered pipeline phases (spec.md §4.8). Transitions are realized by
/// exactly one orchestrated handler each; `ERROR` is reachable from any
/// phase on stage fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    New,
    Probing,
    GeneratingCandidates,
    TranscribingPass1,
    LlmShortlisting,
    TranscribingPass2,
    LlmRefining,
    RenderingPreview,
    Ready,
    Error,
}

impl Phase {
    /// The phase enqueued after this one completes successfully, or `None`
    /// if this phase is terminal (`Ready`/`Error`).
    pub fn next(self) -> Option<Phase> {
        use Phase::*;
        match self {
            New => Some(Probing),
            Probing => Some(GeneratingCandidates),
            GeneratingCandidates => Some(TranscribingPass1),
            TranscribingPass1 => Some(LlmShortlisting),
            LlmShortlisting => Some(TranscribingPass2),
            TranscribingPass2 => Some(LlmRefining),
            LlmRefining => Some(RenderingPreview),
            RenderingPreview => Some(Ready),
            Ready | Error => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Ready | Phase::Error)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub id: Uuid,
    pub subscription_id: Option<Uuid>,
    pub external_item_id: String,
    pub title: String,
    pub published_at: DateTime<Utc>,
    pub phase: Phase,
    pub progress: u8,
    pub error_message: Option<String>,
    pub source: ItemSource,
    pub duration_sec: Option<f64>,
    pub chapters: Vec<Chapter>,
    pub strategy: Option<CandidateStrategy>,
    pub policy_override: Option<ClipPolicy>,
    pub created_at: DateTime<Utc>,
}

impl Item {
    pub fn new(
        subscription_id: Option<Uuid>,
        external_item_id: impl Into<String>,
        title: impl Into<String>,
        published_at: DateTime<Utc>,
        source: ItemSource,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            subscription_id,
            external_item_id: external_item_id.into(),
            title: title.into(),
            published_at,
            phase: Phase::New,
            progress: 0,
            error_message: None,
            source,
            duration_sec: None,
            chapters: Vec::new(),
            strategy: None,
            policy_override: None,
            created_at: Utc::now(),
        }
    }

    /// Resolve the effective clip policy: this Item's override, or the
    /// owning Subscription's policy if none.
    pub fn effective_policy(&self, subscription_policy: ClipPolicy) -> ClipPolicy {
        self.policy_override.unwrap_or(subscription_policy)
    }

    pub fn mark_error(&mut self, message: impl Into<String>) {
        self.phase = Phase::Error;
        self.error_message = Some(message.into());
    }

    pub fn advance_to(&mut self, phase: Phase, progress: u8) {
        self.phase = phase;
        self.progress = progress;
        self.error_message = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_chain_reaches_ready() {
        let mut phase = Phase::New;
        let mut steps = 0;
        while let Some(next) = phase.next() {
            phase = next;
            steps += 1;
            assert!(steps < 20, "phase chain should terminate");
        }
        assert_eq!(phase, Phase::Ready);
    }

    #[test]
    fn error_and_ready_are_terminal() {
        assert!(Phase::Ready.is_terminal());
        assert!(Phase::Error.is_terminal());
        assert!(!Phase::New.is_terminal());
    }

    #[test]
    fn effective_policy_falls_back_to_subscription() {
        let item = Item::new(None, "yt1", "t", Utc::now(), ItemSource::Manual);
        let sub_policy = ClipPolicy::default();
        assert_eq!(item.effective_policy(sub_policy).min_clip_sec, sub_policy.min_clip_sec);
    }

    #[test]
    fn mark_error_sets_phase_and_message() {
        let mut item = Item::new(None, "yt1", "t", Utc::now(), ItemSource::Manual);
        item.mark_error("boom");
        assert_eq!(item.phase, Phase::Error);
        assert_eq!(item.error_message.as_deref(), Some("boom"));
    }
}
