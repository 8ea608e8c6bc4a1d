//! Clip entity — spec.md §3.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::item::CandidateStrategy;

/// Risk flags the LLM gateway may attach to a clip (spec.md §4.2, §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskFlag {
    NeedsContext,
    TooSlow,
    Sensitive,
    UnclearAudio,
    CopyrightMusic,
}

impl RiskFlag {
    /// Fixed penalty table from spec.md §4.2.
    pub fn penalty(self) -> f64 {
        match self {
            RiskFlag::NeedsContext => 10.0,
            RiskFlag::TooSlow => 10.0,
            RiskFlag::Sensitive => 15.0,
            RiskFlag::UnclearAudio => 10.0,
            RiskFlag::CopyrightMusic => 8.0,
        }
    }
}

/// A render-pipeline status for a Clip, distinct from the owning Item's phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RenderPhase {
    Candidate,
    Shortlisted,
    Ready,
    Error,
}

/// Deterministic heuristic feature vector (spec.md §4.2).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub hook_score: f64,
    pub finance_score: f64,
    pub action_score: f64,
    pub payoff_score: f64,
    pub clarity_score: f64,
    pub pacing_score: f64,
}

/// A recognized word and its timing, relative to the clip's *current*
/// start (spec.md §4.5, Glossary "Word timing").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WordTiming {
    pub word: String,
    pub start: f64,
    pub end: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Clip {
    pub id: Uuid,
    pub item_id: Uuid,

    pub start_sec: f64,
    pub end_sec: f64,
    pub source_strategy: CandidateStrategy,
    pub source_info: String,

    pub render_phase: RenderPhase,

    pub llm_viral_score: Option<f64>,
    pub features: FeatureVector,
    pub final_score: Option<f64>,
    pub risk_flags: Vec<RiskFlag>,

    pub pass1_text: Option<String>,
    pub pass2_text: Option<String>,
    pub word_timing: Vec<WordTiming>,

    pub hook_text: Option<String>,
    pub caption: Option<String>,
    pub keywords: Vec<String>,
    pub hashtags: Vec<String>,

    pub file_ref: Option<String>,
    pub thumb_ref: Option<String>,
    pub subtitle_ref: Option<String>,

    pub timing_offset: f64,
    pub was_recut: bool,
    pub approved: bool,

    pub created_at: DateTime<Utc>,
}

impl Clip {
    pub fn new_candidate(
        item_id: Uuid,
        start_sec: f64,
        end_sec: f64,
        source_strategy: CandidateStrategy,
        source_info: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            item_id,
            start_sec,
            end_sec,
            source_strategy,
            source_info: source_info.into(),
            render_phase: RenderPhase::Candidate,
            llm_viral_score: None,
            features: FeatureVector::default(),
            final_score: None,
            risk_flags: Vec::new(),
            pass1_text: None,
            pass2_text: None,
            word_timing: Vec::new(),
            hook_text: None,
            caption: None,
            keywords: Vec::new(),
            hashtags: Vec::new(),
            file_ref: None,
            thumb_ref: None,
            subtitle_ref: None,
            timing_offset: 0.0,
            was_recut: false,
            approved: false,
            created_at: Utc::now(),
        }
    }

    pub fn duration(&self) -> f64 {
        self.end_sec - self.start_sec
    }

    /// `start_sec < end_sec` and both within `[0, item_duration]` (spec.md §8).
    pub fn is_well_formed(&self, item_duration: f64) -> bool {
        self.start_sec < self.end_sec
            && self.start_sec >= 0.0
            && self.end_sec <= item_duration + f64::EPSILON
    }

    pub fn clamp_to_duration(&mut self, item_duration: f64) {
        self.start_sec = self.start_sec.clamp(0.0, item_duration);
        self.end_sec = self.end_sec.clamp(0.0, item_duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn risk_penalties_match_table() {
        assert_eq!(RiskFlag::NeedsContext.penalty(), 10.0);
        assert_eq!(RiskFlag::Sensitive.penalty(), 15.0);
        assert_eq!(RiskFlag::CopyrightMusic.penalty(), 8.0);
    }

    #[test]
    fn well_formed_checks_bounds() {
        let item_id = Uuid::new_v4();
        let clip = Clip::new_candidate(item_id, 10.0, 20.0, CandidateStrategy::FixedInterval, "");
        assert!(clip.is_well_formed(30.0));
        assert!(!clip.is_well_formed(15.0));
    }

    #[test]
    fn clamp_keeps_within_duration() {
        let item_id = Uuid::new_v4();
        let mut clip = Clip::new_candidate(item_id, -5.0, 40.0, CandidateStrategy::FixedInterval, "");
        clip.clamp_to_duration(30.0);
        assert_eq!(clip.start_sec, 0.0);
        assert_eq!(clip.end_sec, 30.0);
    }
}
