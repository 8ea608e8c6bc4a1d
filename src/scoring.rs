//! Heuristic Scorer (C2).
//!
//! A pure function over a transcript and duration: same input always
//! produces the same `FeatureVector` and `final_score`. No side effects,
//! no I/O — grounded in the bilingual (ID/EN) marker sets implied by the
//! original scorer's "podcast/education/finance/motivation" content focus.

use std::sync::OnceLock;

use regex::RegexSet;

use crate::model::{FeatureVector, RiskFlag};

const HOOK_MARKERS: &[&str] = &[
    "rahasia", "ternyata", "jangan", "bayangkan", "kamu tahu", "pernahkah",
    "secret", "imagine", "did you know", "nobody tells you", "what if", "stop",
];

const FINANCE_MARKERS: &[&str] = &[
    "uang", "investasi", "saham", "untung", "modal", "cuan", "bunga",
    "money", "invest", "stock", "profit", "interest", "return", "dividend",
];

/// Enumerated count/how-to/imperative patterns (spec.md §4.2 "action_score").
fn action_patterns() -> &'static RegexSet {
    static SET: OnceLock<RegexSet> = OnceLock::new();
    SET.get_or_init(|| {
        RegexSet::new([
            r"\bcara\s+\w+",
            r"\blangkah\s+(ke)?\w+",
            r"\bberikut(nya)?\b",
            r"\bbegini\b",
            r"\b(pertama|kedua|ketiga)\b",
            r"\bhow to\b",
            r"\bstep\s+\d+\b",
            r"\bhere'?s (how|why|what)\b",
            r"\b(first|second|third),",
            r"\bfollow these\b",
        ])
        .expect("action pattern set is a fixed, valid regex set")
    })
}

const PAYOFF_MARKERS: &[&str] = &[
    "kesimpulan", "intinya", "jadi", "pada akhirnya", "itulah",
    "so in the end", "the takeaway", "that's why", "in summary", "bottom line",
];

const VAGUE_WORDS: &[&str] = &[
    "itu", "ini", "sesuatu", "hal", "thing", "stuff", "something", "it",
];

fn count_matches(haystack: &str, markers: &[&str]) -> usize {
    markers.iter().filter(|m| haystack.contains(*m)).count()
}

fn clamp100(v: f64) -> f64 {
    v.max(0.0).min(100.0)
}

fn words(text: &str) -> Vec<&str> {
    text.split_whitespace().collect()
}

/// First ~25 words.
fn hook_score(text: &str) -> f64 {
    let lower = text.to_lowercase();
    let head: String = words(&lower).into_iter().take(25).collect::<Vec<_>>().join(" ");
    let markers = count_matches(&head, HOOK_MARKERS) as f64;
    let bangs = lower.matches('!').count() as f64;
    let questions = lower.matches('?').count() as f64;
    clamp100(12.0 * markers + (2.0 * bangs).min(10.0) + (1.5 * questions).min(8.0))
}

fn finance_score(text: &str) -> f64 {
    let lower = text.to_lowercase();
    let numeric_tokens = words(&lower)
        .into_iter()
        .filter(|w| w.contains('%') || w.chars().any(|c| c.is_ascii_digit()))
        .count() as f64;
    let markers = count_matches(&lower, FINANCE_MARKERS) as f64;
    clamp100((5.0 * numeric_tokens).min(20.0) + 8.0 * markers)
}

fn action_score(text: &str) -> f64 {
    let lower = text.to_lowercase();
    let markers = action_patterns().matches(&lower).into_iter().count() as f64;
    clamp100(20.0 * markers)
}

/// Last ~35 words.
fn payoff_score(text: &str) -> f64 {
    let lower = text.to_lowercase();
    let all = words(&lower);
    let tail_start = all.len().saturating_sub(35);
    let tail: String = all[tail_start..].join(" ");
    let markers = count_matches(&tail, PAYOFF_MARKERS) as f64;
    clamp100(25.0 * markers)
}

fn clarity_score(text: &str) -> f64 {
    let lower = text.to_lowercase();
    let long_words = words(&lower).iter().filter(|w| w.len() >= 7).count() as f64;
    let vague = count_matches(&lower, VAGUE_WORDS) as f64;
    clamp100(60.0 + 2.0 * long_words - 6.0 * vague)
}

fn pacing_score(text: &str, duration_sec: f64) -> f64 {
    if duration_sec <= 0.0 {
        return 20.0;
    }
    let word_count = words(text).len() as f64;
    let wpm = 60.0 * word_count / duration_sec;
    let score = if !(80.0..=240.0).contains(&wpm) {
        10.0
    } else {
        (100.0 - (wpm - 160.0).abs() / 80.0 * 80.0).max(20.0)
    };
    clamp100(score)
}

/// Compute the full feature vector for a transcript/duration pair (spec.md §4.2).
pub fn score_features(text: &str, duration_sec: f64) -> FeatureVector {
    FeatureVector {
        hook_score: hook_score(text),
        finance_score: finance_score(text),
        action_score: action_score(text),
        payoff_score: payoff_score(text),
        clarity_score: clarity_score(text),
        pacing_score: pacing_score(text, duration_sec),
    }
}

/// Sum of the fixed penalty table over the risk-flag set.
pub fn risk_penalty(flags: &[RiskFlag]) -> f64 {
    flags.iter().map(|f| f.penalty()).sum()
}

/// Weighted fusion of LLM viral score and heuristic features, minus risk
/// penalty, clamped to `[0, 100]` (spec.md §4.2).
pub fn fuse_final_score(llm_viral_score: f64, features: &FeatureVector, flags: &[RiskFlag]) -> f64 {
    let penalty = risk_penalty(flags);
    let raw = 0.50 * llm_viral_score
        + 0.18 * features.hook_score
        + 0.10 * features.finance_score
        + 0.08 * features.action_score
        + 0.08 * features.payoff_score
        + 0.04 * features.clarity_score
        + 0.02 * features.pacing_score
        - penalty;
    clamp100(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scorer_is_pure() {
        let text = "Rahasia cara investasi saham untuk pemula, berikut langkah pertama.";
        let a = score_features(text, 90.0);
        let b = score_features(text, 90.0);
        assert_eq!(a, FeatureVector { ..b });
    }

    #[test]
    fn pacing_score_extremes() {
        assert_eq!(pacing_score("one two three", 0.0), 20.0);
        let too_fast = "word ".repeat(1000);
        assert_eq!(pacing_score(&too_fast, 10.0), 10.0);
    }

    #[test]
    fn risk_penalty_matches_table() {
        let flags = vec![RiskFlag::Sensitive, RiskFlag::CopyrightMusic];
        assert_eq!(risk_penalty(&flags), 15.0 + 8.0);
    }

    #[test]
    fn fusion_clamped_to_range() {
        let features = FeatureVector {
            hook_score: 100.0,
            finance_score: 100.0,
            action_score: 100.0,
            payoff_score: 100.0,
            clarity_score: 100.0,
            pacing_score: 100.0,
        };
        let score = fuse_final_score(100.0, &features, &[]);
        assert!((0.0..=100.0).contains(&score));
        assert_eq!(score, 100.0);
    }

    #[test]
    fn hook_score_rewards_markers_and_punctuation() {
        let text = "Rahasia!! kenapa kamu tahu ini??";
        let score = hook_score(text);
        assert!(score > 0.0);
    }
}
