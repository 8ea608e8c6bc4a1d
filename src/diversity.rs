//! Diversity Filter (C3).
//!
//! Greedy Jaccard-similarity deduplication over scored candidates.

use std::collections::HashSet;
use uuid::Uuid;

/// A scored candidate with a normalized keyword set, as consumed by the
/// diversity filter.
#[derive(Debug, Clone)]
pub struct ScoredCandidate {
    pub id: Uuid,
    pub score: f64,
    pub keywords: HashSet<String>,
}

fn normalize_keywords(raw: &[String]) -> HashSet<String> {
    raw.iter()
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect()
}

impl ScoredCandidate {
    pub fn new(id: Uuid, score: f64, keywords: &[String]) -> Self {
        Self {
            id,
            score,
            keywords: normalize_keywords(keywords),
        }
    }
}

fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count() as f64;
    let union = a.union(b).count() as f64;
    if union == 0.0 {
        0.0
    } else {
        intersection / union
    }
}

/// Sort by score descending, greedily keep, dropping any candidate whose
/// keyword set has Jaccard similarity `>= threshold` with an already-kept
/// candidate's keyword set (spec.md §4.3).
pub fn filter_diverse(candidates: &[ScoredCandidate], threshold: f64) -> Vec<Uuid> {
    let mut sorted: Vec<&ScoredCandidate> = candidates.iter().collect();
    sorted.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap());

    let mut kept: Vec<&ScoredCandidate> = Vec::new();
    for candidate in sorted {
        let too_similar = kept
            .iter()
            .any(|k| jaccard(&k.keywords, &candidate.keywords) >= threshold);
        if !too_similar {
            kept.push(candidate);
        }
    }
    kept.into_iter().map(|c| c.id).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kw(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn diversity_scenario() {
        let a_id = Uuid::new_v4();
        let b_id = Uuid::new_v4();
        let c_id = Uuid::new_v4();

        let a = ScoredCandidate::new(a_id, 80.0, &kw(&["finance", "interest"]));
        let b = ScoredCandidate::new(b_id, 70.0, &kw(&["finance", "interest", "stock"]));
        let c = ScoredCandidate::new(c_id, 60.0, &kw(&["motivation", "grit"]));

        assert!((jaccard(&a.keywords, &b.keywords) - (2.0 / 3.0)).abs() < 1e-9);

        let kept = filter_diverse(&[a, b, c], 0.7);
        assert_eq!(kept, vec![a_id, b_id, c_id]);
    }

    #[test]
    fn near_duplicate_above_threshold_is_dropped() {
        let a_id = Uuid::new_v4();
        let b_id = Uuid::new_v4();
        let a = ScoredCandidate::new(a_id, 90.0, &kw(&["x", "y"]));
        let b = ScoredCandidate::new(b_id, 50.0, &kw(&["x", "y"]));
        let kept = filter_diverse(&[a, b], 0.7);
        assert_eq!(kept, vec![a_id]);
    }

    #[test]
    fn keywords_are_normalized() {
        let c = ScoredCandidate::new(Uuid::new_v4(), 10.0, &kw(&[" Finance ", "", "FINANCE"]));
        assert_eq!(c.keywords.len(), 1);
        assert!(c.keywords.contains("finance"));
    }
}
