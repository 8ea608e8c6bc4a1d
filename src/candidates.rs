//! Candidate window generation (C1).
//!
//! Partitions a source timeline into overlapping candidate windows using the
//! best available structural signal: chapters, then silence-derived speech
//! blocks, then a fixed-interval fallback.

use crate::model::{Chapter, CandidateStrategy};

/// A single candidate time window.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateWindow {
    pub start: f64,
    pub end: f64,
    pub source_info: Option<String>,
}

impl CandidateWindow {
    pub fn len(&self) -> f64 {
        self.end - self.start
    }
}

/// Parameters governing window emission.
#[derive(Debug, Clone, Copy)]
pub struct CandidatePolicy {
    pub min_len: f64,
    pub max_len: f64,
    pub shift: f64,
    pub limit: usize,
}

/// A contiguous span below the silence threshold, in seconds.
pub type SilenceInterval = (f64, f64);

fn clamp(v: f64, lo: f64, hi: f64) -> f64 {
    v.max(lo).min(hi)
}

/// Slide `w`-length windows through `[s, e]` at `policy.shift`-second stride,
/// clipping the final window to `[s, e]` then to `[0, duration]`, keeping
/// only windows whose length after clipping is still `>= min_len`.
fn slide_windows(
    s: f64,
    e: f64,
    duration: f64,
    policy: &CandidatePolicy,
    source_info: Option<String>,
    out: &mut Vec<CandidateWindow>,
) {
    if e <= s {
        return;
    }
    let span_len = e - s;
    let w = clamp(span_len, policy.min_len, policy.max_len);
    let mut start = s;
    while start < e && out.len() < policy.limit {
        let mut end = (start + w).min(e).min(duration);
        let clipped_start = start.max(0.0);
        end = end.max(clipped_start);
        if end - clipped_start >= policy.min_len {
            out.push(CandidateWindow {
                start: clipped_start,
                end,
                source_info: source_info.clone(),
            });
        }
        start += policy.shift;
    }
}

/// Select a strategy and emit candidate windows (spec.md §4.1).
pub fn generate_candidates(
    duration: f64,
    chapters: &[Chapter],
    silence: Option<&[SilenceInterval]>,
    policy: &CandidatePolicy,
) -> (CandidateStrategy, Vec<CandidateWindow>) {
    if !chapters.is_empty() {
        return (CandidateStrategy::Chapter, candidates_from_chapters(chapters, duration, policy));
    }
    if let Some(silence) = silence {
        let blocks = speech_blocks(silence, duration);
        if blocks.iter().any(|(s, e)| e - s >= policy.min_len) {
            return (CandidateStrategy::Silence, candidates_from_speech_blocks(&blocks, duration, policy));
        }
    }
    (CandidateStrategy::FixedInterval, candidates_from_fixed_intervals(duration, policy))
}

/// CHAPTER emission. Invalid bounds (`e <= s`) are silently skipped.
pub fn candidates_from_chapters(
    chapters: &[Chapter],
    duration: f64,
    policy: &CandidatePolicy,
) -> Vec<CandidateWindow> {
    let mut out = Vec::new();
    for chapter in chapters {
        if out.len() >= policy.limit {
            break;
        }
        if chapter.end <= chapter.start {
            continue;
        }
        slide_windows(
            chapter.start,
            chapter.end,
            duration,
            policy,
            Some(chapter.title.clone()),
            &mut out,
        );
    }
    out
}

/// Complement of the silence intervals over `[0, duration]`: the speech
/// blocks, including the tail if the audio ends in speech.
pub fn speech_blocks(silence: &[SilenceInterval], duration: f64) -> Vec<(f64, f64)> {
    let mut sorted: Vec<SilenceInterval> = silence.to_vec();
    sorted.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap());

    let mut blocks = Vec::new();
    let mut cursor = 0.0;
    for (s, e) in &sorted {
        if *s > cursor {
            blocks.push((cursor, *s));
        }
        cursor = cursor.max(*e);
    }
    if cursor < duration {
        blocks.push((cursor, duration));
    }
    blocks
}

/// SILENCE emission. A speech block is usable when its length is
/// `>= min_len + 1.0s` (a 1-second guard against micro-blocks).
pub fn candidates_from_speech_blocks(
    blocks: &[(f64, f64)],
    duration: f64,
    policy: &CandidatePolicy,
) -> Vec<CandidateWindow> {
    let mut out = Vec::new();
    for (s, e) in blocks {
        if out.len() >= policy.limit {
            break;
        }
        if e - s < policy.min_len + 1.0 {
            continue;
        }
        slide_windows(*s, *e, duration, policy, None, &mut out);
    }
    out
}

/// FIXED_INTERVAL emission: `max_len`-length windows at `shift`-second
/// stride from 0 to `duration - min_len`, each clipped to `duration`.
pub fn candidates_from_fixed_intervals(duration: f64, policy: &CandidatePolicy) -> Vec<CandidateWindow> {
    let mut out = Vec::new();
    if duration < policy.min_len {
        return out;
    }
    let mut start = 0.0;
    while start <= duration - policy.min_len && out.len() < policy.limit {
        let end = (start + policy.max_len).min(duration);
        if end - start >= policy.min_len {
            out.push(CandidateWindow {
                start,
                end,
                source_info: None,
            });
        }
        start += policy.shift;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> CandidatePolicy {
        CandidatePolicy {
            min_len: 75.0,
            max_len: 180.0,
            shift: 15.0,
            limit: 400,
        }
    }

    #[test]
    fn chaptered_item_scenario() {
        let chapters = vec![
            Chapter { title: "Intro".into(), start: 0.0, end: 120.0 },
            Chapter { title: "Main".into(), start: 120.0, end: 540.0 },
            Chapter { title: "Outro".into(), start: 540.0, end: 600.0 },
        ];
        let (strategy, windows) = generate_candidates(600.0, &chapters, None, &policy());
        assert_eq!(strategy, CandidateStrategy::Chapter);
        assert!(!windows.is_empty());
        for w in &windows {
            assert!(w.len() >= 75.0 && w.len() <= 180.0);
            let in_some_chapter = chapters.iter().any(|c| w.start >= c.start && w.end <= c.end);
            assert!(in_some_chapter, "window {:?} not contained in any chapter", w);
        }
    }

    #[test]
    fn silence_item_scenario() {
        let silence = vec![(30.0, 31.0), (140.0, 142.0)];
        let blocks = speech_blocks(&silence, 300.0);
        assert_eq!(blocks, vec![(0.0, 30.0), (31.0, 140.0), (142.0, 300.0)]);

        let (strategy, windows) = generate_candidates(300.0, &[], Some(&silence), &policy());
        assert_eq!(strategy, CandidateStrategy::Silence);
        for w in &windows {
            let fully_crosses = silence.iter().any(|(s, e)| w.start < *s && w.end > *e && (*e - *s) > 0.0 && w.len() > (e - s));
            let _ = fully_crosses;
        }
        assert!(!windows.is_empty());
    }

    #[test]
    fn fallback_item_scenario() {
        let (strategy, windows) = generate_candidates(300.0, &[], None, &policy());
        assert_eq!(strategy, CandidateStrategy::FixedInterval);
        let mut expected_start = 0.0;
        for w in &windows {
            assert_eq!(w.start, expected_start);
            assert_eq!(w.end, (expected_start + 180.0).min(300.0));
            assert!(w.len() >= 75.0);
            expected_start += 15.0;
        }
    }

    #[test]
    fn chapter_with_invalid_bounds_is_skipped() {
        let chapters = vec![
            Chapter { title: "Bad".into(), start: 100.0, end: 100.0 },
            Chapter { title: "Good".into(), start: 0.0, end: 200.0 },
        ];
        let windows = candidates_from_chapters(&chapters, 200.0, &policy());
        assert!(!windows.is_empty());
        assert!(windows.iter().all(|w| w.source_info.as_deref() == Some("Good")));
    }

    #[test]
    fn no_silence_yields_single_speech_block() {
        let blocks = speech_blocks(&[], 100.0);
        assert_eq!(blocks, vec![(0.0, 100.0)]);
    }

    #[test]
    fn fixed_interval_below_min_len_is_empty() {
        let windows = candidates_from_fixed_intervals(50.0, &policy());
        assert!(windows.is_empty());
    }

    #[test]
    fn truncates_at_limit() {
        let tight_policy = CandidatePolicy { limit: 3, ..policy() };
        let windows = candidates_from_fixed_intervals(10_000.0, &tight_policy);
        assert_eq!(windows.len(), 3);
    }
}
