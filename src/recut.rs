//! Quality-Control Re-cutter and Snap & Clean (C9).
//!
//! Two bounded time-shift adjustments over a clip's window: a deterministic
//! word-timing snap run before rendering, and an LLM-judged recut run
//! against `final_qc`. Both bookkeep `timing_offset` for the render planner.

use crate::llm::{FinalQc, RecutAction};
use crate::model::{Clip, WordTiming};

/// Filler tokens skipped when hunting for the first substantive word,
/// across both languages the scorer's marker sets target.
const FILLER_TOKENS: &[&str] = &[
    "um", "uh", "eh", "ah", "like", "so", "well", "anyway",
    "eee", "anu", "jadi", "gitu", "nah", "oke", "gini",
];

fn is_filler(word: &str) -> bool {
    let normalized = word.trim().trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase();
    FILLER_TOKENS.contains(&normalized.as_str())
}

/// Outcome of applying Snap & Clean.
#[derive(Debug, Clone, PartialEq)]
pub enum SnapResult {
    Applied { new_start: f64, new_end: f64, start_shift: f64 },
    Unchanged,
}

/// Deterministically skip leading filler tokens to find the first
/// substantive word, snap the end to the last word's end, and accept only
/// if the resulting length is `>= 5.0` seconds (spec.md §4.9).
pub fn snap_and_clean(word_timing: &[WordTiming], clip_len: f64) -> SnapResult {
    if word_timing.is_empty() {
        return SnapResult::Unchanged;
    }

    let first_substantive = word_timing.iter().find(|w| !is_filler(&w.word));
    let first = match first_substantive {
        Some(w) => w,
        None => return SnapResult::Unchanged,
    };
    let last = word_timing.last().expect("non-empty checked above");

    let new_start_shift = first.start;
    let new_end = last.end;
    let new_length = new_end - new_start_shift;

    if new_length < 5.0 || new_start_shift >= clip_len {
        return SnapResult::Unchanged;
    }

    SnapResult::Applied {
        new_start: new_start_shift,
        new_end,
        start_shift: new_start_shift,
    }
}

/// Apply Snap & Clean to a clip in place, accumulating any start shift into
/// `timing_offset`.
pub fn apply_snap_and_clean(clip: &mut Clip) {
    let clip_len = clip.duration();
    match snap_and_clean(&clip.word_timing, clip_len) {
        SnapResult::Applied { start_shift, .. } => {
            clip.start_sec += start_shift;
            clip.timing_offset += start_shift;
        }
        SnapResult::Unchanged => {}
    }
}

/// Outcome of applying a `final_qc` recut plan.
#[derive(Debug, Clone, PartialEq)]
pub enum RecutOutcome {
    Dropped,
    Unchanged,
    Recut { start_sec: f64, end_sec: f64, timing_offset_delta: f64 },
}

/// Interpret a `final_qc` recut plan against a clip's current window
/// (spec.md §4.9):
/// - `drop` removes the clip.
/// - `none` keeps it unchanged.
/// - `shift_*` actions add clamped `[-3, +3]` deltas to start/end, accepted
///   only if the resulting window is `>= 30.0s` long and `start_sec >= 0`.
pub fn apply_recut_plan(start_sec: f64, end_sec: f64, qc: &FinalQc) -> RecutOutcome {
    let plan = &qc.recut_plan;
    match plan.action {
        RecutAction::Drop => RecutOutcome::Dropped,
        RecutAction::None => RecutOutcome::Unchanged,
        RecutAction::ShiftStart | RecutAction::ShiftEnd | RecutAction::ShiftBoth => {
            let shift_start = plan.shift_start_by_sec.clamp(-3.0, 3.0);
            let shift_end = plan.shift_end_by_sec.clamp(-3.0, 3.0);

            let (delta_start, delta_end) = match plan.action {
                RecutAction::ShiftStart => (shift_start, 0.0),
                RecutAction::ShiftEnd => (0.0, shift_end),
                RecutAction::ShiftBoth => (shift_start, shift_end),
                _ => unreachable!(),
            };

            let new_start = start_sec + delta_start;
            let new_end = end_sec + delta_end;

            if new_end - new_start >= 30.0 && new_start >= 0.0 {
                RecutOutcome::Recut {
                    start_sec: new_start,
                    end_sec: new_end,
                    timing_offset_delta: delta_start,
                }
            } else {
                RecutOutcome::Unchanged
            }
        }
    }
}

/// Apply a recut outcome to a clip in place, setting `was_recut` when the
/// window actually moved.
pub fn apply_recut_to_clip(clip: &mut Clip, outcome: &RecutOutcome) {
    if let RecutOutcome::Recut { start_sec, end_sec, timing_offset_delta } = outcome {
        clip.start_sec = *start_sec;
        clip.end_sec = *end_sec;
        clip.timing_offset += timing_offset_delta;
        clip.was_recut = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::RecutPlan;

    fn word(w: &str, start: f64, end: f64) -> WordTiming {
        WordTiming { word: w.to_string(), start, end }
    }

    #[test]
    fn recut_scenario_from_spec() {
        let qc = FinalQc {
            pass: true,
            issues: vec![],
            recut_plan: RecutPlan {
                action: RecutAction::ShiftBoth,
                shift_start_by_sec: 2.0,
                shift_end_by_sec: -1.0,
                notes: String::new(),
            },
            confidence: 90.0,
        };
        let outcome = apply_recut_plan(100.0, 175.0, &qc);
        match outcome {
            RecutOutcome::Recut { start_sec, end_sec, timing_offset_delta } => {
                assert_eq!(start_sec, 102.0);
                assert_eq!(end_sec, 174.0);
                assert_eq!(timing_offset_delta, 2.0);
                assert_eq!(end_sec - start_sec, 72.0);
            }
            other => panic!("expected Recut, got {:?}", other),
        }
    }

    #[test]
    fn recut_rejected_when_too_short() {
        let qc = FinalQc {
            pass: true,
            issues: vec![],
            recut_plan: RecutPlan {
                action: RecutAction::ShiftBoth,
                shift_start_by_sec: 3.0,
                shift_end_by_sec: -3.0,
                notes: String::new(),
            },
            confidence: 50.0,
        };
        // window length 32 - 6 = 26, below 30s floor
        let outcome = apply_recut_plan(100.0, 132.0, &qc);
        assert_eq!(outcome, RecutOutcome::Unchanged);
    }

    #[test]
    fn drop_action_drops() {
        let qc = FinalQc { pass: false, issues: vec![], recut_plan: RecutPlan { action: RecutAction::Drop, shift_start_by_sec: 0.0, shift_end_by_sec: 0.0, notes: String::new() }, confidence: 10.0 };
        assert_eq!(apply_recut_plan(0.0, 100.0, &qc), RecutOutcome::Dropped);
    }

    #[test]
    fn snap_and_clean_skips_filler_and_snaps_end() {
        let timing = vec![
            word("um", 0.0, 0.4),
            word("so", 0.4, 0.6),
            word("Rahasia", 0.6, 1.2),
            word("sukses", 1.2, 1.8),
            word("finansial", 1.8, 8.0),
        ];
        let result = snap_and_clean(&timing, 10.0);
        assert_eq!(
            result,
            SnapResult::Applied { new_start: 0.6, new_end: 8.0, start_shift: 0.6 }
        );
    }

    #[test]
    fn snap_and_clean_rejects_too_short_result() {
        let timing = vec![word("um", 0.0, 0.1), word("hi", 0.1, 0.3)];
        assert_eq!(snap_and_clean(&timing, 10.0), SnapResult::Unchanged);
    }

    #[test]
    fn snap_and_clean_noop_on_empty_timing() {
        assert_eq!(snap_and_clean(&[], 10.0), SnapResult::Unchanged);
    }
}
