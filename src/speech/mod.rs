//! Speech Gateway (C5) — two-pass transcription: a fast pass returning text
//! only, and an accurate pass returning text plus per-word timing.

pub mod whisper;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::model::WordTiming;

/// A pass-1 transcription request window.
#[derive(Debug, Clone, Copy)]
pub struct Pass1Window {
    pub id: Uuid,
    pub start: f64,
    pub end: f64,
}

#[derive(Debug, Clone)]
pub struct Pass1Result {
    pub id: Uuid,
    pub text: String,
}

/// A pass-2 transcription request for an already-shortlisted clip.
#[derive(Debug, Clone, Copy)]
pub struct Pass2Clip {
    pub id: Uuid,
    pub start: f64,
    pub end: f64,
}

#[derive(Debug, Clone)]
pub struct Pass2Result {
    pub id: Uuid,
    pub text: String,
    pub word_timing: Vec<WordTiming>,
}

/// Two-pass transcription interface (spec.md §4.5). Both operations are
/// idempotent given the same source media and windows.
#[async_trait]
pub trait SpeechGateway: Send + Sync {
    async fn pass1(&self, source_media: &str, windows: &[Pass1Window]) -> Result<Vec<Pass1Result>>;

    async fn pass2(&self, source_media: &str, clips: &[Pass2Clip]) -> Result<Vec<Pass2Result>>;
}

/// Clamp a word's relative timing into `[0, ∞)`, keeping it only when its
/// span overlaps `[0, window_len]` at all (spec.md §4.5: "any overlap, not
/// strict inclusion").
pub fn clamp_word_timing(word: WordTiming, clip_start: f64, window_len: f64) -> Option<WordTiming> {
    let rel_start = word.start - clip_start;
    let rel_end = word.end - clip_start;
    if rel_end < 0.0 || rel_start > window_len {
        return None;
    }
    Some(WordTiming {
        word: word.word,
        start: rel_start.max(0.0),
        end: rel_end.max(0.0),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_fully_inside_window_is_kept_relative() {
        let w = WordTiming { word: "hi".into(), start: 105.0, end: 105.5 };
        let clamped = clamp_word_timing(w, 100.0, 50.0).unwrap();
        assert_eq!(clamped.start, 5.0);
        assert_eq!(clamped.end, 5.5);
    }

    #[test]
    fn word_straddling_window_start_is_clamped_not_dropped() {
        let w = WordTiming { word: "hi".into(), start: 98.0, end: 101.0 };
        let clamped = clamp_word_timing(w, 100.0, 50.0).unwrap();
        assert_eq!(clamped.start, 0.0);
        assert_eq!(clamped.end, 1.0);
    }

    #[test]
    fn word_entirely_outside_window_is_dropped() {
        let w = WordTiming { word: "hi".into(), start: 10.0, end: 20.0 };
        assert!(clamp_word_timing(w, 100.0, 50.0).is_none());
    }
}
