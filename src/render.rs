//! Render Planner (C10) — word-snap trimming is handled by `recut`; this
//! module synthesizes the karaoke-style SRT and drives the Media Gateway's
//! cut/thumbnail calls (spec.md §4.10). A planner contract, not a codec
//! implementation.

use crate::media::{MediaGateway, EDITOR_PAD_SEC};
use crate::model::{Clip, WordTiming};

/// The cutter's fixed lead-in pad, as consumed by the offset formula
/// (spec.md §4.10: `editor_pad = -1.5`).
const EDITOR_PAD: f64 = -EDITOR_PAD_SEC;

fn srt_timestamp(seconds: f64) -> String {
    let total_ms = (seconds.max(0.0) * 1000.0).round() as i64;
    let ms = total_ms % 1000;
    let total_secs = total_ms / 1000;
    let s = total_secs % 60;
    let total_mins = total_secs / 60;
    let m = total_mins % 60;
    let h = total_mins / 60;
    format!("{:02}:{:02}:{:02},{:03}", h, m, s, ms)
}

/// `total_start_shift = timing_offset + editor_pad` (spec.md §4.10 step 1).
pub fn total_start_shift(timing_offset: f64) -> f64 {
    timing_offset + EDITOR_PAD
}

/// Synthesize one-word-per-cue SRT text. Cue times are
/// `word.start/end - total_start_shift`, clamped to `>= 0`, text
/// upper-cased verbatim (spec.md §4.10 step 2).
pub fn synthesize_srt(word_timing: &[WordTiming], timing_offset: f64) -> String {
    let shift = total_start_shift(timing_offset);
    let mut out = String::new();
    for (i, word) in word_timing.iter().enumerate() {
        let start = (word.start - shift).max(0.0);
        let end = (word.end - shift).max(0.0);
        out.push_str(&format!(
            "{}\n{} --> {}\n{}\n\n",
            i + 1,
            srt_timestamp(start),
            srt_timestamp(end),
            word.word.to_uppercase(),
        ));
    }
    out
}

/// Drive `Media.cut` then `Media.thumbnail`, storing the resulting
/// references on the clip (spec.md §4.10 steps 3-4).
pub async fn render_clip(
    clip: &mut Clip,
    source: &str,
    media: &dyn MediaGateway,
    srt_path: Option<&str>,
) -> crate::error::Result<()> {
    let output = media.cut(source, clip.start_sec, clip.end_sec, srt_path).await?;
    let thumb = media.thumbnail(&output).await?;
    clip.file_ref = Some(output);
    clip.thumb_ref = Some(thumb);
    clip.subtitle_ref = srt_path.map(|s| s.to_string());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(w: &str, start: f64, end: f64) -> WordTiming {
        WordTiming { word: w.to_string(), start, end }
    }

    #[test]
    fn total_start_shift_applies_fixed_editor_pad() {
        assert_eq!(total_start_shift(2.0), 0.5);
        assert_eq!(total_start_shift(0.0), -1.5);
    }

    #[test]
    fn srt_cues_are_shifted_and_clamped() {
        let timing = vec![word("hello", 0.0, 0.5), word("world", 0.5, 1.2)];
        let srt = synthesize_srt(&timing, 2.0);
        assert!(srt.contains("HELLO"));
        assert!(srt.contains("WORLD"));
        assert!(srt.starts_with("1\n00:00:00,000"));
    }

    #[test]
    fn cue_times_never_go_negative() {
        let timing = vec![word("early", 0.0, 0.2)];
        let srt = synthesize_srt(&timing, 5.0);
        assert!(srt.contains("00:00:00,000"));
    }

    #[test]
    fn srt_timestamp_formats_hours_minutes() {
        assert_eq!(srt_timestamp(3661.234), "01:01:01,234");
    }

    struct StubMedia;

    #[async_trait::async_trait]
    impl MediaGateway for StubMedia {
        async fn probe(&self, _url: &str) -> crate::error::Result<crate::media::ProbeResult> {
            unimplemented!()
        }
        async fn download_audio(&self, _url: &str) -> crate::error::Result<String> {
            unimplemented!()
        }
        async fn download_full(&self, _url: &str) -> crate::error::Result<String> {
            unimplemented!()
        }
        async fn detect_silence(&self, _audio_path: &str, _db: f64, _min_silence_sec: f64) -> crate::error::Result<Vec<crate::media::SilenceInterval>> {
            unimplemented!()
        }
        async fn cut(&self, _source: &str, _start: f64, _end: f64, _subtitle_path: Option<&str>) -> crate::error::Result<String> {
            Ok("/tmp/out.mp4".to_string())
        }
        async fn thumbnail(&self, _clip_path: &str) -> crate::error::Result<String> {
            Ok("/tmp/out.jpg".to_string())
        }
    }

    #[tokio::test]
    async fn render_clip_stores_all_three_references() {
        let mut clip = crate::model::Clip::new_candidate(
            uuid::Uuid::new_v4(),
            10.0,
            80.0,
            crate::model::CandidateStrategy::FixedInterval,
            "",
        );
        render_clip(&mut clip, "/tmp/source.mp4", &StubMedia, Some("/tmp/out.srt")).await.unwrap();
        assert_eq!(clip.file_ref.as_deref(), Some("/tmp/out.mp4"));
        assert_eq!(clip.thumb_ref.as_deref(), Some("/tmp/out.jpg"));
        assert_eq!(clip.subtitle_ref.as_deref(), Some("/tmp/out.srt"));
    }
}
