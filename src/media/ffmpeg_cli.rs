//! `ffmpeg` subprocess backing for cut/thumbnail/silence-detect, grounded in
//! the original cutter's padding, crop, and subtitle-burn arguments.

use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use uuid::Uuid;

use super::{crop_filter_9x16, SilenceInterval, EDITOR_PAD_SEC};
use crate::error::{GatewayError, Result};

/// ASS subtitle burn style: middle-center, small font, yellow primary
/// colour, thin black outline — the original cutter's "Requested style".
const SUBTITLE_STYLE: &str =
    "Alignment=2,Fontname=Arial,FontSize=16,PrimaryColour=&H00FFFF00,OutlineColour=&H00000000,BorderStyle=1,Outline=1,Shadow=1,MarginV=20";

pub struct FfmpegCli {
    binary: String,
    output_dir: String,
    cut_timeout: Duration,
}

impl FfmpegCli {
    pub fn new(output_dir: impl Into<String>) -> Self {
        Self {
            binary: "ffmpeg".to_string(),
            output_dir: output_dir.into(),
            cut_timeout: Duration::from_secs(1800),
        }
    }

    async fn run(&self, args: &[String], timeout_dur: Duration) -> Result<(Vec<u8>, Vec<u8>)> {
        let output = timeout(
            timeout_dur,
            Command::new(&self.binary)
                .args(args)
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .output(),
        )
        .await
        .map_err(|_| GatewayError::Timeout(timeout_dur))?
        .map_err(|e| GatewayError::Transport(e.to_string()))?;

        if !output.status.success() {
            return Err(GatewayError::ProcessFailed(output.status.code().unwrap_or(-1)).into());
        }
        Ok((output.stdout, output.stderr))
    }

    /// Extract `[start - EDITOR_PAD_SEC, end + EDITOR_PAD_SEC]`, center-crop
    /// to 9:16, optionally burn a subtitle, re-encode `ultrafast`/AAC
    /// (spec.md §4.6).
    pub async fn cut(&self, source: &str, start: f64, end: f64, subtitle_path: Option<&str>) -> Result<String> {
        let padded_start = (start - EDITOR_PAD_SEC).max(0.0);
        let padded_end = end + EDITOR_PAD_SEC;
        let duration = padded_end - padded_start;

        let output_path = format!("{}/{}.mp4", self.output_dir, Uuid::new_v4());

        let mut filter = crop_filter_9x16().to_string();
        if let Some(srt) = subtitle_path {
            filter = format!("{},subtitles={}:force_style='{}'", filter, srt, SUBTITLE_STYLE);
        }

        let args = vec![
            "-y".to_string(),
            "-ss".to_string(),
            padded_start.to_string(),
            "-t".to_string(),
            duration.to_string(),
            "-i".to_string(),
            source.to_string(),
            "-vf".to_string(),
            filter,
            "-vcodec".to_string(),
            "libx264".to_string(),
            "-acodec".to_string(),
            "aac".to_string(),
            "-preset".to_string(),
            "ultrafast".to_string(),
            output_path.clone(),
        ];
        self.run(&args, self.cut_timeout).await?;
        Ok(output_path)
    }

    /// Single frame at +1s (spec.md §4.6).
    pub async fn thumbnail(&self, clip_path: &str) -> Result<String> {
        let output_path = clip_path.replace(".mp4", ".jpg");
        let args = vec![
            "-y".to_string(),
            "-ss".to_string(),
            "1".to_string(),
            "-i".to_string(),
            clip_path.to_string(),
            "-vframes".to_string(),
            "1".to_string(),
            output_path.clone(),
        ];
        self.run(&args, Duration::from_secs(60)).await?;
        Ok(output_path)
    }

    /// Parse `ffmpeg -af silencedetect` stderr lines
    /// `silence_start: X` / `silence_end: Y` into paired intervals
    /// (spec.md §6 "Transport is stderr lines").
    pub async fn detect_silence(&self, audio_path: &str, db: f64, min_silence_sec: f64) -> Result<Vec<SilenceInterval>> {
        let filter = format!("silencedetect=noise={}dB:d={}", db, min_silence_sec);
        let args = vec![
            "-i".to_string(),
            audio_path.to_string(),
            "-af".to_string(),
            filter,
            "-f".to_string(),
            "null".to_string(),
            "-".to_string(),
        ];
        let (_, stderr) = self.run(&args, Duration::from_secs(600)).await?;
        let text = String::from_utf8_lossy(&stderr);
        Ok(parse_silencedetect(&text))
    }
}

fn parse_silencedetect(stderr: &str) -> Vec<SilenceInterval> {
    let mut intervals = Vec::new();
    let mut pending_start: Option<f64> = None;

    for line in stderr.lines() {
        if let Some(idx) = line.find("silence_start:") {
            if let Some(v) = line[idx + "silence_start:".len()..].trim().split_whitespace().next() {
                pending_start = v.parse().ok();
            }
        } else if let Some(idx) = line.find("silence_end:") {
            if let Some(start) = pending_start.take() {
                if let Some(v) = line[idx + "silence_end:".len()..].trim().split_whitespace().next() {
                    if let Ok(end) = v.parse::<f64>() {
                        intervals.push((start, end));
                    }
                }
            }
        }
    }
    intervals
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_silence_start_end_pairs() {
        let stderr = "\
[silencedetect @ 0x1] silence_start: 30.0\n\
[silencedetect @ 0x1] silence_end: 31.2 | silence_duration: 1.2\n\
[silencedetect @ 0x1] silence_start: 140.5\n\
[silencedetect @ 0x1] silence_end: 142.0 | silence_duration: 1.5\n";
        let intervals = parse_silencedetect(stderr);
        assert_eq!(intervals, vec![(30.0, 31.2), (140.5, 142.0)]);
    }

    #[test]
    fn ignores_unmatched_start_without_end() {
        let stderr = "silence_start: 10.0\n";
        assert!(parse_silencedetect(stderr).is_empty());
    }
}
