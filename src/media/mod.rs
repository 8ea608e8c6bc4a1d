//! Media Gateway (C6) — probing, fetching, silence detection, cutting and
//! thumbnailing, each a subprocess invocation with a strict timeout. This
//! module is a planner contract: it describes the operations the core
//! needs, not a codec implementation.

pub mod ffmpeg_cli;
pub mod ytdlp;

use async_trait::async_trait;

use crate::error::Result;
use crate::model::Chapter;
use ffmpeg_cli::FfmpegCli;
use ytdlp::YtdlpMediaFetcher;

#[derive(Debug, Clone)]
pub struct ProbeResult {
    pub id: String,
    pub title: String,
    pub duration: f64,
    pub uploader: Option<String>,
    pub chapters: Vec<Chapter>,
}

/// A contiguous silence span `(start, end)` in seconds.
pub type SilenceInterval = (f64, f64);

/// Six operations over source media (spec.md §4.6).
#[async_trait]
pub trait MediaGateway: Send + Sync {
    async fn probe(&self, url: &str) -> Result<ProbeResult>;

    async fn download_audio(&self, url: &str) -> Result<String>;

    async fn download_full(&self, url: &str) -> Result<String>;

    async fn detect_silence(&self, audio_path: &str, db: f64, min_silence_sec: f64) -> Result<Vec<SilenceInterval>>;

    async fn cut(&self, source: &str, start: f64, end: f64, subtitle_path: Option<&str>) -> Result<String>;

    async fn thumbnail(&self, clip_path: &str) -> Result<String>;
}

/// The cutter's fixed lead-in/lead-out pad applied around every cut window
/// (spec.md §4.6, Glossary "Editor pad").
pub const EDITOR_PAD_SEC: f64 = 1.5;

/// 9:16 center-crop filter expression: `crop w = h*(9/16)`, centered on x,
/// full height (spec.md §4.6).
pub fn crop_filter_9x16() -> &'static str {
    "crop=ih*(9/16):ih:(iw-ow)/2:0"
}

/// Default `MediaGateway`: `yt-dlp` for probe/fetch, `ffmpeg` for
/// silence-detect/cut/thumbnail.
pub struct SubprocessMediaGateway {
    fetcher: YtdlpMediaFetcher,
    cutter: FfmpegCli,
}

impl SubprocessMediaGateway {
    pub fn new(download_dir: impl Into<String>, output_dir: impl Into<String>) -> Self {
        let download_dir = download_dir.into();
        Self {
            fetcher: YtdlpMediaFetcher::new(download_dir),
            cutter: FfmpegCli::new(output_dir.into()),
        }
    }
}

#[async_trait]
impl MediaGateway for SubprocessMediaGateway {
    async fn probe(&self, url: &str) -> Result<ProbeResult> {
        self.fetcher.probe(url).await
    }

    async fn download_audio(&self, url: &str) -> Result<String> {
        self.fetcher.download_audio(url).await
    }

    async fn download_full(&self, url: &str) -> Result<String> {
        self.fetcher.download_full(url).await
    }

    async fn detect_silence(&self, audio_path: &str, db: f64, min_silence_sec: f64) -> Result<Vec<SilenceInterval>> {
        self.cutter.detect_silence(audio_path, db, min_silence_sec).await
    }

    async fn cut(&self, source: &str, start: f64, end: f64, subtitle_path: Option<&str>) -> Result<String> {
        self.cutter.cut(source, start, end, subtitle_path).await
    }

    async fn thumbnail(&self, clip_path: &str) -> Result<String> {
        self.cutter.thumbnail(clip_path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crop_filter_matches_spec_expression() {
        assert_eq!(crop_filter_9x16(), "crop=ih*(9/16):ih:(iw-ow)/2:0");
    }

    #[test]
    fn editor_pad_is_fixed() {
        assert_eq!(EDITOR_PAD_SEC, 1.5);
    }
}
