//! `yt-dlp` subprocess backing for probe/download, grounded in the original
//! metadata-probe's `-J --no-download` invocation and audio-only download
//! format selector.

use serde::Deserialize;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use uuid::Uuid;

use super::ProbeResult;
use crate::error::{GatewayError, Result};
use crate::model::Chapter;

pub struct YtdlpMediaFetcher {
    binary: String,
    download_dir: String,
    probe_timeout: Duration,
    download_timeout: Duration,
}

impl YtdlpMediaFetcher {
    pub fn new(download_dir: impl Into<String>) -> Self {
        Self {
            binary: "yt-dlp".to_string(),
            download_dir: download_dir.into(),
            probe_timeout: Duration::from_secs(60),
            download_timeout: Duration::from_secs(300),
        }
    }

    async fn run(&self, args: &[String], timeout_dur: Duration) -> Result<Vec<u8>> {
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
        Ok(output.stdout)
    }

    pub async fn probe(&self, url: &str) -> Result<ProbeResult> {
        let args = vec!["-J".to_string(), "--no-download".to_string(), url.to_string()];
        let stdout = self.run(&args, self.probe_timeout).await?;
        let raw: RawProbe =
            serde_json::from_slice(&stdout).map_err(|e| GatewayError::MalformedResponse(e.to_string()))?;

        let chapters = raw
            .chapters
            .unwrap_or_default()
            .into_iter()
            .map(|c| Chapter {
                title: c.title.unwrap_or_default(),
                start: c.start_time.unwrap_or(0.0),
                end: c.end_time.unwrap_or(0.0),
            })
            .collect();

        Ok(ProbeResult {
            id: raw.id.unwrap_or_default(),
            title: raw.title.unwrap_or_default(),
            duration: raw.duration.ok_or_else(|| GatewayError::MalformedResponse("missing duration".into()))?,
            uploader: raw.uploader,
            chapters,
        })
    }

    /// Best-available audio-only stream (`bestaudio[ext=m4a]/bestaudio`).
    pub async fn download_audio(&self, url: &str) -> Result<String> {
        let id = Uuid::new_v4();
        let template = format!("{}/{}.%(ext)s", self.download_dir, id);
        let args = vec![
            "-f".to_string(),
            "bestaudio[ext=m4a]/bestaudio".to_string(),
            "-o".to_string(),
            template,
            "--no-playlist".to_string(),
            url.to_string(),
        ];
        self.run(&args, self.download_timeout).await?;

        for ext in ["m4a", "webm", "mp3", "opus"] {
            let path = format!("{}/{}.{}", self.download_dir, id, ext);
            if Path::new(&path).exists() {
                return Ok(path);
            }
        }
        Err(GatewayError::Transport("downloaded audio file not found".into()).into())
    }

    /// Merged video+audio bounded to `height <= 720` (spec.md §4.6).
    pub async fn download_full(&self, url: &str) -> Result<String> {
        let id = Uuid::new_v4();
        let template = format!("{}/{}.%(ext)s", self.download_dir, id);
        let args = vec![
            "-f".to_string(),
            "bestvideo[height<=720]+bestaudio/best[height<=720]".to_string(),
            "-o".to_string(),
            template,
            "--no-playlist".to_string(),
            "--merge-output-format".to_string(),
            "mp4".to_string(),
            url.to_string(),
        ];
        self.run(&args, self.download_timeout).await?;

        let path = format!("{}/{}.mp4", self.download_dir, id);
        if Path::new(&path).exists() {
            Ok(path)
        } else {
            Err(GatewayError::Transport("downloaded video file not found".into()).into())
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawChapter {
    title: Option<String>,
    start_time: Option<f64>,
    end_time: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawProbe {
    id: Option<String>,
    title: Option<String>,
    duration: Option<f64>,
    uploader: Option<String>,
    chapters: Option<Vec<RawChapter>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_probe_tolerates_missing_chapters() {
        let json = r#"{"id":"abc","title":"t","duration":120.5,"uploader":null}"#;
        let raw: RawProbe = serde_json::from_str(json).unwrap();
        assert!(raw.chapters.is_none());
        assert_eq!(raw.duration, Some(120.5));
    }
}
