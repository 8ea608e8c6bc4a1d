//! Subprocess-backed `SpeechGateway`, grounded in the two whisper passes
//! driven by `pass1_model`/`pass2_model` config (spec.md §6).
//!
//! Holds no per-call model state: the model name and beam size are bound at
//! worker boot (spec.md §9 "Cross-run model caches") and passed to every
//! invocation of the transcription subprocess.

use async_trait::async_trait;
use serde::Deserialize;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use uuid::Uuid;

use super::{clamp_word_timing, Pass1Result, Pass1Window, Pass2Clip, Pass2Result, SpeechGateway};
use crate::error::{GatewayError, Result};
use crate::model::WordTiming;

pub struct WhisperSpeechGateway {
    binary: String,
    pass1_model: String,
    pass1_beam: u32,
    pass2_model: String,
    pass2_beam: u32,
    timeout: Duration,
}

impl WhisperSpeechGateway {
    pub fn new(pass1_model: impl Into<String>, pass1_beam: u32, pass2_model: impl Into<String>, pass2_beam: u32) -> Self {
        Self {
            binary: "whisper-cli".to_string(),
            pass1_model: pass1_model.into(),
            pass1_beam,
            pass2_model: pass2_model.into(),
            pass2_beam,
            timeout: Duration::from_secs(3600),
        }
    }

    async fn run(&self, args: &[String]) -> Result<Vec<u8>> {
        let output = timeout(
            self.timeout,
            Command::new(&self.binary)
                .args(args)
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .output(),
        )
        .await
        .map_err(|_| GatewayError::Timeout(self.timeout))?
        .map_err(|e| GatewayError::Transport(e.to_string()))?;

        if !output.status.success() {
            return Err(GatewayError::ProcessFailed(output.status.code().unwrap_or(-1)).into());
        }
        Ok(output.stdout)
    }
}

#[derive(Debug, Deserialize)]
struct RawPass1Entry {
    id: Uuid,
    text: String,
}

#[derive(Debug, Deserialize)]
struct RawWord {
    word: String,
    start: f64,
    end: f64,
}

#[derive(Debug, Deserialize)]
struct RawPass2Entry {
    id: Uuid,
    text: String,
    words: Vec<RawWord>,
}

#[async_trait]
impl SpeechGateway for WhisperSpeechGateway {
    async fn pass1(&self, source_media: &str, windows: &[Pass1Window]) -> Result<Vec<Pass1Result>> {
        let windows_json = serde_json::to_string(
            &windows
                .iter()
                .map(|w| serde_json::json!({"id": w.id, "start": w.start, "end": w.end}))
                .collect::<Vec<_>>(),
        )
        .expect("in-memory window list always serializes");

        let args = vec![
            "pass1".to_string(),
            "--source".to_string(),
            source_media.to_string(),
            "--model".to_string(),
            self.pass1_model.clone(),
            "--beam".to_string(),
            self.pass1_beam.to_string(),
            "--windows".to_string(),
            windows_json,
        ];
        let stdout = self.run(&args).await?;
        let entries: Vec<RawPass1Entry> =
            serde_json::from_slice(&stdout).map_err(|e| GatewayError::MalformedResponse(e.to_string()))?;

        Ok(entries.into_iter().map(|e| Pass1Result { id: e.id, text: e.text }).collect())
    }

    async fn pass2(&self, source_media: &str, clips: &[Pass2Clip]) -> Result<Vec<Pass2Result>> {
        let clips_json = serde_json::to_string(
            &clips
                .iter()
                .map(|c| serde_json::json!({"id": c.id, "start": c.start, "end": c.end}))
                .collect::<Vec<_>>(),
        )
        .expect("in-memory clip list always serializes");

        let args = vec![
            "pass2".to_string(),
            "--source".to_string(),
            source_media.to_string(),
            "--model".to_string(),
            self.pass2_model.clone(),
            "--beam".to_string(),
            self.pass2_beam.to_string(),
            "--clips".to_string(),
            clips_json,
        ];
        let stdout = self.run(&args).await?;
        let entries: Vec<RawPass2Entry> =
            serde_json::from_slice(&stdout).map_err(|e| GatewayError::MalformedResponse(e.to_string()))?;

        let mut out = Vec::with_capacity(entries.len());
        for entry in entries {
            let clip = clips
                .iter()
                .find(|c| c.id == entry.id)
                .ok_or_else(|| GatewayError::MalformedResponse(format!("unknown clip id {}", entry.id)))?;
            let window_len = clip.end - clip.start;

            let word_timing: Vec<WordTiming> = entry
                .words
                .into_iter()
                .filter_map(|w| {
                    clamp_word_timing(
                        WordTiming { word: w.word, start: w.start, end: w.end },
                        0.0,
                        window_len,
                    )
                })
                .collect();

            out.push(Pass2Result { id: entry.id, text: entry.text, word_timing });
        }
        Ok(out)
    }
}
