//! Groq-backed `LlmGateway` implementation.
//!
//! The upstream response is tolerant of several JSON shapes: a bare list, a
//! dict keyed `clips`/`segments`/`candidates`, or — failing those — the
//! first list-valued entry in the top-level object. This mirrors how the
//! original LLM-calling code unwraps Groq chat-completion payloads rather
//! than assuming one fixed envelope.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use uuid::Uuid;

use super::{
    FinalQc, LlmGateway, OpeningValidation, Packaging, RefineInput, RefinedClip,
    ShortlistCandidate, ShortlistedClip,
};
use crate::error::{GatewayError, Result};

const CHAT_COMPLETIONS_PATH: &str = "/openai/v1/chat/completions";
const DEFAULT_BASE_URL: &str = "https://api.groq.com";

pub struct GroqLlmGateway {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f64,
    timeout: Duration,
}

impl GroqLlmGateway {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            model: model.into(),
            temperature: 0.2,
            timeout: Duration::from_secs(60),
        }
    }

    async fn chat(&self, system_prompt: &str, user_prompt: &str) -> Result<Value> {
        let body = serde_json::json!({
            "model": self.model,
            "temperature": self.temperature,
            "response_format": { "type": "json_object" },
            "messages": [
                { "role": "system", "content": system_prompt },
                { "role": "user", "content": user_prompt },
            ],
        });

        let resp = self
            .client
            .post(format!("{}{}", self.base_url, CHAT_COMPLETIONS_PATH))
            .bearer_auth(&self.api_key)
            .json(&body)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(GatewayError::Transport(format!("status {}", resp.status())).into());
        }

        let envelope: Value = resp
            .json()
            .await
            .map_err(|e| GatewayError::MalformedResponse(e.to_string()))?;

        let content = envelope["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| GatewayError::MalformedResponse("missing choices[0].message.content".into()))?;

        serde_json::from_str(content).map_err(|e| GatewayError::MalformedResponse(e.to_string()).into())
    }
}

/// Unwrap a tolerant JSON root into a list of values: a bare array, a dict
/// under one of `clips`/`segments`/`candidates`, or the first list-valued
/// entry of the object.
fn unwrap_list_root(root: &Value) -> Option<&Vec<Value>> {
    if let Some(arr) = root.as_array() {
        return Some(arr);
    }
    let obj = root.as_object()?;
    for key in ["clips", "segments", "candidates"] {
        if let Some(Value::Array(arr)) = obj.get(key) {
            return Some(arr);
        }
    }
    obj.values().find_map(|v| v.as_array())
}

#[async_trait]
impl LlmGateway for GroqLlmGateway {
    async fn shortlist(&self, candidates: &[ShortlistCandidate], max_clips: usize) -> Result<Vec<ShortlistedClip>> {
        let windows: Vec<Value> = candidates
            .iter()
            .map(|c| {
                serde_json::json!({
                    "id": c.id,
                    "start": c.start,
                    "end": c.end,
                    "text": c.text,
                })
            })
            .collect();

        let system = "Select the strongest short-form clip windows from the provided candidates. \
            Respond with strict JSON only.";
        let user = serde_json::json!({
            "candidates": windows,
            "max_clips": max_clips,
        })
        .to_string();

        let root = self.chat(system, &user).await?;
        let list = unwrap_list_root(&root)
            .ok_or_else(|| GatewayError::MalformedResponse("no list-valued shortlist root".into()))?;

        let mut out = Vec::with_capacity(list.len());
        for item in list.iter().take(max_clips) {
            let clip: ShortlistedClip = serde_json::from_value(item.clone())
                .map_err(|e| GatewayError::MalformedResponse(e.to_string()))?;
            out.push(clip);
        }
        Ok(out)
    }

    async fn refine(&self, clips: &[RefineInput]) -> Result<Vec<RefinedClip>> {
        let payload: Vec<Value> = clips
            .iter()
            .map(|c| {
                serde_json::json!({
                    "id": c.id,
                    "start": c.start,
                    "end": c.end,
                    "text": c.text,
                })
            })
            .collect();

        let system = "Refine hook_text, caption, risk_flags and keywords for each clip. \
            Timestamps must not change. Respond with strict JSON only.";
        let user = serde_json::json!({ "clips": payload }).to_string();

        let root = self.chat(system, &user).await?;
        let list = unwrap_list_root(&root)
            .ok_or_else(|| GatewayError::MalformedResponse("no list-valued refine root".into()))?;

        let mut out = Vec::with_capacity(list.len());
        for item in list {
            let clip: RefinedClip = serde_json::from_value(item.clone())
                .map_err(|e| GatewayError::MalformedResponse(e.to_string()))?;
            out.push(clip);
        }
        Ok(out)
    }

    async fn validate_opening(&self, opening_text: &str, clip_duration: f64) -> Result<OpeningValidation> {
        let system = "Judge whether this clip opening hooks a viewer in the first seconds. \
            Respond with strict JSON only: pass, opening_type, reason, confidence.";
        let user = serde_json::json!({
            "opening_text": opening_text,
            "clip_duration": clip_duration,
        })
        .to_string();

        let root = self.chat(system, &user).await?;
        serde_json::from_value(root).map_err(|e| GatewayError::MalformedResponse(e.to_string()).into())
    }

    async fn final_qc(&self, clip_id: Uuid, duration: f64, opening: &str, ending: &str) -> Result<FinalQc> {
        let system = "Run final quality control on this clip. If a small time shift would improve \
            it, propose a recut_plan. Respond with strict JSON only.";
        let user = serde_json::json!({
            "clip_id": clip_id,
            "duration": duration,
            "opening": opening,
            "ending": ending,
        })
        .to_string();

        let root = self.chat(system, &user).await?;
        let mut qc: FinalQc =
            serde_json::from_value(root).map_err(|e| GatewayError::MalformedResponse(e.to_string()))?;
        qc.recut_plan.shift_start_by_sec = qc.recut_plan.shift_start_by_sec.clamp(-3.0, 3.0);
        qc.recut_plan.shift_end_by_sec = qc.recut_plan.shift_end_by_sec.clamp(-3.0, 3.0);
        Ok(qc)
    }

    async fn packaging(&self, clip_id: Uuid, duration: f64, full_transcript: &str) -> Result<Packaging> {
        let system = "Produce final packaging for this clip: a verbatim key_sentence drawn from the \
            transcript, a short title, a caption, and hashtags. Respond with strict JSON only.";
        let user = serde_json::json!({
            "clip_id": clip_id,
            "duration": duration,
            "transcript": full_transcript,
        })
        .to_string();

        let root = self.chat(system, &user).await?;
        serde_json::from_value(root).map_err(|e| GatewayError::MalformedResponse(e.to_string()).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unwraps_bare_array() {
        let root = json!([{"a": 1}, {"b": 2}]);
        assert_eq!(unwrap_list_root(&root).unwrap().len(), 2);
    }

    #[test]
    fn unwraps_clips_key() {
        let root = json!({ "clips": [{"a": 1}] });
        assert_eq!(unwrap_list_root(&root).unwrap().len(), 1);
    }

    #[test]
    fn unwraps_first_list_valued_entry_when_keys_unknown() {
        let root = json!({ "weird_wrapper_key": [{"a": 1}, {"b": 2}, {"c": 3}] });
        assert_eq!(unwrap_list_root(&root).unwrap().len(), 3);
    }

    #[test]
    fn returns_none_when_nothing_list_shaped() {
        let root = json!({ "message": "no clips today" });
        assert!(unwrap_list_root(&root).is_none());
    }
}
