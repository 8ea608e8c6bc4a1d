//! Pipeline configuration.
//!
//! `CoreConfig` is parsed once at process start (REDESIGN FLAGS, spec.md §9:
//! "Global mutable configuration") and threaded explicitly into `AppState`,
//! the `Dispatcher`, and each component's constructor — no process-wide
//! statics are read at call time.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Candidate Generator parameters (spec.md §4.1, §6).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CandidateConfig {
    pub min_sec: f64,
    pub max_sec: f64,
    pub shift_sec: f64,
    pub limit: usize,
    pub silence_db: f64,
    pub min_silence_sec: f64,
}

impl Default for CandidateConfig {
    fn default() -> Self {
        Self {
            min_sec: 75.0,
            max_sec: 180.0,
            shift_sec: 15.0,
            limit: 400,
            silence_db: -35.0,
            min_silence_sec: 0.35,
        }
    }
}

/// Speech Gateway model parameters (spec.md §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhisperConfig {
    pub pass1_model: String,
    pub pass1_beam: u32,
    pub pass2_model: String,
    pub pass2_beam: u32,
}

impl Default for WhisperConfig {
    fn default() -> Self {
        Self {
            pass1_model: "base".to_string(),
            pass1_beam: 1,
            pass2_model: "small".to_string(),
            pass2_beam: 5,
        }
    }
}

/// LLM Gateway sizing parameters (spec.md §4.4, §6).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LlmConfig {
    pub shortlist_max_candidates: usize,
    pub send_max_chars: usize,
    pub temperature: f64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            shortlist_max_candidates: 120,
            send_max_chars: 100_000,
            temperature: 0.2,
        }
    }
}

/// Dispatcher retry/timeout policy for a single named queue (spec.md §4.7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueuePolicyConfig {
    pub timeout_secs: u64,
    pub backoff_secs: Vec<u64>,
}

impl QueuePolicyConfig {
    pub fn max_attempts(&self) -> usize {
        self.backoff_secs.len() + 1
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// The three named queues (spec.md §4.7 table).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatcherConfig {
    pub io: QueuePolicyConfig,
    pub ai: QueuePolicyConfig,
    pub render: QueuePolicyConfig,
    pub io_workers: usize,
    pub ai_workers: usize,
    pub render_workers: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            io: QueuePolicyConfig {
                timeout_secs: 600,
                backoff_secs: vec![30, 60, 120],
            },
            ai: QueuePolicyConfig {
                timeout_secs: 3600,
                backoff_secs: vec![30, 60, 120, 120, 120],
            },
            render: QueuePolicyConfig {
                timeout_secs: 1800,
                backoff_secs: vec![30, 60],
            },
            io_workers: 4,
            ai_workers: 2,
            render_workers: 2,
        }
    }
}

/// Feed Poller parameters (spec.md §4.11, §6).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FeedConfig {
    pub poll_interval_secs: u64,
    pub max_backfill: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 300,
            max_backfill: 10,
        }
    }
}

/// Top-level process configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub queue_broker_url: String,
    /// Broker-side queue identifiers for the three named queues (spec.md §6
    /// "I/O queue name" / "AI queue name" / "Render queue name"). The
    /// in-process `Dispatcher` addresses queues by the fixed `QueueName`
    /// enum regardless of these; a broker-backed `Dispatcher` would use
    /// them to route to the right topic/queue.
    pub io_queue_name: String,
    pub ai_queue_name: String,
    pub render_queue_name: String,
    pub llm_api_key: String,
    pub log_level: String,
    pub candidates: CandidateConfig,
    pub whisper: WhisperConfig,
    pub llm: LlmConfig,
    pub dispatcher: DispatcherConfig,
    pub feed: FeedConfig,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8088,
            database_url: "memory://".to_string(),
            queue_broker_url: "memory://".to_string(),
            io_queue_name: "io".to_string(),
            ai_queue_name: "ai".to_string(),
            render_queue_name: "render".to_string(),
            llm_api_key: String::new(),
            log_level: "info".to_string(),
            candidates: CandidateConfig::default(),
            whisper: WhisperConfig::default(),
            llm: LlmConfig::default(),
            dispatcher: DispatcherConfig::default(),
            feed: FeedConfig::default(),
        }
    }
}

impl CoreConfig {
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Load configuration from a TOML file.
    pub fn from_file(path: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let config: CoreConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Build configuration from environment variables, falling back to
    /// defaults for anything unset (spec.md §6 environment table).
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(v) = std::env::var("DATABASE_URL") {
            config.database_url = v;
        }
        if let Ok(v) = std::env::var("QUEUE_BROKER_URL") {
            config.queue_broker_url = v;
        }
        if let Ok(v) = std::env::var("LLM_API_KEY") {
            config.llm_api_key = v;
        }
        if let Ok(v) = std::env::var("POLL_INTERVAL_SECONDS") {
            if let Ok(n) = v.parse() {
                config.feed.poll_interval_secs = n;
            }
        }
        if let Ok(v) = std::env::var("CANDIDATE_MIN_SEC") {
            if let Ok(n) = v.parse() {
                config.candidates.min_sec = n;
            }
        }
        if let Ok(v) = std::env::var("CANDIDATE_MAX_SEC") {
            if let Ok(n) = v.parse() {
                config.candidates.max_sec = n;
            }
        }
        if let Ok(v) = std::env::var("CANDIDATE_SHIFT_SEC") {
            if let Ok(n) = v.parse() {
                config.candidates.shift_sec = n;
            }
        }
        if let Ok(v) = std::env::var("CANDIDATE_LIMIT") {
            if let Ok(n) = v.parse() {
                config.candidates.limit = n;
            }
        }
        if let Ok(v) = std::env::var("WHISPER_PASS1_MODEL") {
            config.whisper.pass1_model = v;
        }
        if let Ok(v) = std::env::var("WHISPER_PASS1_BEAM") {
            if let Ok(n) = v.parse() {
                config.whisper.pass1_beam = n;
            }
        }
        if let Ok(v) = std::env::var("WHISPER_PASS2_MODEL") {
            config.whisper.pass2_model = v;
        }
        if let Ok(v) = std::env::var("WHISPER_PASS2_BEAM") {
            if let Ok(n) = v.parse() {
                config.whisper.pass2_beam = n;
            }
        }
        if let Ok(v) = std::env::var("LLM_SHORTLIST_MAX") {
            if let Ok(n) = v.parse() {
                config.llm.shortlist_max_candidates = n;
            }
        }
        if let Ok(v) = std::env::var("LLM_SEND_MAX_CHARS") {
            if let Ok(n) = v.parse() {
                config.llm.send_max_chars = n;
            }
        }
        if let Ok(v) = std::env::var("IO_QUEUE_NAME") {
            config.io_queue_name = v;
        }
        if let Ok(v) = std::env::var("AI_QUEUE_NAME") {
            config.ai_queue_name = v;
        }
        if let Ok(v) = std::env::var("RENDER_QUEUE_NAME") {
            config.render_queue_name = v;
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CoreConfig::default();
        assert_eq!(config.port, 8088);
        assert_eq!(config.candidates.min_sec, 75.0);
        assert_eq!(config.dispatcher.io.max_attempts(), 4);
        assert_eq!(config.dispatcher.ai.max_attempts(), 6);
        assert_eq!(config.dispatcher.render.max_attempts(), 3);
    }

    #[test]
    fn test_socket_addr() {
        let config = CoreConfig {
            host: "127.0.0.1".to_string(),
            port: 9000,
            ..CoreConfig::default()
        };
        assert_eq!(config.socket_addr(), "127.0.0.1:9000");
    }

    #[test]
    fn test_queue_timeouts_match_spec_table() {
        let d = DispatcherConfig::default();
        assert_eq!(d.io.timeout(), Duration::from_secs(600));
        assert_eq!(d.ai.timeout(), Duration::from_secs(3600));
        assert_eq!(d.render.timeout(), Duration::from_secs(1800));
    }
}
