//! Configuration file support
//!
//! Loads process configuration from TOML files with a friendlier,
//! mostly-optional surface than `CoreConfig` itself, merging onto defaults.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::config::CoreConfig;

/// Configuration file format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigFile {
    pub server: ServerSettings,
    pub candidates: Option<CandidateSettings>,
    pub whisper: Option<WhisperSettings>,
    pub llm: Option<LlmSettings>,
    pub dispatcher: Option<DispatcherSettings>,
    pub feed: Option<FeedSettings>,
    pub logging: Option<LoggingSettings>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub database_url: Option<String>,
    pub queue_broker_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateSettings {
    pub min_sec: Option<f64>,
    pub max_sec: Option<f64>,
    pub shift_sec: Option<f64>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhisperSettings {
    pub pass1_model: Option<String>,
    pub pass1_beam: Option<u32>,
    pub pass2_model: Option<String>,
    pub pass2_beam: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSettings {
    pub shortlist_max_candidates: Option<usize>,
    pub send_max_chars: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatcherSettings {
    pub io_workers: Option<usize>,
    pub ai_workers: Option<usize>,
    pub render_workers: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedSettings {
    pub poll_interval_secs: Option<u64>,
    pub max_backfill: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    pub level: String,
}

impl ConfigFile {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: ConfigFile = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), content)?;
        Ok(())
    }

    pub fn default_config() -> Self {
        let defaults = CoreConfig::default();
        Self {
            server: ServerSettings {
                host: defaults.host,
                port: defaults.port,
                database_url: Some(defaults.database_url),
                queue_broker_url: Some(defaults.queue_broker_url),
            },
            candidates: None,
            whisper: None,
            llm: None,
            dispatcher: None,
            feed: None,
            logging: Some(LoggingSettings {
                level: defaults.log_level,
            }),
        }
    }

    /// Merge this file's settings onto `CoreConfig::default()`.
    pub fn into_core_config(self) -> CoreConfig {
        let mut config = CoreConfig::default();
        config.host = self.server.host;
        config.port = self.server.port;
        if let Some(url) = self.server.database_url {
            config.database_url = url;
        }
        if let Some(url) = self.server.queue_broker_url {
            config.queue_broker_url = url;
        }
        if let Some(c) = self.candidates {
            if let Some(v) = c.min_sec {
                config.candidates.min_sec = v;
            }
            if let Some(v) = c.max_sec {
                config.candidates.max_sec = v;
            }
            if let Some(v) = c.shift_sec {
                config.candidates.shift_sec = v;
            }
            if let Some(v) = c.limit {
                config.candidates.limit = v;
            }
        }
        if let Some(w) = self.whisper {
            if let Some(v) = w.pass1_model {
                config.whisper.pass1_model = v;
            }
            if let Some(v) = w.pass1_beam {
                config.whisper.pass1_beam = v;
            }
            if let Some(v) = w.pass2_model {
                config.whisper.pass2_model = v;
            }
            if let Some(v) = w.pass2_beam {
                config.whisper.pass2_beam = v;
            }
        }
        if let Some(l) = self.llm {
            if let Some(v) = l.shortlist_max_candidates {
                config.llm.shortlist_max_candidates = v;
            }
            if let Some(v) = l.send_max_chars {
                config.llm.send_max_chars = v;
            }
        }
        if let Some(d) = self.dispatcher {
            if let Some(v) = d.io_workers {
                config.dispatcher.io_workers = v;
            }
            if let Some(v) = d.ai_workers {
                config.dispatcher.ai_workers = v;
            }
            if let Some(v) = d.render_workers {
                config.dispatcher.render_workers = v;
            }
        }
        if let Some(f) = self.feed {
            if let Some(v) = f.poll_interval_secs {
                config.feed.poll_interval_secs = v;
            }
            if let Some(v) = f.max_backfill {
                config.feed.max_backfill = v;
            }
        }
        if let Some(l) = self.logging {
            config.log_level = l.level;
        }
        config
    }
}

/// Generate a default configuration file at the specified path.
pub fn generate_default_config<P: AsRef<Path>>(path: P) -> Result<(), Box<dyn std::error::Error>> {
    ConfigFile::default_config().to_file(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = ConfigFile::default_config();
        assert_eq!(config.server.port, 8088);
    }

    #[test]
    fn test_config_file_roundtrip() {
        let config = ConfigFile::default_config();

        let mut temp_file = NamedTempFile::new().unwrap();
        let content = toml::to_string_pretty(&config).unwrap();
        temp_file.write_all(content.as_bytes()).unwrap();

        let loaded = ConfigFile::from_file(temp_file.path()).unwrap();
        assert_eq!(loaded.server.port, config.server.port);
    }

    #[test]
    fn test_into_core_config_merges_overrides() {
        let mut config_file = ConfigFile::default_config();
        config_file.candidates = Some(CandidateSettings {
            min_sec: Some(50.0),
            max_sec: None,
            shift_sec: None,
            limit: None,
        });
        let core = config_file.into_core_config();
        assert_eq!(core.candidates.min_sec, 50.0);
        assert_eq!(core.candidates.max_sec, CoreConfig::default().candidates.max_sec);
    }

    #[test]
    fn test_generate_default_config() {
        let temp_file = NamedTempFile::new().unwrap();
        let path = temp_file.path().to_path_buf();

        generate_default_config(&path).unwrap();

        assert!(path.exists());
        let loaded = ConfigFile::from_file(&path).unwrap();
        assert_eq!(loaded.server.port, 8088);
    }
}
