//! Application state shared across HTTP handlers and the CLI — the
//! construction point where stores, gateways and the dispatcher are wired
//! together, following the teacher's `AppState` shape.

use std::sync::Arc;

use crate::config::CoreConfig;
use crate::dispatcher::Dispatcher;
use crate::llm::groq::GroqLlmGateway;
use crate::llm::LlmGateway;
use crate::media::{MediaGateway, SubprocessMediaGateway};
use crate::orchestrator::Orchestrator;
use crate::speech::whisper::WhisperSpeechGateway;
use crate::speech::SpeechGateway;
use crate::store::memory::{MemoryClipStore, MemoryItemStore, MemoryPostJobStore, MemorySubscriptionStore};
use crate::store::{ClipStore, ItemStore, PostJobStore, SubscriptionStore};

pub struct AppState {
    pub config: CoreConfig,
    pub subscriptions: Arc<dyn SubscriptionStore>,
    pub items: Arc<dyn ItemStore>,
    pub clips: Arc<dyn ClipStore>,
    pub post_jobs: Arc<dyn PostJobStore>,
    pub dispatcher: Arc<Dispatcher>,
    pub orchestrator: Arc<Orchestrator>,
}

impl AppState {
    /// Build the default process wiring: in-memory stores, Groq LLM
    /// gateway, whisper-cli speech gateway, yt-dlp/ffmpeg media gateway.
    pub fn new(config: CoreConfig) -> Self {
        let subscriptions: Arc<dyn SubscriptionStore> = Arc::new(MemorySubscriptionStore::default());
        let items: Arc<dyn ItemStore> = Arc::new(MemoryItemStore::default());
        let clips: Arc<dyn ClipStore> = Arc::new(MemoryClipStore::default());
        let post_jobs: Arc<dyn PostJobStore> = Arc::new(MemoryPostJobStore::default());

        let llm: Arc<dyn LlmGateway> = Arc::new(GroqLlmGateway::new(config.llm_api_key.clone(), "llama-3.3-70b-versatile"));
        let speech: Arc<dyn SpeechGateway> = Arc::new(WhisperSpeechGateway::new(
            config.whisper.pass1_model.clone(),
            config.whisper.pass1_beam,
            config.whisper.pass2_model.clone(),
            config.whisper.pass2_beam,
        ));
        let media: Arc<dyn MediaGateway> = Arc::new(SubprocessMediaGateway::new("/tmp/autoclipper/downloads", "/tmp/autoclipper/clips"));

        let dispatcher = Arc::new(Dispatcher::new(&config.dispatcher));

        let orchestrator = Orchestrator::new(
            Arc::clone(&subscriptions),
            Arc::clone(&items),
            Arc::clone(&clips),
            llm,
            speech,
            media,
            Arc::clone(&dispatcher),
            config.clone(),
        );
        orchestrator.register_handlers();

        Self { config, subscriptions, items, clips, post_jobs, dispatcher, orchestrator }
    }

    /// Start the dispatcher's worker pools per the configured counts
    /// (spec.md §5 "Worker count per queue is a deployment knob").
    pub fn spawn_workers(&self) {
        self.dispatcher.spawn_workers(crate::dispatcher::QueueName::Io, self.config.dispatcher.io_workers);
        self.dispatcher.spawn_workers(crate::dispatcher::QueueName::Ai, self.config.dispatcher.ai_workers);
        self.dispatcher.spawn_workers(crate::dispatcher::QueueName::Render, self.config.dispatcher.render_workers);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_state_builds_with_default_config() {
        let state = AppState::new(CoreConfig::default());
        assert_eq!(state.config.port, 8088);
    }
}
