//! Pipeline Orchestrator (C8) — the state machine over `Item::phase`
//! (spec.md §4.8). Each orchestrated handler calls the appropriate gateway
//! or component, persists outputs atomically, advances the phase, and
//! enqueues the next stage on the right queue. Clips are associated across
//! stages by their stable `Uuid`, never by time proximity (spec.md §9).

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::candidates::{self, CandidatePolicy};
use crate::config::CoreConfig;
use crate::dispatcher::{Dispatcher, JobHandler, QueueName};
use crate::diversity::{self, ScoredCandidate};
use crate::error::{PipelineError, Result};
use crate::llm::{LlmGateway, OpeningValidation, RefineInput, ShortlistCandidate};
use crate::media::MediaGateway;
use crate::model::{Clip, ClipPolicy, Item, ItemSource, Phase, RenderPhase};
use crate::recut;
use crate::render;
use crate::scoring;
use crate::speech::{Pass1Window, Pass2Clip, SpeechGateway};
use crate::store::{ClipStore, ItemStore, SubscriptionStore};

const HANDLER_PROBE: &str = "probe_item";
const HANDLER_GENERATE_CANDIDATES: &str = "generate_candidates";
const HANDLER_TRANSCRIBE_PASS1: &str = "transcribe_pass1";
const HANDLER_LLM_SHORTLIST: &str = "llm_shortlist";
const HANDLER_TRANSCRIBE_PASS2: &str = "transcribe_pass2";
const HANDLER_LLM_REFINE: &str = "llm_refine";
const HANDLER_RENDER_PREVIEW: &str = "render_preview";

/// Diversity filter's Jaccard similarity threshold (spec.md §4.3).
const DIVERSITY_THRESHOLD: f64 = 0.7;

pub struct Orchestrator {
    subscriptions: Arc<dyn SubscriptionStore>,
    items: Arc<dyn ItemStore>,
    clips: Arc<dyn ClipStore>,
    llm: Arc<dyn LlmGateway>,
    speech: Arc<dyn SpeechGateway>,
    media: Arc<dyn MediaGateway>,
    dispatcher: Arc<Dispatcher>,
    config: CoreConfig,
}

impl Orchestrator {
    pub fn new(
        subscriptions: Arc<dyn SubscriptionStore>,
        items: Arc<dyn ItemStore>,
        clips: Arc<dyn ClipStore>,
        llm: Arc<dyn LlmGateway>,
        speech: Arc<dyn SpeechGateway>,
        media: Arc<dyn MediaGateway>,
        dispatcher: Arc<Dispatcher>,
        config: CoreConfig,
    ) -> Arc<Self> {
        Arc::new(Self { subscriptions, items, clips, llm, speech, media, dispatcher, config })
    }

    /// Register this orchestrator's handlers with the dispatcher under
    /// their stable string names (spec.md §9 "Handler registration by
    /// callable identity").
    pub fn register_handlers(self: &Arc<Self>) {
        let stages: [(&str, QueueName); 7] = [
            (HANDLER_PROBE, QueueName::Io),
            (HANDLER_GENERATE_CANDIDATES, QueueName::Io),
            (HANDLER_TRANSCRIBE_PASS1, QueueName::Ai),
            (HANDLER_LLM_SHORTLIST, QueueName::Ai),
            (HANDLER_TRANSCRIBE_PASS2, QueueName::Ai),
            (HANDLER_LLM_REFINE, QueueName::Ai),
            (HANDLER_RENDER_PREVIEW, QueueName::Render),
        ];
        for (name, _queue) in stages {
            self.dispatcher.register_handler(
                name,
                Arc::new(StageHandler { orchestrator: Arc::clone(self), stage: name.to_string() }),
            );
        }
    }

    /// Begin the pipeline for a freshly created Item.
    pub fn start(&self, item_id: Uuid) {
        self.dispatcher.enqueue(QueueName::Io, HANDLER_PROBE, json!({ "item_id": item_id }));
    }

    fn enqueue_next(&self, queue: QueueName, handler: &str, item_id: Uuid) {
        self.dispatcher.enqueue(queue, handler, json!({ "item_id": item_id }));
    }

    async fn fail_item(&self, mut item: Item, stage: &str, error: &PipelineError) {
        warn!(item_id = %item.id, stage, error = %error, "stage failed, marking item ERROR");
        item.mark_error(format!("{stage}: {error}"));
        let _ = self.items.put(item).await;
    }

    async fn effective_policy(&self, item: &Item) -> ClipPolicy {
        if let Some(sub_id) = item.subscription_id {
            if let Ok(sub) = self.subscriptions.get(sub_id).await {
                return item.effective_policy(sub.policy);
            }
        }
        item.effective_policy(ClipPolicy::default())
    }

    async fn handle_probing(&self, item_id: Uuid) -> Result<()> {
        let mut item = self.items.get(item_id).await?;
        if item.phase != Phase::New && item.phase != Phase::Probing {
            return Ok(()); // idempotent no-op past this phase
        }

        let probe = self.media.probe(&item.external_item_id).await?;
        item.duration_sec = Some(probe.duration);
        item.chapters = probe.chapters;
        item.advance_to(Phase::GeneratingCandidates, 10);
        self.items.put(item.clone()).await?;

        self.enqueue_next(QueueName::Io, HANDLER_GENERATE_CANDIDATES, item_id);
        Ok(())
    }

    async fn handle_generating_candidates(&self, item_id: Uuid) -> Result<()> {
        let mut item = self.items.get(item_id).await?;
        if item.phase != Phase::GeneratingCandidates {
            return Ok(());
        }
        let duration = item
            .duration_sec
            .ok_or_else(|| PipelineError::DeterministicInput("item has no probed duration".into()))?;
        let policy = self.effective_policy(&item).await;

        let candidate_policy = CandidatePolicy {
            min_len: policy.min_clip_sec,
            max_len: policy.max_clip_sec,
            shift: self.config.candidates.shift_sec,
            limit: self.config.candidates.limit,
        };

        let silence = if item.chapters.is_empty() {
            match self.media.download_audio(&item.external_item_id).await {
                Ok(audio_path) => self
                    .media
                    .detect_silence(&audio_path, self.config.candidates.silence_db, self.config.candidates.min_silence_sec)
                    .await
                    .ok(),
                Err(_) => None,
            }
        } else {
            None
        };

        let (strategy, windows) =
            candidates::generate_candidates(duration, &item.chapters, silence.as_deref(), &candidate_policy);

        if windows.is_empty() {
            return Err(PipelineError::DeterministicInput("no candidate windows generated".into()));
        }

        for w in &windows {
            let clip = Clip::new_candidate(item_id, w.start, w.end, strategy, w.source_info.clone().unwrap_or_default());
            self.clips.put(clip).await?;
        }

        item.strategy = Some(strategy);
        item.advance_to(Phase::TranscribingPass1, 25);
        self.items.put(item).await?;

        self.enqueue_next(QueueName::Ai, HANDLER_TRANSCRIBE_PASS1, item_id);
        Ok(())
    }

    async fn handle_transcribing_pass1(&self, item_id: Uuid) -> Result<()> {
        let mut item = self.items.get(item_id).await?;
        if item.phase != Phase::TranscribingPass1 {
            return Ok(());
        }

        let clips = self.clips.list_by_item(item_id).await?;
        let windows: Vec<Pass1Window> = clips
            .iter()
            .filter(|c| c.render_phase == RenderPhase::Candidate)
            .map(|c| Pass1Window { id: c.id, start: c.start_sec, end: c.end_sec })
            .collect();

        let audio_path = self.media.download_audio(&item.external_item_id).await?;
        let results = self.speech.pass1(&audio_path, &windows).await?;

        for result in results {
            if let Ok(mut clip) = self.clips.get(result.id).await {
                clip.pass1_text = Some(result.text);
                self.clips.put(clip).await?;
            }
        }

        item.advance_to(Phase::LlmShortlisting, 40);
        self.items.put(item).await?;

        self.enqueue_next(QueueName::Ai, HANDLER_LLM_SHORTLIST, item_id);
        Ok(())
    }

    async fn handle_llm_shortlisting(&self, item_id: Uuid) -> Result<()> {
        let mut item = self.items.get(item_id).await?;
        if item.phase != Phase::LlmShortlisting {
            return Ok(());
        }
        let policy = self.effective_policy(&item).await;

        let mut candidate_clips = self.clips.list_by_item(item_id).await?;
        candidate_clips.retain(|c| c.render_phase == RenderPhase::Candidate);
        candidate_clips.truncate(self.config.llm.shortlist_max_candidates);

        let shortlist_inputs: Vec<ShortlistCandidate> = candidate_clips
            .iter()
            .map(|c| ShortlistCandidate {
                id: c.id,
                start: c.start_sec,
                end: c.end_sec,
                text: c.pass1_text.clone().unwrap_or_default(),
            })
            .collect();

        let shortlisted = self.llm.shortlist(&shortlist_inputs, policy.target_count).await?;

        let mut scored = Vec::with_capacity(shortlisted.len());
        for entry in &shortlisted {
            let mut clip = match self.clips.get(entry.id).await {
                Ok(c) => c,
                Err(_) => continue,
            };
            let features = scoring::score_features(clip.pass1_text.as_deref().unwrap_or(""), clip.duration());
            let final_score = scoring::fuse_final_score(entry.viral_score, &features, &entry.risk_flags);

            clip.llm_viral_score = Some(entry.viral_score);
            clip.features = features;
            clip.final_score = Some(final_score);
            clip.risk_flags = entry.risk_flags.clone();
            clip.keywords = entry.keywords.clone();
            clip.hook_text = Some(entry.hook_text.clone());
            clip.caption = Some(entry.caption.clone());
            clip.render_phase = RenderPhase::Shortlisted;

            scored.push(ScoredCandidate::new(clip.id, final_score, &clip.keywords));
            self.clips.put(clip).await?;
        }

        let kept: std::collections::HashSet<Uuid> =
            diversity::filter_diverse(&scored, DIVERSITY_THRESHOLD).into_iter().collect();

        // Delete every Candidate clip not promoted by the shortlist/diversity
        // pass (spec.md §9 resolution of the "unpromoted CANDIDATE clips"
        // open question).
        let all_clips = self.clips.list_by_item(item_id).await?;
        for clip in all_clips {
            let promoted = clip.render_phase == RenderPhase::Shortlisted && kept.contains(&clip.id);
            if !promoted {
                self.clips.delete(clip.id).await?;
            }
        }

        item.advance_to(Phase::TranscribingPass2, 55);
        self.items.put(item).await?;

        self.enqueue_next(QueueName::Ai, HANDLER_TRANSCRIBE_PASS2, item_id);
        Ok(())
    }

    async fn handle_transcribing_pass2(&self, item_id: Uuid) -> Result<()> {
        let mut item = self.items.get(item_id).await?;
        if item.phase != Phase::TranscribingPass2 {
            return Ok(());
        }

        let clips = self.clips.list_by_item(item_id).await?;
        let pass2_clips: Vec<Pass2Clip> = clips
            .iter()
            .filter(|c| c.render_phase == RenderPhase::Shortlisted)
            .map(|c| Pass2Clip { id: c.id, start: c.start_sec, end: c.end_sec })
            .collect();

        let audio_path = self.media.download_audio(&item.external_item_id).await?;
        let results = self.speech.pass2(&audio_path, &pass2_clips).await?;

        for result in results {
            if let Ok(mut clip) = self.clips.get(result.id).await {
                clip.pass2_text = Some(result.text);
                clip.word_timing = result.word_timing;
                self.clips.put(clip).await?;
            }
        }

        item.advance_to(Phase::LlmRefining, 70);
        self.items.put(item).await?;

        self.enqueue_next(QueueName::Ai, HANDLER_LLM_REFINE, item_id);
        Ok(())
    }

    async fn handle_llm_refining(&self, item_id: Uuid) -> Result<()> {
        let mut item = self.items.get(item_id).await?;
        if item.phase != Phase::LlmRefining {
            return Ok(());
        }

        let clips = self.clips.list_by_item(item_id).await?;
        let refine_inputs: Vec<RefineInput> = clips
            .iter()
            .filter(|c| c.render_phase == RenderPhase::Shortlisted)
            .map(|c| RefineInput {
                id: c.id,
                start: c.start_sec,
                end: c.end_sec,
                text: c.pass2_text.clone().unwrap_or_default(),
            })
            .collect();

        let refined = self.llm.refine(&refine_inputs).await?;

        for entry in refined {
            if let Ok(mut clip) = self.clips.get(entry.id).await {
                clip.hook_text = Some(entry.hook_text);
                clip.caption = Some(entry.caption);
                clip.risk_flags = entry.risk_flags;
                clip.keywords = entry.keywords;
                clip.render_phase = RenderPhase::Ready;
                self.clips.put(clip).await?;
            }
        }

        item.advance_to(Phase::RenderingPreview, 85);
        self.items.put(item).await?;

        self.enqueue_next(QueueName::Render, HANDLER_RENDER_PREVIEW, item_id);
        Ok(())
    }

    async fn handle_rendering_preview(&self, item_id: Uuid) -> Result<()> {
        let mut item = self.items.get(item_id).await?;
        if item.phase != Phase::RenderingPreview {
            return Ok(());
        }

        let source = self.media.download_full(&item.external_item_id).await?;
        let clips = self.clips.list_by_item(item_id).await?;

        for mut clip in clips.into_iter().filter(|c| c.render_phase == RenderPhase::Ready) {
            recut::apply_snap_and_clean(&mut clip);

            let (opening, ending) = opening_and_ending_text(&clip);

            let opening_validation = self
                .llm
                .validate_opening(&opening, clip.duration())
                .await
                .unwrap_or_else(|_| crate::llm::OpeningValidation::default_pass());
            if !opening_validation.pass && !clip.risk_flags.contains(&crate::model::RiskFlag::NeedsContext) {
                warn!(
                    clip_id = %clip.id,
                    opening_type = ?opening_validation.opening_type,
                    reason = %opening_validation.reason,
                    "opening evaluation failed, flagging clip as needing context"
                );
                clip.risk_flags.push(crate::model::RiskFlag::NeedsContext);
            }

            let qc = self
                .llm
                .final_qc(clip.id, clip.duration(), &opening, &ending)
                .await
                .unwrap_or_else(|_| crate::llm::FinalQc::default_pass());

            let outcome = recut::apply_recut_plan(clip.start_sec, clip.end_sec, &qc);
            if outcome == crate::recut::RecutOutcome::Dropped {
                self.clips.delete(clip.id).await?;
                continue;
            }
            recut::apply_recut_to_clip(&mut clip, &outcome);

            let srt = render::synthesize_srt(&clip.word_timing, clip.timing_offset);
            let srt_path = format!("/tmp/autoclipper/{}.srt", clip.id);
            if let Some(parent) = std::path::Path::new(&srt_path).parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            std::fs::write(&srt_path, srt)?;

            render::render_clip(&mut clip, &source, self.media.as_ref(), Some(&srt_path)).await?;
            self.clips.put(clip).await?;
        }

        item.advance_to(Phase::Ready, 100);
        self.items.put(item).await?;
        info!(item_id = %item.id, "pipeline complete");
        Ok(())
    }
}

/// First ~10 seconds of transcript by word timing, else first ~25 words;
/// last ~12 seconds, else last ~35 words (spec.md §4.9).
fn opening_and_ending_text(clip: &Clip) -> (String, String) {
    if !clip.word_timing.is_empty() {
        let opening: String = clip
            .word_timing
            .iter()
            .take_while(|w| w.start < 10.0)
            .map(|w| w.word.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        let tail_cutoff = clip.duration() - 12.0;
        let ending: String = clip
            .word_timing
            .iter()
            .filter(|w| w.end >= tail_cutoff)
            .map(|w| w.word.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        return (opening, ending);
    }

    let text = clip.pass2_text.as_deref().or(clip.pass1_text.as_deref()).unwrap_or("");
    let words: Vec<&str> = text.split_whitespace().collect();
    let opening = words.iter().take(25).cloned().collect::<Vec<_>>().join(" ");
    let ending_start = words.len().saturating_sub(35);
    let ending = words[ending_start..].join(" ");
    (opening, ending)
}

struct StageHandler {
    orchestrator: Arc<Orchestrator>,
    stage: String,
}

#[async_trait]
impl JobHandler for StageHandler {
    async fn handle(&self, args: serde_json::Value) -> Result<()> {
        let item_id: Uuid = serde_json::from_value(args["item_id"].clone())
            .map_err(|e| PipelineError::DeterministicInput(format!("bad job args: {e}")))?;

        let result = match self.stage.as_str() {
            HANDLER_PROBE => self.orchestrator.handle_probing(item_id).await,
            HANDLER_GENERATE_CANDIDATES => self.orchestrator.handle_generating_candidates(item_id).await,
            HANDLER_TRANSCRIBE_PASS1 => self.orchestrator.handle_transcribing_pass1(item_id).await,
            HANDLER_LLM_SHORTLIST => self.orchestrator.handle_llm_shortlisting(item_id).await,
            HANDLER_TRANSCRIBE_PASS2 => self.orchestrator.handle_transcribing_pass2(item_id).await,
            HANDLER_LLM_REFINE => self.orchestrator.handle_llm_refining(item_id).await,
            HANDLER_RENDER_PREVIEW => self.orchestrator.handle_rendering_preview(item_id).await,
            other => Err(PipelineError::Config(format!("unknown stage handler {other}"))),
        };

        if let Err(ref e) = result {
            if let Ok(item) = self.orchestrator.items.get(item_id).await {
                self.orchestrator.fail_item(item, &self.stage, e).await;
            }
        }
        result
    }
}

impl Orchestrator {
    /// Run the `packaging` LLM operation for an approved clip, producing the
    /// post-facing title/caption/hashtags from the full transcript (spec.md
    /// §4.4 "packaging"). Called from the `approve` endpoint rather than the
    /// phase chain: packaging is a publish-time concern, not a render one.
    /// On failure the clip's existing caption/hashtags are left untouched
    /// (spec.md §4.4 "packaging is skipped").
    pub async fn finalize_packaging(&self, clip_id: Uuid) -> Result<()> {
        let mut clip = self.clips.get(clip_id).await?;
        let transcript = clip.pass2_text.as_deref().or(clip.pass1_text.as_deref()).unwrap_or("").to_string();

        match self.llm.packaging(clip.id, clip.duration(), &transcript).await {
            Ok(packaging) => {
                clip.caption = Some(packaging.caption);
                clip.hashtags = packaging.hashtags;
                self.clips.put(clip).await?;
                Ok(())
            }
            Err(e) => {
                warn!(clip_id = %clip_id, error = %e, "packaging failed, keeping existing clip caption/hashtags");
                Ok(())
            }
        }
    }
}

/// Manual submission bypasses the feed entirely (spec.md §6 "manual-submit").
pub fn new_manual_item(feed_url_or_id: impl Into<String>, title: impl Into<String>) -> Item {
    Item::new(None, feed_url_or_id, title, chrono::Utc::now(), ItemSource::Manual)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opening_ending_falls_back_to_word_count_without_timing() {
        let mut clip = Clip::new_candidate(Uuid::new_v4(), 0.0, 100.0, crate::model::CandidateStrategy::Chapter, "");
        clip.pass2_text = Some((0..40).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" "));
        let (opening, ending) = opening_and_ending_text(&clip);
        assert_eq!(opening.split_whitespace().count(), 25);
        assert_eq!(ending.split_whitespace().count(), 35);
    }
}
