//! Operator HTTP request handlers: CRUD over Subscriptions/Items/Clips and
//! the `approve` endpoint (spec.md §6).

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::PipelineError;
use crate::model::{ClipPolicy, Item, PostJob, PostJobMode, Subscription};
use crate::state::AppState;

/// Wraps `PipelineError` for the one place in the crate that needs to turn
/// it into an HTTP response (mirrors the teacher's `HttpError`).
pub struct ApiError(PipelineError);

impl From<PipelineError> for ApiError {
    fn from(e: PipelineError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            PipelineError::ItemNotFound(_)
            | PipelineError::SubscriptionNotFound(_)
            | PipelineError::ClipNotFound(_) => StatusCode::NOT_FOUND,
            PipelineError::DeterministicInput(_) | PipelineError::InvalidTransition { .. } => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(serde_json::json!({ "error": self.0.to_string() }))).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

pub async fn health_check() -> &'static str {
    "ok"
}

pub async fn version_check() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// `/debug/dispatcher` — per-queue pending/running counts, the
/// teacher-shaped sibling of `/debug/cache`.
pub async fn dispatcher_stats(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    use crate::dispatcher::QueueName;
    Json(serde_json::json!({
        "io_pending": state.dispatcher.pending_count(QueueName::Io),
        "ai_pending": state.dispatcher.pending_count(QueueName::Ai),
        "render_pending": state.dispatcher.pending_count(QueueName::Render),
    }))
}

#[derive(Debug, Deserialize)]
pub struct CreateSubscriptionRequest {
    pub external_feed_id: String,
    pub name: String,
    pub feed_url: String,
    pub target_count: Option<usize>,
    pub min_clip_sec: Option<f64>,
    pub max_clip_sec: Option<f64>,
}

pub async fn create_subscription(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateSubscriptionRequest>,
) -> ApiResult<Json<Subscription>> {
    let mut sub = Subscription::new(req.external_feed_id, req.name, req.feed_url);
    if let Some(target_count) = req.target_count {
        sub.policy.target_count = target_count;
    }
    if let Some(min) = req.min_clip_sec {
        sub.policy.min_clip_sec = min;
    }
    if let Some(max) = req.max_clip_sec {
        sub.policy.max_clip_sec = max;
    }
    if !sub.policy.is_valid() {
        return Err(PipelineError::DeterministicInput("min_clip_sec must be < max_clip_sec".into()).into());
    }
    state.subscriptions.put(sub.clone()).await?;
    Ok(Json(sub))
}

pub async fn list_subscriptions(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<Subscription>>> {
    Ok(Json(state.subscriptions.list_all().await?))
}

pub async fn get_subscription(State(state): State<Arc<AppState>>, Path(id): Path<Uuid>) -> ApiResult<Json<Subscription>> {
    Ok(Json(state.subscriptions.get(id).await?))
}

/// Deletes the Subscription and cascades to its Items and their Clips
/// (spec.md §3 "Deletion cascades downward").
pub async fn delete_subscription(State(state): State<Arc<AppState>>, Path(id): Path<Uuid>) -> ApiResult<StatusCode> {
    let items = state.items.list_by_subscription(id).await?;
    for item in &items {
        state.clips.delete_by_item(item.id).await?;
    }
    state.items.delete_by_subscription(id).await?;
    state.subscriptions.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_items_for_subscription(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<Item>>> {
    Ok(Json(state.items.list_by_subscription(id).await?))
}

pub async fn list_manual_items(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<Item>>> {
    Ok(Json(state.items.list_manual().await?))
}

pub async fn get_item(State(state): State<Arc<AppState>>, Path(id): Path<Uuid>) -> ApiResult<Json<Item>> {
    Ok(Json(state.items.get(id).await?))
}

/// Deletes the Item and cascades to its Clips.
pub async fn delete_item(State(state): State<Arc<AppState>>, Path(id): Path<Uuid>) -> ApiResult<StatusCode> {
    state.clips.delete_by_item(id).await?;
    state.items.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct ManualSubmitRequest {
    pub url: String,
    pub title: String,
}

/// Manual submission bypasses the feed entirely (spec.md §6 "manual-submit").
pub async fn manual_submit(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ManualSubmitRequest>,
) -> ApiResult<Json<Item>> {
    let item = crate::orchestrator::new_manual_item(req.url, req.title);
    let item_id = item.id;
    state.items.put(item.clone()).await?;
    state.orchestrator.start(item_id);
    Ok(Json(item))
}

pub async fn list_clips_for_item(State(state): State<Arc<AppState>>, Path(id): Path<Uuid>) -> ApiResult<Json<Vec<crate::model::Clip>>> {
    Ok(Json(state.clips.list_by_item(id).await?))
}

pub async fn get_clip(State(state): State<Arc<AppState>>, Path(id): Path<Uuid>) -> ApiResult<Json<crate::model::Clip>> {
    Ok(Json(state.clips.get(id).await?))
}

#[derive(Debug, Default, Deserialize)]
pub struct ApproveQuery {
    #[serde(default)]
    pub direct: bool,
}

/// `approve` endpoint (spec.md §6): creates a `PostJob` for a `READY` clip,
/// marking it `approved` so it is no longer eligible for silent recut.
pub async fn approve_clip(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Query(query): Query<ApproveQuery>,
) -> ApiResult<Json<PostJob>> {
    let mut clip = state.clips.get(id).await?;
    if clip.render_phase != crate::model::RenderPhase::Ready {
        return Err(PipelineError::InvalidTransition {
            from: format!("{:?}", clip.render_phase),
            to: "approved".to_string(),
        }
        .into());
    }

    clip.approved = true;
    state.clips.put(clip).await?;
    state.orchestrator.finalize_packaging(id).await?;

    let mode = if query.direct { PostJobMode::Direct } else { PostJobMode::Draft };
    let job = PostJob::new(id, mode);
    state.post_jobs.put(job.clone()).await?;
    Ok(Json(job))
}

pub async fn list_post_jobs_for_clip(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<PostJob>>> {
    Ok(Json(state.post_jobs.list_by_clip(id).await?))
}

/// Reports the default `ClipPolicy` shown in the create-subscription form.
pub async fn default_clip_policy() -> Json<ClipPolicy> {
    Json(ClipPolicy::default())
}
