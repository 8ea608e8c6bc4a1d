//! Axum router configuration — operator CRUD surface over
//! Subscriptions/Items/Clips plus health/version/debug (spec.md §6).

use axum::{
    http::{header, Method},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

use super::handlers::{
    approve_clip, create_subscription, default_clip_policy, delete_item, delete_subscription,
    dispatcher_stats, get_clip, get_item, get_subscription, health_check, list_clips_for_item,
    list_items_for_subscription, list_manual_items, list_post_jobs_for_clip, list_subscriptions,
    manual_submit, version_check,
};

/// Create the Axum router with all routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::ACCEPT, header::CONTENT_TYPE, header::ORIGIN])
        .max_age(Duration::from_secs(3600));

    Router::new()
        .route("/health", get(health_check))
        .route("/version", get(version_check))
        .route("/debug/dispatcher", get(dispatcher_stats))
        .route("/policy/default", get(default_clip_policy))
        .route("/subscriptions", get(list_subscriptions).post(create_subscription))
        .route("/subscriptions/{id}", get(get_subscription).delete(delete_subscription))
        .route("/subscriptions/{id}/items", get(list_items_for_subscription))
        .route("/items/manual", get(list_manual_items).post(manual_submit))
        .route("/items/{id}", get(get_item).delete(delete_item))
        .route("/items/{id}/clips", get(list_clips_for_item))
        .route("/clips/{id}", get(get_clip))
        .route("/clips/{id}/approve", post(approve_clip))
        .route("/clips/{id}/post_jobs", get(list_post_jobs_for_clip))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CoreConfig;

    #[test]
    fn router_builds_with_default_state() {
        let state = Arc::new(AppState::new(CoreConfig::default()));
        let _router = create_router(state);
    }

    #[tokio::test]
    async fn health_endpoint_responds_ok() {
        use axum::body::Body;
        use axum::http::Request;
        use tower::util::ServiceExt;

        let state = Arc::new(AppState::new(CoreConfig::default()));
        let app = create_router(state);

        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), axum::http::StatusCode::OK);
    }
}
