//! Autoclipper pipeline — durable multi-stage extraction of short vertical
//! clips from long-form video (spec.md §1).
//!
//! The operator binary is a thin dispatch over `cli::Command`: each variant
//! is a different deployment shape of the same `AppState` wiring, following
//! the teacher's single-binary `main.rs` pattern generalized to subcommands.

mod candidates;
mod cli;
mod config;
mod config_file;
mod dispatcher;
mod diversity;
mod error;
mod feed;
mod http;
mod llm;
mod media;
mod model;
mod orchestrator;
mod recut;
mod render;
mod scoring;
mod speech;
mod state;
mod store;

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Cli, Command};
use crate::config::CoreConfig;
use crate::error::Result;
use crate::feed::{FeedPoller, HttpFeedSource};
use crate::http::create_router;
use crate::state::AppState;

const APP_NAME: &str = "autoclipper";
const VERSION: &str = env!("CARGO_PKG_VERSION");

fn load_config(path: &str) -> CoreConfig {
    if std::path::Path::new(path).exists() {
        match crate::config_file::ConfigFile::from_file(path) {
            Ok(cf) => cf.into_core_config(),
            Err(e) => {
                tracing::warn!("failed to load config file {}: {}. using defaults.", path, e);
                CoreConfig::default()
            }
        }
    } else {
        CoreConfig::from_env()
    }
}

fn init_logging(level: &str) {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            format!("autoclipper={level},tower_http=info").into()
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli.config);
    init_logging(&config.log_level);
    tracing::info!("{} v{} starting", APP_NAME, VERSION);

    let state = Arc::new(AppState::new(config.clone()));

    match cli.command {
        Command::StartWorker { queues } => {
            let queue_names = cli::parse_queue_names(&queues);
            for queue in queue_names {
                let worker_count = match queue {
                    dispatcher::QueueName::Io => config.dispatcher.io_workers,
                    dispatcher::QueueName::Ai => config.dispatcher.ai_workers,
                    dispatcher::QueueName::Render => config.dispatcher.render_workers,
                };
                tracing::info!(?queue, worker_count, "spawning workers");
                state.dispatcher.spawn_workers(queue, worker_count);
            }
            std::future::pending::<()>().await;
        }
        Command::StartPoller => {
            run_poller(&state).await;
        }
        Command::ManualBackfill { subscription, count } => {
            let poller = build_poller(&state);
            let created = poller.backfill(subscription, count).await?;
            tracing::info!(count = created.len(), "manual backfill ingested items");
        }
        Command::ManualSubmit { url, title } => {
            let item = crate::orchestrator::new_manual_item(url, title);
            let item_id = item.id;
            state.items.put(item).await?;
            state.orchestrator.start(item_id);
            tracing::info!(item_id = %item_id, "manual item submitted");
        }
        Command::Serve => {
            state.spawn_workers();

            let poller_state = Arc::clone(&state);
            tokio::spawn(async move {
                run_poller(&poller_state).await;
            });

            let app = create_router(Arc::clone(&state));
            let addr: SocketAddr = state.config.socket_addr().parse().expect("invalid host:port");
            tracing::info!("listening on {}", addr);
            let listener = tokio::net::TcpListener::bind(addr).await?;
            axum::serve(listener, app).await?;
        }
    }

    Ok(())
}

fn build_poller(state: &Arc<AppState>) -> Arc<FeedPoller> {
    Arc::new(FeedPoller::new(
        Arc::new(HttpFeedSource::default()),
        Arc::clone(&state.subscriptions),
        Arc::clone(&state.items),
        Arc::clone(&state.orchestrator),
        state.config.feed,
    ))
}

async fn run_poller(state: &Arc<AppState>) {
    let poller = build_poller(state);
    poller.run().await;
}

#[cfg(test)]
mod tests {
    #[test]
    fn version_is_set() {
        assert!(!super::VERSION.is_empty());
    }
}
