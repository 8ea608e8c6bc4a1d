//! Operator CLI surface (spec.md §6 "Operator CLI surface").
//!
//! A `clap`-derived multi-subcommand binary, generalizing the teacher's
//! single positional config-path argument into named subcommands: each one
//! a different deployment shape of the same `AppState` wiring.

use clap::{Parser, Subcommand};

use crate::dispatcher::QueueName;

#[derive(Parser, Debug)]
#[command(name = "autoclipper", about = "Durable clip-extraction pipeline operator CLI")]
pub struct Cli {
    /// Path to a TOML configuration file (defaults applied for anything unset).
    #[arg(long, global = true, default_value = "config.toml")]
    pub config: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the dispatcher's worker pools for the given queues only.
    StartWorker {
        /// Comma-separated queue names: io, ai, render.
        #[arg(long, value_delimiter = ',', default_value = "io,ai,render")]
        queues: Vec<String>,
    },
    /// Run the feed poller loop only.
    StartPoller,
    /// Operator-initiated backfill for one Subscription, bypassing the
    /// forward-only baseline (spec.md §4.11, capped at `MAX_BACKFILL`).
    ManualBackfill {
        #[arg(long)]
        subscription: uuid::Uuid,
        #[arg(long, default_value_t = 10)]
        count: usize,
    },
    /// Submit a single Item directly from a feed-item URL, bypassing the
    /// feed entirely (spec.md §9 "Duplicate Subscription synthetic Manual
    /// collection" — modeled as a nullable `subscription_id`, not a
    /// sentinel Subscription row).
    ManualSubmit {
        #[arg(long)]
        url: String,
        #[arg(long, default_value = "manual submission")]
        title: String,
    },
    /// Run the HTTP operator API, the dispatcher's workers, and the feed
    /// poller in one process — the common single-binary deployment shape.
    Serve,
}

pub fn parse_queue_names(names: &[String]) -> Vec<QueueName> {
    names
        .iter()
        .filter_map(|n| match n.trim().to_lowercase().as_str() {
            "io" => Some(QueueName::Io),
            "ai" => Some(QueueName::Ai),
            "render" => Some(QueueName::Render),
            other => {
                tracing::warn!(queue = other, "unknown queue name, ignoring");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_queue_names() {
        let queues = parse_queue_names(&["io".to_string(), "ai".to_string(), "render".to_string()]);
        assert_eq!(queues, vec![QueueName::Io, QueueName::Ai, QueueName::Render]);
    }

    #[test]
    fn ignores_unknown_queue_names() {
        let queues = parse_queue_names(&["io".to_string(), "bogus".to_string()]);
        assert_eq!(queues, vec![QueueName::Io]);
    }

    #[test]
    fn cli_parses_serve_subcommand() {
        let cli = Cli::parse_from(["autoclipper", "serve"]);
        assert!(matches!(cli.command, Command::Serve));
    }

    #[test]
    fn cli_parses_manual_backfill_args() {
        let id = uuid::Uuid::new_v4();
        let cli = Cli::parse_from(["autoclipper", "manual-backfill", "--subscription", &id.to_string(), "--count", "5"]);
        match cli.command {
            Command::ManualBackfill { subscription, count } => {
                assert_eq!(subscription, id);
                assert_eq!(count, 5);
            }
            other => panic!("expected ManualBackfill, got {:?}", other),
        }
    }
}
