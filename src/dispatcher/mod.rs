//! Work Dispatcher (C7) — durable job queues with retry policy, job
//! chaining and timeout, following the teacher's `DashMap`-backed shared
//! state and `Arc`-handle idiom.

pub mod job;

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::time::Duration;
use uuid::Uuid;

pub use job::{Job, JobStatus, QueueName};

use crate::config::DispatcherConfig;
use crate::error::{PipelineError, Result};

/// A named, idempotent unit of orchestrated work. Handlers are looked up
/// by `name` at execution time so a restarted worker can re-resolve them
/// without depending on function-object identity (spec.md §9).
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn handle(&self, args: Value) -> Result<()>;
}

struct QueueRuntime {
    timeout: Duration,
    backoff: Vec<Duration>,
    sender: mpsc::UnboundedSender<Uuid>,
    receiver: Mutex<mpsc::UnboundedReceiver<Uuid>>,
}

/// Durable multi-queue dispatcher. Jobs survive dispatcher restart in
/// `jobs`; workers are tokio tasks that share one multi-producer channel
/// per queue, each locking the receiver only long enough to pop a job id.
pub struct Dispatcher {
    jobs: Arc<DashMap<Uuid, Job>>,
    handlers: Arc<DashMap<String, Arc<dyn JobHandler>>>,
    queues: Arc<DashMap<QueueName, QueueRuntime>>,
}

impl Dispatcher {
    pub fn new(config: &DispatcherConfig) -> Self {
        let jobs = Arc::new(DashMap::new());
        let handlers: Arc<DashMap<String, Arc<dyn JobHandler>>> = Arc::new(DashMap::new());
        let queues = Arc::new(DashMap::new());

        for (name, policy) in [
            (QueueName::Io, &config.io),
            (QueueName::Ai, &config.ai),
            (QueueName::Render, &config.render),
        ] {
            let (tx, rx) = mpsc::unbounded_channel();
            queues.insert(
                name,
                QueueRuntime {
                    timeout: policy.timeout(),
                    backoff: policy.backoff_secs.iter().map(|s| Duration::from_secs(*s)).collect(),
                    sender: tx,
                    receiver: Mutex::new(rx),
                },
            );
        }

        Self { jobs, handlers, queues }
    }

    pub fn register_handler(&self, name: impl Into<String>, handler: Arc<dyn JobHandler>) {
        self.handlers.insert(name.into(), handler);
    }

    fn max_attempts_for(&self, queue: QueueName) -> usize {
        self.queues.get(&queue).map(|q| q.backoff.len() + 1).unwrap_or(1)
    }

    /// `enqueue(queue, handler_name, args) -> job_handle` (spec.md §4.7).
    pub fn enqueue(&self, queue: QueueName, handler_name: impl Into<String>, args: Value) -> Uuid {
        let max_attempts = self.max_attempts_for(queue);
        let job = Job::new(queue, handler_name, args, max_attempts);
        let id = job.id;
        self.jobs.insert(id, job);
        if let Some(runtime) = self.queues.get(&queue) {
            let _ = runtime.sender.send(id);
        }
        id
    }

    pub fn get(&self, id: Uuid) -> Option<Job> {
        self.jobs.get(&id).map(|j| j.clone())
    }

    /// Number of jobs currently tracked, by status — used by the operator
    /// `/debug/dispatcher` surface.
    pub fn pending_count(&self, queue: QueueName) -> usize {
        self.jobs
            .iter()
            .filter(|j| j.queue == queue && matches!(j.status, JobStatus::Pending | JobStatus::Running))
            .count()
    }

    /// Spawn `worker_count` tokio tasks draining `queue`'s channel, each
    /// running at most one job at a time (spec.md §5 "parallel workers").
    pub fn spawn_workers(self: &Arc<Self>, queue: QueueName, worker_count: usize) {
        for _ in 0..worker_count {
            let dispatcher = Arc::clone(self);
            tokio::spawn(async move {
                dispatcher.worker_loop(queue).await;
            });
        }
    }

    async fn next_job_id(&self, queue: QueueName) -> Option<Uuid> {
        let runtime = self.queues.get(&queue)?;
        let mut receiver = runtime.receiver.lock().await;
        receiver.recv().await
    }

    async fn worker_loop(self: Arc<Self>, queue: QueueName) {
        while let Some(id) = self.next_job_id(queue).await {
            self.run_job(queue, id).await;
        }
    }

    async fn run_job(&self, queue: QueueName, id: Uuid) {
        let (handler_name, args, attempt) = {
            let mut job = match self.jobs.get_mut(&id) {
                Some(j) => j,
                None => return,
            };
            job.status = JobStatus::Running;
            job.attempt += 1;
            (job.handler_name.clone(), job.args.clone(), job.attempt)
        };

        let handler = self.handlers.get(&handler_name).map(|h| Arc::clone(&h));
        let timeout_dur = self.queues.get(&queue).map(|q| q.timeout).unwrap_or(Duration::from_secs(60));

        let outcome: Result<()> = match handler {
            Some(h) => match tokio::time::timeout(timeout_dur, h.handle(args)).await {
                Ok(inner) => inner,
                Err(_) => Err(PipelineError::StageFailed {
                    stage: handler_name.clone(),
                    reason: format!("timed out after {:?}", timeout_dur),
                }),
            },
            None => Err(PipelineError::Config(format!("no handler registered for {}", handler_name))),
        };

        match outcome {
            Ok(()) => {
                if let Some(mut job) = self.jobs.get_mut(&id) {
                    job.status = JobStatus::Succeeded;
                }
            }
            Err(e) => self.handle_failure(queue, id, attempt, e).await,
        }
    }

    async fn handle_failure(&self, queue: QueueName, id: Uuid, attempt: u32, error: PipelineError) {
        let retryable = error.is_retryable();
        let (exhausted, backoff) = {
            let mut job = match self.jobs.get_mut(&id) {
                Some(j) => j,
                None => return,
            };
            job.last_error = Some(error.to_string());
            let exhausted = !retryable || job.is_exhausted();
            let backoff = self
                .queues
                .get(&queue)
                .and_then(|q| q.backoff.get((attempt as usize).saturating_sub(1)).copied());
            if exhausted {
                job.status = JobStatus::DeadLettered;
            } else {
                job.status = JobStatus::Pending;
            }
            (exhausted, backoff)
        };

        if exhausted {
            return;
        }

        let jobs = Arc::clone(&self.jobs);
        let queues = Arc::clone(&self.queues);
        let delay = backoff.unwrap_or(Duration::from_secs(30));
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if jobs.contains_key(&id) {
                if let Some(runtime) = queues.get(&queue) {
                    let _ = runtime.sender.send(id);
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DispatcherConfig;

    #[test]
    fn max_attempts_match_queue_policy() {
        let config = DispatcherConfig::default();
        let dispatcher = Dispatcher::new(&config);
        assert_eq!(dispatcher.max_attempts_for(QueueName::Io), 4);
        assert_eq!(dispatcher.max_attempts_for(QueueName::Ai), 6);
        assert_eq!(dispatcher.max_attempts_for(QueueName::Render), 3);
    }

    #[test]
    fn enqueue_stores_a_pending_job() {
        let config = DispatcherConfig::default();
        let dispatcher = Dispatcher::new(&config);
        let id = dispatcher.enqueue(QueueName::Io, "probe_item", Value::Null);
        let job = dispatcher.get(id).unwrap();
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.handler_name, "probe_item");
    }

    #[tokio::test]
    async fn a_registered_handler_runs_and_succeeds() {
        struct NoopHandler;
        #[async_trait]
        impl JobHandler for NoopHandler {
            async fn handle(&self, _args: Value) -> Result<()> {
                Ok(())
            }
        }

        let config = DispatcherConfig::default();
        let dispatcher = Arc::new(Dispatcher::new(&config));
        dispatcher.register_handler("noop", Arc::new(NoopHandler));
        dispatcher.spawn_workers(QueueName::Io, 1);

        let id = dispatcher.enqueue(QueueName::Io, "noop", Value::Null);

        for _ in 0..50 {
            if matches!(dispatcher.get(id).unwrap().status, JobStatus::Succeeded) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("job did not succeed in time");
    }
}
