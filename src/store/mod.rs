//! Persistence traits over the entity model.
//!
//! Each trait is a narrow, storage-agnostic contract matching the logical
//! schema of spec.md §6. `memory::MemoryStore` is the default DashMap-backed
//! implementation (the same concurrency primitive the teacher uses for
//! `AppState::streams`); a real database-backed implementation would
//! implement the same traits without touching the orchestrator.

pub mod memory;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::model::{Clip, Item, PostJob, Subscription};

#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    async fn put(&self, sub: Subscription) -> Result<()>;
    async fn get(&self, id: Uuid) -> Result<Subscription>;
    async fn get_by_external_feed_id(&self, external_feed_id: &str) -> Result<Option<Subscription>>;
    async fn list_all(&self) -> Result<Vec<Subscription>>;
    async fn list_active(&self) -> Result<Vec<Subscription>>;
    async fn delete(&self, id: Uuid) -> Result<()>;
}

#[async_trait]
pub trait ItemStore: Send + Sync {
    async fn put(&self, item: Item) -> Result<()>;
    async fn get(&self, id: Uuid) -> Result<Item>;
    async fn get_by_external_id(&self, external_item_id: &str) -> Result<Option<Item>>;
    async fn list_by_subscription(&self, subscription_id: Uuid) -> Result<Vec<Item>>;
    async fn list_manual(&self) -> Result<Vec<Item>>;
    async fn delete(&self, id: Uuid) -> Result<()>;
    async fn delete_by_subscription(&self, subscription_id: Uuid) -> Result<()>;
}

#[async_trait]
pub trait ClipStore: Send + Sync {
    async fn put(&self, clip: Clip) -> Result<()>;
    async fn get(&self, id: Uuid) -> Result<Clip>;
    async fn list_by_item(&self, item_id: Uuid) -> Result<Vec<Clip>>;
    async fn delete(&self, id: Uuid) -> Result<()>;
    async fn delete_by_item(&self, item_id: Uuid) -> Result<()>;
}

#[async_trait]
pub trait PostJobStore: Send + Sync {
    async fn put(&self, job: PostJob) -> Result<()>;
    async fn get(&self, id: Uuid) -> Result<PostJob>;
    async fn list_by_clip(&self, clip_id: Uuid) -> Result<Vec<PostJob>>;
}
