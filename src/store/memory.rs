//! In-memory store implementation.
//!
//! A `DashMap`-backed default, matching the teacher's `AppState::streams:
//! DashMap<String, Arc<StreamIndex>>` pattern. Durability beyond process
//! lifetime is a deployment concern (spec.md out-of-scope: "database schema
//! migrations"); a production deployment swaps this module for one backed
//! by a real database behind the same traits.

use async_trait::async_trait;
use dashmap::DashMap;
use uuid::Uuid;

use super::{ClipStore, ItemStore, PostJobStore, SubscriptionStore};
use crate::error::{PipelineError, Result};
use crate::model::{Clip, Item, PostJob, Subscription};

#[derive(Default)]
pub struct MemorySubscriptionStore {
    by_id: DashMap<Uuid, Subscription>,
}

#[async_trait]
impl SubscriptionStore for MemorySubscriptionStore {
    async fn put(&self, sub: Subscription) -> Result<()> {
        self.by_id.insert(sub.id, sub);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Subscription> {
        self.by_id
            .get(&id)
            .map(|r| r.clone())
            .ok_or_else(|| PipelineError::SubscriptionNotFound(id.to_string()))
    }

    async fn get_by_external_feed_id(&self, external_feed_id: &str) -> Result<Option<Subscription>> {
        Ok(self
            .by_id
            .iter()
            .find(|r| r.external_feed_id == external_feed_id)
            .map(|r| r.clone()))
    }

    async fn list_all(&self) -> Result<Vec<Subscription>> {
        Ok(self.by_id.iter().map(|r| r.clone()).collect())
    }

    async fn list_active(&self) -> Result<Vec<Subscription>> {
        Ok(self
            .by_id
            .iter()
            .filter(|r| r.active)
            .map(|r| r.clone())
            .collect())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        self.by_id.remove(&id);
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryItemStore {
    by_id: DashMap<Uuid, Item>,
}

#[async_trait]
impl ItemStore for MemoryItemStore {
    async fn put(&self, item: Item) -> Result<()> {
        self.by_id.insert(item.id, item);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Item> {
        self.by_id
            .get(&id)
            .map(|r| r.clone())
            .ok_or_else(|| PipelineError::ItemNotFound(id.to_string()))
    }

    async fn get_by_external_id(&self, external_item_id: &str) -> Result<Option<Item>> {
        Ok(self
            .by_id
            .iter()
            .find(|r| r.external_item_id == external_item_id)
            .map(|r| r.clone()))
    }

    async fn list_by_subscription(&self, subscription_id: Uuid) -> Result<Vec<Item>> {
        Ok(self
            .by_id
            .iter()
            .filter(|r| r.subscription_id == Some(subscription_id))
            .map(|r| r.clone())
            .collect())
    }

    async fn list_manual(&self) -> Result<Vec<Item>> {
        Ok(self
            .by_id
            .iter()
            .filter(|r| r.subscription_id.is_none())
            .map(|r| r.clone())
            .collect())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        self.by_id.remove(&id);
        Ok(())
    }

    async fn delete_by_subscription(&self, subscription_id: Uuid) -> Result<()> {
        self.by_id.retain(|_, item| item.subscription_id != Some(subscription_id));
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryClipStore {
    by_id: DashMap<Uuid, Clip>,
}

#[async_trait]
impl ClipStore for MemoryClipStore {
    async fn put(&self, clip: Clip) -> Result<()> {
        self.by_id.insert(clip.id, clip);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Clip> {
        self.by_id
            .get(&id)
            .map(|r| r.clone())
            .ok_or_else(|| PipelineError::ClipNotFound(id.to_string()))
    }

    async fn list_by_item(&self, item_id: Uuid) -> Result<Vec<Clip>> {
        Ok(self
            .by_id
            .iter()
            .filter(|r| r.item_id == item_id)
            .map(|r| r.clone())
            .collect())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        self.by_id.remove(&id);
        Ok(())
    }

    async fn delete_by_item(&self, item_id: Uuid) -> Result<()> {
        self.by_id.retain(|_, clip| clip.item_id != item_id);
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryPostJobStore {
    by_id: DashMap<Uuid, PostJob>,
}

#[async_trait]
impl PostJobStore for MemoryPostJobStore {
    async fn put(&self, job: PostJob) -> Result<()> {
        self.by_id.insert(job.id, job);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<PostJob> {
        self.by_id
            .get(&id)
            .map(|r| r.clone())
            .ok_or_else(|| PipelineError::ItemNotFound(id.to_string()))
    }

    async fn list_by_clip(&self, clip_id: Uuid) -> Result<Vec<PostJob>> {
        Ok(self
            .by_id
            .iter()
            .filter(|r| r.clip_id == clip_id)
            .map(|r| r.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ItemSource, Subscription};
    use chrono::Utc;

    #[tokio::test]
    async fn subscription_roundtrip() {
        let store = MemorySubscriptionStore::default();
        let sub = Subscription::new("UC1", "Channel One", "https://feed.example/1");
        let id = sub.id;
        store.put(sub).await.unwrap();

        let fetched = store.get(id).await.unwrap();
        assert_eq!(fetched.external_feed_id, "UC1");
        assert!(store.get_by_external_feed_id("UC1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn item_cascade_delete_by_subscription() {
        let store = MemoryItemStore::default();
        let sub_id = Uuid::new_v4();
        let item = Item::new(Some(sub_id), "yt1", "Title", Utc::now(), ItemSource::Feed);
        store.put(item).await.unwrap();

        assert_eq!(store.list_by_subscription(sub_id).await.unwrap().len(), 1);
        store.delete_by_subscription(sub_id).await.unwrap();
        assert_eq!(store.list_by_subscription(sub_id).await.unwrap().len(), 0);
    }

    #[tokio::test]
    async fn manual_items_are_those_without_a_subscription() {
        let store = MemoryItemStore::default();
        store.put(Item::new(Some(Uuid::new_v4()), "yt1", "Fed", Utc::now(), ItemSource::Feed)).await.unwrap();
        store.put(Item::new(None, "yt2", "Manual", Utc::now(), ItemSource::Manual)).await.unwrap();

        let manual = store.list_manual().await.unwrap();
        assert_eq!(manual.len(), 1);
        assert_eq!(manual[0].external_item_id, "yt2");
    }

    #[tokio::test]
    async fn missing_clip_errors() {
        let store = MemoryClipStore::default();
        let err = store.get(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, PipelineError::ClipNotFound(_)));
    }
}
