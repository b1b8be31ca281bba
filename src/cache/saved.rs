use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::db::DurableStore;
use crate::error::Result;
use crate::models::SavedArticle;

const SAVED_ARTICLES_KEY: &str = "savedArticles";

type SavedMap = BTreeMap<String, SavedArticle>;

/// Bookmarked article ids with the category they were saved from.
pub struct SavedArticles<S> {
    store: Arc<S>,
    write_lock: Mutex<()>,
}

impl<S: DurableStore> SavedArticles<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    async fn read_map(&self) -> Result<SavedMap> {
        let Some(raw) = self.store.get(SAVED_ARTICLES_KEY).await? else {
            return Ok(SavedMap::new());
        };
        match serde_json::from_str(&raw) {
            Ok(map) => Ok(map),
            Err(e) => {
                tracing::warn!("Discarding unreadable saved articles: {}", e);
                Ok(SavedMap::new())
            }
        }
    }

    async fn write_map(&self, map: &SavedMap) -> Result<()> {
        let raw = serde_json::to_string(map)?;
        self.store.set(SAVED_ARTICLES_KEY, raw).await
    }

    pub async fn save(&self, id: &str, category: &str) -> Result<SavedArticle> {
        self.save_at(id, category, Utc::now()).await
    }

    pub async fn save_at(
        &self,
        id: &str,
        category: &str,
        saved_at: DateTime<Utc>,
    ) -> Result<SavedArticle> {
        let _guard = self.write_lock.lock().await;
        let mut map = self.read_map().await?;

        let entry = SavedArticle {
            category: category.to_string(),
            saved_at,
        };
        map.insert(id.to_string(), entry.clone());
        self.write_map(&map).await?;
        Ok(entry)
    }

    /// Returns whether the id was saved.
    pub async fn unsave(&self, id: &str) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let mut map = self.read_map().await?;

        let removed = map.remove(id).is_some();
        self.write_map(&map).await?;
        Ok(removed)
    }

    pub async fn is_saved(&self, id: &str) -> bool {
        self.load_all().await.contains_key(id)
    }

    pub async fn load_all(&self) -> BTreeMap<String, SavedArticle> {
        match self.read_map().await {
            Ok(map) => map,
            Err(e) => {
                tracing::warn!("Failed to read saved articles: {}", e);
                SavedMap::new()
            }
        }
    }

    /// Most recently saved first.
    pub async fn newest_first(&self) -> Vec<(String, SavedArticle)> {
        let mut entries: Vec<_> = self.load_all().await.into_iter().collect();
        entries.sort_by(|(_, a), (_, b)| b.saved_at.cmp(&a.saved_at));
        entries
    }

    pub async fn clear(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.store.remove(SAVED_ARTICLES_KEY).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryStore;
    use chrono::TimeZone;

    fn saved() -> (Arc<MemoryStore>, SavedArticles<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (Arc::clone(&store), SavedArticles::new(store))
    }

    #[tokio::test]
    async fn save_then_unsave() {
        let (_, saved) = saved();

        let entry = tokio_test::assert_ok!(saved.save("a1", "world").await);
        assert_eq!(entry.category, "world");
        assert!(saved.is_saved("a1").await);

        assert!(saved.unsave("a1").await.unwrap());
        assert!(!saved.is_saved("a1").await);
        assert!(!saved.unsave("a1").await.unwrap());
    }

    #[tokio::test]
    async fn persisted_layout() {
        let (store, saved) = saved();
        let at = Utc.with_ymd_and_hms(2025, 2, 23, 3, 46, 0).unwrap();
        saved.save_at("a1", "world", at).await.unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&store.raw(SAVED_ARTICLES_KEY).unwrap()).unwrap();
        assert_eq!(raw["a1"]["category"], "world");
        assert_eq!(
            raw["a1"]["time"].as_str().and_then(|t| t.parse::<DateTime<Utc>>().ok()),
            Some(at)
        );
    }

    #[tokio::test]
    async fn reads_timestamps_with_millis() {
        let (store, saved) = saved();
        store.put_raw(
            SAVED_ARTICLES_KEY,
            r#"{"a1":{"category":"world","time":"2025-02-23T03:46:00.000Z"}}"#,
        );
        assert!(saved.is_saved("a1").await);
    }

    #[tokio::test]
    async fn newest_first_orders_by_saved_time() {
        let (_, saved) = saved();
        let day = |d| Utc.with_ymd_and_hms(2025, 2, d, 0, 0, 0).unwrap();
        saved.save_at("old", "world", day(1)).await.unwrap();
        saved.save_at("new", "sports", day(3)).await.unwrap();
        saved.save_at("mid", "world", day(2)).await.unwrap();

        let ids: Vec<_> = saved.newest_first().await.into_iter().map(|(id, _)| id).collect();
        assert_eq!(ids, ["new", "mid", "old"]);
    }

    #[tokio::test]
    async fn failed_write_is_reported() {
        let (store, saved) = saved();
        store.fail_writes(true);
        assert!(saved.save("a1", "world").await.is_err());

        store.fail_writes(false);
        assert!(!saved.is_saved("a1").await);
    }

    #[tokio::test]
    async fn unreadable_map_reads_as_empty() {
        let (store, saved) = saved();
        store.put_raw(SAVED_ARTICLES_KEY, "[");
        assert!(saved.load_all().await.is_empty());

        store.fail_reads(true);
        assert!(!saved.is_saved("a1").await);
    }

    #[tokio::test]
    async fn concurrent_saves_are_not_lost() {
        let (_, saved) = saved();
        let (a, b) = tokio::join!(saved.save("a1", "world"), saved.save("a2", "sports"));
        a.unwrap();
        b.unwrap();
        assert_eq!(saved.load_all().await.len(), 2);
    }

    #[tokio::test]
    async fn clear_removes_everything() {
        let (store, saved) = saved();
        saved.save("a1", "world").await.unwrap();
        saved.clear().await.unwrap();
        assert!(store.raw(SAVED_ARTICLES_KEY).is_none());
        assert!(saved.load_all().await.is_empty());
    }
}
