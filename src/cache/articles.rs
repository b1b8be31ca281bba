use std::collections::BTreeMap;
use std::sync::Arc;

use crate::db::DurableStore;
use crate::error::Result;
use crate::models::{sort_newest_first, ArticleRecord, ArticleSummary};

use super::locks::KeyedLocks;

/// Pseudo-category holding search results, so detail lookups work for them.
pub const SEARCH_CATEGORY: &str = "search";

const ARTICLE_KEY_PREFIX: &str = "article_";

/// All cached articles of one category, keyed by article id. Stored as a
/// single JSON object per category and rewritten wholesale on each change.
type Collection = BTreeMap<String, ArticleRecord>;

pub fn article_key(category: &str) -> String {
    format!("{}{}", ARTICLE_KEY_PREFIX, category)
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MergeReport {
    pub inserted: usize,
    pub replaced: usize,
    /// Incoming records dropped because a full record was already cached.
    pub kept_full: usize,
}

pub struct ArticleCache<S> {
    store: Arc<S>,
    locks: KeyedLocks,
}

impl<S: DurableStore> ArticleCache<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            locks: KeyedLocks::new(),
        }
    }

    /// Storage failures propagate; an unreadable blob counts as empty.
    async fn read_collection(&self, key: &str) -> Result<Collection> {
        let Some(raw) = self.store.get(key).await? else {
            return Ok(Collection::new());
        };
        if raw.trim().is_empty() {
            return Ok(Collection::new());
        }
        match serde_json::from_str(&raw) {
            Ok(collection) => Ok(collection),
            Err(e) => {
                tracing::warn!("Discarding unreadable cache entry {}: {}", key, e);
                Ok(Collection::new())
            }
        }
    }

    async fn read_collection_or_empty(&self, key: &str) -> Collection {
        match self.read_collection(key).await {
            Ok(collection) => collection,
            Err(e) => {
                tracing::warn!("Failed to read {}: {}", key, e);
                Collection::new()
            }
        }
    }

    async fn write_collection(&self, key: &str, collection: &Collection) -> Result<()> {
        let raw = serde_json::to_string(collection)?;
        self.store.set(key, raw).await
    }

    /// Cached articles of a category, newest first, reduced to list fields.
    /// Never fails: an unreadable cache is reported as empty.
    pub async fn list_summaries(&self, category: &str) -> Vec<ArticleSummary> {
        let collection = self.read_collection_or_empty(&article_key(category)).await;
        let mut summaries: Vec<ArticleSummary> = collection
            .into_values()
            .map(ArticleRecord::into_summary)
            .collect();
        sort_newest_first(&mut summaries);
        summaries
    }

    /// Upsert a batch of records. A cached full record is never replaced
    /// here; full payloads are written with [`ArticleCache::set_detail`].
    pub async fn merge_incoming(
        &self,
        category: &str,
        incoming: Vec<ArticleRecord>,
    ) -> Result<MergeReport> {
        let key = article_key(category);
        let _guard = self.locks.lock(&key).await;

        let mut collection = self.read_collection(&key).await?;
        let mut report = MergeReport::default();

        for record in incoming {
            match collection.get(record.id()).map(ArticleRecord::is_full) {
                Some(true) => {
                    report.kept_full += 1;
                    continue;
                }
                Some(false) => report.replaced += 1,
                None => report.inserted += 1,
            }
            collection.insert(record.id().to_string(), record);
        }

        self.write_collection(&key, &collection).await?;
        tracing::debug!(
            "Merged into {}: {} new, {} replaced, {} kept full",
            key,
            report.inserted,
            report.replaced,
            report.kept_full
        );
        Ok(report)
    }

    /// The cached record for `id`, partial or full. Read failures yield `None`.
    pub async fn get_detail(&self, category: &str, id: &str) -> Option<ArticleRecord> {
        self.read_collection_or_empty(&article_key(category))
            .await
            .remove(id)
    }

    /// Unconditionally store `record` under `id`. Only call with full
    /// payloads: a partial record written here replaces a full one.
    pub async fn set_detail(&self, category: &str, id: &str, record: ArticleRecord) -> Result<()> {
        let key = article_key(category);
        let _guard = self.locks.lock(&key).await;

        let mut collection = self.read_collection(&key).await?;
        collection.insert(id.to_string(), record);
        self.write_collection(&key, &collection).await
    }

    /// Blank the stored collection of every given category.
    pub async fn clear_all<'a, I>(&self, categories: I) -> Result<usize>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut cleared = 0;
        for category in categories {
            let key = article_key(category);
            let _guard = self.locks.lock(&key).await;
            self.store.remove(&key).await?;
            cleared += 1;
        }
        tracing::debug!("Cleared {} article collections", cleared);
        Ok(cleared)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{full, partial, MemoryStore};

    fn cache() -> (Arc<MemoryStore>, ArticleCache<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (Arc::clone(&store), ArticleCache::new(store))
    }

    #[tokio::test]
    async fn merge_never_downgrades_full_records() {
        let (_, cache) = cache();
        let detail = full("a1", "2025-02-23T03:46:00Z", "Body text");
        cache.set_detail("world", "a1", detail.clone()).await.unwrap();

        let mut newer_listing = partial("a1", "2025-02-23T03:46:00Z");
        newer_listing.summary_mut().title = "Retitled".to_string();
        let report = cache
            .merge_incoming("world", vec![newer_listing])
            .await
            .unwrap();

        assert_eq!(report.kept_full, 1);
        assert_eq!(cache.get_detail("world", "a1").await, Some(detail));
    }

    #[tokio::test]
    async fn merge_upserts_into_empty_collection() {
        let (_, cache) = cache();
        let incoming = vec![
            partial("a1", "2025-02-21T00:00:00Z"),
            partial("a2", "2025-02-22T00:00:00Z"),
            full("a3", "2025-02-23T00:00:00Z", "body"),
        ];

        let report = cache
            .merge_incoming("world", incoming.clone())
            .await
            .unwrap();
        assert_eq!(report.inserted, 3);
        assert_eq!(cache.list_summaries("world").await.len(), 3);

        for record in incoming {
            assert_eq!(cache.get_detail("world", record.id()).await, Some(record));
        }
    }

    #[tokio::test]
    async fn list_payload_fields_survive_the_cache() {
        let (_, cache) = cache();
        let incoming: ArticleRecord = serde_json::from_value(serde_json::json!({
            "_id": "a1",
            "title": "T",
            "pubDate": "2025-02-23T03:46:00Z",
            "link": "https://news.example.com/a1",
            "description": "lede",
            "category": ["world"]
        }))
        .unwrap();
        cache.merge_incoming("world", vec![incoming.clone()]).await.unwrap();

        let stored = cache.get_detail("world", "a1").await.unwrap();
        assert_eq!(stored, incoming);
        let value = serde_json::to_value(&stored).unwrap();
        assert_eq!(value["link"], "https://news.example.com/a1");
        assert_eq!(value["description"], "lede");
    }

    #[tokio::test]
    async fn partial_records_are_replaced() {
        let (_, cache) = cache();
        cache
            .merge_incoming("world", vec![partial("a1", "2025-02-21T00:00:00Z")])
            .await
            .unwrap();

        let mut update = partial("a1", "2025-02-21T00:00:00Z");
        update.summary_mut().title = "Updated".to_string();
        let report = cache.merge_incoming("world", vec![update]).await.unwrap();

        assert_eq!(report.replaced, 1);
        let summaries = cache.list_summaries("world").await;
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].title, "Updated");
    }

    #[tokio::test]
    async fn summaries_are_newest_first() {
        let (_, cache) = cache();
        cache
            .merge_incoming(
                "world",
                vec![
                    partial("two-days", "2025-02-21T12:00:00Z"),
                    partial("now", "2025-02-23T12:00:00Z"),
                    partial("yesterday", "2025-02-22T12:00:00Z"),
                ],
            )
            .await
            .unwrap();

        let ids: Vec<_> = cache
            .list_summaries("world")
            .await
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(ids, ["now", "yesterday", "two-days"]);
    }

    #[tokio::test]
    async fn unreadable_cache_reads_as_empty() {
        let (store, cache) = cache();
        store.put_raw("article_world", "{not json");
        assert!(cache.list_summaries("world").await.is_empty());
        assert_eq!(cache.get_detail("world", "a1").await, None);

        store.fail_reads(true);
        assert!(cache.list_summaries("sports").await.is_empty());
    }

    #[tokio::test]
    async fn corrupt_blob_is_overwritten_by_merge() {
        let (store, cache) = cache();
        store.put_raw("article_world", "{not json");

        cache
            .merge_incoming("world", vec![partial("a1", "2025-02-21T00:00:00Z")])
            .await
            .unwrap();
        assert_eq!(cache.list_summaries("world").await.len(), 1);
    }

    #[tokio::test]
    async fn write_failures_propagate() {
        let (store, cache) = cache();
        store.fail_writes(true);

        let merged = cache
            .merge_incoming("world", vec![partial("a1", "2025-02-21T00:00:00Z")])
            .await;
        assert!(merged.is_err());

        let detail = cache
            .set_detail("world", "a1", full("a1", "2025-02-21T00:00:00Z", "x"))
            .await;
        assert!(detail.is_err());
    }

    #[tokio::test]
    async fn set_detail_overwrites_and_creates() {
        let (store, cache) = cache();
        cache
            .set_detail("search", "a9", full("a9", "2025-02-21T00:00:00Z", "x"))
            .await
            .unwrap();
        assert!(store.raw("article_search").is_some());

        // explicit writes may downgrade; that is the caller's contract
        cache
            .set_detail("search", "a9", partial("a9", "2025-02-21T00:00:00Z"))
            .await
            .unwrap();
        let stored = cache.get_detail("search", "a9").await.unwrap();
        assert!(!stored.is_full());
    }

    #[tokio::test]
    async fn concurrent_merges_keep_both_batches() {
        let (_, cache) = cache();
        tokio::join!(
            async {
                cache
                    .merge_incoming("world", vec![partial("a1", "2025-02-21T00:00:00Z")])
                    .await
                    .unwrap()
            },
            async {
                cache
                    .merge_incoming("world", vec![partial("a2", "2025-02-22T00:00:00Z")])
                    .await
                    .unwrap()
            },
        );
        assert_eq!(cache.list_summaries("world").await.len(), 2);
    }

    #[tokio::test]
    async fn clear_all_blanks_every_category() {
        let (_, cache) = cache();
        for category in ["latest", "world", SEARCH_CATEGORY] {
            cache
                .merge_incoming(category, vec![partial("a1", "2025-02-21T00:00:00Z")])
                .await
                .unwrap();
        }

        let cleared = cache
            .clear_all(["latest", "world", SEARCH_CATEGORY])
            .await
            .unwrap();
        assert_eq!(cleared, 3);
        for category in ["latest", "world", SEARCH_CATEGORY] {
            assert!(cache.list_summaries(category).await.is_empty());
        }
    }
}
