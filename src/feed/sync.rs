use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::stream::{self, StreamExt};

use crate::api::ArticleApi;
use crate::cache::{ArticleCache, SEARCH_CATEGORY};
use crate::db::DurableStore;
use crate::error::Result;
use crate::models::{sort_newest_first, ArticleRecord, ArticleSummary, SavedArticle, SavedArticleView};

use super::state::{
    DetailOutcome, FeedPhase, FeedState, FeedView, LoadOutcome, PageOutcome, SearchOutcome,
    SkipReason,
};

/// Max concurrent detail fetches when resolving bookmarks.
const SAVED_FETCH_CONCURRENCY: usize = 4;

/// Mediates between the article backend and the local cache: serves cached
/// feeds immediately, replaces them with fresh results, and pages backwards
/// in time with at most one older-page request per category in flight.
pub struct FeedSync<S, A> {
    cache: Arc<ArticleCache<S>>,
    api: A,
    page_size: u32,
    feeds: Mutex<HashMap<String, FeedState>>,
    generations: AtomicU64,
}

fn summaries_of(records: &[ArticleRecord]) -> Vec<ArticleSummary> {
    records.iter().map(|r| r.summary().clone()).collect()
}

impl<S: DurableStore, A: ArticleApi> FeedSync<S, A> {
    pub fn new(cache: Arc<ArticleCache<S>>, api: A, page_size: u32) -> Self {
        Self {
            cache,
            api,
            page_size,
            feeds: Mutex::new(HashMap::new()),
            generations: AtomicU64::new(0),
        }
    }

    fn feeds(&self) -> MutexGuard<'_, HashMap<String, FeedState>> {
        self.feeds.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn next_generation(&self) -> u64 {
        self.generations.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Run `f` on the feed only if it is still on `generation`.
    fn with_current<R>(
        &self,
        category: &str,
        generation: u64,
        f: impl FnOnce(&mut FeedState) -> R,
    ) -> Option<R> {
        let mut feeds = self.feeds();
        match feeds.get_mut(category) {
            Some(state) if state.generation == generation => Some(f(state)),
            _ => None,
        }
    }

    pub fn view(&self, category: &str) -> Option<FeedView> {
        self.feeds().get(category).map(FeedState::view)
    }

    /// Show the cached feed, then replace it with the backend's first page.
    /// Backend failures keep the cached list and report `Offline`; cache
    /// write failures and local request errors are returned as errors.
    pub async fn load_feed(&self, category: &str) -> Result<LoadOutcome> {
        let generation = self.next_generation();
        self.feeds()
            .entry(category.to_string())
            .or_insert_with(|| FeedState::new(generation))
            .restart(generation);

        let cached = self.cache.list_summaries(category).await;
        if !cached.is_empty() {
            self.with_current(category, generation, |state| state.articles = cached);
        }

        let records = match self.api.latest(category).await {
            Ok(records) => records,
            Err(e) if !e.is_network() => {
                self.with_current(category, generation, |state| state.phase = FeedPhase::Ready);
                return Err(e);
            }
            Err(e) => {
                tracing::warn!("Failed to fetch {} feed, showing cache: {}", category, e);
                let shown = self.with_current(category, generation, |state| {
                    state.phase = FeedPhase::Ready;
                    state.offline = true;
                    state.articles.len()
                });
                return Ok(match shown {
                    Some(shown) => LoadOutcome::Offline { shown },
                    None => LoadOutcome::Superseded,
                });
            }
        };

        let mut fresh = summaries_of(&records);
        sort_newest_first(&mut fresh);
        let count = fresh.len();

        let applied = self.with_current(category, generation, |state| {
            state.articles = fresh;
            state.phase = FeedPhase::Ready;
            state.has_more = true;
            state.offline = false;
        });
        if applied.is_none() {
            tracing::debug!("Dropping superseded {} feed result", category);
            return Ok(LoadOutcome::Superseded);
        }

        self.cache.merge_incoming(category, records).await?;
        Ok(LoadOutcome::Fresh { count })
    }

    /// Fetch articles strictly older than `last_pub_date` and append them.
    /// A second call while one is outstanding, or after the backend ran
    /// out of older articles, returns immediately without a request.
    pub async fn load_older(&self, category: &str, last_pub_date: &str) -> Result<PageOutcome> {
        let generation = {
            let mut feeds = self.feeds();
            let state = feeds
                .entry(category.to_string())
                .or_insert_with(|| FeedState::new(self.next_generation()));
            if state.loading_more {
                return Ok(PageOutcome::Skipped(SkipReason::InFlight));
            }
            if !state.has_more {
                return Ok(PageOutcome::Skipped(SkipReason::Exhausted));
            }
            state.loading_more = true;
            state.generation
        };

        let result = self
            .api
            .older(category, last_pub_date, self.page_size)
            .await;
        let result = match result {
            Err(e) if !e.is_network() => {
                self.with_current(category, generation, |state| state.loading_more = false);
                return Err(e);
            }
            result => result,
        };

        let outcome = self.with_current(category, generation, |state| {
            state.loading_more = false;
            match &result {
                Ok(records) if records.is_empty() => {
                    state.has_more = false;
                    PageOutcome::Exhausted
                }
                Ok(records) => {
                    let mut page = summaries_of(records);
                    sort_newest_first(&mut page);
                    state.append(page);
                    state.offline = false;
                    PageOutcome::Appended {
                        count: records.len(),
                    }
                }
                Err(_) => {
                    state.offline = true;
                    PageOutcome::Offline
                }
            }
        });

        let Some(outcome) = outcome else {
            tracing::debug!("Dropping superseded older page for {}", category);
            return Ok(PageOutcome::Superseded);
        };

        match result {
            Ok(records) if !records.is_empty() => {
                self.cache.merge_incoming(category, records).await?;
            }
            Ok(_) => tracing::debug!("No older articles for {}", category),
            Err(e) => tracing::warn!("Failed to fetch older {} articles: {}", category, e),
        }

        Ok(outcome)
    }

    /// [`FeedSync::load_older`] anchored at the oldest displayed article.
    pub async fn load_more(&self, category: &str) -> Result<PageOutcome> {
        let anchor = self
            .feeds()
            .get(category)
            .and_then(|state| state.articles.last())
            .map(|last| last.pub_date.clone());

        match anchor {
            Some(anchor) => self.load_older(category, &anchor).await,
            None => Ok(PageOutcome::Skipped(SkipReason::NoAnchor)),
        }
    }

    /// Clear the displayed list and load the feed again.
    pub async fn refresh(&self, category: &str) -> Result<LoadOutcome> {
        {
            let mut feeds = self.feeds();
            if let Some(state) = feeds.get_mut(category) {
                state.articles.clear();
            }
        }
        self.load_feed(category).await
    }

    /// Forget the session; responses still in flight are discarded.
    pub fn close_feed(&self, category: &str) {
        self.feeds().remove(category);
    }

    /// Cached record first, then the backend. A fresh full record is
    /// written back; when offline a cached full record is still served.
    pub async fn load_detail(&self, category: &str, id: &str) -> Result<DetailOutcome> {
        let cached = self.cache.get_detail(category, id).await;

        let mut record = match self.api.detail(id).await {
            Ok(record) => record,
            Err(e) if !e.is_network() => return Err(e),
            Err(e) => {
                tracing::warn!("Failed to fetch article {}: {}", id, e);
                return Ok(match cached {
                    Some(record) if record.is_full() => DetailOutcome::Cached(record),
                    _ => DetailOutcome::Unavailable,
                });
            }
        };

        // The listing's source icon wins over whatever the detail carries.
        if let Some(icon) = cached.and_then(|c| c.into_summary().source_icon) {
            record.summary_mut().source_icon = Some(icon);
        }

        if record.is_full() {
            self.cache.set_detail(category, id, record.clone()).await?;
        } else {
            self.cache
                .merge_incoming(category, vec![record.clone()])
                .await?;
        }
        Ok(DetailOutcome::Fresh(record))
    }

    pub async fn search(&self, query: &str) -> Result<SearchOutcome> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(SearchOutcome::Results(Vec::new()));
        }

        match self.api.search(query).await {
            Ok(records) => {
                let results = summaries_of(&records);
                self.cache.merge_incoming(SEARCH_CATEGORY, records).await?;
                Ok(SearchOutcome::Results(results))
            }
            Err(e) if !e.is_network() => Err(e),
            Err(e) => {
                tracing::warn!("Search for {:?} failed: {}", query, e);
                Ok(SearchOutcome::Offline)
            }
        }
    }

    /// Resolve bookmarks to articles, keeping the given order. Entries found
    /// neither in the cache nor on the backend are skipped.
    pub async fn resolve_saved(
        &self,
        entries: Vec<(String, SavedArticle)>,
    ) -> Vec<SavedArticleView> {
        stream::iter(entries)
            .map(|(id, saved)| async move {
                let article = match self.cache.get_detail(&saved.category, &id).await {
                    Some(article) => article,
                    None => match self.api.detail(&id).await {
                        Ok(article) => article,
                        Err(e) => {
                            tracing::warn!("Skipping saved article {}: {}", id, e);
                            return None;
                        }
                    },
                };
                Some(SavedArticleView { id, saved, article })
            })
            .buffered(SAVED_FETCH_CONCURRENCY)
            .filter_map(|view| async move { view })
            .collect()
            .await
    }
}
