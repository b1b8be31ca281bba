//! In-process stand-ins for the durable store and the article backend.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::api::ArticleApi;
use crate::db::DurableStore;
use crate::error::{AppError, Result};
use crate::models::{ArticleRecord, ArticleSummary, ContentBlock, FullArticle};

pub fn summary(id: &str, pub_date: &str) -> ArticleSummary {
    ArticleSummary {
        id: id.to_string(),
        title: format!("Title {}", id),
        pub_date: pub_date.to_string(),
        pub_date_tz: Some("UTC".to_string()),
        image_url: Some(format!("https://img.example.com/{}.jpg", id)),
        source_icon: Some("1".to_string()),
    }
}

pub fn partial(id: &str, pub_date: &str) -> ArticleRecord {
    ArticleRecord::Partial(summary(id, pub_date).into())
}

pub fn full(id: &str, pub_date: &str, body: &str) -> ArticleRecord {
    ArticleRecord::Full(FullArticle {
        summary: summary(id, pub_date),
        content: vec![ContentBlock::text(body)],
        extra: Default::default(),
    })
}

fn offline() -> AppError {
    AppError::Api {
        status: 503,
        message: "backend unavailable".to_string(),
    }
}

/// Map-backed store that yields on every access, so concurrent callers
/// interleave the way they would against real storage.
#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.values.lock().unwrap().get(key).cloned()
    }

    pub fn put_raw(&self, key: &str, value: &str) {
        self.values
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
    }

    fn check(&self, flag: &AtomicBool) -> Result<()> {
        if flag.load(Ordering::SeqCst) {
            return Err(std::io::Error::other("storage unavailable").into());
        }
        Ok(())
    }
}

impl DurableStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        tokio::task::yield_now().await;
        self.check(&self.fail_reads)?;
        Ok(self.raw(key))
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        tokio::task::yield_now().await;
        self.check(&self.fail_writes)?;
        self.values.lock().unwrap().insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        tokio::task::yield_now().await;
        self.check(&self.fail_writes)?;
        self.values.lock().unwrap().remove(key);
        Ok(())
    }
}

/// Scripted backend. Older pages are served in the order they were pushed;
/// once the queue is empty the backend reports no more articles.
#[derive(Default)]
pub struct FakeApi {
    latest: Mutex<HashMap<String, Vec<ArticleRecord>>>,
    older_pages: Mutex<VecDeque<Vec<ArticleRecord>>>,
    details: Mutex<HashMap<String, ArticleRecord>>,
    search_results: Mutex<Vec<ArticleRecord>>,
    older_anchors: Mutex<Vec<String>>,
    offline: AtomicBool,
    misconfigured: AtomicBool,
    latest_calls: AtomicUsize,
    older_calls: AtomicUsize,
    detail_calls: AtomicUsize,
    search_calls: AtomicUsize,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_latest(&self, category: &str, records: Vec<ArticleRecord>) {
        self.latest
            .lock()
            .unwrap()
            .insert(category.to_string(), records);
    }

    pub fn push_older_page(&self, records: Vec<ArticleRecord>) {
        self.older_pages.lock().unwrap().push_back(records);
    }

    pub fn set_detail(&self, record: ArticleRecord) {
        self.details
            .lock()
            .unwrap()
            .insert(record.id().to_string(), record);
    }

    pub fn set_search_results(&self, records: Vec<ArticleRecord>) {
        *self.search_results.lock().unwrap() = records;
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Fail every request with a local (non-network) error.
    pub fn set_misconfigured(&self, misconfigured: bool) {
        self.misconfigured.store(misconfigured, Ordering::SeqCst);
    }

    pub fn older_anchors(&self) -> Vec<String> {
        self.older_anchors.lock().unwrap().clone()
    }

    pub fn latest_calls(&self) -> usize {
        self.latest_calls.load(Ordering::SeqCst)
    }

    pub fn older_calls(&self) -> usize {
        self.older_calls.load(Ordering::SeqCst)
    }

    pub fn detail_calls(&self) -> usize {
        self.detail_calls.load(Ordering::SeqCst)
    }

    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    fn check_online(&self) -> Result<()> {
        if self.misconfigured.load(Ordering::SeqCst) {
            return Err(AppError::Config("invalid backend URL".to_string()));
        }
        if self.offline.load(Ordering::SeqCst) {
            return Err(offline());
        }
        Ok(())
    }
}

impl ArticleApi for FakeApi {
    async fn latest(&self, category: &str) -> Result<Vec<ArticleRecord>> {
        self.latest_calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        self.check_online()?;
        Ok(self
            .latest
            .lock()
            .unwrap()
            .get(category)
            .cloned()
            .unwrap_or_default())
    }

    async fn older(
        &self,
        _category: &str,
        last_pub_date: &str,
        _limit: u32,
    ) -> Result<Vec<ArticleRecord>> {
        self.older_calls.fetch_add(1, Ordering::SeqCst);
        self.older_anchors
            .lock()
            .unwrap()
            .push(last_pub_date.to_string());
        tokio::task::yield_now().await;
        self.check_online()?;
        Ok(self
            .older_pages
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_default())
    }

    async fn search(&self, _query: &str) -> Result<Vec<ArticleRecord>> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        self.check_online()?;
        Ok(self.search_results.lock().unwrap().clone())
    }

    async fn detail(&self, id: &str) -> Result<ArticleRecord> {
        self.detail_calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        self.check_online()?;
        self.details
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| AppError::Api {
                status: 404,
                message: format!("article {} not found", id),
            })
    }
}
