use std::sync::Arc;

use tokio::sync::Mutex;

use crate::db::DurableStore;
use crate::error::{AppError, Result};
use crate::models::{default_categories, CategoryEntry, RESERVED_CATEGORY_COUNT};

const CATEGORY_LIST_KEY: &str = "categoryList";

/// Ordered category tabs with a per-entry subscription flag. The persisted
/// list is the single source of truth; callers re-read it after mutating.
pub struct CategoryRegistry<S> {
    store: Arc<S>,
    write_lock: Mutex<()>,
}

impl<S: DurableStore> CategoryRegistry<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    /// The persisted registry, seeding it with the built-in catalog when
    /// nothing (or nothing readable) is stored.
    pub async fn load(&self) -> Result<Vec<CategoryEntry>> {
        let _guard = self.write_lock.lock().await;
        self.load_locked().await
    }

    async fn load_locked(&self) -> Result<Vec<CategoryEntry>> {
        match self.read_list().await {
            Ok(Some(list)) => Ok(list),
            Ok(None) => self.seed().await,
            Err(e) => {
                // Don't reseed over a list we merely failed to read.
                tracing::warn!("Failed to read category list, using defaults: {}", e);
                Ok(default_categories())
            }
        }
    }

    /// `None` when nothing usable is stored. Store failures are returned.
    async fn read_list(&self) -> Result<Option<Vec<CategoryEntry>>> {
        let Some(raw) = self.store.get(CATEGORY_LIST_KEY).await? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(list) => Ok(Some(list)),
            Err(e) => {
                tracing::warn!("Discarding unreadable category list: {}", e);
                Ok(None)
            }
        }
    }

    async fn seed(&self) -> Result<Vec<CategoryEntry>> {
        let defaults = default_categories();
        self.write(&defaults).await?;
        Ok(defaults)
    }

    async fn write(&self, list: &[CategoryEntry]) -> Result<()> {
        let raw = serde_json::to_string(list)?;
        self.store.set(CATEGORY_LIST_KEY, raw).await
    }

    /// Flip the subscription of `code` and persist the whole list.
    /// Returns the new subscription state.
    pub async fn toggle(&self, code: &str) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let mut list = match self.read_list().await? {
            Some(list) => list,
            None => self.seed().await?,
        };

        let index = list
            .iter()
            .position(|entry| entry.code == code)
            .ok_or_else(|| AppError::UnknownCategory(code.to_string()))?;
        if index < RESERVED_CATEGORY_COUNT {
            return Err(AppError::ReservedCategory(code.to_string()));
        }

        let entry = &mut list[index];
        entry.subscribed = !entry.subscribed;
        let subscribed = entry.subscribed;

        self.write(&list).await?;
        tracing::debug!("Category {} subscribed = {}", code, subscribed);
        Ok(subscribed)
    }

    /// Drop the persisted list; the next load reseeds the defaults.
    pub async fn clear(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.store.remove(CATEGORY_LIST_KEY).await
    }

    pub async fn subscribed(&self) -> Result<Vec<CategoryEntry>> {
        Ok(self
            .load()
            .await?
            .into_iter()
            .filter(|entry| entry.subscribed)
            .collect())
    }

    /// The tab shown when no category has been chosen yet.
    pub async fn first_subscribed(&self) -> Result<Option<CategoryEntry>> {
        Ok(self.subscribed().await?.into_iter().next())
    }
}
