use std::sync::Arc;

use url::Url;

use crate::db::DurableStore;
use crate::error::{AppError, Result};

const BACKEND_URL_KEY: &str = "backendUrl";

/// User-adjustable settings kept in the durable store.
pub struct Settings<S> {
    store: Arc<S>,
}

impl<S: DurableStore> Settings<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub async fn backend_url(&self) -> Option<String> {
        match self.store.get(BACKEND_URL_KEY).await {
            Ok(url) => url.filter(|u| !u.trim().is_empty()),
            Err(e) => {
                tracing::warn!("Failed to read backend URL: {}", e);
                None
            }
        }
    }

    pub async fn set_backend_url(&self, url: &str) -> Result<Url> {
        let parsed = parse_backend_url(url)?;
        self.store
            .set(BACKEND_URL_KEY, parsed.as_str().to_string())
            .await?;
        Ok(parsed)
    }

    /// The stored URL wins over the configured fallback.
    pub async fn resolve_backend_url(&self, fallback: Option<&str>) -> Result<Url> {
        match self.backend_url().await {
            Some(url) => parse_backend_url(&url),
            None => match fallback {
                Some(url) if !url.trim().is_empty() => parse_backend_url(url),
                _ => Err(AppError::Config("backend URL not configured".to_string())),
            },
        }
    }
}

fn parse_backend_url(url: &str) -> Result<Url> {
    let parsed = Url::parse(url.trim())?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        scheme => Err(AppError::Config(format!(
            "unsupported backend URL scheme '{}'",
            scheme
        ))),
    }
}
