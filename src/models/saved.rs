use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ArticleRecord;

/// Bookmark metadata, keyed by article id in the saved-articles map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedArticle {
    pub category: String,
    #[serde(rename = "time")]
    pub saved_at: DateTime<Utc>,
}

/// A bookmark resolved to the article it points at.
#[derive(Debug, Clone)]
pub struct SavedArticleView {
    pub id: String,
    pub saved: SavedArticle,
    pub article: ArticleRecord,
}
