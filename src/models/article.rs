use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::date::parse_pub_date;

/// Fields needed to render an article in a list. Present on every record,
/// whether it came from a list endpoint or a detail endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleSummary {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "pubDate", default)]
    pub pub_date: String,
    #[serde(rename = "pubDateTZ", default)]
    pub pub_date_tz: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub source_icon: Option<String>,
}

impl ArticleSummary {
    /// Most recent first. Dates that do not parse go last; equal instants
    /// keep their relative order when used with a stable sort.
    pub fn cmp_newest_first(&self, other: &Self) -> Ordering {
        let a = parse_pub_date(&self.pub_date);
        let b = parse_pub_date(&other.pub_date);
        b.cmp(&a)
    }
}

pub fn sort_newest_first(summaries: &mut [ArticleSummary]) {
    summaries.sort_by(ArticleSummary::cmp_newest_first);
}

/// One typed block of article body, e.g. `{"type": "text", "value": "..."}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub value: Value,
}

impl ContentBlock {
    #[cfg(test)]
    pub fn text(value: impl Into<String>) -> Self {
        Self {
            kind: "text".to_string(),
            value: Value::String(value.into()),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        if self.kind == "text" {
            self.value.as_str()
        } else {
            None
        }
    }

    /// Text blocks rendered to plain text, stripping any markup.
    pub fn plain_text(&self, width: usize) -> Option<String> {
        let raw = self.as_text()?;
        match html2text::from_read(raw.as_bytes(), width) {
            Ok(text) => Some(text.trim_end().to_string()),
            Err(e) => {
                tracing::debug!("Failed to convert content block to text: {}", e);
                Some(raw.to_string())
            }
        }
    }
}

/// A list or search payload. Fields beyond the summary are carried along
/// untouched so the cached entry matches what the backend sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartialArticle {
    pub summary: ArticleSummary,
    pub extra: Map<String, Value>,
}

impl From<ArticleSummary> for PartialArticle {
    fn from(summary: ArticleSummary) -> Self {
        Self {
            summary,
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FullArticle {
    pub summary: ArticleSummary,
    pub content: Vec<ContentBlock>,
    /// Detail fields with no dedicated slot (link, author, ...), kept so a
    /// rewrite of the cache never loses them.
    pub extra: Map<String, Value>,
}

/// An article as stored in the cache. A `Partial` record came from a list
/// endpoint and has no body; a `Full` one came from the detail endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "StoredArticle", into = "StoredArticle")]
pub enum ArticleRecord {
    Partial(PartialArticle),
    Full(FullArticle),
}

impl ArticleRecord {
    pub fn summary(&self) -> &ArticleSummary {
        match self {
            ArticleRecord::Partial(partial) => &partial.summary,
            ArticleRecord::Full(full) => &full.summary,
        }
    }

    pub fn summary_mut(&mut self) -> &mut ArticleSummary {
        match self {
            ArticleRecord::Partial(partial) => &mut partial.summary,
            ArticleRecord::Full(full) => &mut full.summary,
        }
    }

    pub fn into_summary(self) -> ArticleSummary {
        match self {
            ArticleRecord::Partial(partial) => partial.summary,
            ArticleRecord::Full(full) => full.summary,
        }
    }

    pub fn id(&self) -> &str {
        &self.summary().id
    }

    pub fn is_full(&self) -> bool {
        matches!(self, ArticleRecord::Full(_))
    }

    pub fn content(&self) -> Option<&[ContentBlock]> {
        match self {
            ArticleRecord::Partial(_) => None,
            ArticleRecord::Full(full) => Some(&full.content),
        }
    }
}

/// Wire and storage shape: a flat JSON object where the presence of
/// `content` decides between partial and full.
#[derive(Serialize, Deserialize)]
struct StoredArticle {
    #[serde(flatten)]
    summary: ArticleSummary,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    content: Option<Vec<ContentBlock>>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl From<StoredArticle> for ArticleRecord {
    fn from(stored: StoredArticle) -> Self {
        match stored.content {
            Some(content) => ArticleRecord::Full(FullArticle {
                summary: stored.summary,
                content,
                extra: stored.extra,
            }),
            None => ArticleRecord::Partial(PartialArticle {
                summary: stored.summary,
                extra: stored.extra,
            }),
        }
    }
}

impl From<ArticleRecord> for StoredArticle {
    fn from(record: ArticleRecord) -> Self {
        match record {
            ArticleRecord::Partial(partial) => StoredArticle {
                summary: partial.summary,
                content: None,
                extra: partial.extra,
            },
            ArticleRecord::Full(full) => StoredArticle {
                summary: full.summary,
                content: Some(full.content),
                extra: full.extra,
            },
        }
    }
}
