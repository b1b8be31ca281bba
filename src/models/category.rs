use serde::{Deserialize, Serialize};

/// Number of leading built-in entries that always stay subscribed.
pub const RESERVED_CATEGORY_COUNT: usize = 2;

/// Built-in catalog used to seed the registry on first run, in tab order.
pub const DEFAULT_CATEGORIES: &[(&str, &str, bool)] = &[
    ("latest", "Latest", true),
    ("featured", "Featured", true),
    ("world", "World", true),
    ("business", "Business", true),
    ("technology", "Technology", true),
    ("sports", "Sports", true),
    ("entertainment", "Entertainment", false),
    ("health", "Health", false),
    ("science", "Science", false),
    ("education", "Education", false),
    ("law", "Law", false),
    ("travel", "Travel", false),
];

/// Persisted as a `[code, displayName, subscribed]` tuple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(String, String, bool)", into = "(String, String, bool)")]
pub struct CategoryEntry {
    pub code: String,
    pub display_name: String,
    pub subscribed: bool,
}

impl CategoryEntry {
    pub fn new(code: impl Into<String>, display_name: impl Into<String>, subscribed: bool) -> Self {
        Self {
            code: code.into(),
            display_name: display_name.into(),
            subscribed,
        }
    }
}

impl From<(String, String, bool)> for CategoryEntry {
    fn from((code, display_name, subscribed): (String, String, bool)) -> Self {
        Self {
            code,
            display_name,
            subscribed,
        }
    }
}

impl From<CategoryEntry> for (String, String, bool) {
    fn from(entry: CategoryEntry) -> Self {
        (entry.code, entry.display_name, entry.subscribed)
    }
}

pub fn default_categories() -> Vec<CategoryEntry> {
    DEFAULT_CATEGORIES
        .iter()
        .map(|(code, name, subscribed)| CategoryEntry::new(*code, *name, *subscribed))
        .collect()
}
