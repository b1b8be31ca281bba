use crate::models::{sort_newest_first, ArticleRecord, ArticleSummary};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FeedPhase {
    #[default]
    Idle,
    Loading,
    Ready,
}

/// What the caller should show for one category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedView {
    pub articles: Vec<ArticleSummary>,
    pub phase: FeedPhase,
    pub has_more: bool,
    pub loading_more: bool,
    /// Set when the last network request for this feed failed.
    pub offline: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The first page arrived and replaced the displayed list.
    Fresh { count: usize },
    /// The request failed; `shown` cached articles stay on display.
    Offline { shown: usize },
    /// A newer load or a close happened first; the result was dropped.
    Superseded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    InFlight,
    Exhausted,
    NoAnchor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageOutcome {
    Appended { count: usize },
    /// The backend had nothing older; paging stops until the next load.
    Exhausted,
    Skipped(SkipReason),
    Offline,
    Superseded,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DetailOutcome {
    Fresh(ArticleRecord),
    /// The backend was unreachable; this is the cached full record.
    Cached(ArticleRecord),
    Unavailable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    Results(Vec<ArticleSummary>),
    Offline,
}

/// Per-category session. `generation` changes on every (re)load and on
/// close; network results tagged with an older generation are discarded.
#[derive(Debug)]
pub(super) struct FeedState {
    pub generation: u64,
    pub phase: FeedPhase,
    pub articles: Vec<ArticleSummary>,
    pub has_more: bool,
    pub loading_more: bool,
    pub offline: bool,
}

impl FeedState {
    pub fn new(generation: u64) -> Self {
        Self {
            generation,
            phase: FeedPhase::Idle,
            articles: Vec::new(),
            has_more: true,
            loading_more: false,
            offline: false,
        }
    }

    /// Start a new load. The displayed list is kept until results arrive.
    pub fn restart(&mut self, generation: u64) {
        self.generation = generation;
        self.phase = FeedPhase::Loading;
        self.has_more = true;
        self.loading_more = false;
    }

    /// Extend the tail; an id already on display is updated in place.
    /// The list stays newest first even if an update moved a date.
    pub fn append(&mut self, page: Vec<ArticleSummary>) {
        for summary in page {
            match self.articles.iter_mut().find(|a| a.id == summary.id) {
                Some(existing) => *existing = summary,
                None => self.articles.push(summary),
            }
        }
        sort_newest_first(&mut self.articles);
    }

    pub fn view(&self) -> FeedView {
        FeedView {
            articles: self.articles.clone(),
            phase: self.phase,
            has_more: self.has_more,
            loading_more: self.loading_more,
            offline: self.offline,
        }
    }
}
