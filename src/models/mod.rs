mod article;
mod category;
mod date;
mod saved;

pub use article::{sort_newest_first, ArticleRecord, ArticleSummary};
#[cfg(test)]
pub use article::{ContentBlock, FullArticle};
pub use category::{default_categories, CategoryEntry, RESERVED_CATEGORY_COUNT};
pub use date::format_relative;
pub use saved::{SavedArticle, SavedArticleView};
