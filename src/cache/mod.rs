mod articles;
mod categories;
mod locks;
mod saved;
mod settings;

pub use articles::{ArticleCache, SEARCH_CATEGORY};
pub use categories::CategoryRegistry;
pub use saved::SavedArticles;
pub use settings::Settings;
