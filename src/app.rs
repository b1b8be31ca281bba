use std::sync::Arc;

use chrono::Utc;

use crate::api::HttpArticleApi;
use crate::cache::{ArticleCache, CategoryRegistry, SavedArticles, Settings, SEARCH_CATEGORY};
use crate::cli::{Command, USAGE};
use crate::config::Config;
use crate::db::SqliteStore;
use crate::error::{AppError, Result};
use crate::feed::{DetailOutcome, FeedSync, LoadOutcome, PageOutcome, SearchOutcome};
use crate::models::{format_relative, ArticleRecord, ArticleSummary, SavedArticleView};

const TEXT_WIDTH: usize = 80;

type Orchestrator = FeedSync<SqliteStore, HttpArticleApi>;

/// Owns every repository over the shared store; built once per process.
pub struct App {
    articles: Arc<ArticleCache<SqliteStore>>,
    categories: CategoryRegistry<SqliteStore>,
    saved: SavedArticles<SqliteStore>,
    settings: Settings<SqliteStore>,
    sync: Option<Orchestrator>,
    config: Config,
}

impl App {
    pub async fn new(config: &Config) -> Result<Self> {
        let store = Arc::new(SqliteStore::open(&config.db_path).await?);

        let articles = Arc::new(ArticleCache::new(Arc::clone(&store)));
        let categories = CategoryRegistry::new(Arc::clone(&store));
        let saved = SavedArticles::new(Arc::clone(&store));
        let settings = Settings::new(store);

        let mut app = Self {
            articles,
            categories,
            saved,
            settings,
            sync: None,
            config: config.clone(),
        };
        app.connect().await?;
        Ok(app)
    }

    /// (Re)build the backend client from the current settings. A missing
    /// backend URL leaves the app in cache-only mode.
    async fn connect(&mut self) -> Result<()> {
        let url = match self
            .settings
            .resolve_backend_url(self.config.backend_url.as_deref())
            .await
        {
            Ok(url) => url,
            Err(e) => {
                tracing::debug!("Running without backend: {}", e);
                self.sync = None;
                return Ok(());
            }
        };

        let api = HttpArticleApi::new(&url, self.config.request_timeout())?;
        self.sync = Some(FeedSync::new(
            Arc::clone(&self.articles),
            api,
            self.config.older_page_size,
        ));
        Ok(())
    }

    fn sync(&self) -> Result<&Orchestrator> {
        self.sync.as_ref().ok_or_else(|| {
            AppError::Config("backend URL not configured (run `newsdesk backend <url>`)".to_string())
        })
    }

    async fn resolve_category(&self, category: Option<String>) -> Result<String> {
        if let Some(category) = category {
            return Ok(category);
        }
        self.categories
            .first_subscribed()
            .await?
            .map(|entry| entry.code)
            .ok_or_else(|| AppError::Config("no subscribed categories".to_string()))
    }

    pub async fn run(&mut self, command: Command) -> Result<()> {
        match command {
            Command::Feed { category } => {
                let category = self.resolve_category(category).await?;
                let sync = self.sync()?;
                let outcome = sync.load_feed(&category).await?;
                if let LoadOutcome::Offline { .. } = outcome {
                    println!("Offline: showing cached articles. Run the command again to retry.");
                }
                let articles = sync.view(&category).map(|v| v.articles).unwrap_or_default();
                sync.close_feed(&category);
                print_articles(&category, &articles);
            }

            Command::Refresh { category } => {
                let category = self.resolve_category(category).await?;
                let sync = self.sync()?;
                match sync.refresh(&category).await? {
                    LoadOutcome::Fresh { count } => tracing::debug!("Refreshed {} articles", count),
                    LoadOutcome::Offline { .. } => {
                        println!("Offline: could not refresh {}.", category)
                    }
                    LoadOutcome::Superseded => {}
                }
                let articles = sync.view(&category).map(|v| v.articles).unwrap_or_default();
                sync.close_feed(&category);
                print_articles(&category, &articles);
            }

            Command::More { category, pages } => {
                let category = self.resolve_category(category).await?;
                let sync = self.sync()?;
                if let LoadOutcome::Offline { .. } = sync.load_feed(&category).await? {
                    println!("Offline: showing cached articles.");
                }
                for _ in 0..pages {
                    match sync.load_more(&category).await? {
                        PageOutcome::Appended { count } => {
                            tracing::debug!("Loaded {} older articles", count);
                        }
                        PageOutcome::Exhausted => {
                            println!("No older articles.");
                            break;
                        }
                        PageOutcome::Offline => {
                            println!("Offline: could not load older articles.");
                            break;
                        }
                        PageOutcome::Skipped(_) | PageOutcome::Superseded => break,
                    }
                }
                let articles = sync.view(&category).map(|v| v.articles).unwrap_or_default();
                sync.close_feed(&category);
                print_articles(&category, &articles);
            }

            Command::Cached { category } => {
                let articles = self.articles.list_summaries(&category).await;
                print_articles(&category, &articles);
            }

            Command::Show { category, id } => {
                let record = match self.sync() {
                    Ok(sync) => match sync.load_detail(&category, &id).await? {
                        DetailOutcome::Fresh(record) => Some(record),
                        DetailOutcome::Cached(record) => {
                            println!("Offline: showing the cached copy.");
                            Some(record)
                        }
                        DetailOutcome::Unavailable => None,
                    },
                    Err(_) => self.articles.get_detail(&category, &id).await,
                };
                match record {
                    Some(record) => {
                        let saved = self.saved.is_saved(&id).await;
                        print_article(&record, saved);
                    }
                    None => println!("Article {} is not available offline.", id),
                }
            }

            Command::Search { query } => match self.sync()?.search(&query).await? {
                SearchOutcome::Results(results) => print_articles(SEARCH_CATEGORY, &results),
                SearchOutcome::Offline => println!("Offline: search is unavailable."),
            },

            Command::Categories => {
                for entry in self.categories.load().await? {
                    let mark = if entry.subscribed { "x" } else { " " };
                    println!("[{}] {:<16} {}", mark, entry.code, entry.display_name);
                }
            }

            Command::Toggle { code } => {
                let subscribed = self.categories.toggle(&code).await?;
                let state = if subscribed { "Subscribed to" } else { "Unsubscribed from" };
                println!("{} {}", state, code);
            }

            Command::Save { id, category } => {
                self.saved.save(&id, &category).await?;
                println!("Saved {}", id);
            }

            Command::Unsave { id } => {
                if self.saved.unsave(&id).await? {
                    println!("Removed {}", id);
                } else {
                    println!("{} was not saved", id);
                }
            }

            Command::Saved => {
                let entries = self.saved.newest_first().await;
                let views = match self.sync() {
                    Ok(sync) => sync.resolve_saved(entries).await,
                    Err(_) => self.resolve_saved_offline(entries).await,
                };
                print_saved(&views);
            }

            Command::ClearCache => {
                let mut codes: Vec<String> = self
                    .categories
                    .load()
                    .await?
                    .into_iter()
                    .map(|entry| entry.code)
                    .collect();
                codes.push(SEARCH_CATEGORY.to_string());
                let cleared = self
                    .articles
                    .clear_all(codes.iter().map(String::as_str))
                    .await?;
                println!("Cleared {} categories", cleared);
            }

            Command::ResetCategories => {
                self.categories.clear().await?;
                let restored = self.categories.load().await?;
                println!("Restored {} default categories", restored.len());
            }

            Command::ClearSaved => {
                self.saved.clear().await?;
                println!("Removed all saved articles");
            }

            Command::Backend { url: None } => {
                match self
                    .settings
                    .resolve_backend_url(self.config.backend_url.as_deref())
                    .await
                {
                    Ok(url) => println!("{}", url),
                    Err(e) => println!("{}", e),
                }
            }

            Command::Backend { url: Some(url) } => {
                let url = self.settings.set_backend_url(&url).await?;
                self.connect().await?;
                println!("Backend set to {}", url);
            }

            Command::Help => println!("{}", USAGE),
        }

        Ok(())
    }

    async fn resolve_saved_offline(
        &self,
        entries: Vec<(String, crate::models::SavedArticle)>,
    ) -> Vec<SavedArticleView> {
        let mut views = Vec::with_capacity(entries.len());
        for (id, saved) in entries {
            if let Some(article) = self.articles.get_detail(&saved.category, &id).await {
                views.push(SavedArticleView { id, saved, article });
            }
        }
        views
    }
}

fn print_articles(category: &str, articles: &[ArticleSummary]) {
    if articles.is_empty() {
        println!("No articles in {}.", category);
        return;
    }
    let now = Utc::now();
    for (i, article) in articles.iter().enumerate() {
        println!(
            "{:>3}. {} ({})  [{}]",
            i + 1,
            article.title,
            format_relative(&article.pub_date, now),
            article.id
        );
    }
}

fn print_article(record: &ArticleRecord, saved: bool) {
    let summary = record.summary();
    println!("{}", summary.title);
    println!(
        "{}{}",
        format_relative(&summary.pub_date, Utc::now()),
        if saved { "  (saved)" } else { "" }
    );
    println!();

    match record.content() {
        Some(blocks) => {
            for text in blocks.iter().filter_map(|b| b.plain_text(TEXT_WIDTH)) {
                println!("{}\n", text);
            }
        }
        None => println!("(full text not downloaded yet)"),
    }
}

fn print_saved(views: &[SavedArticleView]) {
    if views.is_empty() {
        println!("No saved articles.");
        return;
    }
    for view in views {
        println!(
            "{}  [{} / {}]  saved {}",
            view.article.summary().title,
            view.saved.category,
            view.id,
            view.saved.saved_at.format("%d/%m/%Y %H:%M")
        );
    }
}
