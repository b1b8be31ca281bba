use std::future::Future;
use std::time::Duration;

use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use url::Url;

use crate::error::{AppError, Result};
use crate::models::ArticleRecord;

/// The remote article backend. Implementations report transport failures,
/// non-2xx statuses and malformed bodies as errors; callers treat any error
/// as "offline".
pub trait ArticleApi: Send + Sync + 'static {
    /// `GET /articles?category=`
    fn latest(&self, category: &str) -> impl Future<Output = Result<Vec<ArticleRecord>>> + Send;

    /// `GET /articles?category=&limit=&lastPubDate=&direction=older`
    fn older(
        &self,
        category: &str,
        last_pub_date: &str,
        limit: u32,
    ) -> impl Future<Output = Result<Vec<ArticleRecord>>> + Send;

    /// `GET /articles/search?search=`
    fn search(&self, query: &str) -> impl Future<Output = Result<Vec<ArticleRecord>>> + Send;

    /// `GET /articles/article-detail?id=`
    fn detail(&self, id: &str) -> impl Future<Output = Result<ArticleRecord>> + Send;
}

pub struct HttpArticleApi {
    client: Client,
    base_url: String,
}

impl HttpArticleApi {
    pub fn new(base_url: &Url, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .user_agent(concat!("newsdesk/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.as_str().trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, path: &str, params: &[(&str, &str)]) -> Result<Url> {
        let url = format!("{}/{}", self.base_url, path);
        Ok(Url::parse_with_params(&url, params)?)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        tracing::debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .header("Accept", "application/json")
            .send()
            .await?;
        let response = check_status(response).await?;
        Ok(response.json().await?)
    }
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(AppError::Api {
        status: status.as_u16(),
        message,
    })
}

impl ArticleApi for HttpArticleApi {
    async fn latest(&self, category: &str) -> Result<Vec<ArticleRecord>> {
        let url = self.endpoint("articles", &[("category", category)])?;
        self.get_json(url).await
    }

    async fn older(
        &self,
        category: &str,
        last_pub_date: &str,
        limit: u32,
    ) -> Result<Vec<ArticleRecord>> {
        let limit = limit.to_string();
        let url = self.endpoint(
            "articles",
            &[
                ("category", category),
                ("limit", &limit),
                ("lastPubDate", last_pub_date),
                ("direction", "older"),
            ],
        )?;
        self.get_json(url).await
    }

    async fn search(&self, query: &str) -> Result<Vec<ArticleRecord>> {
        let url = self.endpoint("articles/search", &[("search", query)])?;
        self.get_json(url).await
    }

    async fn detail(&self, id: &str) -> Result<ArticleRecord> {
        let url = self.endpoint("articles/article-detail", &[("id", id)])?;
        self.get_json(url).await
    }
}
