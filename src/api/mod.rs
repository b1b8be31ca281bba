mod client;

pub use client::{ArticleApi, HttpArticleApi};
