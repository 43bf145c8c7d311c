// src/search/types.rs
use anyhow::Result;

/// One ordered web search result: title, snippet, url.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub snippet: String,
    pub url: String,
}

/// Search backend contract: a query and a result cap in, ordered hits out.
/// May fail on network errors; callers treat that as a normal failure path.
#[async_trait::async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>>;
    fn name(&self) -> &'static str;
}

/// Optional page-body fetch, used only when a snippet alone yields nothing.
#[async_trait::async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String>;
}
