// src/search/providers/page.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::time::Duration;

use crate::extract::normalize_text;
use crate::search::types::PageFetcher;

/// Bounded page-body fetch. The returned text is already HTML-stripped and
/// length-capped so extractors can run on it directly.
pub struct HttpPageFetcher {
    http: reqwest::Client,
}

impl HttpPageFetcher {
    pub fn new(request_timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("match-fusion-engine/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(request_timeout)
            .build()
            .expect("reqwest client");
        Self { http }
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .context("page request")?
            .error_for_status()
            .context("page status")?;
        let body = resp.text().await.context("page body")?;
        Ok(normalize_text(&body))
    }
}
