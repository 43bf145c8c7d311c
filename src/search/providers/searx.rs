// src/search/providers/searx.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::{counter, histogram};
use serde::Deserialize;
use std::time::Duration;

use crate::search::types::{SearchHit, SearchProvider};

#[derive(Debug, Deserialize)]
struct SearxResponse {
    #[serde(default)]
    results: Vec<SearxResult>,
}

#[derive(Debug, Deserialize)]
struct SearxResult {
    #[serde(default)]
    title: String,
    /// SearXNG calls the snippet "content".
    #[serde(default)]
    content: String,
    url: String,
}

/// Search provider backed by a SearXNG-compatible JSON endpoint
/// (`GET {base}/search?q=...&format=json`).
pub struct SearxProvider {
    http: reqwest::Client,
    base_url: String,
}

impl SearxProvider {
    pub fn new(base_url: impl Into<String>, request_timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("match-fusion-engine/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(request_timeout)
            .build()
            .expect("reqwest client");
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl SearchProvider for SearxProvider {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>> {
        let t0 = std::time::Instant::now();

        let resp = self
            .http
            .get(format!("{}/search", self.base_url))
            .query(&[("q", query), ("format", "json"), ("categories", "news")])
            .send()
            .await
            .context("searx request")?
            .error_for_status()
            .context("searx status")?;

        let body: SearxResponse = resp.json().await.context("searx json")?;
        let hits: Vec<SearchHit> = body
            .results
            .into_iter()
            .filter(|r| !r.url.is_empty())
            .take(limit)
            .map(|r| SearchHit {
                title: r.title,
                snippet: r.content,
                url: r.url,
            })
            .collect();

        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("evidence_search_ms").record(ms);
        counter!("evidence_results_total").increment(hits.len() as u64);

        Ok(hits)
    }

    fn name(&self) -> &'static str {
        "searx"
    }
}
