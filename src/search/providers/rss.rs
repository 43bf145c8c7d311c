// src/search/providers/rss.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::{counter, histogram};
use quick_xml::de::from_str;
use serde::Deserialize;
use std::time::Duration;
use time::{format_description::well_known::Rfc2822, OffsetDateTime, UtcOffset};

use crate::search::types::{SearchHit, SearchProvider};

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
}

fn parse_rfc2822_to_unix(ts: &str) -> u64 {
    OffsetDateTime::parse(ts, &Rfc2822)
        .ok()
        .map(|dt| dt.to_offset(UtcOffset::UTC).unix_timestamp())
        .and_then(|x| u64::try_from(x).ok())
        .unwrap_or(0)
}

/// Football-news RSS feeds as a search provider. Entries are kept when they
/// overlap the query's significant tokens (the extractor makes the final
/// relevance call), newest first.
pub struct RssSearchProvider {
    http: Option<reqwest::Client>,
    feed_urls: Vec<String>,
    fixture_xml: Vec<String>,
}

impl RssSearchProvider {
    pub fn new(feed_urls: Vec<String>, request_timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("match-fusion-engine/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(request_timeout)
            .build()
            .expect("reqwest client");
        Self {
            http: Some(http),
            feed_urls,
            fixture_xml: Vec::new(),
        }
    }

    /// Offline provider over embedded XML content; used by tests and demos.
    pub fn from_fixture(content: &str) -> Self {
        Self {
            http: None,
            feed_urls: Vec::new(),
            fixture_xml: vec![content.to_string()],
        }
    }

    fn parse_feed(xml: &str) -> Result<Vec<(u64, SearchHit)>> {
        let rss: Rss = from_str(xml).context("parsing rss xml")?;
        let mut out = Vec::with_capacity(rss.channel.item.len());
        for it in rss.channel.item {
            let title = it.title.unwrap_or_default();
            let snippet = it.description.unwrap_or_default();
            let Some(url) = it.link else { continue };
            if title.is_empty() && snippet.is_empty() {
                continue;
            }
            let published = it
                .pub_date
                .as_deref()
                .map(parse_rfc2822_to_unix)
                .unwrap_or(0);
            out.push((
                published,
                SearchHit {
                    title,
                    snippet,
                    url,
                },
            ));
        }
        Ok(out)
    }
}

#[async_trait]
impl SearchProvider for RssSearchProvider {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>> {
        let t0 = std::time::Instant::now();

        let mut documents: Vec<String> = self.fixture_xml.clone();
        if let Some(http) = &self.http {
            for url in &self.feed_urls {
                // One broken feed must not sink the others.
                match fetch_feed(http, url).await {
                    Ok(xml) => documents.push(xml),
                    Err(e) => {
                        tracing::warn!(error = ?e, feed = %url, "rss feed error");
                        counter!("evidence_provider_errors_total").increment(1);
                    }
                }
            }
        }

        let mut entries: Vec<(u64, SearchHit)> = Vec::new();
        for xml in &documents {
            match Self::parse_feed(xml) {
                Ok(mut v) => entries.append(&mut v),
                Err(e) => {
                    tracing::warn!(error = ?e, "rss parse error");
                    counter!("evidence_provider_errors_total").increment(1);
                }
            }
        }

        // Crude token overlap with the query; the extractor verifies later.
        let tokens: Vec<String> = query
            .split_whitespace()
            .filter(|w| w.len() >= 4)
            .map(|w| w.to_ascii_lowercase())
            .collect();
        entries.retain(|(_, hit)| {
            let text = format!("{} {}", hit.title, hit.snippet).to_ascii_lowercase();
            tokens.is_empty() || tokens.iter().any(|t| text.contains(t.as_str()))
        });

        entries.sort_by(|a, b| b.0.cmp(&a.0));
        let hits: Vec<SearchHit> = entries.into_iter().take(limit).map(|(_, h)| h).collect();

        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("evidence_search_ms").record(ms);
        counter!("evidence_results_total").increment(hits.len() as u64);

        Ok(hits)
    }

    fn name(&self) -> &'static str {
        "rss"
    }
}

async fn fetch_feed(http: &reqwest::Client, url: &str) -> Result<String> {
    let resp = http
        .get(url)
        .send()
        .await
        .context("rss request")?
        .error_for_status()
        .context("rss status")?;
    Ok(resp.text().await.context("rss body")?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r#"<?xml version="1.0"?>
<rss version="2.0">
  <channel>
    <title>Football News</title>
    <item>
      <title>Arsenal to win the derby, pundits say</title>
      <link>https://www.soccernews.com/arsenal-derby</link>
      <pubDate>Sat, 23 Aug 2025 09:00:00 +0000</pubDate>
      <description>Arsenal favoured against Chelsea this weekend.</description>
    </item>
    <item>
      <title>Transfer gossip roundup</title>
      <link>https://www.soccernews.com/gossip</link>
      <pubDate>Fri, 22 Aug 2025 12:00:00 +0000</pubDate>
      <description>All of today's rumours.</description>
    </item>
  </channel>
</rss>"#;

    #[tokio::test]
    async fn fixture_feed_filters_by_query_tokens() {
        let provider = RssSearchProvider::from_fixture(FEED);
        let hits = provider
            .search("Arsenal vs Chelsea prediction preview", 3)
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert!(hits[0].title.contains("Arsenal"));
        assert_eq!(hits[0].url, "https://www.soccernews.com/arsenal-derby");
    }

    #[tokio::test]
    async fn newest_entries_come_first_and_limit_applies() {
        let provider = RssSearchProvider::from_fixture(FEED);
        // A query overlapping both entries via a generic token.
        let hits = provider.search("arsenal gossip today", 1).await.unwrap();
        assert_eq!(hits.len(), 1);
        // The Arsenal entry is newer than the gossip entry.
        assert!(hits[0].title.contains("Arsenal"));
    }

    #[test]
    fn rfc2822_parses_to_unix() {
        assert!(parse_rfc2822_to_unix("Sat, 23 Aug 2025 09:00:00 +0000") > 1_700_000_000);
        assert_eq!(parse_rfc2822_to_unix("not a date"), 0);
    }
}
