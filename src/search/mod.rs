// src/search/mod.rs
//! Evidence collection: run a web search for a fixture, extract a directional
//! signal from each result, and weight it by source reliability.
//!
//! Failure policy: everything in here degrades to "fewer signals". A broken
//! provider, a dead page, or a result with no directional language is logged
//! and skipped; the aggregate deadline returns whatever was extracted so far
//! rather than blocking on stragglers.

pub mod providers;
pub mod types;

use metrics::{counter, describe_counter, describe_histogram};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, warn};

use crate::extract::{KeywordExtractor, SignalExtractor};
use crate::fixture::{Fixture, FixtureStatus, SourceSignal, SourceType};
use crate::search::providers::{
    page::HttpPageFetcher, rss::RssSearchProvider, searx::SearxProvider,
};
use crate::search::types::{PageFetcher, SearchProvider};
use crate::source_weights::SourceWeightsConfig;

/// One-time metrics registration (so series show up wherever they're scraped).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "evidence_results_total",
            "Search results returned by providers."
        );
        describe_counter!(
            "evidence_signals_total",
            "Directional signals extracted from results."
        );
        describe_counter!(
            "evidence_no_signal_total",
            "Results with no extractable direction."
        );
        describe_counter!(
            "evidence_provider_errors_total",
            "Provider fetch/parse errors."
        );
        describe_counter!(
            "evidence_timeouts_total",
            "Search or fetch calls abandoned on timeout."
        );
        describe_histogram!("evidence_search_ms", "Provider search time in milliseconds.");
    });
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceConfig {
    pub enabled: bool,
    /// Hard cap on results inspected per provider. Kept low to bound cost.
    pub max_results: usize,
    /// Aggregate time budget for the whole collection pass.
    pub budget_ms: u64,
    /// Budget for any single network call within the pass.
    pub request_budget_ms: u64,
    /// Fetch the page body when the snippet alone yields nothing.
    pub fetch_pages: bool,
    /// SearXNG-compatible endpoint; no web search runs without one.
    pub search_url: Option<String>,
    pub rss_feeds: Vec<String>,
}

impl Default for EvidenceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_results: 3,
            budget_ms: 5_000,
            request_budget_ms: 2_000,
            fetch_pages: false,
            search_url: None,
            rss_feeds: vec![
                "https://www.soccernews.com/feed/".to_string(),
                "https://www.football365.com/feed".to_string(),
            ],
        }
    }
}

/// The evidence extractor: providers + extraction strategy + reliability
/// table under one aggregate deadline.
pub struct EvidenceCollector {
    cfg: EvidenceConfig,
    providers: Vec<Box<dyn SearchProvider>>,
    fetcher: Option<Box<dyn PageFetcher>>,
    extractor: Box<dyn SignalExtractor>,
    weights: SourceWeightsConfig,
}

impl EvidenceCollector {
    pub fn new(
        cfg: EvidenceConfig,
        providers: Vec<Box<dyn SearchProvider>>,
        fetcher: Option<Box<dyn PageFetcher>>,
        extractor: Box<dyn SignalExtractor>,
        weights: SourceWeightsConfig,
    ) -> Self {
        Self {
            cfg,
            providers,
            fetcher,
            extractor,
            weights,
        }
    }

    /// Wire the production providers described by the config.
    pub fn from_config(cfg: &EvidenceConfig) -> Self {
        let request_budget = Duration::from_millis(cfg.request_budget_ms);
        let mut providers: Vec<Box<dyn SearchProvider>> = Vec::new();
        if let Some(url) = &cfg.search_url {
            providers.push(Box::new(SearxProvider::new(url.clone(), request_budget)));
        }
        if !cfg.rss_feeds.is_empty() {
            providers.push(Box::new(RssSearchProvider::new(
                cfg.rss_feeds.clone(),
                request_budget,
            )));
        }
        let fetcher: Option<Box<dyn PageFetcher>> = cfg
            .fetch_pages
            .then(|| Box::new(HttpPageFetcher::new(request_budget)) as Box<dyn PageFetcher>);
        Self::new(
            cfg.clone(),
            providers,
            fetcher,
            Box::new(KeywordExtractor::default()),
            SourceWeightsConfig::default(),
        )
    }

    /// Collect web signals for a fixture. Returns whatever was extracted by
    /// the time the aggregate budget runs out; never errors.
    pub async fn collect(&self, fixture: &Fixture) -> Vec<SourceSignal> {
        ensure_metrics_described();

        let deadline = Instant::now() + Duration::from_millis(self.cfg.budget_ms);
        let request_budget = Duration::from_millis(self.cfg.request_budget_ms);
        let query = build_query(fixture);
        // Never log raw queries; hashed id only.
        debug!(target: "evidence", id = %anon_hash(&query), providers = self.providers.len(), "search dispatch");

        let mut signals: Vec<SourceSignal> = Vec::new();

        'providers: for provider in &self.providers {
            if Instant::now() >= deadline {
                break;
            }

            let step = (Instant::now() + request_budget).min(deadline);
            let hits = match timeout_at(step, provider.search(&query, self.cfg.max_results)).await
            {
                Ok(Ok(hits)) => hits,
                Ok(Err(e)) => {
                    warn!(error = ?e, provider = provider.name(), "search provider error");
                    counter!("evidence_provider_errors_total").increment(1);
                    continue;
                }
                Err(_) => {
                    warn!(provider = provider.name(), "search provider timed out");
                    counter!("evidence_timeouts_total").increment(1);
                    continue;
                }
            };

            for hit in hits.into_iter().take(self.cfg.max_results) {
                if Instant::now() >= deadline {
                    break 'providers;
                }

                let combined = format!("{}. {}", hit.title, hit.snippet);
                let mut lean = self.extractor.extract(&combined, fixture);

                // Snippet said nothing directional; try the page body under
                // its own sub-budget.
                if lean.is_none() && self.cfg.fetch_pages {
                    if let Some(fetcher) = &self.fetcher {
                        let step = (Instant::now() + request_budget).min(deadline);
                        match timeout_at(step, fetcher.fetch(&hit.url)).await {
                            Ok(Ok(body)) => lean = self.extractor.extract(&body, fixture),
                            Ok(Err(e)) => {
                                warn!(error = ?e, "page fetch error");
                                counter!("evidence_provider_errors_total").increment(1);
                            }
                            Err(_) => {
                                counter!("evidence_timeouts_total").increment(1);
                            }
                        }
                    }
                }

                let Some(lean) = lean else {
                    counter!("evidence_no_signal_total").increment(1);
                    continue;
                };

                let source_name =
                    source_name_from_url(&hit.url).unwrap_or_else(|| provider.name().to_string());
                let reliability = self.weights.weight_for_url(&hit.url);
                signals.push(
                    SourceSignal::new(
                        SourceType::Web,
                        source_name,
                        lean.outcome,
                        lean.confidence,
                        reliability,
                    )
                    .with_rationale(clip(&hit.title, 120)),
                );
            }
        }

        counter!("evidence_signals_total").increment(signals.len() as u64);
        signals
    }
}

/// Search query for a fixture; the date narrows results for scheduled games.
fn build_query(fixture: &Fixture) -> String {
    let mut q = format!(
        "{} vs {} prediction preview",
        fixture.home_team, fixture.away_team
    );
    if fixture.status == FixtureStatus::Scheduled {
        q.push(' ');
        q.push_str(&fixture.kickoff_utc.format("%Y-%m-%d").to_string());
    }
    q
}

/// Readable source name from a result URL: host without `www.` or the TLD
/// ("https://www.forebet.com/en/..." → "forebet").
fn source_name_from_url(url: &str) -> Option<String> {
    let rest = url
        .trim()
        .strip_prefix("https://")
        .or_else(|| url.trim().strip_prefix("http://"))?;
    let host = rest.split(['/', '?', '#']).next()?;
    let host = host.strip_prefix("www.").unwrap_or(host);
    let stem = host
        .trim_end_matches(".co.uk")
        .trim_end_matches(".com")
        .trim_end_matches(".org")
        .trim_end_matches(".net");
    if stem.is_empty() {
        None
    } else {
        Some(stem.to_string())
    }
}

fn clip(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

/// Short anonymized hash for query logging.
fn anon_hash(text: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}
