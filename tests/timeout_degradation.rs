//! Sources that sleep past their budgets are discarded, not awaited: the
//! engine still answers within the budget ceiling, statistical-only.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};

use match_fusion_engine::enhancer::{AiVerdict, NarrativeBackend, NarrativeEnhancer};
use match_fusion_engine::extract::KeywordExtractor;
use match_fusion_engine::search::types::{SearchHit, SearchProvider};
use match_fusion_engine::source_weights::SourceWeightsConfig;
use match_fusion_engine::{
    EvidenceCollector, EvidenceConfig, Fixture, FixtureStatus, FusionEngine, FusionPolicy, Mode,
    PredictionMethod, Quality, SourceType, StatisticalModel, TeamStrength, TeamStrengths,
};

fn fixture() -> Fixture {
    Fixture {
        id: 200,
        home_team: "Arsenal".into(),
        away_team: "Chelsea".into(),
        competition: "Premier League".into(),
        kickoff_utc: Utc.with_ymd_and_hms(2025, 8, 23, 14, 0, 0).unwrap(),
        status: FixtureStatus::Scheduled,
    }
}

fn strengths() -> TeamStrengths {
    TeamStrengths {
        home: Some(TeamStrength {
            attack: 60.0,
            defense: 58.0,
            goals_per_game: 1.6,
        }),
        away: Some(TeamStrength {
            attack: 57.0,
            defense: 55.0,
            goals_per_game: 1.5,
        }),
    }
}

/// Sleeps far past any budget before answering.
struct SleepySearch;

#[async_trait]
impl SearchProvider for SleepySearch {
    async fn search(&self, _query: &str, _limit: usize) -> anyhow::Result<Vec<SearchHit>> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(vec![SearchHit {
            title: "too late".into(),
            snippet: "Arsenal to win".into(),
            url: "https://slow.example/1".into(),
        }])
    }
    fn name(&self) -> &'static str {
        "sleepy"
    }
}

/// Answers instantly; used to prove partial results survive a slow sibling.
struct QuickSearch;

#[async_trait]
impl SearchProvider for QuickSearch {
    async fn search(&self, _query: &str, limit: usize) -> anyhow::Result<Vec<SearchHit>> {
        Ok(vec![SearchHit {
            title: "Arsenal to win, preview".into(),
            snippet: "Arsenal favoured against Chelsea".into(),
            url: "https://www.forebet.com/en/1".into(),
        }]
        .into_iter()
        .take(limit)
        .collect())
    }
    fn name(&self) -> &'static str {
        "quick"
    }
}

struct SleepyBackend;

impl NarrativeBackend for SleepyBackend {
    fn assess<'a>(
        &'a self,
        _prompt: &'a str,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Option<AiVerdict>> + Send + 'a>> {
        Box::pin(async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            None
        })
    }
    fn name(&self) -> &'static str {
        "sleepy"
    }
}

fn tight_evidence_cfg() -> EvidenceConfig {
    EvidenceConfig {
        budget_ms: 250,
        request_budget_ms: 200,
        ..EvidenceConfig::default()
    }
}

#[tokio::test]
async fn all_sources_timing_out_degrades_to_statistical_only() {
    let collector = EvidenceCollector::new(
        tight_evidence_cfg(),
        vec![Box::new(SleepySearch)],
        None,
        Box::new(KeywordExtractor::default()),
        SourceWeightsConfig::default(),
    );
    let enhancer = NarrativeEnhancer::new(
        Arc::new(SleepyBackend),
        0.85,
        Duration::from_millis(300),
    );
    let engine = FusionEngine::new(FusionPolicy::default(), StatisticalModel::default())
        .with_evidence(collector)
        .with_enhancer(enhancer);

    let started = Instant::now();
    let p = engine
        .predict(&fixture(), &strengths(), Mode::Full)
        .await
        .expect("prediction");
    let elapsed = started.elapsed();

    // Budget ceiling (max of the two source budgets) plus fixed overhead.
    assert!(
        elapsed < Duration::from_secs(2),
        "predict took {elapsed:?}, budgets were ≤300ms"
    );
    assert_eq!(p.prediction_quality, Quality::Low);
    assert_eq!(p.prediction_method, PredictionMethod::StatisticalOnly);
    assert_eq!(p.sources_used.len(), 1);
    assert_eq!(p.sources_used[0].source_type, SourceType::Statistical);
    assert!((p.probabilities.sum() - 100.0).abs() <= 1.0);
}

#[tokio::test]
async fn quick_provider_survives_a_sleepy_sibling() {
    let collector = EvidenceCollector::new(
        tight_evidence_cfg(),
        vec![Box::new(QuickSearch), Box::new(SleepySearch)],
        None,
        Box::new(KeywordExtractor::default()),
        SourceWeightsConfig::default(),
    );
    let engine = FusionEngine::new(FusionPolicy::default(), StatisticalModel::default())
        .with_evidence(collector);

    let started = Instant::now();
    let p = engine
        .predict(&fixture(), &strengths(), Mode::Full)
        .await
        .expect("prediction");

    assert!(started.elapsed() < Duration::from_secs(2));
    assert!(
        p.sources_used.iter().any(|s| s.source_type == SourceType::Web),
        "quick provider's signal must survive the sleepy one"
    );
    assert_eq!(p.prediction_method, PredictionMethod::MultiSource);
}
