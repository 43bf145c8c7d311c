//! Vote semantics end to end: unanimous evidence overrides a neutral
//! statistical estimate, disagreement damps confidence, and identical
//! inputs give identical predictions.

use async_trait::async_trait;
use chrono::{TimeZone, Utc};

use match_fusion_engine::extract::KeywordExtractor;
use match_fusion_engine::search::types::{SearchHit, SearchProvider};
use match_fusion_engine::source_weights::SourceWeightsConfig;
use match_fusion_engine::{
    EvidenceCollector, EvidenceConfig, Fixture, FixtureStatus, FusionEngine, FusionPolicy, Mode,
    Outcome, SourceType, StatisticalModel, TeamStrength, TeamStrengths,
};

fn fixture() -> Fixture {
    Fixture {
        id: 300,
        home_team: "Arsenal".into(),
        away_team: "Chelsea".into(),
        competition: "Premier League".into(),
        kickoff_utc: Utc.with_ymd_and_hms(2025, 8, 23, 14, 0, 0).unwrap(),
        status: FixtureStatus::Scheduled,
    }
}

fn even_strengths() -> TeamStrengths {
    TeamStrengths {
        home: Some(TeamStrength {
            attack: 55.0,
            defense: 55.0,
            goals_per_game: 1.5,
        }),
        away: Some(TeamStrength {
            attack: 55.0,
            defense: 55.0,
            goals_per_game: 1.5,
        }),
    }
}

struct ScriptedSearch(Vec<SearchHit>);

#[async_trait]
impl SearchProvider for ScriptedSearch {
    async fn search(&self, _query: &str, limit: usize) -> anyhow::Result<Vec<SearchHit>> {
        Ok(self.0.iter().take(limit).cloned().collect())
    }
    fn name(&self) -> &'static str {
        "scripted"
    }
}

fn engine_with_hits(hits: Vec<SearchHit>) -> FusionEngine {
    let collector = EvidenceCollector::new(
        EvidenceConfig::default(),
        vec![Box::new(ScriptedSearch(hits))],
        None,
        Box::new(KeywordExtractor::default()),
        SourceWeightsConfig::default(),
    );
    FusionEngine::new(FusionPolicy::default(), StatisticalModel::default())
        .with_evidence(collector)
}

#[tokio::test]
async fn unanimous_away_evidence_beats_a_neutral_statistical_estimate() {
    let hits = vec![
        SearchHit {
            title: "Chelsea to win the derby, 85% say pundits".into(),
            snippet: "Chelsea favoured to beat Arsenal".into(),
            url: "https://www.bbc.co.uk/sport/1".into(),
        },
        SearchHit {
            title: "Prediction: Chelsea to win".into(),
            snippet: "Chelsea tipped to beat Arsenal away".into(),
            url: "https://www.forebet.com/en/2".into(),
        },
        SearchHit {
            title: "Chelsea victory expected".into(),
            snippet: "Chelsea should prevail over Arsenal".into(),
            url: "https://www.predictz.com/3".into(),
        },
    ];
    let engine = engine_with_hits(hits);

    let p = engine
        .predict(&fixture(), &even_strengths(), Mode::Full)
        .await
        .expect("prediction");

    assert_eq!(p.predicted_outcome, Outcome::AwayWin);
    assert_eq!(p.predicted_team, "Chelsea");
    assert!(p.probabilities.away_win > p.probabilities.home_win);
    assert!((p.probabilities.sum() - 100.0).abs() <= 1.0);
}

#[tokio::test]
async fn disagreeing_sources_damp_fused_confidence() {
    // Statistical leans home; the only web source screams away at 90%.
    let strengths = TeamStrengths {
        home: Some(TeamStrength {
            attack: 55.0,
            defense: 55.0,
            goals_per_game: 1.5,
        }),
        away: Some(TeamStrength {
            attack: 52.0,
            defense: 52.0,
            goals_per_game: 1.5,
        }),
    };
    let hits = vec![SearchHit {
        title: "Chelsea to win at Arsenal, 90% chance".into(),
        snippet: "Chelsea heavily favoured".into(),
        url: "https://www.bbc.co.uk/sport/1".into(),
    }];
    let engine = engine_with_hits(hits);

    let p = engine
        .predict(&fixture(), &strengths, Mode::Full)
        .await
        .expect("prediction");

    let stat_conf = p
        .sources_used
        .iter()
        .find(|s| s.source_type == SourceType::Statistical)
        .unwrap()
        .confidence;
    let web_conf = p
        .sources_used
        .iter()
        .find(|s| s.source_type == SourceType::Web)
        .unwrap()
        .confidence;

    assert!(
        p.confidence < stat_conf,
        "fused {} not below statistical {}",
        p.confidence,
        stat_conf
    );
    assert!(
        p.confidence < web_conf,
        "fused {} not below web {}",
        p.confidence,
        web_conf
    );
}

#[tokio::test]
async fn identical_inputs_yield_identical_predictions() {
    let hits = vec![SearchHit {
        title: "Arsenal to win, preview".into(),
        snippet: "Arsenal favoured against Chelsea".into(),
        url: "https://www.forebet.com/en/1".into(),
    }];
    let a = engine_with_hits(hits.clone())
        .predict(&fixture(), &even_strengths(), Mode::Full)
        .await
        .expect("prediction");
    let b = engine_with_hits(hits)
        .predict(&fixture(), &even_strengths(), Mode::Full)
        .await
        .expect("prediction");
    assert_eq!(a, b);
}
