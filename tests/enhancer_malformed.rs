//! A narrative backend that answers garbage contributes nothing; a valid
//! verdict joins the vote as one more weighted source.

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};

use match_fusion_engine::enhancer::{MockBackend, NarrativeEnhancer};
use match_fusion_engine::{
    Fixture, FixtureStatus, FusionEngine, FusionPolicy, Mode, Outcome, PredictionMethod,
    SourceType, StatisticalModel, TeamStrength, TeamStrengths,
};

fn fixture() -> Fixture {
    Fixture {
        id: 400,
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
            attack: 62.0,
            defense: 60.0,
            goals_per_game: 1.7,
        }),
        away: Some(TeamStrength {
            attack: 54.0,
            defense: 53.0,
            goals_per_game: 1.3,
        }),
    }
}

fn engine_with_backend(raw: &str) -> FusionEngine {
    let enhancer = NarrativeEnhancer::new(
        Arc::new(MockBackend::returning(raw)),
        0.85,
        Duration::from_secs(5),
    );
    FusionEngine::new(FusionPolicy::default(), StatisticalModel::default())
        .with_enhancer(enhancer)
}

#[tokio::test]
async fn non_numeric_confidence_contributes_no_signal() {
    let engine = engine_with_backend(
        r#"{"probabilities": {"home_win": 50, "draw": 30, "away_win": 20},
           "confidence": "very sure", "rationale": "trust me"}"#,
    );
    let p = engine
        .predict(&fixture(), &strengths(), Mode::Full)
        .await
        .expect("prediction");

    assert!(p.sources_used.iter().all(|s| s.source_type != SourceType::Ai));
    assert_eq!(p.prediction_method, PredictionMethod::StatisticalOnly);
    assert!((p.probabilities.sum() - 100.0).abs() <= 1.0);
}

#[tokio::test]
async fn prose_without_json_contributes_no_signal() {
    let engine = engine_with_backend("The home side will probably edge it, I feel.");
    let p = engine
        .predict(&fixture(), &strengths(), Mode::Full)
        .await
        .expect("prediction");

    assert!(p.sources_used.iter().all(|s| s.source_type != SourceType::Ai));
    assert!((p.probabilities.sum() - 100.0).abs() <= 1.0);
}

#[tokio::test]
async fn valid_verdict_joins_the_vote() {
    let engine = engine_with_backend(
        r#"{"probabilities": {"home_win": 62, "draw": 23, "away_win": 15},
           "confidence": 71, "rationale": "Evidence leans home throughout."}"#,
    );
    let p = engine
        .predict(&fixture(), &strengths(), Mode::Full)
        .await
        .expect("prediction");

    let ai = p
        .sources_used
        .iter()
        .find(|s| s.source_type == SourceType::Ai)
        .expect("ai signal present");
    assert_eq!(ai.outcome, Outcome::HomeWin);
    assert_eq!(ai.confidence, 71.0);
    assert_eq!(p.prediction_method, PredictionMethod::MultiSource);
    assert!((p.probabilities.sum() - 100.0).abs() <= 1.0);
}
