//! Missing reference data is recovered locally: league-average defaults with
//! visibly lower statistical confidence, never an error. A broken caller
//! contract, by contrast, is the one rejection the engine surfaces.

use chrono::{TimeZone, Utc};

use match_fusion_engine::{
    ContractViolation, Fixture, FixtureStatus, FusionEngine, FusionPolicy, Mode, SourceType,
    StatisticalModel, TeamStrength, TeamStrengths,
};

fn fixture() -> Fixture {
    Fixture {
        id: 500,
        home_team: "Arsenal".into(),
        away_team: "Newly Promoted FC".into(),
        competition: "FA Cup".into(),
        kickoff_utc: Utc.with_ymd_and_hms(2025, 9, 2, 19, 45, 0).unwrap(),
        status: FixtureStatus::Scheduled,
    }
}

fn engine() -> FusionEngine {
    FusionEngine::new(FusionPolicy::default(), StatisticalModel::default())
}

fn arsenal() -> TeamStrength {
    TeamStrength {
        attack: 70.0,
        defense: 66.0,
        goals_per_game: 2.0,
    }
}

#[tokio::test]
async fn missing_away_strength_lowers_statistical_confidence() {
    let full = engine()
        .predict(
            &fixture(),
            &TeamStrengths {
                home: Some(arsenal()),
                away: Some(TeamStrength {
                    attack: 48.0,
                    defense: 46.0,
                    goals_per_game: 1.1,
                }),
            },
            Mode::Fast,
        )
        .await
        .expect("prediction");

    let partial = engine()
        .predict(
            &fixture(),
            &TeamStrengths {
                home: Some(arsenal()),
                away: None,
            },
            Mode::Fast,
        )
        .await
        .expect("prediction with defaults");

    let conf = |p: &match_fusion_engine::Prediction| {
        p.sources_used
            .iter()
            .find(|s| s.source_type == SourceType::Statistical)
            .unwrap()
            .confidence
    };

    assert!(conf(&partial) < conf(&full));
    assert!((partial.probabilities.sum() - 100.0).abs() <= 1.0);
}

#[tokio::test]
async fn both_sides_missing_still_produces_a_prediction() {
    let p = engine()
        .predict(&fixture(), &TeamStrengths::default(), Mode::Fast)
        .await
        .expect("prediction");
    assert!((p.probabilities.sum() - 100.0).abs() <= 1.0);
    assert!(p.confidence > 0.0);
}

#[tokio::test]
async fn broken_contract_is_the_only_rejection() {
    let mut bad = fixture();
    bad.home_team = "".into();
    let err = engine()
        .predict(&bad, &TeamStrengths::default(), Mode::Fast)
        .await
        .expect_err("empty team name must be rejected");
    assert_eq!(err, ContractViolation::EmptyTeamName);

    let strengths = TeamStrengths {
        home: Some(TeamStrength {
            attack: f32::NAN,
            defense: 50.0,
            goals_per_game: 1.0,
        }),
        away: None,
    };
    let err = engine()
        .predict(&fixture(), &strengths, Mode::Fast)
        .await
        .expect_err("non-finite strength must be rejected");
    assert_eq!(err, ContractViolation::NonFiniteStrength);
}
