//! Offline demo: fuse one prediction from deterministic local sources and
//! print it as JSON. No network access; the RSS provider runs on an embedded
//! feed and the narrative backend is scripted.
//!
//! Run with `cargo run --bin predict_demo`. Set RUST_LOG=debug for the
//! phase-by-phase trace.

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use match_fusion_engine::enhancer::{MockBackend, NarrativeEnhancer};
use match_fusion_engine::extract::KeywordExtractor;
use match_fusion_engine::search::providers::rss::RssSearchProvider;
use match_fusion_engine::search::types::SearchProvider;
use match_fusion_engine::source_weights::SourceWeightsConfig;
use match_fusion_engine::{
    EvidenceCollector, EvidenceConfig, Fixture, FixtureStatus, FusionEngine, FusionPolicy, Mode,
    StatisticalModel, TeamStrength, TeamStrengths,
};

const DEMO_FEED: &str = r#"<?xml version="1.0"?>
<rss version="2.0">
  <channel>
    <title>Demo Football Feed</title>
    <item>
      <title>Weekend preview: Arsenal to win the London derby</title>
      <link>https://www.bbc.co.uk/sport/football/demo-1</link>
      <pubDate>Fri, 22 Aug 2025 18:00:00 +0000</pubDate>
      <description>Arsenal favoured at home; Chelsea missing key starters.</description>
    </item>
    <item>
      <title>Stats corner: Arsenal vs Chelsea, 64% home edge</title>
      <link>https://www.forebet.com/en/demo-2</link>
      <pubDate>Fri, 22 Aug 2025 16:00:00 +0000</pubDate>
      <description>Arsenal to win according to the model consensus.</description>
    </item>
  </channel>
</rss>"#;

const DEMO_VERDICT: &str = r#"{"probabilities": {"home_win": 58, "draw": 24, "away_win": 18},
  "confidence": 70,
  "rationale": "Both the strength model and the previews lean home; no contradicting evidence."}"#;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();

    let fixture = Fixture {
        id: 1001,
        home_team: "Arsenal".into(),
        away_team: "Chelsea".into(),
        competition: "Premier League".into(),
        kickoff_utc: chrono::Utc::now() + chrono::Duration::days(2),
        status: FixtureStatus::Scheduled,
    };
    let strengths = TeamStrengths {
        home: Some(TeamStrength {
            attack: 72.0,
            defense: 68.0,
            goals_per_game: 2.1,
        }),
        away: Some(TeamStrength {
            attack: 64.0,
            defense: 61.0,
            goals_per_game: 1.4,
        }),
    };

    let providers: Vec<Box<dyn SearchProvider>> =
        vec![Box::new(RssSearchProvider::from_fixture(DEMO_FEED))];
    let collector = EvidenceCollector::new(
        EvidenceConfig::default(),
        providers,
        None,
        Box::new(KeywordExtractor::default()),
        SourceWeightsConfig::default(),
    );
    let enhancer = NarrativeEnhancer::new(
        Arc::new(MockBackend::returning(DEMO_VERDICT)),
        0.85,
        Duration::from_secs(5),
    );

    let engine = FusionEngine::new(FusionPolicy::default(), StatisticalModel::default())
        .with_evidence(collector)
        .with_enhancer(enhancer);

    let prediction = engine.predict(&fixture, &strengths, Mode::Full).await?;
    println!("{}", serde_json::to_string_pretty(&prediction)?);

    Ok(())
}
