//! fixture.rs — domain types shared by every prediction source and the
//! fusion coordinator: fixtures, team strength figures, per-source signals,
//! and the fused `Prediction` returned to the caller.
//!
//! Everything here is plain data. Sources produce `SourceSignal`s, the
//! coordinator consumes them and hands back one `Prediction`; nothing in this
//! module performs I/O.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Full-time outcome of a match, from the home side's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    HomeWin,
    Draw,
    AwayWin,
}

impl Outcome {
    /// Display name used in UI-facing fields ("Arsenal", "Draw", ...).
    pub fn display_team(&self, fixture: &Fixture) -> String {
        match self {
            Outcome::HomeWin => fixture.home_team.clone(),
            Outcome::AwayWin => fixture.away_team.clone(),
            Outcome::Draw => "Draw".to_string(),
        }
    }
}

/// Lifecycle state of a fixture as supplied by the match-data collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FixtureStatus {
    Scheduled,
    InPlay,
    Finished,
    Postponed,
}

/// One upcoming (or in-progress) match. Immutable input; owned by the
/// fixture provider, only borrowed here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fixture {
    pub id: u64,
    pub home_team: String,
    pub away_team: String,
    pub competition: String,
    pub kickoff_utc: DateTime<Utc>,
    pub status: FixtureStatus,
}

impl Fixture {
    /// Check the caller contract: team names must be present and distinct.
    pub fn validate(&self) -> Result<(), ContractViolation> {
        if self.home_team.trim().is_empty() || self.away_team.trim().is_empty() {
            return Err(ContractViolation::EmptyTeamName);
        }
        if self.home_team.eq_ignore_ascii_case(&self.away_team) {
            return Err(ContractViolation::IdenticalTeams);
        }
        Ok(())
    }
}

/// Historical strength figures for one team (0–100 rating scale).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TeamStrength {
    pub attack: f32,
    pub defense: f32,
    pub goals_per_game: f32,
}

impl TeamStrength {
    /// Single composite rating used by the strength-differential model.
    pub fn rating(&self) -> f32 {
        (self.attack + self.defense) * 0.5
    }

    fn is_finite(&self) -> bool {
        self.attack.is_finite() && self.defense.is_finite() && self.goals_per_game.is_finite()
    }
}

/// Strength figures for both sides of a fixture. Either side may be absent;
/// the statistical model substitutes a league-average default in that case.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamStrengths {
    pub home: Option<TeamStrength>,
    pub away: Option<TeamStrength>,
}

impl TeamStrengths {
    pub fn validate(&self) -> Result<(), ContractViolation> {
        for s in [self.home, self.away].into_iter().flatten() {
            if !s.is_finite() {
                return Err(ContractViolation::NonFiniteStrength);
            }
        }
        Ok(())
    }
}

/// Which kind of producer emitted a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Statistical,
    Web,
    Ai,
}

/// One independent outcome/confidence estimate for a fixture. Produced by
/// exactly one source, immutable afterwards, and held only for the duration
/// of a single fusion call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceSignal {
    pub source_type: SourceType,
    /// Human-readable producer name, e.g. "strength-model", "bbc", "openai".
    pub source_name: String,
    pub outcome: Outcome,
    /// 0–100.
    pub confidence: f32,
    /// Trust weight in [0,1] from the reliability table.
    pub reliability: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
}

impl SourceSignal {
    pub fn new(
        source_type: SourceType,
        source_name: impl Into<String>,
        outcome: Outcome,
        confidence: f32,
        reliability: f32,
    ) -> Self {
        Self {
            source_type,
            source_name: source_name.into(),
            outcome,
            confidence: confidence.clamp(0.0, 100.0),
            reliability: clamp01(reliability),
            rationale: None,
        }
    }

    pub fn with_rationale(mut self, rationale: impl Into<String>) -> Self {
        self.rationale = Some(rationale.into());
        self
    }
}

/// Outcome probability triple in percent. Always normalized so the three
/// values are non-negative and sum to 100 within rounding tolerance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Probabilities {
    pub home_win: f32,
    pub draw: f32,
    pub away_win: f32,
}

impl Probabilities {
    /// Normalize raw non-negative scores into a percentage triple.
    /// Zero total degenerates to an even split rather than NaN.
    pub fn from_scores(home: f32, draw: f32, away: f32) -> Self {
        let (h, d, a) = (home.max(0.0), draw.max(0.0), away.max(0.0));
        let total = h + d + a;
        if total <= f32::EPSILON {
            return Self {
                home_win: 33.3,
                draw: 33.4,
                away_win: 33.3,
            };
        }
        Self {
            home_win: round1(h / total * 100.0),
            draw: round1(d / total * 100.0),
            away_win: round1(a / total * 100.0),
        }
    }

    pub fn get(&self, outcome: Outcome) -> f32 {
        match outcome {
            Outcome::HomeWin => self.home_win,
            Outcome::Draw => self.draw,
            Outcome::AwayWin => self.away_win,
        }
    }

    /// Outcome with the highest probability; home wins ties over away,
    /// non-draw over draw.
    pub fn top(&self) -> Outcome {
        if self.home_win >= self.away_win && self.home_win >= self.draw {
            Outcome::HomeWin
        } else if self.away_win >= self.draw {
            Outcome::AwayWin
        } else {
            Outcome::Draw
        }
    }

    pub fn sum(&self) -> f32 {
        self.home_win + self.draw + self.away_win
    }
}

/// One half-time-collapse estimate: the named side leads at half-time but
/// fails to win at full-time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioEstimate {
    pub team: String,
    /// Percent, typically in the 1.5–8.5 band.
    pub probability: f32,
    pub description: String,
}

/// Half-time scenarios for both sides. Always derived from the statistical
/// model; `damped` marks them as low-prominence when the fused top-level
/// confidence is weak.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HalfTimeScenarios {
    pub home_lead_collapse: ScenarioEstimate,
    pub away_lead_collapse: ScenarioEstimate,
    pub damped: bool,
}

/// Coarse indicator of how many independent sources backed a prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quality {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionMethod {
    StatisticalOnly,
    MultiSource,
}

/// The fused output of one prediction call. Built once, returned by value;
/// the engine never touches it again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub predicted_outcome: Outcome,
    /// Display name: winning team or "Draw".
    pub predicted_team: String,
    pub probabilities: Probabilities,
    /// 0–100.
    pub confidence: f32,
    pub half_time_scenarios: HalfTimeScenarios,
    pub reasoning: String,
    /// Contributing signals in collection order (statistical first).
    pub sources_used: Vec<SourceSignal>,
    pub prediction_method: PredictionMethod,
    pub prediction_quality: Quality,
}

/// Caller-selected cost/latency mode. `Fast` runs the statistical model
/// only; `Full` also fans out to the optional sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Fast,
    Full,
}

/// The one error class surfaced to callers: a broken input contract.
/// Environmental failures (timeouts, bad responses) never reach here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContractViolation {
    EmptyTeamName,
    IdenticalTeams,
    NonFiniteStrength,
}

impl fmt::Display for ContractViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContractViolation::EmptyTeamName => write!(f, "fixture has an empty team name"),
            ContractViolation::IdenticalTeams => {
                write!(f, "fixture has identical home and away teams")
            }
            ContractViolation::NonFiniteStrength => {
                write!(f, "team strength contains a non-finite value")
            }
        }
    }
}

impl std::error::Error for ContractViolation {}

pub(crate) fn clamp01(x: f32) -> f32 {
    if x < 0.0 {
        0.0
    } else if x > 1.0 {
        1.0
    } else {
        x
    }
}

pub(crate) fn round1(x: f32) -> f32 {
    (x * 10.0).round() / 10.0
}
