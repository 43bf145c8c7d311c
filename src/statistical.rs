//! statistical.rs — strength-differential outcome model.
//!
//! The always-available prediction source: maps two `TeamStrength` records
//! (plus a home-advantage adjustment) onto a probability triple, a confidence
//! figure, and the half-time-collapse scenario estimates. Pure business
//! logic, no I/O, no clock; identical inputs always produce identical
//! outputs, which the idempotence tests rely on.

use serde::{Deserialize, Serialize};

use crate::fixture::{
    round1, Fixture, HalfTimeScenarios, Probabilities, ScenarioEstimate, SourceSignal, SourceType,
    TeamStrengths,
};

/// `source_name` carried by every statistical signal.
pub const SOURCE_NAME: &str = "strength-model";

/// Reliability attached to the statistical source. Kept below the curated
/// web outlets: the model knows nothing about injuries or lineups.
pub const SOURCE_RELIABILITY: f32 = 0.70;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StatModelConfig {
    /// Flat rating bonus for playing at home.
    pub home_advantage: f32,
    /// Confidence is clamped here so the model never claims near-certainty.
    pub confidence_ceiling: f32,
    /// League-average substitutes when a side has no strength record.
    pub default_rating: f32,
    pub default_goals_per_game: f32,
    /// Confidence multiplier applied when a default had to be substituted.
    pub missing_data_damping: f32,
}

impl Default for StatModelConfig {
    fn default() -> Self {
        Self {
            home_advantage: 3.5,
            confidence_ceiling: 85.0,
            default_rating: 50.0,
            default_goals_per_game: 1.3,
            missing_data_damping: 0.75,
        }
    }
}

/// Everything the coordinator needs from the statistical pass: the signal
/// that joins the fusion vote, plus the raw triple and half-time figures
/// that only this source produces.
#[derive(Debug, Clone, PartialEq)]
pub struct StatisticalEstimate {
    pub signal: SourceSignal,
    pub probabilities: Probabilities,
    pub half_time: HalfTimeScenarios,
}

#[derive(Debug, Clone, Default)]
pub struct StatisticalModel {
    cfg: StatModelConfig,
}

impl StatisticalModel {
    pub fn new(cfg: StatModelConfig) -> Self {
        Self { cfg }
    }

    /// Compute the full statistical estimate for a fixture. Never fails:
    /// missing strength records degrade to league-average defaults with
    /// damped confidence.
    pub fn estimate(&self, fixture: &Fixture, strengths: &TeamStrengths) -> StatisticalEstimate {
        let (home_rating, home_goals, home_defaulted) = match strengths.home {
            Some(s) => (s.rating(), s.goals_per_game, false),
            None => (self.cfg.default_rating, self.cfg.default_goals_per_game, true),
        };
        let (away_rating, away_goals, away_defaulted) = match strengths.away {
            Some(s) => (s.rating(), s.goals_per_game, false),
            None => (self.cfg.default_rating, self.cfg.default_goals_per_game, true),
        };

        // Home advantage scales with how solid the home side currently is.
        let mut home_advantage = self.cfg.home_advantage;
        if home_rating > 60.0 {
            home_advantage += 1.5;
        } else if home_rating < 40.0 {
            home_advantage -= 0.5;
        }

        let diff = (home_rating + home_advantage) - away_rating;
        let (mut home, mut draw, mut away) = probability_ladder(diff);

        // Sides that out-score the other by a clear margin get a nudge.
        if home_goals > away_goals + 0.5 {
            home += 0.05;
            away -= 0.03;
            draw -= 0.02;
        } else if away_goals > home_goals + 0.5 {
            away += 0.05;
            home -= 0.03;
            draw -= 0.02;
        }

        let probabilities = Probabilities::from_scores(home, draw, away);
        let outcome = probabilities.top();

        let mut confidence = probabilities
            .get(outcome)
            .min(self.cfg.confidence_ceiling);
        let defaulted = home_defaulted || away_defaulted;
        if defaulted {
            confidence *= self.cfg.missing_data_damping;
        }

        let rationale = self.describe(fixture, diff, home_goals, away_goals, defaulted);
        let signal = SourceSignal::new(
            SourceType::Statistical,
            SOURCE_NAME,
            outcome,
            confidence,
            SOURCE_RELIABILITY,
        )
        .with_rationale(rationale);

        let half_time = HalfTimeScenarios {
            home_lead_collapse: ScenarioEstimate {
                team: fixture.home_team.clone(),
                probability: collapse_probability(
                    home_rating + home_advantage,
                    away_rating,
                    Side::Home,
                    &fixture.home_team,
                    &fixture.away_team,
                ),
                description: format!(
                    "{} leads at half-time but fails to win",
                    fixture.home_team
                ),
            },
            away_lead_collapse: ScenarioEstimate {
                team: fixture.away_team.clone(),
                probability: collapse_probability(
                    away_rating,
                    home_rating + home_advantage,
                    Side::Away,
                    &fixture.home_team,
                    &fixture.away_team,
                ),
                description: format!(
                    "{} leads at half-time but fails to win",
                    fixture.away_team
                ),
            },
            damped: false,
        };

        StatisticalEstimate {
            signal,
            probabilities,
            half_time,
        }
    }

    fn describe(
        &self,
        fixture: &Fixture,
        diff: f32,
        home_goals: f32,
        away_goals: f32,
        defaulted: bool,
    ) -> String {
        let mut parts: Vec<String> = Vec::new();

        if diff > 15.0 {
            parts.push(format!("{} clearly stronger on ratings", fixture.home_team));
        } else if diff > 8.0 {
            parts.push(format!("{} stronger on ratings", fixture.home_team));
        } else if diff < -15.0 {
            parts.push(format!("{} clearly stronger on ratings", fixture.away_team));
        } else if diff < -8.0 {
            parts.push(format!("{} stronger on ratings", fixture.away_team));
        } else {
            parts.push("evenly matched on ratings".to_string());
        }

        if home_goals > away_goals + 0.5 {
            parts.push(format!("{} scoring more per game", fixture.home_team));
        } else if away_goals > home_goals + 0.5 {
            parts.push(format!("{} scoring more per game", fixture.away_team));
        }

        if defaulted {
            parts.push("league-average figures substituted for missing data".to_string());
        }

        parts.join("; ")
    }
}

/// Tiered mapping from adjusted rating differential to outcome fractions
/// (home, draw, away).
fn probability_ladder(diff: f32) -> (f32, f32, f32) {
    if diff > 20.0 {
        (0.85, 0.07, 0.08)
    } else if diff > 15.0 {
        (0.82, 0.08, 0.10)
    } else if diff > 10.0 {
        (0.75, 0.10, 0.15)
    } else if diff > 5.0 {
        (0.65, 0.15, 0.20)
    } else if diff > -5.0 {
        (0.45, 0.20, 0.35)
    } else if diff > -10.0 {
        (0.20, 0.15, 0.65)
    } else if diff > -15.0 {
        (0.10, 0.08, 0.82)
    } else {
        (0.08, 0.07, 0.85)
    }
}

#[derive(Clone, Copy)]
enum Side {
    Home,
    Away,
}

/// Probability (percent) that `strength` leads at half-time yet fails to win.
/// Moderate favourites blow leads most often; huge favourites rarely do, and
/// away sides concede leads slightly more than home sides.
fn collapse_probability(
    strength: f32,
    opponent: f32,
    side: Side,
    home_team: &str,
    away_team: &str,
) -> f32 {
    let mut prob = 4.0;
    let gap = (strength - opponent).abs();

    if (5.0..=15.0).contains(&gap) {
        prob += 2.0;
    } else if gap > 20.0 {
        prob -= 1.0;
    }

    if matches!(side, Side::Away) {
        prob += 0.8;
    }

    // Per-matchup variation in ±1.5, derived from the team names so the
    // model stays deterministic.
    let tag = match side {
        Side::Home => format!("{home_team}|{away_team}|h"),
        Side::Away => format!("{home_team}|{away_team}|a"),
    };
    prob += matchup_jitter(&tag);

    round1(prob.clamp(1.5, 8.5))
}

/// FNV-1a over the matchup tag, folded into [-1.5, 1.5].
fn matchup_jitter(tag: &str) -> f32 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for b in tag.bytes() {
        hash ^= u64::from(b);
        hash = hash.wrapping_mul(0x1000_0000_01b3);
    }
    let unit = (hash % 3001) as f32 / 3000.0;
    unit * 3.0 - 1.5
}
