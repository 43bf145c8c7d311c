//! # Fusion Coordinator
//! Orchestrates one prediction call: statistical pass, optional concurrent
//! sources under independent time budgets, then weighted-vote reconciliation.
//!
//! Policy: every signal votes `type_weight × confidence × reliability`; the
//! outcome with the heaviest vote wins. Confidence blends the contributors'
//! figures, damped when they disagree and boosted when independent source
//! types agree. A `Prediction` comes back in every case except a broken
//! caller contract — all-sources-failed degrades to statistical-only.

use std::collections::BTreeSet;

use tracing::{debug, warn};

use crate::config::{EngineConfig, FusionPolicy};
use crate::enhancer::NarrativeEnhancer;
use crate::fixture::{
    ContractViolation, Fixture, Mode, Outcome, Prediction, PredictionMethod, Probabilities,
    Quality, SourceSignal, SourceType, TeamStrengths,
};
use crate::search::EvidenceCollector;
use crate::statistical::{StatisticalEstimate, StatisticalModel};

/// One engine instance per deployment; each `predict` call is independent,
/// holds no locks, and leaves no state behind.
pub struct FusionEngine {
    policy: FusionPolicy,
    model: StatisticalModel,
    evidence: Option<EvidenceCollector>,
    enhancer: Option<NarrativeEnhancer>,
}

impl FusionEngine {
    /// Statistical-only engine; optional sources attach via the builders.
    pub fn new(policy: FusionPolicy, model: StatisticalModel) -> Self {
        Self {
            policy,
            model,
            evidence: None,
            enhancer: None,
        }
    }

    pub fn with_evidence(mut self, collector: EvidenceCollector) -> Self {
        self.evidence = Some(collector);
        self
    }

    pub fn with_enhancer(mut self, enhancer: NarrativeEnhancer) -> Self {
        self.enhancer = Some(enhancer);
        self
    }

    /// Wire the full production engine from config.
    pub fn from_config(cfg: EngineConfig) -> Self {
        let mut engine = Self::new(cfg.fusion.clone(), StatisticalModel::new(cfg.statistical));
        if cfg.evidence.enabled {
            engine = engine.with_evidence(EvidenceCollector::from_config(&cfg.evidence));
        }
        if cfg.enhancer.enabled {
            engine = engine.with_enhancer(NarrativeEnhancer::from_config(&cfg.enhancer));
        }
        engine
    }

    /// Produce one fused prediction for a fixture.
    ///
    /// `Mode::Fast` skips the optional sources entirely. Environmental
    /// failures (timeouts, network errors, malformed replies) only reduce
    /// the set of contributing signals; the sole error path is a broken
    /// input contract.
    pub async fn predict(
        &self,
        fixture: &Fixture,
        strengths: &TeamStrengths,
        mode: Mode,
    ) -> Result<Prediction, ContractViolation> {
        fixture.validate()?;
        strengths.validate()?;

        // COLLECTING: the statistical source is synchronous and never fails.
        debug!(fixture = fixture.id, ?mode, phase = "collecting", "fusion start");
        let estimate = self.model.estimate(fixture, strengths);
        let mut signals: Vec<SourceSignal> = vec![estimate.signal.clone()];

        if mode == Mode::Full {
            // Evidence available to the enhancer is what exists at launch:
            // the two optional sources start together and must not block
            // each other.
            let launch_context = vec![estimate.signal.clone()];

            let evidence_fut = async {
                match &self.evidence {
                    // The collector enforces its own aggregate deadline and
                    // returns partial results instead of blocking.
                    Some(collector) => collector.collect(fixture).await,
                    None => Vec::new(),
                }
            };
            let enhancer_fut = async {
                match &self.enhancer {
                    Some(enhancer) => {
                        match tokio::time::timeout(
                            enhancer.budget(),
                            enhancer.assess(fixture, &launch_context),
                        )
                        .await
                        {
                            Ok(signal) => signal,
                            Err(_) => {
                                // Dropping the future abandons the in-flight
                                // request; nothing to clean up.
                                warn!(fixture = fixture.id, "narrative enhancer timed out");
                                None
                            }
                        }
                    }
                    None => None,
                }
            };

            let (web_signals, ai_signal) = tokio::join!(evidence_fut, enhancer_fut);
            signals.extend(web_signals);
            signals.extend(ai_signal);
        }

        debug!(
            fixture = fixture.id,
            signals = signals.len(),
            phase = "reconciling",
            "fusion merge"
        );
        Ok(self.reconcile(fixture, &estimate, signals))
    }

    /// RECONCILING → DONE: weighted vote, confidence blending, labels.
    fn reconcile(
        &self,
        fixture: &Fixture,
        estimate: &StatisticalEstimate,
        signals: Vec<SourceSignal>,
    ) -> Prediction {
        let p = &self.policy;

        const OUTCOMES: [Outcome; 3] = [Outcome::HomeWin, Outcome::Draw, Outcome::AwayWin];
        let mut votes = [0.0f32; 3];
        let mut conf_weight_sum = 0.0f32;
        let mut weighted_conf_sum = 0.0f32;

        for s in &signals {
            let weight = p.type_weight(s.source_type) * (s.confidence / 100.0) * s.reliability;
            let slot = OUTCOMES.iter().position(|o| *o == s.outcome).unwrap_or(0);
            votes[slot] += weight;
            weighted_conf_sum += s.confidence * weight;
            conf_weight_sum += weight;
        }

        let total: f32 = votes.iter().sum();
        let (predicted_outcome, probabilities) = if total <= f32::EPSILON {
            // Every signal carried zero weight; fall back to the raw
            // statistical triple rather than inventing a vote.
            (estimate.probabilities.top(), estimate.probabilities)
        } else {
            (
                pick_outcome(&votes, &estimate.probabilities),
                Probabilities::from_scores(votes[0], votes[1], votes[2]),
            )
        };

        let top_share = if total > f32::EPSILON {
            votes[OUTCOMES.iter().position(|o| *o == predicted_outcome).unwrap()] / total
        } else {
            1.0
        };

        // Confidence: weighted mean, damped by the dissenting vote share,
        // boosted when independent source types back the winner.
        let mean_conf = if conf_weight_sum > f32::EPSILON {
            weighted_conf_sum / conf_weight_sum
        } else {
            estimate.signal.confidence
        };
        let dissent = (1.0 - top_share).max(0.0);
        let penalty = (2.0 * dissent).min(1.0) * p.max_disagreement_penalty;
        let mut confidence = mean_conf * (1.0 - penalty);

        let agreeing_types: BTreeSet<&'static str> = signals
            .iter()
            .filter(|s| s.outcome == predicted_outcome)
            .map(|s| type_tag(s.source_type))
            .collect();
        if agreeing_types.len() >= 2 {
            confidence += p.agreement_boost * top_share;
        }
        let confidence = confidence.clamp(0.0, p.confidence_cap);

        let optional_count = signals
            .iter()
            .filter(|s| s.source_type != SourceType::Statistical)
            .count();
        let distinct_types: BTreeSet<&'static str> =
            signals.iter().map(|s| type_tag(s.source_type)).collect();

        let prediction_quality = if optional_count == 0 {
            Quality::Low
        } else if optional_count >= 2
            && distinct_types.len() >= 2
            && top_share >= p.clear_majority
        {
            Quality::High
        } else {
            Quality::Medium
        };
        let prediction_method = if optional_count == 0 {
            PredictionMethod::StatisticalOnly
        } else {
            PredictionMethod::MultiSource
        };

        let mut half_time_scenarios = estimate.half_time.clone();
        half_time_scenarios.damped = confidence < p.damped_confidence_floor;

        let reasoning = build_reasoning(&signals);
        let predicted_team = predicted_outcome.display_team(fixture);

        debug!(fixture = fixture.id, phase = "done", ?prediction_quality, "fusion complete");
        Prediction {
            predicted_outcome,
            predicted_team,
            probabilities,
            confidence,
            half_time_scenarios,
            reasoning,
            sources_used: signals,
            prediction_method,
            prediction_quality,
        }
    }
}

fn type_tag(t: SourceType) -> &'static str {
    match t {
        SourceType::Statistical => "statistical",
        SourceType::Web => "web",
        SourceType::Ai => "ai",
    }
}

/// Winner of the weighted vote. On exactly equal votes, prefer the non-draw
/// outcome with the higher raw statistical probability, else draw.
fn pick_outcome(votes: &[f32; 3], statistical: &Probabilities) -> Outcome {
    const OUTCOMES: [Outcome; 3] = [Outcome::HomeWin, Outcome::Draw, Outcome::AwayWin];
    let max = votes.iter().copied().fold(f32::MIN, f32::max);
    let tied: Vec<Outcome> = OUTCOMES
        .iter()
        .zip(votes.iter())
        .filter(|(_, v)| **v == max)
        .map(|(o, _)| *o)
        .collect();

    if tied.len() == 1 {
        return tied[0];
    }

    let non_draw: Vec<Outcome> = tied
        .iter()
        .copied()
        .filter(|o| *o != Outcome::Draw)
        .collect();
    match non_draw.as_slice() {
        [only] => *only,
        [a, b] => {
            let (pa, pb) = (statistical.get(*a), statistical.get(*b));
            if pa > pb {
                *a
            } else if pb > pa {
                *b
            } else {
                Outcome::Draw
            }
        }
        _ => Outcome::Draw,
    }
}

/// Short explanation from the top contributors, in collection order.
fn build_reasoning(signals: &[SourceSignal]) -> String {
    let parts: Vec<String> = signals
        .iter()
        .filter_map(|s| {
            s.rationale
                .as_deref()
                .map(|r| format!("{}: {}", s.source_name, r))
        })
        .take(3)
        .collect();
    if parts.is_empty() {
        format!("Fused {} source(s)", signals.len())
    } else {
        format!("Fused {} source(s). {}", signals.len(), parts.join("; "))
    }
}
