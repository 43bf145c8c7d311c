// src/config.rs
//! Engine configuration: one JSON document aggregating the per-source
//! settings and the fusion policy. Everything has a sensible default so the
//! engine also runs with no config file at all.

use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

use crate::enhancer::EnhancerConfig;
use crate::fixture::SourceType;
use crate::search::EvidenceConfig;
use crate::statistical::StatModelConfig;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub statistical: StatModelConfig,
    #[serde(default)]
    pub evidence: EvidenceConfig,
    #[serde(default)]
    pub enhancer: EnhancerConfig,
    #[serde(default)]
    pub fusion: FusionPolicy,
}

impl EngineConfig {
    /// Strict load: surface read/parse errors to the caller.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let data = fs::read_to_string(path)?;
        let mut cfg: EngineConfig = serde_json::from_str(&data)?;
        cfg.fusion.sanitize();
        Ok(cfg)
    }

    /// Lenient load: any failure falls back to defaults.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(path) {
            Ok(s) => {
                let mut cfg: EngineConfig = serde_json::from_str(&s).unwrap_or_default();
                cfg.fusion.sanitize();
                cfg
            }
            Err(_) => Self::default(),
        }
    }
}

/// The weighting scheme applied during reconciliation. These are calibration
/// knobs, not physical constants; the defaults come from the ensemble this
/// engine replaces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FusionPolicy {
    /// Base weight per source type in the vote.
    pub web_weight: f32,
    pub ai_weight: f32,
    pub statistical_weight: f32,
    /// Max fraction of the mean confidence removed when sources disagree.
    pub max_disagreement_penalty: f32,
    /// Added (scaled by winning vote share) when ≥2 source types agree.
    pub agreement_boost: f32,
    /// Fused confidence never exceeds this.
    pub confidence_cap: f32,
    /// Winning vote share needed for a "high" quality label.
    pub clear_majority: f32,
    /// Below this fused confidence, half-time scenarios are marked damped.
    pub damped_confidence_floor: f32,
}

impl Default for FusionPolicy {
    fn default() -> Self {
        Self {
            web_weight: 0.35,
            ai_weight: 0.30,
            statistical_weight: 0.25,
            max_disagreement_penalty: 0.5,
            agreement_boost: 6.0,
            confidence_cap: 95.0,
            clear_majority: 0.60,
            damped_confidence_floor: 50.0,
        }
    }
}

impl FusionPolicy {
    pub fn type_weight(&self, source_type: SourceType) -> f32 {
        match source_type {
            SourceType::Web => self.web_weight,
            SourceType::Ai => self.ai_weight,
            SourceType::Statistical => self.statistical_weight,
        }
    }

    /// Clamp fields that would otherwise break invariants downstream.
    fn sanitize(&mut self) {
        let d = Self::default();
        for (v, fallback) in [
            (&mut self.web_weight, d.web_weight),
            (&mut self.ai_weight, d.ai_weight),
            (&mut self.statistical_weight, d.statistical_weight),
        ] {
            if !v.is_finite() || *v <= 0.0 {
                *v = fallback;
            }
        }
        if !(0.0..=1.0).contains(&self.max_disagreement_penalty) {
            self.max_disagreement_penalty = d.max_disagreement_penalty;
        }
        if !(0.0..=1.0).contains(&self.clear_majority) {
            self.clear_majority = d.clear_majority;
        }
        if !(0.0..=100.0).contains(&self.confidence_cap) {
            self.confidence_cap = d.confidence_cap;
        }
        if !self.agreement_boost.is_finite() || self.agreement_boost < 0.0 {
            self.agreement_boost = d.agreement_boost;
        }
        if !(0.0..=100.0).contains(&self.damped_confidence_floor) {
            self.damped_confidence_floor = d.damped_confidence_floor;
        }
    }
}
