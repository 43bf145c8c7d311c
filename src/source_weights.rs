//! # Source Weights
//!
//! Configurable mapping from evidence sources (prediction sites, news
//! outlets, feed names) to normalized reliability weights in `[0.0, 1.0]`.
//!
//! - Loads from JSON config (weights + aliases).
//! - Case-insensitive lookup with normalization of punctuation, dashes, etc.
//! - Aliases map alternative spellings/domains to canonical sources.
//! - Fallback order: aliases → exact match → substring match → default.
//! - Includes a built-in `default_seed()` with common football outlets.
//!
//! A recognized outlet ("bbc", "sky sports") outweighs a generic blog; the
//! default weight is what an unknown domain earns.

use serde::Deserialize;
use std::{collections::HashMap, fs, path::Path};

use crate::fixture::clamp01;

/// Configuration for source weights, loaded from JSON or defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceWeightsConfig {
    /// Default weight if no match is found.
    #[serde(default = "default_default_weight")]
    pub default_weight: f32,
    /// Explicit weights for canonical source names.
    #[serde(default)]
    pub weights: HashMap<String, f32>,
    /// Aliases mapping non-canonical names → canonical names.
    #[serde(default)]
    pub aliases: HashMap<String, String>,
}

fn default_default_weight() -> f32 {
    0.70
}

impl Default for SourceWeightsConfig {
    fn default() -> Self {
        Self::default_seed()
    }
}

impl SourceWeightsConfig {
    /// Load configuration from a JSON file.
    /// Falls back to `default_seed()` on error.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(path) {
            Ok(s) => serde_json::from_str(&s).unwrap_or_else(|_| Self::default_seed()),
            Err(_) => Self::default_seed(),
        }
    }

    /// Get the weight for a given source name.
    ///
    /// Steps:
    /// 1. Alias lookup (normalized) → canonical → weight.
    /// 2. Exact weight match.
    /// 3. Substring fallback (e.g. "BBC Sport Football" → "bbc").
    /// 4. Default weight.
    pub fn weight_for(&self, source: &str) -> f32 {
        let s = normalize(source);

        // 1) Alias resolution.
        if let Some(canon) = self.aliases.get(&s) {
            let c = normalize(canon);
            if let Some(&w) = self.weights.get(&c) {
                return clamp01(w);
            }
        }

        // 2) Exact weight match.
        if let Some(&w) = self.weights.get(&s) {
            return clamp01(w);
        }

        // 3) Substring fallback.
        for (k, &w) in &self.weights {
            if s.contains(k) {
                return clamp01(w);
            }
        }

        // 4) Default.
        clamp01(self.default_weight)
    }

    /// Weight for a result URL: reduce to the host, strip `www.`, then run
    /// the normal lookup so "https://www.forebet.com/en/..." hits "forebet".
    pub fn weight_for_url(&self, url: &str) -> f32 {
        self.weight_for(&domain_of(url))
    }

    /// Built-in seed with common prediction sites and sports outlets.
    /// Used as fallback if no config is found.
    pub(crate) fn default_seed() -> Self {
        let mut weights = HashMap::new();
        let mut aliases = HashMap::new();

        for (k, v) in [
            ("bbc", 0.95),
            ("sky sports", 0.90),
            ("espn", 0.90),
            ("the guardian", 0.88),
            ("the athletic", 0.85),
            ("forebet", 0.85),
            ("betexplorer", 0.82),
            ("reuters", 0.85),
            ("predictz", 0.80),
            ("goal", 0.80),
            ("footystats", 0.78),
            ("whoscored", 0.78),
            ("sofascore", 0.76),
            ("soccervista", 0.75),
            ("flashscore", 0.74),
            ("football365", 0.72),
            ("soccernews", 0.70),
        ] {
            weights.insert(k.to_string(), v);
        }

        for (a, c) in [
            ("bbc sport", "bbc"),
            ("bbc co uk", "bbc"),
            ("skysports", "sky sports"),
            ("skysports com", "sky sports"),
            ("espn fc", "espn"),
            ("guardian", "the guardian"),
            ("theguardian", "the guardian"),
            ("theathletic", "the athletic"),
            ("athletic", "the athletic"),
            ("forebet com", "forebet"),
            ("predictz com", "predictz"),
            ("betexplorer com", "betexplorer"),
            ("goal com", "goal"),
            ("footystats org", "footystats"),
            ("whoscored com", "whoscored"),
            ("sofascore com", "sofascore"),
            ("soccervista com", "soccervista"),
            ("flashscore com", "flashscore"),
            ("football365 com", "football365"),
            ("soccernews com", "soccernews"),
        ] {
            aliases.insert(a.to_string(), c.to_string());
        }

        Self {
            default_weight: 0.70,
            weights,
            aliases,
        }
    }
}

/// Normalize input string: lowercase, replace punctuation/dashes with spaces,
/// collapse multiple spaces into one.
fn normalize(s: &str) -> String {
    let mut out = s.trim().to_ascii_lowercase();

    // Replace common separators with spaces.
    for ch in ['—', '–', '-', '_', '/', '\\'] {
        out = out.replace(ch, " ");
    }

    // Replace disruptive punctuation/whitespace with spaces.
    out = out.replace(['\n', '\r', '\t', '.', ',', '’', '\''], " ");

    // Collapse multiple spaces.
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Reduce a URL to its bare host: scheme and path stripped, `www.` removed.
fn domain_of(url: &str) -> String {
    let rest = url
        .trim()
        .strip_prefix("https://")
        .or_else(|| url.trim().strip_prefix("http://"))
        .unwrap_or_else(|| url.trim());
    let host = rest.split(['/', '?', '#']).next().unwrap_or(rest);
    let host = host.split('@').next_back().unwrap_or(host);
    let host = host.split(':').next().unwrap_or(host);
    host.strip_prefix("www.").unwrap_or(host).to_string()
}
