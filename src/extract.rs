//! extract.rs — free-text extraction heuristics: turn a search-result title,
//! snippet, or page body into a directional lean for one fixture.
//!
//! Extraction sits behind the one-method `SignalExtractor` trait so the
//! string-matching logic can be swapped or tested without touching any
//! network code. The default `KeywordExtractor` is phrase-driven and
//! configurable from TOML.

use once_cell::sync::OnceCell;
use regex::Regex;
use serde::Deserialize;

use crate::fixture::{Fixture, Outcome};

/// Directional lean extracted from one piece of text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lean {
    pub outcome: Outcome,
    /// 0–100, coarse: phrase count plus any explicit percent figure.
    pub confidence: f32,
}

/// Pluggable extraction strategy: text in, optional lean out.
pub trait SignalExtractor: Send + Sync {
    fn extract(&self, text: &str, fixture: &Fixture) -> Option<Lean>;
}

/* ----------------------------
Config schema (from TOML)
---------------------------- */

#[derive(Debug, Clone, Deserialize)]
pub struct ExtractorConfig {
    #[serde(default)]
    pub confidence: ConfidenceCfg,
    #[serde(default)]
    pub phrases: PhraseCfg,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConfidenceCfg {
    pub base: f32,
    pub per_hit: f32,
    pub cap: f32,
    pub draw_base: f32,
    pub draw_cap: f32,
}

impl Default for ConfidenceCfg {
    fn default() -> Self {
        Self {
            base: 60.0,
            per_hit: 10.0,
            cap: 90.0,
            draw_base: 55.0,
            draw_cap: 85.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PhraseCfg {
    pub win: Vec<String>,
    pub draw: Vec<String>,
}

impl Default for PhraseCfg {
    fn default() -> Self {
        let win = [
            "to win", "will win", "win", "victory", "beat", "defeat", "favored", "favoured",
            "favourite", "favorite", "edge", "should prevail",
        ];
        let draw = ["draw", "tie", "stalemate", "share the spoils", "all square"];
        Self {
            win: win.iter().map(|s| s.to_string()).collect(),
            draw: draw.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            confidence: ConfidenceCfg::default(),
            phrases: PhraseCfg::default(),
        }
    }
}

impl ExtractorConfig {
    /// Load from a TOML string; used by tests and custom deployments.
    pub fn from_toml_str(toml_str: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }
}

/* ----------------------------
Default keyword extractor
---------------------------- */

/// Phrase-count extractor: looks for "<team> to win" style directives, a
/// general win/draw vocabulary, and explicit percent figures, and scores a
/// coarse confidence from the number of favorable hits.
#[derive(Debug, Clone, Default)]
pub struct KeywordExtractor {
    cfg: ExtractorConfig,
}

impl KeywordExtractor {
    pub fn new(cfg: ExtractorConfig) -> Self {
        Self { cfg }
    }
}

impl SignalExtractor for KeywordExtractor {
    fn extract(&self, text: &str, fixture: &Fixture) -> Option<Lean> {
        // Canonical form: lowercase, punctuation folded to spaces, padded,
        // so phrase matches respect word boundaries ("ticket" ≠ "tie").
        let canon = canonical(&normalize_text(text));
        if canon.trim().is_empty() {
            return None;
        }

        // The result must actually be about one of the two teams.
        let home_mentions = mention_count(&canon, &fixture.home_team);
        let away_mentions = mention_count(&canon, &fixture.away_team);
        if home_mentions == 0 && away_mentions == 0 {
            return None;
        }

        let home_l = canonical(&fixture.home_team);
        let away_l = canonical(&fixture.away_team);

        // Explicit "<team> <phrase>" hits count double; a lone win word is
        // attributed to whichever team dominates the text.
        let mut home_hits = 0usize;
        let mut away_hits = 0usize;
        for p in &self.cfg.phrases.win {
            if canon.contains(&format!("{}{p} ", home_l)) {
                home_hits += 2;
            }
            if canon.contains(&format!("{}{p} ", away_l)) {
                away_hits += 2;
            }
        }
        if self
            .cfg
            .phrases
            .win
            .iter()
            .any(|p| canon.contains(&format!(" {p} ")))
        {
            if home_mentions > away_mentions {
                home_hits += 1;
            } else if away_mentions > home_mentions {
                away_hits += 1;
            }
        }
        let draw_hits = self
            .cfg
            .phrases
            .draw
            .iter()
            .filter(|p| canon.contains(&format!(" {p} ")))
            .count();

        let c = &self.cfg.confidence;
        let (outcome, hits, base, cap) = if home_hits > away_hits {
            (Outcome::HomeWin, home_hits, c.base, c.cap)
        } else if away_hits > home_hits {
            (Outcome::AwayWin, away_hits, c.base, c.cap)
        } else if draw_hits > 0 {
            (Outcome::Draw, draw_hits, c.draw_base, c.draw_cap)
        } else {
            return None;
        };

        let mut confidence = (base + c.per_hit * hits as f32).min(cap);
        // Odds-style "72%" phrasing overrides the phrase count when plausible.
        if let Some(pct) = percent_figure(&canon) {
            if (35.0..=95.0).contains(&pct) {
                confidence = confidence.max(pct).min(cap);
            }
        }

        Some(Lean { outcome, confidence })
    }
}

/// Count mentions of a team in canonical text. Exact full-name occurrences
/// first; otherwise a fuzzy pass over the team's distinctive name word so a
/// misspelt "Arsnal" still registers.
fn mention_count(canon: &str, team: &str) -> usize {
    let t = canonical(team);
    let direct = canon.matches(t.trim_end()).count();
    if direct > 0 {
        return direct;
    }
    let Some(key) = t.split_whitespace().filter(|w| w.len() >= 4).next_back() else {
        return 0;
    };
    canon
        .split_whitespace()
        .filter(|tok| tok.len() >= 4)
        .filter(|tok| strsim::jaro_winkler(key, tok) >= 0.92)
        .count()
}

/// Lowercase, fold punctuation to spaces, collapse runs, pad both ends so
/// `" phrase "` containment checks respect word boundaries. Keeps `%` for
/// the odds heuristic.
fn canonical(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push(' ');
    let mut prev_space = true;
    for ch in s.chars() {
        if ch.is_alphanumeric() || ch == '%' {
            for c in ch.to_lowercase() {
                out.push(c);
            }
            prev_space = false;
        } else if !prev_space {
            out.push(' ');
            prev_space = true;
        }
    }
    if !out.ends_with(' ') {
        out.push(' ');
    }
    out
}

/// First "NN%" figure in the text, if any.
fn percent_figure(text: &str) -> Option<f32> {
    static RE: OnceCell<Regex> = OnceCell::new();
    let re = RE.get_or_init(|| Regex::new(r"(\d{1,3})\s*%").unwrap());
    re.captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<f32>().ok())
}

/// Normalize text: decode HTML entities, strip tags, collapse whitespace,
/// cap length. Shared by the extractor and the page fetcher.
pub fn normalize_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, " ").to_string();

    // 3) Collapse whitespace
    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").to_string();
    out = out.trim().to_string();

    // 4) Length cap: 1500 chars
    if out.chars().count() > 1500 {
        out = out.chars().take(1500).collect();
    }

    out
}
