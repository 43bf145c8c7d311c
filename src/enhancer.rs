//! Narrative enhancer: provider abstraction over a generative-text backend.
//!
//! The backend is handed the fixture plus the evidence gathered so far and
//! asked for a reconciled probability triple with a short rationale. It is
//! one more weighted source, never an override, and every failure mode —
//! transport error, quota rejection, malformed JSON — degrades to "no
//! signal" rather than surfacing to the caller.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::fixture::{Fixture, Outcome, Probabilities, SourceSignal, SourceType};

// ------------------------------------------------------------
// Public surface
// ------------------------------------------------------------

/// Structured verdict returned by narrative backends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiVerdict {
    pub probabilities: Probabilities,
    /// 0–100.
    pub confidence: f32,
    pub rationale: String,
}

/// Low-level backend: performs the actual remote call. Separated from the
/// enhancer so tests can script responses through the same parsing path.
pub trait NarrativeBackend: Send + Sync {
    fn assess<'a>(
        &'a self,
        prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = Option<AiVerdict>> + Send + 'a>>;
    /// Backend name for diagnostics and the signal's `source_name`.
    fn name(&self) -> &'static str;
}

pub type DynNarrativeBackend = Arc<dyn NarrativeBackend>;

/// Config for the enhancer, loaded as part of `EngineConfig`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnhancerConfig {
    pub enabled: bool,
    /// "openai" is the only wired provider; anything else is disabled.
    pub provider: String,
    pub model: String,
    /// "ENV" means: read from OPENAI_API_KEY.
    pub api_key: String,
    /// Time budget for the whole enhancer pass, enforced by the coordinator.
    pub budget_ms: u64,
    /// Reliability attached to the resulting signal.
    pub reliability: f32,
}

impl Default for EnhancerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: "openai".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key: "ENV".to_string(),
            budget_ms: 8_000,
            reliability: 0.85,
        }
    }
}

impl EnhancerConfig {
    fn resolve_api_key(&self) -> Option<String> {
        if self.api_key.trim().eq_ignore_ascii_case("env") {
            std::env::var("OPENAI_API_KEY").ok()
        } else {
            Some(self.api_key.clone())
        }
    }
}

/// Factory: build a backend according to config. Unknown providers or a
/// missing key fall back to the disabled backend rather than erroring.
pub fn build_backend(config: &EnhancerConfig) -> DynNarrativeBackend {
    if !config.enabled {
        return Arc::new(DisabledBackend);
    }
    match config.provider.to_ascii_lowercase().as_str() {
        "openai" => match config.resolve_api_key() {
            Some(key) if !key.is_empty() => {
                Arc::new(OpenAiBackend::new(key, Some(&config.model)))
            }
            _ => {
                tracing::warn!("enhancer enabled but no api key resolved; disabling");
                Arc::new(DisabledBackend)
            }
        },
        other => {
            tracing::warn!(provider = other, "unknown narrative provider; disabling");
            Arc::new(DisabledBackend)
        }
    }
}

// ------------------------------------------------------------
// Concrete backends
// ------------------------------------------------------------

/// OpenAI backend (Chat Completions API).
pub struct OpenAiBackend {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl OpenAiBackend {
    /// `model_override`: pass Some("gpt-4o-mini") to override; defaults to gpt-4o-mini.
    pub fn new(api_key: String, model_override: Option<&str>) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("match-fusion-engine/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(10))
            .build()
            .expect("reqwest client");
        let model = model_override.unwrap_or("gpt-4o-mini").to_string();
        Self {
            http,
            api_key,
            model,
        }
    }
}

impl NarrativeBackend for OpenAiBackend {
    fn assess<'a>(
        &'a self,
        prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = Option<AiVerdict>> + Send + 'a>> {
        Box::pin(async move {
            if self.api_key.is_empty() {
                return None;
            }

            #[derive(Serialize)]
            struct Msg<'a> {
                role: &'a str,
                content: &'a str,
            }
            #[derive(Serialize)]
            struct Req<'a> {
                model: &'a str,
                messages: Vec<Msg<'a>>,
                temperature: f32,
                max_tokens: u32,
            }
            #[derive(Deserialize)]
            struct Resp {
                choices: Vec<Choice>,
            }
            #[derive(Deserialize)]
            struct Choice {
                message: ChoiceMsg,
            }
            #[derive(Deserialize)]
            struct ChoiceMsg {
                content: String,
            }

            let sys = "You are a football match analyst. Use ONLY the evidence supplied by the user; \
                       never introduce facts from outside it. Reply with ONE JSON object and nothing else.";
            let req = Req {
                model: &self.model,
                messages: vec![
                    Msg {
                        role: "system",
                        content: sys,
                    },
                    Msg {
                        role: "user",
                        content: prompt,
                    },
                ],
                temperature: 0.3,
                max_tokens: 400,
            };

            let resp = self
                .http
                .post("https://api.openai.com/v1/chat/completions")
                .bearer_auth(&self.api_key)
                .json(&req)
                .send()
                .await
                .ok()?;

            if !resp.status().is_success() {
                // Covers quota rejections (429) and auth failures alike.
                tracing::warn!(status = %resp.status(), "narrative backend refused");
                return None;
            }
            let body: Resp = resp.json().await.ok()?;
            let content = body
                .choices
                .first()
                .map(|c| c.message.content.as_str())
                .unwrap_or("");
            parse_verdict(content)
        })
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

/// Returns `None` always; used when the enhancer is disabled.
pub struct DisabledBackend;

impl NarrativeBackend for DisabledBackend {
    fn assess<'a>(
        &'a self,
        _prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = Option<AiVerdict>> + Send + 'a>> {
        Box::pin(async { None })
    }
    fn name(&self) -> &'static str {
        "disabled"
    }
}

/// Scripted backend for tests/local runs: feeds a fixed raw "model output"
/// through the same parsing path as the real provider.
#[derive(Clone)]
pub struct MockBackend {
    pub raw: String,
}

impl MockBackend {
    pub fn returning(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }
}

impl NarrativeBackend for MockBackend {
    fn assess<'a>(
        &'a self,
        _prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = Option<AiVerdict>> + Send + 'a>> {
        Box::pin(async move { parse_verdict(&self.raw) })
    }
    fn name(&self) -> &'static str {
        "mock"
    }
}

// ------------------------------------------------------------
// Enhancer facade
// ------------------------------------------------------------

/// Turns a backend verdict into one weighted `SourceSignal`.
pub struct NarrativeEnhancer {
    backend: DynNarrativeBackend,
    reliability: f32,
    budget: Duration,
}

impl NarrativeEnhancer {
    pub fn new(backend: DynNarrativeBackend, reliability: f32, budget: Duration) -> Self {
        Self {
            backend,
            reliability,
            budget,
        }
    }

    pub fn from_config(config: &EnhancerConfig) -> Self {
        Self::new(
            build_backend(config),
            config.reliability,
            Duration::from_millis(config.budget_ms),
        )
    }

    /// Time budget the coordinator should allow this source.
    pub fn budget(&self) -> Duration {
        self.budget
    }

    /// Ask the backend to reconcile the supplied evidence. `None` on any
    /// backend failure or unusable verdict.
    pub async fn assess(&self, fixture: &Fixture, evidence: &[SourceSignal]) -> Option<SourceSignal> {
        let prompt = build_prompt(fixture, evidence);
        let verdict = self.backend.assess(&prompt).await?;

        let outcome = verdict.probabilities.top();
        let rationale = sanitize_rationale(&verdict.rationale);
        let mut signal = SourceSignal::new(
            SourceType::Ai,
            self.backend.name(),
            outcome,
            verdict.confidence,
            self.reliability,
        );
        if !rationale.is_empty() {
            signal = signal.with_rationale(rationale);
        }
        Some(signal)
    }
}

/// Structured summary handed to the backend: fixture header, one line per
/// collected signal, and the exact reply format.
pub fn build_prompt(fixture: &Fixture, evidence: &[SourceSignal]) -> String {
    let mut lines = String::new();
    if evidence.is_empty() {
        lines.push_str("- (no evidence collected)\n");
    }
    for s in evidence {
        let outcome = match s.outcome {
            Outcome::HomeWin => "HOME_WIN",
            Outcome::Draw => "DRAW",
            Outcome::AwayWin => "AWAY_WIN",
        };
        let rationale = s.rationale.as_deref().unwrap_or("");
        lines.push_str(&format!(
            "- {} ({:?}): {} at {:.0}% confidence. {}\n",
            s.source_name, s.source_type, outcome, s.confidence, rationale
        ));
    }

    format!(
        "MATCH: {home} (home) vs {away} (away)\n\
         COMPETITION: {comp}\n\
         KICKOFF: {kickoff}\n\n\
         COLLECTED EVIDENCE:\n{lines}\n\
         Reconcile the evidence above into one match forecast. Stay consistent with \
         the evidence; do not invent form, injuries, or results that are not listed.\n\
         Reply with ONLY this JSON object:\n\
         {{\"probabilities\": {{\"home_win\": 0, \"draw\": 0, \"away_win\": 0}}, \
         \"confidence\": 0, \"rationale\": \"1-3 sentences\"}}\n\
         Percentages must sum to 100.",
        home = fixture.home_team,
        away = fixture.away_team,
        comp = fixture.competition,
        kickoff = fixture.kickoff_utc.format("%Y-%m-%d %H:%M UTC"),
        lines = lines,
    )
}

/// Parse a backend reply into a verdict. Strict: the outermost JSON object
/// must deserialize with numeric, finite fields, otherwise `None`.
pub fn parse_verdict(content: &str) -> Option<AiVerdict> {
    let start = content.find('{')?;
    let end = content.rfind('}')?;
    if end < start {
        return None;
    }

    #[derive(Deserialize)]
    struct RawProbs {
        home_win: f32,
        draw: f32,
        away_win: f32,
    }
    #[derive(Deserialize)]
    struct Raw {
        probabilities: RawProbs,
        confidence: f32,
        #[serde(default)]
        rationale: String,
    }

    let raw: Raw = serde_json::from_str(&content[start..=end]).ok()?;
    let p = &raw.probabilities;
    for v in [p.home_win, p.draw, p.away_win, raw.confidence] {
        if !v.is_finite() || v < 0.0 {
            return None;
        }
    }
    if p.home_win + p.draw + p.away_win <= f32::EPSILON {
        return None;
    }

    Some(AiVerdict {
        probabilities: Probabilities::from_scores(p.home_win, p.draw, p.away_win),
        confidence: raw.confidence.clamp(0.0, 100.0),
        rationale: raw.rationale,
    })
}

/// Ensure ASCII-only, single line, and <=240 chars. Collapses whitespace.
pub fn sanitize_rationale(input: &str) -> String {
    let mut out = String::with_capacity(240);
    let mut prev_space = false;
    for ch in input.chars() {
        let c = match ch {
            '\r' | '\n' | '\t' => ' ',
            c if c.is_ascii() => c,
            _ => ' ',
        };
        if c == ' ' {
            if !prev_space && !out.is_empty() {
                out.push(' ');
            }
            prev_space = true;
        } else {
            out.push(c);
            prev_space = false;
        }
        if out.len() >= 240 {
            break;
        }
    }
    out.trim().to_string()
}
