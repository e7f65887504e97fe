//! Scoring Engine: judgment call with a deterministic keyword fallback.
//!
//! Flow per (JD, résumé) pair:
//! validate → truncate → one judgment call (bounded by a deadline) → parse the
//! outermost `{...}` → normalize fields → enrich with keyword overlap.
//!
//! Any failure along that path (blank input, transport error, timeout,
//! malformed JSON, non-numeric score) lands in `fallback_score`, so `score`
//! never returns an error. Both paths produce the same `Assessment` shape.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{error, warn};

use crate::extraction::identity::name_from_first_lines;
use crate::llm_client::LlmError;
use crate::models::candidate::{Assessment, Classification, UNKNOWN_NAME};
use crate::screening::keywords::keyword_match;
use crate::screening::prompts::build_judgment_prompt;
use crate::timing::log_performance;

pub const DEFAULT_MAX_JD_CHARS: usize = 1500;
pub const DEFAULT_MAX_RESUME_CHARS: usize = 3000;
pub const DEFAULT_JUDGMENT_TIMEOUT: Duration = Duration::from_secs(60);

/// Score used when the judgment response omits `score` entirely.
const DEFAULT_JUDGMENT_SCORE: f64 = 50.0;
const NO_SUMMARY: &str = "No summary available";

const FALLBACK_NAME_LINES: usize = 5;
const FALLBACK_SCORE_CAP: f64 = 85.0;
const FALLBACK_NO_MATCH_SCORE: f64 = 50.0;

// ────────────────────────────────────────────────────────────────────────────
// Judgment service seam
// ────────────────────────────────────────────────────────────────────────────

/// External text-generation service. One prompt in, one completion out.
///
/// Implementations make exactly one attempt; the engine does not retry.
#[async_trait]
pub trait JudgmentService: Send + Sync {
    async fn judge(&self, prompt: &str) -> Result<String, LlmError>;
}

/// Why a judgment response was not used. Never leaves this module.
#[derive(Debug, Error)]
pub enum ScoreError {
    #[error("judgment service failed: {0}")]
    Service(#[from] LlmError),

    #[error("judgment call exceeded {0:?}")]
    Timeout(Duration),

    #[error("no JSON object found in judgment response")]
    NoJsonObject,

    #[error("judgment response is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("judgment response JSON is not an object")]
    NotAnObject,

    #[error("judgment score is not numeric: {0}")]
    InvalidScore(String),
}

/// Validated fields of a judgment response.
#[derive(Debug, Clone, PartialEq)]
pub struct Judgment {
    pub name: String,
    pub score: f64,
    pub classification: Classification,
    pub summary: String,
}

#[derive(Debug, Clone)]
pub struct ScoringLimits {
    pub max_jd_chars: usize,
    pub max_resume_chars: usize,
    pub judgment_timeout: Duration,
}

impl Default for ScoringLimits {
    fn default() -> Self {
        Self {
            max_jd_chars: DEFAULT_MAX_JD_CHARS,
            max_resume_chars: DEFAULT_MAX_RESUME_CHARS,
            judgment_timeout: DEFAULT_JUDGMENT_TIMEOUT,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Engine
// ────────────────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct ScoringEngine {
    service: Arc<dyn JudgmentService>,
    limits: ScoringLimits,
}

impl ScoringEngine {
    pub fn new(service: Arc<dyn JudgmentService>, limits: ScoringLimits) -> Self {
        Self { service, limits }
    }

    /// Scores one résumé against a JD. Never fails.
    pub async fn score(&self, jd: &str, resume_text: &str) -> Assessment {
        if jd.trim().is_empty() || resume_text.trim().is_empty() {
            warn!("Blank job description or resume text, using keyword fallback");
            return fallback_score(jd, resume_text);
        }

        let jd_trimmed = truncate_chars(jd, self.limits.max_jd_chars);
        let resume_trimmed = truncate_chars(resume_text, self.limits.max_resume_chars);

        match self.judge(jd_trimmed, resume_trimmed).await {
            Ok(judgment) => Assessment {
                name: judgment.name,
                score: judgment.score,
                classification: judgment.classification,
                summary: judgment.summary,
                // Overlap on the text the service actually saw.
                keywords: keyword_match(jd_trimmed, resume_trimmed),
            },
            Err(e) => {
                error!("Judgment scoring failed, using keyword fallback: {e}");
                fallback_score(jd, resume_text)
            }
        }
    }

    async fn judge(&self, jd: &str, resume_text: &str) -> Result<Judgment, ScoreError> {
        let prompt = build_judgment_prompt(jd, resume_text);
        let deadline = self.limits.judgment_timeout;

        let started = Instant::now();
        let response = tokio::time::timeout(deadline, self.service.judge(&prompt))
            .await
            .map_err(|_| ScoreError::Timeout(deadline))??;
        log_performance("Judgment call", started.elapsed());

        parse_judgment(&response)
    }
}

/// Extracts and validates the JSON object between the first `{` and the last `}`.
pub fn parse_judgment(response: &str) -> Result<Judgment, ScoreError> {
    let (start, end) = match (response.find('{'), response.rfind('}')) {
        (Some(start), Some(end)) if start < end => (start, end),
        _ => return Err(ScoreError::NoJsonObject),
    };

    let value: Value = serde_json::from_str(&response[start..=end])?;
    let fields = value.as_object().ok_or(ScoreError::NotAnObject)?;

    Ok(Judgment {
        name: string_field(fields, "name")
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| UNKNOWN_NAME.to_string()),
        score: normalize_score(fields.get("score"))?,
        classification: fields
            .get("classification")
            .and_then(Value::as_str)
            .and_then(Classification::from_label)
            .unwrap_or_default(),
        summary: string_field(fields, "summary").unwrap_or_else(|| NO_SUMMARY.to_string()),
    })
}

fn string_field(fields: &Map<String, Value>, key: &str) -> Option<String> {
    fields.get(key).and_then(Value::as_str).map(str::to_string)
}

/// Missing → default; numbers and numeric strings → clamped into [0, 100];
/// anything else is a validation failure.
fn normalize_score(value: Option<&Value>) -> Result<f64, ScoreError> {
    let raw = match value {
        None => DEFAULT_JUDGMENT_SCORE,
        Some(Value::Number(n)) => n
            .as_f64()
            .ok_or_else(|| ScoreError::InvalidScore(n.to_string()))?,
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| ScoreError::InvalidScore(s.clone()))?,
        Some(other) => return Err(ScoreError::InvalidScore(other.to_string())),
    };

    if !raw.is_finite() {
        return Err(ScoreError::InvalidScore(raw.to_string()));
    }

    Ok(raw.clamp(0.0, 100.0))
}

// ────────────────────────────────────────────────────────────────────────────
// Keyword fallback
// ────────────────────────────────────────────────────────────────────────────

/// Deterministic keyword-overlap scorer. Pure function of its inputs.
///
/// score = min(85, round(ratio × 100)) when anything matched, else 50.
pub fn fallback_score(jd: &str, resume_text: &str) -> Assessment {
    let name = name_from_first_lines(resume_text, FALLBACK_NAME_LINES)
        .unwrap_or_else(|| UNKNOWN_NAME.to_string());
    let keywords = keyword_match(jd, resume_text);

    let score = if keywords.match_ratio > 0.0 {
        (keywords.match_ratio * 100.0).round().min(FALLBACK_SCORE_CAP)
    } else {
        FALLBACK_NO_MATCH_SCORE
    };

    Assessment {
        name,
        score,
        classification: Classification::from_fallback_score(score),
        // Counts the displayed (capped) matches, not the full set.
        summary: format!(
            "Fallback analysis: {} keyword matches",
            keywords.matched_keywords.len()
        ),
        keywords,
    }
}

/// Hard character cutoff; may split a word but never a UTF-8 sequence.
fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    const JD: &str = "Looking for Python developer with SQL experience.";
    const RESUME: &str = "John Doe\nPython developer with SQL knowledge.";

    enum Reply {
        Text(&'static str),
        Unavailable,
        Hang,
    }

    /// Records every prompt it receives.
    struct StubService {
        reply: Reply,
        prompts: Mutex<Vec<String>>,
    }

    impl StubService {
        fn new(reply: Reply) -> Arc<Self> {
            Arc::new(Self {
                reply,
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl JudgmentService for StubService {
        async fn judge(&self, prompt: &str) -> Result<String, LlmError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            match &self.reply {
                Reply::Text(text) => Ok(text.to_string()),
                Reply::Unavailable => Err(LlmError::Api {
                    status: 503,
                    message: "service unavailable".to_string(),
                }),
                Reply::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(String::new())
                }
            }
        }
    }

    fn engine(service: Arc<StubService>) -> ScoringEngine {
        ScoringEngine::new(service, ScoringLimits::default())
    }

    #[tokio::test]
    async fn test_unavailable_service_falls_back_to_keywords() {
        let service = StubService::new(Reply::Unavailable);
        let result = engine(service.clone()).score(JD, RESUME).await;

        assert_eq!(service.calls(), 1);
        assert_eq!(result.name, "John Doe");
        assert_eq!(result.keywords.match_ratio, 0.75);
        assert_eq!(result.score, 75.0);
        assert_eq!(result.classification, Classification::Strong);
        assert_eq!(result.summary, "Fallback analysis: 3 keyword matches");
        assert_eq!(
            result.keywords.jd_keywords,
            vec!["developer", "experience", "python", "sql"]
        );
    }

    #[tokio::test]
    async fn test_valid_judgment_is_used() {
        let service = StubService::new(Reply::Text(
            r#"{"name": "John Doe", "score": 88, "classification": "Excellent", "summary": "Great fit"}"#,
        ));
        let result = engine(service).score(JD, RESUME).await;

        assert_eq!(result.name, "John Doe");
        assert_eq!(result.score, 88.0);
        assert_eq!(result.classification, Classification::Excellent);
        assert_eq!(result.summary, "Great fit");
        assert_eq!(result.keywords.match_ratio, 0.75);
    }

    #[tokio::test]
    async fn test_out_of_range_score_is_clamped() {
        let service = StubService::new(Reply::Text(
            r#"{"name": "A B", "score": 150, "classification": "Strong", "summary": "ok"}"#,
        ));
        let result = engine(service).score(JD, RESUME).await;
        assert_eq!(result.score, 100.0);
    }

    #[tokio::test]
    async fn test_json_wrapped_in_prose_is_parsed() {
        let service = StubService::new(Reply::Text(
            "Sure! Here is the evaluation:\n```json\n{\"name\": \"Jo Park\", \"score\": 64.5, \"classification\": \"Partial\", \"summary\": \"Some gaps\"}\n```\nHope that helps.",
        ));
        let result = engine(service).score(JD, RESUME).await;
        assert_eq!(result.name, "Jo Park");
        assert_eq!(result.score, 64.5);
        assert_eq!(result.classification, Classification::Partial);
    }

    #[tokio::test]
    async fn test_response_without_json_falls_back() {
        let service = StubService::new(Reply::Text("I cannot evaluate this resume."));
        let result = engine(service).score(JD, RESUME).await;
        assert!(result.summary.starts_with("Fallback analysis"));
        assert_eq!(result.score, 75.0);
    }

    #[tokio::test]
    async fn test_non_numeric_score_falls_back() {
        let service = StubService::new(Reply::Text(
            r#"{"name": "A B", "score": "very high", "classification": "Strong"}"#,
        ));
        let result = engine(service).score(JD, RESUME).await;
        assert!(result.summary.starts_with("Fallback analysis"));
    }

    #[tokio::test]
    async fn test_blank_inputs_skip_the_service() {
        let service = StubService::new(Reply::Text(r#"{"score": 99}"#));
        let engine = engine(service.clone());

        let blank_jd = engine.score("   ", RESUME).await;
        let blank_resume = engine.score(JD, "\n\t ").await;

        assert_eq!(service.calls(), 0);
        assert_eq!(blank_jd.score, 50.0);
        assert_eq!(blank_jd.keywords.match_ratio, 0.0);
        assert_eq!(blank_resume.score, 50.0);
        assert_eq!(blank_resume.classification, Classification::Weak);
        assert_eq!(blank_resume.name, "Unknown");
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_service_times_out_into_fallback() {
        let service = StubService::new(Reply::Hang);
        let limits = ScoringLimits {
            judgment_timeout: Duration::from_secs(5),
            ..ScoringLimits::default()
        };
        let result = ScoringEngine::new(service, limits).score(JD, RESUME).await;

        assert_eq!(result.score, 75.0);
        assert!(result.summary.starts_with("Fallback analysis"));
    }

    #[tokio::test]
    async fn test_inputs_truncated_before_the_call() {
        let service = StubService::new(Reply::Text(
            r#"{"name": "A B", "score": 70, "classification": "Strong", "summary": "ok"}"#,
        ));
        let limits = ScoringLimits {
            max_jd_chars: 4,
            max_resume_chars: 11,
            ..ScoringLimits::default()
        };
        let result = ScoringEngine::new(service.clone(), limits)
            .score("rust python go", "rust python go java")
            .await;

        let prompts = service.prompts.lock().unwrap();
        assert!(prompts[0].contains("JOB DESCRIPTION:\nrust\n"));
        assert!(prompts[0].contains("RESUME:\nrust python"));
        assert!(!prompts[0].contains("rust python go"));
        assert_eq!(result.keywords.jd_keywords, vec!["rust"]);
        assert_eq!(result.keywords.match_ratio, 1.0);
    }

    #[tokio::test]
    async fn test_both_paths_serialize_to_the_same_keys() {
        let judged = engine(StubService::new(Reply::Text(
            r#"{"name": "A B", "score": 70, "classification": "Strong", "summary": "ok"}"#,
        )))
        .score(JD, RESUME)
        .await;
        let fallback = engine(StubService::new(Reply::Unavailable))
            .score(JD, RESUME)
            .await;

        let keys = |a: &Assessment| {
            let value = serde_json::to_value(a).unwrap();
            let mut keys: Vec<String> = value.as_object().unwrap().keys().cloned().collect();
            keys.sort();
            keys
        };
        assert_eq!(keys(&judged), keys(&fallback));
    }

    #[test]
    fn test_parse_defaults_for_missing_fields() {
        let judgment = parse_judgment("{}").unwrap();
        assert_eq!(judgment.name, "Unknown");
        assert_eq!(judgment.score, 50.0);
        assert_eq!(judgment.classification, Classification::Partial);
        assert_eq!(judgment.summary, "No summary available");
    }

    #[test]
    fn test_parse_unknown_classification_defaults_to_partial() {
        let judgment =
            parse_judgment(r#"{"name": "", "score": -20, "classification": "Amazing"}"#).unwrap();
        assert_eq!(judgment.name, "Unknown");
        assert_eq!(judgment.score, 0.0);
        assert_eq!(judgment.classification, Classification::Partial);
    }

    #[test]
    fn test_parse_numeric_string_score() {
        let judgment = parse_judgment(r#"{"score": " 82.5 "}"#).unwrap();
        assert_eq!(judgment.score, 82.5);
    }

    #[test]
    fn test_parse_rejects_null_and_bool_scores() {
        assert!(matches!(
            parse_judgment(r#"{"score": null}"#),
            Err(ScoreError::InvalidScore(_))
        ));
        assert!(matches!(
            parse_judgment(r#"{"score": true}"#),
            Err(ScoreError::InvalidScore(_))
        ));
    }

    #[test]
    fn test_parse_rejects_malformed_json() {
        assert!(matches!(
            parse_judgment("{name: John}"),
            Err(ScoreError::Json(_))
        ));
        assert!(matches!(
            parse_judgment("} backwards {"),
            Err(ScoreError::NoJsonObject)
        ));
    }

    #[test]
    fn test_fallback_is_deterministic() {
        assert_eq!(fallback_score(JD, RESUME), fallback_score(JD, RESUME));
    }

    #[test]
    fn test_fallback_without_overlap_scores_fifty() {
        let result = fallback_score("Kubernetes operator", "Jane Smith\nPastry chef");
        assert_eq!(result.score, 50.0);
        assert_eq!(result.classification, Classification::Weak);
        assert_eq!(result.summary, "Fallback analysis: 0 keyword matches");
    }

    #[test]
    fn test_fallback_caps_at_eighty_five() {
        let result = fallback_score("rust tokio axum", "Rust Tokio Axum");
        assert_eq!(result.keywords.match_ratio, 1.0);
        assert_eq!(result.score, 85.0);
        assert_eq!(result.classification, Classification::Strong);
    }

    #[test]
    fn test_fallback_summary_counts_displayed_matches() {
        let jd: Vec<String> = (0..15).map(|i| format!("skill{i:02}")).collect();
        let jd = jd.join(" ");
        let result = fallback_score(&jd, &jd);

        assert_eq!(result.keywords.matched_keywords.len(), 10);
        assert_eq!(result.keywords.match_ratio, 1.0);
        assert_eq!(result.summary, "Fallback analysis: 10 keyword matches");
    }

    #[test]
    fn test_fallback_partial_band() {
        // 2 of 3 keywords → 67
        let result = fallback_score("rust tokio axum", "rust tokio");
        assert_eq!(result.score, 67.0);
        assert_eq!(result.classification, Classification::Partial);
    }

    #[test]
    fn test_truncate_chars_respects_char_boundaries() {
        assert_eq!(truncate_chars("résumé", 2), "ré");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("abc", 0), "");
    }
}
