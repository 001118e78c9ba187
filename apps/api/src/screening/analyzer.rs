//! Candidate Analyzer: scores one resume against a job description.
//!
//! The AI service is reached through [`ScoringBackend`], a stateless handle
//! passed in at construction. The analyzer owns the retry budget and the
//! validation of the response shape; nothing is cached between calls.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

use crate::llm_client::prompts::{JSON_ONLY_SYSTEM, NO_INVENTION_INSTRUCTION};
use crate::llm_client::{LlmClient, LlmError, RetryPolicy};
use crate::models::screening::FailureKind;
use crate::screening::prompts::{SCREENING_PROMPT_TEMPLATE, SCREENING_SYSTEM};

/// Resume text beyond this many characters is not sent to the AI service.
pub const MAX_RESUME_CHARS: usize = 15_000;
/// Job descriptions beyond this many characters are truncated in the prompt.
pub const MAX_JOB_DESCRIPTION_CHARS: usize = 8_000;

const EXPERIENCE_FALLBACK: &str = "Not specified";

/// Anything that can turn {job description, resume text} into a structured
/// JSON analysis. Implemented by [`LlmClient`]; tests use scripted fakes.
#[async_trait]
pub trait ScoringBackend: Send + Sync {
    async fn score_resume(
        &self,
        job_description: &str,
        resume_text: &str,
    ) -> Result<Value, LlmError>;
}

#[async_trait]
impl ScoringBackend for LlmClient {
    async fn score_resume(
        &self,
        job_description: &str,
        resume_text: &str,
    ) -> Result<Value, LlmError> {
        let prompt = build_screening_prompt(job_description, resume_text);
        let system = format!("{SCREENING_SYSTEM} {JSON_ONLY_SYSTEM}");
        self.call_json::<Value>(&prompt, &system).await
    }
}

/// How to treat a fit score outside 0–100.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ScorePolicy {
    /// Out-of-range scores are a malformed response.
    #[default]
    Strict,
    /// Out-of-range scores are clamped into range.
    Clamp,
}

/// Validated analysis of one resume.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateAnalysis {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub experience: String,
    pub skills: Vec<String>,
    pub education: Option<String>,
    pub location: Option<String>,
    pub score: u8,
    pub summary: String,
    pub rejection_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    #[error("Malformed AI response: {0}")]
    MalformedResponse(String),

    #[error("AI service unavailable after {attempts} attempt(s): {message}")]
    ServiceUnavailable { attempts: u32, message: String },
}

impl AnalysisError {
    pub fn kind(&self) -> FailureKind {
        match self {
            AnalysisError::MalformedResponse(_) => FailureKind::MalformedAiResponse,
            AnalysisError::ServiceUnavailable { .. } => FailureKind::AiServiceUnavailable,
        }
    }
}

pub struct CandidateAnalyzer {
    backend: Arc<dyn ScoringBackend>,
    retry: RetryPolicy,
    score_policy: ScorePolicy,
}

impl CandidateAnalyzer {
    pub fn new(backend: Arc<dyn ScoringBackend>, retry: RetryPolicy, score_policy: ScorePolicy) -> Self {
        Self {
            backend,
            retry,
            score_policy,
        }
    }

    pub async fn analyze(
        &self,
        job_description: &str,
        resume_text: &str,
    ) -> Result<CandidateAnalysis, AnalysisError> {
        let raw = self.call_with_retry(job_description, resume_text).await?;
        parse_analysis(raw, self.score_policy)
    }

    async fn call_with_retry(
        &self,
        job_description: &str,
        resume_text: &str,
    ) -> Result<Value, AnalysisError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.backend.score_resume(job_description, resume_text).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < self.retry.max_attempts() => {
                    let delay = self.retry.backoff(attempt);
                    warn!(
                        "AI scoring attempt {} failed ({}), retrying after {}ms...",
                        attempt,
                        e,
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e @ (LlmError::Parse(_) | LlmError::EmptyContent)) => {
                    return Err(AnalysisError::MalformedResponse(e.to_string()))
                }
                Err(e) => {
                    return Err(AnalysisError::ServiceUnavailable {
                        attempts: attempt,
                        message: e.to_string(),
                    })
                }
            }
        }
    }
}

pub fn build_screening_prompt(job_description: &str, resume_text: &str) -> String {
    SCREENING_PROMPT_TEMPLATE
        .replace("{no_invention}", NO_INVENTION_INSTRUCTION.trim())
        .replace("{resume_text}", &truncate_chars(resume_text, MAX_RESUME_CHARS))
        .replace(
            "{job_description}",
            &truncate_chars(job_description, MAX_JOB_DESCRIPTION_CHARS),
        )
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

/// Wire shape of the AI response. Accepts both the record field names and the
/// longer names older prompts used.
#[derive(Debug, Deserialize)]
struct RawAnalysis {
    #[serde(default, alias = "candidate_name")]
    name: Option<Value>,
    #[serde(default)]
    email: Option<Value>,
    #[serde(default)]
    phone: Option<Value>,
    #[serde(default, alias = "experience_years")]
    experience: Option<Value>,
    #[serde(default)]
    skills: Option<Value>,
    #[serde(default)]
    education: Option<Value>,
    #[serde(default)]
    location: Option<Value>,
    #[serde(default, alias = "fit_score")]
    score: Option<Value>,
    #[serde(default)]
    summary: Option<Value>,
    #[serde(default)]
    rejection_reason: Option<Value>,
}

fn parse_analysis(value: Value, policy: ScorePolicy) -> Result<CandidateAnalysis, AnalysisError> {
    if !value.is_object() {
        return Err(AnalysisError::MalformedResponse(
            "expected a JSON object".to_string(),
        ));
    }
    let raw: RawAnalysis = serde_json::from_value(value)
        .map_err(|e| AnalysisError::MalformedResponse(e.to_string()))?;

    let name = text(raw.name)
        .ok_or_else(|| AnalysisError::MalformedResponse("missing candidate name".to_string()))?;
    let score = parse_score(raw.score, policy)?;

    let skills = match raw.skills {
        Some(Value::Array(items)) => items.into_iter().filter_map(|v| text(Some(v))).collect(),
        _ => Vec::new(),
    };

    Ok(CandidateAnalysis {
        name,
        email: text(raw.email).unwrap_or_default(),
        phone: text(raw.phone),
        experience: text(raw.experience).unwrap_or_else(|| EXPERIENCE_FALLBACK.to_string()),
        skills,
        education: text(raw.education),
        location: text(raw.location),
        score,
        summary: text(raw.summary).unwrap_or_default(),
        rejection_reason: text(raw.rejection_reason),
    })
}

fn text(value: Option<Value>) -> Option<String> {
    match value? {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn parse_score(value: Option<Value>, policy: ScorePolicy) -> Result<u8, AnalysisError> {
    let raw = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().trim_end_matches('%').trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|v| v.is_finite())
    .ok_or_else(|| AnalysisError::MalformedResponse("missing or non-numeric fit score".to_string()))?;

    let rounded = raw.round();
    if (0.0..=100.0).contains(&rounded) {
        return Ok(rounded as u8);
    }
    match policy {
        ScorePolicy::Clamp => {
            warn!("Clamping out-of-range fit score {raw}");
            Ok(rounded.clamp(0.0, 100.0) as u8)
        }
        ScorePolicy::Strict => Err(AnalysisError::MalformedResponse(format!(
            "fit score {raw} is outside 0-100"
        ))),
    }
}
