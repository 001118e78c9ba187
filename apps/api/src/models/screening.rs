use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Outcome of classifying one candidate against the run threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateStatus {
    Shortlisted,
    Rejected,
}

impl CandidateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CandidateStatus::Shortlisted => "shortlisted",
            CandidateStatus::Rejected => "rejected",
        }
    }
}

/// Score band used for ranking summaries and the score distribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateTier {
    Exceptional,
    Strong,
    Good,
    Average,
    Poor,
}

impl CandidateTier {
    pub fn from_score(score: u8) -> Self {
        match score {
            90..=u8::MAX => CandidateTier::Exceptional,
            80..=89 => CandidateTier::Strong,
            70..=79 => CandidateTier::Good,
            60..=69 => CandidateTier::Average,
            _ => CandidateTier::Poor,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CandidateTier::Exceptional => "exceptional",
            CandidateTier::Strong => "strong",
            CandidateTier::Good => "good",
            CandidateTier::Average => "average",
            CandidateTier::Poor => "poor",
        }
    }
}

/// Why a single uploaded file produced no candidate record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
    UnsupportedFormat,
    CorruptOrUnreadable,
    EmptyOrProtectedDocument,
    #[serde(rename = "MalformedAIResponse")]
    MalformedAiResponse,
    #[serde(rename = "AIServiceUnavailable")]
    AiServiceUnavailable,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::UnsupportedFormat => "UnsupportedFormat",
            FailureKind::CorruptOrUnreadable => "CorruptOrUnreadable",
            FailureKind::EmptyOrProtectedDocument => "EmptyOrProtectedDocument",
            FailureKind::MalformedAiResponse => "MalformedAIResponse",
            FailureKind::AiServiceUnavailable => "AIServiceUnavailable",
        }
    }
}

#[derive(Debug, Error)]
#[error("unknown {field} value '{value}'")]
pub struct UnknownVariant {
    field: &'static str,
    value: String,
}

impl FromStr for CandidateStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "shortlisted" => Ok(CandidateStatus::Shortlisted),
            "rejected" => Ok(CandidateStatus::Rejected),
            other => Err(UnknownVariant {
                field: "status",
                value: other.to_string(),
            }),
        }
    }
}

impl FromStr for CandidateTier {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "exceptional" => Ok(CandidateTier::Exceptional),
            "strong" => Ok(CandidateTier::Strong),
            "good" => Ok(CandidateTier::Good),
            "average" => Ok(CandidateTier::Average),
            "poor" => Ok(CandidateTier::Poor),
            other => Err(UnknownVariant {
                field: "tier",
                value: other.to_string(),
            }),
        }
    }
}

impl FromStr for FailureKind {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "UnsupportedFormat" => Ok(FailureKind::UnsupportedFormat),
            "CorruptOrUnreadable" => Ok(FailureKind::CorruptOrUnreadable),
            "EmptyOrProtectedDocument" => Ok(FailureKind::EmptyOrProtectedDocument),
            "MalformedAIResponse" => Ok(FailureKind::MalformedAiResponse),
            "AIServiceUnavailable" => Ok(FailureKind::AiServiceUnavailable),
            other => Err(UnknownVariant {
                field: "failure kind",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable summary of one screening run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreeningJob {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub job_description: String,
    /// Position label used in rejection subjects (explicit title or derived).
    pub position_label: String,
    /// Effective threshold the run classified against.
    pub threshold: u8,
    pub total_processed: u32,
    pub shortlisted_count: u32,
    pub rejected_count: u32,
    pub failed_count: u32,
    pub average_score: f64,
    /// Wall time from batch receipt up to, but excluding, the store write.
    /// The value is fixed before the write so stored and returned records agree.
    pub processing_time_ms: u64,
    /// Truncated to microseconds, the precision Postgres keeps.
    pub created_at: DateTime<Utc>,
}

/// Structured, scored output for one resume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateRecord {
    pub id: Uuid,
    pub job_id: Uuid,
    pub file_name: String,
    /// Zero-based index of the source file in the upload.
    pub position: u32,
    /// 1-based rank by score, ties broken by `position`.
    pub rank: u32,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub score: u8,
    pub status: CandidateStatus,
    pub tier: CandidateTier,
    pub summary: String,
    pub experience: String,
    pub skills: Vec<String>,
    pub education: Option<String>,
    pub location: Option<String>,
    pub raw_extracted_text: Option<String>,
}

/// Rejection correspondence drafted for one rejected candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectionEmailDraft {
    pub candidate_id: Uuid,
    pub job_id: Uuid,
    pub candidate_name: String,
    pub candidate_email: String,
    pub subject: String,
    pub content: String,
}

/// A file that could not be turned into a candidate record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileFailure {
    pub file_name: String,
    pub position: u32,
    pub kind: FailureKind,
    pub message: String,
}

/// Everything persisted for one run, written and read as a unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecords {
    pub job: ScreeningJob,
    pub candidates: Vec<CandidateRecord>,
    pub rejection_emails: Vec<RejectionEmailDraft>,
    pub failures: Vec<FileFailure>,
}
