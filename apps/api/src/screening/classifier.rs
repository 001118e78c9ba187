use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::screening::CandidateStatus;

/// Minimum fit score for shortlisting, always within 0–100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Threshold(u8);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("threshold must be between 0 and 100, got {0}")]
pub struct InvalidThreshold(pub i64);

impl Threshold {
    pub const DEFAULT: Threshold = Threshold(80);

    pub fn new(value: i64) -> Result<Self, InvalidThreshold> {
        u8::try_from(value)
            .ok()
            .filter(|v| *v <= 100)
            .map(Threshold)
            .ok_or(InvalidThreshold(value))
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl Default for Threshold {
    fn default() -> Self {
        Threshold::DEFAULT
    }
}

impl TryFrom<i64> for Threshold {
    type Error = InvalidThreshold;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Threshold::new(value)
    }
}

impl From<Threshold> for u8 {
    fn from(threshold: Threshold) -> Self {
        threshold.0
    }
}

/// `score >= threshold` shortlists; the boundary is inclusive.
pub fn classify(score: u8, threshold: Threshold) -> CandidateStatus {
    debug_assert!(score <= 100, "fit score {score} escaped analyzer validation");
    if score >= threshold.value() {
        CandidateStatus::Shortlisted
    } else {
        CandidateStatus::Rejected
    }
}
