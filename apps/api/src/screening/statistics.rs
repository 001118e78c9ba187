use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::screening::{CandidateRecord, CandidateStatus, CandidateTier};

const BORDERLINE_SCORES: std::ops::RangeInclusive<u8> = 70..=79;
const EXCEPTIONAL_SCORE: u8 = 95;
const HIGH_SHORTLIST_RATE: f64 = 50.0;
const LOW_SHORTLIST_RATE: f64 = 10.0;
const HIGH_ESCALATION_RATE: f64 = 30.0;
const LOW_SHORTLIST_MEAN: f64 = 80.0;

/// Candidate counts per tier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreDistribution {
    pub exceptional: u32,
    pub strong: u32,
    pub good: u32,
    pub average: u32,
    pub poor: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EscalationPriority {
    Medium,
    High,
}

/// Why a candidate was set aside for a human reviewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationReason {
    /// Close enough to the default threshold that the AI score alone should not decide.
    BorderlineScore,
    ExceptionalCandidate,
}

impl EscalationReason {
    pub fn for_score(score: u8) -> Option<Self> {
        if score >= EXCEPTIONAL_SCORE {
            Some(Self::ExceptionalCandidate)
        } else if BORDERLINE_SCORES.contains(&score) {
            Some(Self::BorderlineScore)
        } else {
            None
        }
    }

    pub fn priority(self) -> EscalationPriority {
        match self {
            Self::ExceptionalCandidate => EscalationPriority::High,
            Self::BorderlineScore => EscalationPriority::Medium,
        }
    }

    pub fn recommended_action(self) -> &'static str {
        match self {
            Self::ExceptionalCandidate => {
                "Fast-track for senior review and schedule an interview promptly"
            }
            Self::BorderlineScore => "Have a recruiter review the resume and make the final call",
        }
    }
}

/// A candidate flagged for human review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Escalation {
    pub candidate_id: Uuid,
    pub candidate_name: String,
    pub file_name: String,
    pub score: u8,
    pub status: CandidateStatus,
    pub reason: EscalationReason,
    pub priority: EscalationPriority,
    pub recommended_action: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationCode {
    TightenCriteria,
    ReviewRequirements,
    HighEscalationRate,
    LowShortlistScores,
}

impl RecommendationCode {
    pub fn message(self) -> &'static str {
        match self {
            Self::TightenCriteria => "Over half of the candidates were shortlisted; consider tightening the criteria",
            Self::ReviewRequirements => "Under 10% of the candidates were shortlisted; consider reviewing the job requirements",
            Self::HighEscalationRate => "Over 30% of the candidates need human review; the scoring may need calibration",
            Self::LowShortlistScores => "The average shortlisted score is below 80; review the selection criteria",
        }
    }
}

/// Process advice for the recruiter, derived from the run's outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub code: RecommendationCode,
    pub message: String,
}

impl From<RecommendationCode> for Recommendation {
    fn from(code: RecommendationCode) -> Self {
        Self {
            code,
            message: code.message().to_string(),
        }
    }
}

/// Derived view over a run's candidates. Recomputed on every read from the
/// stored records, so it never disagrees with them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunStatistics {
    pub highest_score: Option<u8>,
    pub lowest_score: Option<u8>,
    /// Percentage of processed candidates that were shortlisted.
    pub shortlist_rate: f64,
    pub distribution: ScoreDistribution,
    /// Candidates flagged for human review, in rank order.
    pub escalations: Vec<Escalation>,
    /// Percentage of processed candidates that were escalated.
    pub escalation_rate: f64,
    pub recommendations: Vec<Recommendation>,
}

/// Arithmetic mean of the scores, 0.0 for an empty slice.
pub fn average_score(scores: &[u8]) -> f64 {
    if scores.is_empty() {
        return 0.0;
    }
    scores.iter().map(|s| f64::from(*s)).sum::<f64>() / scores.len() as f64
}

/// Sorts by score descending, ties by upload position, and assigns 1-based ranks.
pub fn rank_candidates(candidates: &mut [CandidateRecord]) {
    candidates.sort_by(|a, b| b.score.cmp(&a.score).then(a.position.cmp(&b.position)));
    for (i, candidate) in candidates.iter_mut().enumerate() {
        candidate.rank = i as u32 + 1;
    }
}

pub fn compute_statistics(candidates: &[CandidateRecord]) -> RunStatistics {
    let mut distribution = ScoreDistribution::default();
    for candidate in candidates {
        let bucket = match CandidateTier::from_score(candidate.score) {
            CandidateTier::Exceptional => &mut distribution.exceptional,
            CandidateTier::Strong => &mut distribution.strong,
            CandidateTier::Good => &mut distribution.good,
            CandidateTier::Average => &mut distribution.average,
            CandidateTier::Poor => &mut distribution.poor,
        };
        *bucket += 1;
    }

    let shortlisted_scores: Vec<u8> = candidates
        .iter()
        .filter(|c| c.status == CandidateStatus::Shortlisted)
        .map(|c| c.score)
        .collect();
    let escalations = escalate(candidates);

    let shortlist_rate = percentage(shortlisted_scores.len(), candidates.len());
    let escalation_rate = percentage(escalations.len(), candidates.len());
    let recommendations = if candidates.is_empty() {
        Vec::new()
    } else {
        recommend(shortlist_rate, escalation_rate, &shortlisted_scores)
    };

    RunStatistics {
        highest_score: candidates.iter().map(|c| c.score).max(),
        lowest_score: candidates.iter().map(|c| c.score).min(),
        shortlist_rate,
        distribution,
        escalations,
        escalation_rate,
        recommendations,
    }
}

fn percentage(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 * 100.0 / total as f64
    }
}

pub fn escalate(candidates: &[CandidateRecord]) -> Vec<Escalation> {
    candidates
        .iter()
        .filter_map(|c| {
            let reason = EscalationReason::for_score(c.score)?;
            Some(Escalation {
                candidate_id: c.id,
                candidate_name: c.name.clone(),
                file_name: c.file_name.clone(),
                score: c.score,
                status: c.status,
                reason,
                priority: reason.priority(),
                recommended_action: reason.recommended_action().to_string(),
            })
        })
        .collect()
}

fn recommend(
    shortlist_rate: f64,
    escalation_rate: f64,
    shortlisted_scores: &[u8],
) -> Vec<Recommendation> {
    let mut codes = Vec::new();
    if shortlist_rate > HIGH_SHORTLIST_RATE {
        codes.push(RecommendationCode::TightenCriteria);
    } else if shortlist_rate < LOW_SHORTLIST_RATE {
        codes.push(RecommendationCode::ReviewRequirements);
    }
    if escalation_rate > HIGH_ESCALATION_RATE {
        codes.push(RecommendationCode::HighEscalationRate);
    }
    if !shortlisted_scores.is_empty() && average_score(shortlisted_scores) < LOW_SHORTLIST_MEAN {
        codes.push(RecommendationCode::LowShortlistScores);
    }
    codes.into_iter().map(Recommendation::from).collect()
}
