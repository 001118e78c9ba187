//! Screening Run Aggregator.
//!
//! Fans a batch out into independent per-file tasks (extract, analyze,
//! classify, draft), bounded by a semaphore, then folds the per-file outcomes
//! into one run and writes it through the [`JobStore`] as a single unit.
//!
//! Dropping the future returned by [`ScreeningPipeline::run`] aborts every
//! in-flight task and nothing is persisted.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use chrono::{SubsecRound, Utc};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::extraction::extract_blocking;
use crate::models::screening::{
    CandidateRecord, CandidateStatus, CandidateTier, FailureKind, FileFailure, JobRecords,
    RejectionEmailDraft, ScreeningJob,
};
use crate::screening::analyzer::CandidateAnalyzer;
use crate::screening::classifier::{classify, Threshold};
use crate::screening::drafter::{draft_rejection, position_label};
use crate::screening::statistics::{average_score, compute_statistics, rank_candidates, RunStatistics};
use crate::store::{JobStore, StoreError};

const MAX_FILE_NAME_CHARS: usize = 255;

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub default_threshold: Threshold,
    /// Per-file tasks allowed in flight at once within one run.
    pub max_concurrency: usize,
    pub max_files: usize,
    pub max_file_bytes: usize,
    /// Keep the extracted text on each candidate record.
    pub retain_extracted_text: bool,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            default_threshold: Threshold::DEFAULT,
            max_concurrency: 4,
            max_files: 20,
            max_file_bytes: 10 * 1024 * 1024,
            retain_extracted_text: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content: Bytes,
}

#[derive(Debug, Clone)]
pub struct ScreeningRequest {
    pub owner_id: Uuid,
    pub job_description: String,
    pub job_title: Option<String>,
    /// Overrides the configured default threshold for this run only.
    pub threshold: Option<Threshold>,
    pub files: Vec<UploadedFile>,
}

/// A persisted run plus its derived statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScreeningReport {
    #[serde(flatten)]
    pub records: JobRecords,
    pub statistics: RunStatistics,
}

impl ScreeningReport {
    fn from_records(records: JobRecords) -> Self {
        let statistics = compute_statistics(&records.candidates);
        Self {
            records,
            statistics,
        }
    }
}

#[derive(Debug, Error)]
pub enum ScreeningError {
    #[error("Invalid batch: {0}")]
    InvalidBatch(String),

    #[error("None of the {} uploaded file(s) could be processed", .0.len())]
    NoProcessableFiles(Vec<FileFailure>),

    #[error("Failed to persist screening run: {0}")]
    Persistence(#[source] StoreError),

    #[error("Screening job {0} not found")]
    NotFound(Uuid),
}

/// Result of one file's trip through the pipeline.
#[derive(Debug)]
enum FileOutcome {
    Processed {
        candidate: CandidateRecord,
        rejection: Option<RejectionEmailDraft>,
    },
    Failed(FileFailure),
}

impl FileOutcome {
    fn failed(file_name: String, position: u32, kind: FailureKind, message: String) -> Self {
        FileOutcome::Failed(FileFailure {
            file_name,
            position,
            kind,
            message,
        })
    }

    fn position(&self) -> u32 {
        match self {
            FileOutcome::Processed { candidate, .. } => candidate.position,
            FileOutcome::Failed(failure) => failure.position,
        }
    }
}

/// Read-only inputs shared by every per-file task of one run.
struct RunContext {
    analyzer: Arc<CandidateAnalyzer>,
    job_id: Uuid,
    job_description: String,
    position_label: String,
    threshold: Threshold,
    retain_extracted_text: bool,
}

pub struct ScreeningPipeline {
    analyzer: Arc<CandidateAnalyzer>,
    store: Arc<dyn JobStore>,
    settings: PipelineSettings,
}

impl ScreeningPipeline {
    pub fn new(
        analyzer: Arc<CandidateAnalyzer>,
        store: Arc<dyn JobStore>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            analyzer,
            store,
            settings,
        }
    }

    /// Screens a batch and persists the run.
    ///
    /// Per-file failures are reported in the result. The call only fails when
    /// the batch is invalid, no file produced a candidate, or the write fails.
    pub async fn run(&self, request: ScreeningRequest) -> Result<ScreeningReport, ScreeningError> {
        let started = Instant::now();
        self.validate(&request)?;

        let ScreeningRequest {
            owner_id,
            job_description,
            job_title,
            threshold,
            files,
        } = request;

        let threshold = threshold.unwrap_or(self.settings.default_threshold);
        let ctx = Arc::new(RunContext {
            analyzer: self.analyzer.clone(),
            job_id: Uuid::new_v4(),
            position_label: position_label(&job_description, job_title.as_deref()),
            job_description,
            threshold,
            retain_extracted_text: self.settings.retain_extracted_text,
        });

        info!(
            "Screening run {} started: {} file(s), threshold {}, position '{}'",
            ctx.job_id,
            files.len(),
            threshold.value(),
            ctx.position_label
        );

        let file_names: Vec<String> = files.iter().map(|f| f.file_name.clone()).collect();
        let outcomes = self.process_files(&ctx, files).await;
        let outcomes = fill_missing_outcomes(outcomes, &file_names);

        let mut candidates = Vec::new();
        let mut rejection_emails = Vec::new();
        let mut failures = Vec::new();
        for outcome in outcomes {
            match outcome {
                FileOutcome::Processed {
                    candidate,
                    rejection,
                } => {
                    candidates.push(candidate);
                    rejection_emails.extend(rejection);
                }
                FileOutcome::Failed(failure) => failures.push(failure),
            }
        }
        failures.sort_by_key(|f| f.position);

        if candidates.is_empty() {
            warn!(
                "Screening run {} produced no candidates; {} file(s) failed",
                ctx.job_id,
                failures.len()
            );
            return Err(ScreeningError::NoProcessableFiles(failures));
        }

        rank_candidates(&mut candidates);
        let ranks: HashMap<Uuid, u32> = candidates.iter().map(|c| (c.id, c.rank)).collect();
        rejection_emails.sort_by_key(|e| ranks.get(&e.candidate_id).copied().unwrap_or(u32::MAX));

        let scores: Vec<u8> = candidates.iter().map(|c| c.score).collect();
        let shortlisted_count = candidates
            .iter()
            .filter(|c| c.status == CandidateStatus::Shortlisted)
            .count() as u32;
        let total_processed = candidates.len() as u32;

        let job = ScreeningJob {
            id: ctx.job_id,
            owner_id,
            job_description: ctx.job_description.clone(),
            position_label: ctx.position_label.clone(),
            threshold: threshold.value(),
            total_processed,
            shortlisted_count,
            rejected_count: total_processed - shortlisted_count,
            failed_count: failures.len() as u32,
            average_score: average_score(&scores),
            processing_time_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            created_at: Utc::now().trunc_subsecs(6),
        };

        let records = JobRecords {
            job,
            candidates,
            rejection_emails,
            failures,
        };

        if let Err(e) = self.store.create_job(&records).await {
            error!("Screening run {} could not be persisted: {e}", ctx.job_id);
            return Err(ScreeningError::Persistence(e));
        }

        info!(
            "Screening run {} completed in {}ms: {} shortlisted, {} rejected, {} failed",
            records.job.id,
            records.job.processing_time_ms,
            records.job.shortlisted_count,
            records.job.rejected_count,
            records.job.failed_count
        );

        Ok(ScreeningReport::from_records(records))
    }

    /// Job summaries for an owner, most recent first.
    pub async fn history(&self, owner_id: Uuid) -> Result<Vec<ScreeningJob>, ScreeningError> {
        self.store
            .list_jobs(owner_id)
            .await
            .map_err(ScreeningError::Persistence)
    }

    /// A persisted run exactly as stored, with statistics derived from it.
    pub async fn detail(&self, owner_id: Uuid, job_id: Uuid) -> Result<ScreeningReport, ScreeningError> {
        self.store
            .find_job(owner_id, job_id)
            .await
            .map_err(ScreeningError::Persistence)?
            .map(ScreeningReport::from_records)
            .ok_or(ScreeningError::NotFound(job_id))
    }

    fn validate(&self, request: &ScreeningRequest) -> Result<(), ScreeningError> {
        if request.job_description.trim().is_empty() {
            return Err(ScreeningError::InvalidBatch(
                "job description must not be empty".to_string(),
            ));
        }
        if request.files.is_empty() {
            return Err(ScreeningError::InvalidBatch(
                "at least one resume file is required".to_string(),
            ));
        }
        if request.files.len() > self.settings.max_files {
            return Err(ScreeningError::InvalidBatch(format!(
                "too many files: {} (maximum {})",
                request.files.len(),
                self.settings.max_files
            )));
        }
        for file in &request.files {
            if file.file_name.chars().count() > MAX_FILE_NAME_CHARS {
                return Err(ScreeningError::InvalidBatch(format!(
                    "file name longer than {MAX_FILE_NAME_CHARS} characters"
                )));
            }
            if file.content.len() > self.settings.max_file_bytes {
                return Err(ScreeningError::InvalidBatch(format!(
                    "'{}' is {} bytes (maximum {})",
                    file.file_name,
                    file.content.len(),
                    self.settings.max_file_bytes
                )));
            }
        }
        Ok(())
    }

    async fn process_files(&self, ctx: &Arc<RunContext>, files: Vec<UploadedFile>) -> Vec<FileOutcome> {
        let semaphore = Arc::new(Semaphore::new(self.settings.max_concurrency.max(1)));
        let mut tasks = JoinSet::new();

        for (position, file) in files.into_iter().enumerate() {
            let ctx = ctx.clone();
            let semaphore = semaphore.clone();
            tasks.spawn(async move {
                let position = position as u32;
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(e) => {
                        return FileOutcome::failed(
                            file.file_name,
                            position,
                            FailureKind::CorruptOrUnreadable,
                            format!("worker pool closed: {e}"),
                        )
                    }
                };
                process_file(&ctx, position, file).await
            });
        }

        let mut outcomes = Vec::with_capacity(tasks.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => error!("Screening task for run {} failed: {e}", ctx.job_id),
            }
        }
        outcomes
    }
}

async fn process_file(ctx: &RunContext, position: u32, file: UploadedFile) -> FileOutcome {
    let UploadedFile { file_name, content } = file;

    let text = match extract_blocking(content, file_name.clone()).await {
        Ok(text) => text,
        Err(e) => {
            warn!("Extraction failed for '{file_name}' ({}): {e}", e.kind());
            return FileOutcome::failed(file_name, position, e.kind(), e.to_string());
        }
    };

    let analysis = match ctx.analyzer.analyze(&ctx.job_description, &text).await {
        Ok(analysis) => analysis,
        Err(e) => {
            warn!("Analysis failed for '{file_name}' ({}): {e}", e.kind());
            return FileOutcome::failed(file_name, position, e.kind(), e.to_string());
        }
    };

    let status = classify(analysis.score, ctx.threshold);
    let candidate = CandidateRecord {
        id: Uuid::new_v4(),
        job_id: ctx.job_id,
        file_name,
        position,
        rank: 0,
        name: analysis.name,
        email: analysis.email,
        phone: analysis.phone,
        score: analysis.score,
        status,
        tier: CandidateTier::from_score(analysis.score),
        summary: analysis.summary,
        experience: analysis.experience,
        skills: analysis.skills,
        education: analysis.education,
        location: analysis.location,
        raw_extracted_text: ctx.retain_extracted_text.then_some(text),
    };

    let rejection = (status == CandidateStatus::Rejected).then(|| {
        draft_rejection(
            &candidate,
            &ctx.position_label,
            analysis.rejection_reason.as_deref(),
        )
    });

    FileOutcome::Processed {
        candidate,
        rejection,
    }
}

/// Any file whose task died without reporting gets an explicit failure.
fn fill_missing_outcomes(mut outcomes: Vec<FileOutcome>, file_names: &[String]) -> Vec<FileOutcome> {
    let seen: HashSet<u32> = outcomes.iter().map(FileOutcome::position).collect();
    for (position, file_name) in file_names.iter().enumerate() {
        let position = position as u32;
        if !seen.contains(&position) {
            outcomes.push(FileOutcome::failed(
                file_name.clone(),
                position,
                FailureKind::CorruptOrUnreadable,
                "processing task aborted".to_string(),
            ));
        }
    }
    outcomes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::RetryPolicy;
    use crate::screening::analyzer::ScorePolicy;
    use crate::screening::statistics::RecommendationCode;
    use crate::store::memory::MemoryJobStore;
    use crate::testing::{analysis_json, docx_fixture, ScriptedBackend, Step};
    use std::time::Duration;

    const JOB_DESCRIPTION: &str = "Senior Rust Engineer\nBuild distributed storage in Rust.";

    fn owner() -> Uuid {
        Uuid::from_u128(0x5eed)
    }

    fn pipeline_with(
        backend: Arc<ScriptedBackend>,
        store: Arc<MemoryJobStore>,
        settings: PipelineSettings,
    ) -> ScreeningPipeline {
        let analyzer = CandidateAnalyzer::new(
            backend,
            RetryPolicy {
                max_retries: 2,
                base_backoff: Duration::from_millis(100),
            },
            ScorePolicy::Strict,
        );
        ScreeningPipeline::new(Arc::new(analyzer), store, settings)
    }

    fn pipeline(backend: Arc<ScriptedBackend>, store: Arc<MemoryJobStore>) -> ScreeningPipeline {
        pipeline_with(backend, store, PipelineSettings::default())
    }

    fn resume(name: &str) -> UploadedFile {
        UploadedFile {
            file_name: format!("{}.docx", name.to_lowercase()),
            content: Bytes::from(docx_fixture(&[name, "Software engineer, 6 years of Rust"])),
        }
    }

    fn request(files: Vec<UploadedFile>) -> ScreeningRequest {
        ScreeningRequest {
            owner_id: owner(),
            job_description: JOB_DESCRIPTION.to_string(),
            job_title: None,
            threshold: None,
            files,
        }
    }

    fn three_candidates() -> ScriptedBackend {
        ScriptedBackend::new()
            .script("Alice", vec![Step::Respond(analysis_json("Alice", 95))])
            .script("Bob", vec![Step::Respond(analysis_json("Bob", 60))])
            .script("Carol", vec![Step::Respond(analysis_json("Carol", 81))])
    }

    fn assert_run_invariants(records: &JobRecords) {
        let job = &records.job;
        assert_eq!(job.total_processed, job.shortlisted_count + job.rejected_count);
        assert_eq!(job.total_processed as usize, records.candidates.len());
        assert_eq!(job.failed_count as usize, records.failures.len());

        for c in &records.candidates {
            assert_eq!(c.status == CandidateStatus::Shortlisted, c.score >= job.threshold);
            let drafts = records
                .rejection_emails
                .iter()
                .filter(|e| e.candidate_id == c.id)
                .count();
            let expected = usize::from(c.status == CandidateStatus::Rejected);
            assert_eq!(drafts, expected, "drafts for {}", c.name);
        }

        let scores: Vec<u8> = records.candidates.iter().map(|c| c.score).collect();
        let mean = scores.iter().map(|s| f64::from(*s)).sum::<f64>() / scores.len() as f64;
        assert!((job.average_score - mean).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_mixed_scores_are_classified_and_drafted() {
        let backend = Arc::new(three_candidates());
        let store = Arc::new(MemoryJobStore::new());
        let report = pipeline(backend, store.clone())
            .run(request(vec![resume("Alice"), resume("Bob"), resume("Carol")]))
            .await
            .unwrap();

        let records = &report.records;
        assert_eq!(records.job.total_processed, 3);
        assert_eq!(records.job.shortlisted_count, 2);
        assert_eq!(records.job.rejected_count, 1);
        assert_eq!(records.job.threshold, 80);
        assert_eq!(records.job.position_label, "Senior Rust Engineer");
        assert_eq!(records.rejection_emails.len(), 1);
        assert_eq!(records.rejection_emails[0].candidate_name, "Bob");
        assert_eq!(
            records.rejection_emails[0].subject,
            "Thank you for your application - Senior Rust Engineer"
        );
        assert!(records.failures.is_empty());
        assert_run_invariants(records);

        let ranked: Vec<(&str, u32)> = records
            .candidates
            .iter()
            .map(|c| (c.name.as_str(), c.rank))
            .collect();
        assert_eq!(ranked, vec![("Alice", 1), ("Carol", 2), ("Bob", 3)]);
        assert_eq!(report.statistics.highest_score, Some(95));
        assert_eq!(report.statistics.lowest_score, Some(60));
        let escalated: Vec<&str> = report
            .statistics
            .escalations
            .iter()
            .map(|e| e.candidate_name.as_str())
            .collect();
        assert_eq!(escalated, vec!["Alice"]);
        assert_eq!(
            report.statistics.recommendations[0].code,
            RecommendationCode::TightenCriteria
        );

        // What was returned is exactly what was stored.
        let stored = store
            .find_job(owner(), records.job.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(&stored, records);
    }

    #[tokio::test]
    async fn test_job_timing_fields_survive_storage() {
        let backend = Arc::new(three_candidates());
        let store = Arc::new(MemoryJobStore::new());
        let report = pipeline(backend, store.clone())
            .run(request(vec![resume("Alice")]))
            .await
            .unwrap();

        let job = &report.records.job;
        assert_eq!(job.created_at.timestamp_subsec_nanos() % 1_000, 0);

        let stored = store.find_job(owner(), job.id).await.unwrap().unwrap();
        assert_eq!(stored.job.created_at, job.created_at);
        assert_eq!(stored.job.processing_time_ms, job.processing_time_ms);
    }

    #[tokio::test]
    async fn test_unsupported_file_is_reported_and_run_still_persisted() {
        let backend = Arc::new(three_candidates());
        let store = Arc::new(MemoryJobStore::new());
        let notes = UploadedFile {
            file_name: "notes.txt".to_string(),
            content: Bytes::from_static(b"Alice, great at Rust, call me"),
        };
        let report = pipeline(backend, store.clone())
            .run(request(vec![resume("Alice"), notes]))
            .await
            .unwrap();

        let records = &report.records;
        assert_eq!(records.job.total_processed, 1);
        assert_eq!(records.job.failed_count, 1);
        assert_eq!(records.failures.len(), 1);
        assert_eq!(records.failures[0].file_name, "notes.txt");
        assert_eq!(records.failures[0].position, 1);
        assert_eq!(records.failures[0].kind, FailureKind::UnsupportedFormat);
        assert_run_invariants(records);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_all_files_failing_is_a_batch_failure() {
        let backend = Arc::new(three_candidates());
        let store = Arc::new(MemoryJobStore::new());
        let files = vec![
            UploadedFile {
                file_name: "a.png".to_string(),
                content: Bytes::from_static(b"\x89PNG\r\n\x1a\n"),
            },
            UploadedFile {
                file_name: "b.pdf".to_string(),
                content: Bytes::from_static(b"not really a pdf"),
            },
        ];
        let err = pipeline(backend.clone(), store.clone())
            .run(request(files))
            .await
            .unwrap_err();

        match err {
            ScreeningError::NoProcessableFiles(failures) => {
                let names: Vec<_> = failures.iter().map(|f| f.file_name.as_str()).collect();
                assert_eq!(names, vec!["a.png", "b.pdf"]);
                assert!(failures
                    .iter()
                    .all(|f| f.kind == FailureKind::UnsupportedFormat));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(store.len(), 0);
        assert_eq!(backend.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ai_timeouts_are_retried_transparently() {
        let backend = Arc::new(ScriptedBackend::new().script(
            "Alice",
            vec![
                Step::Timeout,
                Step::Timeout,
                Step::Respond(analysis_json("Alice", 88)),
            ],
        ));
        let store = Arc::new(MemoryJobStore::new());
        let report = pipeline(backend.clone(), store)
            .run(request(vec![resume("Alice")]))
            .await
            .unwrap();

        assert!(report.records.failures.is_empty());
        assert_eq!(report.records.candidates[0].score, 88);
        assert_eq!(backend.calls(), 3);
    }

    #[tokio::test]
    async fn test_ai_failure_is_scoped_to_one_file() {
        let backend = Arc::new(
            ScriptedBackend::new()
                .script("Alice", vec![Step::Respond(analysis_json("Alice", 91))])
                .script("Bob", vec![Step::Unauthorized])
                .script("Carol", vec![Step::Garbage]),
        );
        let store = Arc::new(MemoryJobStore::new());
        let report = pipeline(backend, store)
            .run(request(vec![resume("Alice"), resume("Bob"), resume("Carol")]))
            .await
            .unwrap();

        let kinds: Vec<_> = report.records.failures.iter().map(|f| f.kind).collect();
        assert_eq!(
            kinds,
            vec![FailureKind::AiServiceUnavailable, FailureKind::MalformedAiResponse]
        );
        assert_eq!(report.records.job.total_processed, 1);
    }

    #[tokio::test]
    async fn test_threshold_override_applies_to_run() {
        let backend = Arc::new(three_candidates());
        let store = Arc::new(MemoryJobStore::new());
        let mut req = request(vec![resume("Alice"), resume("Bob"), resume("Carol")]);
        req.threshold = Some(Threshold::new(60).unwrap());
        let report = pipeline(backend, store).run(req).await.unwrap();

        assert_eq!(report.records.job.threshold, 60);
        assert_eq!(report.records.job.shortlisted_count, 3);
        assert!(report.records.rejection_emails.is_empty());
        assert_run_invariants(&report.records);
    }

    #[tokio::test]
    async fn test_persistence_failure_is_fatal() {
        let backend = Arc::new(three_candidates());
        let store = Arc::new(MemoryJobStore::failing());
        let err = pipeline(backend, store.clone())
            .run(request(vec![resume("Alice")]))
            .await
            .unwrap_err();
        assert!(matches!(err, ScreeningError::Persistence(_)));
        assert_eq!(store.len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_run_persists_nothing() {
        let backend = Arc::new(three_candidates().with_delay(Duration::from_secs(30)));
        let store = Arc::new(MemoryJobStore::new());
        let pipeline = pipeline(backend, store.clone());

        let outcome = tokio::time::timeout(
            Duration::from_secs(1),
            pipeline.run(request(vec![resume("Alice"), resume("Bob")])),
        )
        .await;
        assert!(outcome.is_err());

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(store.len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrency_is_bounded() {
        let mut backend = ScriptedBackend::new();
        let names = ["Ann", "Ben", "Cid", "Dee", "Eve", "Fay"];
        for name in names {
            backend = backend.script(name, vec![Step::Respond(analysis_json(name, 70))]);
        }
        let backend = Arc::new(backend.with_delay(Duration::from_secs(1)));
        let store = Arc::new(MemoryJobStore::new());
        let settings = PipelineSettings {
            max_concurrency: 2,
            ..PipelineSettings::default()
        };
        let report = pipeline_with(backend.clone(), store, settings)
            .run(request(names.iter().map(|n| resume(n)).collect()))
            .await
            .unwrap();

        assert_eq!(report.records.job.total_processed, 6);
        assert!(backend.max_in_flight() <= 2);
        assert!(backend.max_in_flight() >= 1);
    }

    #[tokio::test]
    async fn test_detail_is_stable_and_owner_scoped() {
        let backend = Arc::new(three_candidates());
        let store = Arc::new(MemoryJobStore::new());
        let pipeline = pipeline(backend, store);
        let report = pipeline
            .run(request(vec![resume("Alice"), resume("Bob")]))
            .await
            .unwrap();
        let job_id = report.records.job.id;

        let first = pipeline.detail(owner(), job_id).await.unwrap();
        let second = pipeline.detail(owner(), job_id).await.unwrap();
        assert_eq!(first, report);
        assert_eq!(
            serde_json::to_vec(&first).unwrap(),
            serde_json::to_vec(&second).unwrap()
        );

        let err = pipeline.detail(Uuid::new_v4(), job_id).await.unwrap_err();
        assert!(matches!(err, ScreeningError::NotFound(id) if id == job_id));
    }

    #[tokio::test]
    async fn test_history_lists_owner_runs_most_recent_first() {
        let backend = Arc::new(
            ScriptedBackend::new().script(
                "Alice",
                vec![
                    Step::Respond(analysis_json("Alice", 90)),
                    Step::Respond(analysis_json("Alice", 40)),
                ],
            ),
        );
        let store = Arc::new(MemoryJobStore::new());
        let pipeline = pipeline(backend, store);
        let first = pipeline.run(request(vec![resume("Alice")])).await.unwrap();
        let second = pipeline.run(request(vec![resume("Alice")])).await.unwrap();

        let history = pipeline.history(owner()).await.unwrap();
        assert_eq!(history.len(), 2);
        assert!(history[0].created_at >= history[1].created_at);
        let ids: HashSet<Uuid> = history.iter().map(|j| j.id).collect();
        assert!(ids.contains(&first.records.job.id));
        assert!(ids.contains(&second.records.job.id));

        assert!(pipeline.history(Uuid::new_v4()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_batch_validation() {
        let backend = Arc::new(three_candidates());
        let store = Arc::new(MemoryJobStore::new());
        let settings = PipelineSettings {
            max_files: 2,
            max_file_bytes: 64 * 1024,
            ..PipelineSettings::default()
        };
        let pipeline = pipeline_with(backend.clone(), store.clone(), settings);

        let mut blank = request(vec![resume("Alice")]);
        blank.job_description = "  \n ".to_string();
        let too_many = request(vec![resume("Alice"), resume("Bob"), resume("Carol")]);
        let too_large = request(vec![UploadedFile {
            file_name: "huge.pdf".to_string(),
            content: Bytes::from(vec![0u8; 64 * 1024 + 1]),
        }]);
        let long_name = request(vec![UploadedFile {
            file_name: format!("{}.pdf", "a".repeat(300)),
            content: Bytes::from_static(b"%PDF-1.4"),
        }]);

        for req in [request(Vec::new()), blank, too_many, too_large, long_name] {
            let err = pipeline.run(req).await.unwrap_err();
            assert!(matches!(err, ScreeningError::InvalidBatch(_)), "{err:?}");
        }
        assert_eq!(backend.calls(), 0);
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn test_missing_outcomes_become_failures() {
        let names = vec!["a.pdf".to_string(), "b.pdf".to_string()];
        let present = vec![FileOutcome::failed(
            "b.pdf".to_string(),
            1,
            FailureKind::UnsupportedFormat,
            "nope".to_string(),
        )];
        let filled = fill_missing_outcomes(present, &names);
        assert_eq!(filled.len(), 2);
        match &filled[1] {
            FileOutcome::Failed(f) => {
                assert_eq!(f.file_name, "a.pdf");
                assert_eq!(f.position, 0);
                assert_eq!(f.kind, FailureKind::CorruptOrUnreadable);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
}
