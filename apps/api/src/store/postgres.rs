use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::info;
use uuid::Uuid;

use crate::models::screening::{
    CandidateRecord, FileFailure, JobRecords, RejectionEmailDraft, ScreeningJob,
};
use crate::store::{JobStore, StoreError};

/// PostgreSQL-backed store. Tables are created by the embedded migrations and
/// reject UPDATEs, so rows stay exactly as written.
#[derive(Clone)]
pub struct PgJobStore {
    pool: PgPool,
}

impl PgJobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn create_job(&self, records: &JobRecords) -> Result<(), StoreError> {
        let JobRecords {
            job,
            candidates,
            rejection_emails,
            failures,
        } = records;

        let mut tx = self.pool.begin().await.map_err(connection_error)?;

        sqlx::query(
            r#"
            INSERT INTO screening_jobs
                (id, owner_id, job_description, position_label, threshold,
                 total_processed, shortlisted_count, rejected_count, failed_count,
                 average_score, processing_time_ms, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(job.id)
        .bind(job.owner_id)
        .bind(&job.job_description)
        .bind(&job.position_label)
        .bind(job.threshold as i16)
        .bind(job.total_processed as i32)
        .bind(job.shortlisted_count as i32)
        .bind(job.rejected_count as i32)
        .bind(job.failed_count as i32)
        .bind(job.average_score)
        .bind(job.processing_time_ms as i64)
        .bind(job.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::AlreadyExists(job.id),
            other => StoreError::Database(other),
        })?;

        for candidate in candidates {
            sqlx::query(
                r#"
                INSERT INTO screening_candidates
                    (id, job_id, file_name, position, rank, name, email, phone, score,
                     status, tier, summary, experience, skills, education, location,
                     raw_extracted_text)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
                "#,
            )
            .bind(candidate.id)
            .bind(candidate.job_id)
            .bind(&candidate.file_name)
            .bind(candidate.position as i32)
            .bind(candidate.rank as i32)
            .bind(&candidate.name)
            .bind(&candidate.email)
            .bind(&candidate.phone)
            .bind(candidate.score as i16)
            .bind(candidate.status.as_str())
            .bind(candidate.tier.as_str())
            .bind(&candidate.summary)
            .bind(&candidate.experience)
            .bind(&candidate.skills)
            .bind(&candidate.education)
            .bind(&candidate.location)
            .bind(&candidate.raw_extracted_text)
            .execute(&mut *tx)
            .await?;
        }

        for email in rejection_emails {
            sqlx::query(
                r#"
                INSERT INTO screening_rejection_emails
                    (candidate_id, job_id, candidate_name, candidate_email, subject, content)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(email.candidate_id)
            .bind(email.job_id)
            .bind(&email.candidate_name)
            .bind(&email.candidate_email)
            .bind(&email.subject)
            .bind(&email.content)
            .execute(&mut *tx)
            .await?;
        }

        for failure in failures {
            sqlx::query(
                r#"
                INSERT INTO screening_file_failures (job_id, position, file_name, kind, message)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(job.id)
            .bind(failure.position as i32)
            .bind(&failure.file_name)
            .bind(failure.kind.as_str())
            .bind(&failure.message)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        info!(
            "Persisted screening job {} ({} candidates, {} rejection emails, {} failures)",
            job.id,
            candidates.len(),
            rejection_emails.len(),
            failures.len()
        );
        Ok(())
    }

    async fn list_jobs(&self, owner_id: Uuid) -> Result<Vec<ScreeningJob>, StoreError> {
        let rows = sqlx::query(
            "SELECT * FROM screening_jobs WHERE owner_id = $1 ORDER BY created_at DESC, id",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(job_from_row).collect::<Result<_, _>>()?)
    }

    async fn find_job(&self, owner_id: Uuid, job_id: Uuid) -> Result<Option<JobRecords>, StoreError> {
        let row = sqlx::query("SELECT * FROM screening_jobs WHERE id = $1 AND owner_id = $2")
            .bind(job_id)
            .bind(owner_id)
            .fetch_optional(&self.pool)
            .await?;

        let job = match row {
            Some(row) => job_from_row(&row)?,
            None => return Ok(None),
        };

        let candidates = sqlx::query(
            "SELECT * FROM screening_candidates WHERE job_id = $1 ORDER BY rank, position",
        )
        .bind(job_id)
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(candidate_from_row)
        .collect::<Result<Vec<_>, _>>()?;

        let rejection_emails = sqlx::query(
            r#"
            SELECT e.* FROM screening_rejection_emails e
            JOIN screening_candidates c ON c.id = e.candidate_id
            WHERE e.job_id = $1
            ORDER BY c.rank, c.position
            "#,
        )
        .bind(job_id)
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(email_from_row)
        .collect::<Result<Vec<_>, _>>()?;

        let failures = sqlx::query(
            "SELECT * FROM screening_file_failures WHERE job_id = $1 ORDER BY position",
        )
        .bind(job_id)
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(failure_from_row)
        .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(JobRecords {
            job,
            candidates,
            rejection_emails,
            failures,
        }))
    }
}

/// Pool exhaustion and I/O failures mean the database could not be reached at all.
fn connection_error(e: sqlx::Error) -> StoreError {
    match e {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            StoreError::Unavailable(e.to_string())
        }
        other => StoreError::Database(other),
    }
}

fn decode_error<E>(e: E) -> sqlx::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    sqlx::Error::Decode(Box::new(e))
}

fn job_from_row(row: &PgRow) -> Result<ScreeningJob, sqlx::Error> {
    Ok(ScreeningJob {
        id: row.try_get("id")?,
        owner_id: row.try_get("owner_id")?,
        job_description: row.try_get("job_description")?,
        position_label: row.try_get("position_label")?,
        threshold: u8::try_from(row.try_get::<i16, _>("threshold")?).map_err(decode_error)?,
        total_processed: u32::try_from(row.try_get::<i32, _>("total_processed")?)
            .map_err(decode_error)?,
        shortlisted_count: u32::try_from(row.try_get::<i32, _>("shortlisted_count")?)
            .map_err(decode_error)?,
        rejected_count: u32::try_from(row.try_get::<i32, _>("rejected_count")?)
            .map_err(decode_error)?,
        failed_count: u32::try_from(row.try_get::<i32, _>("failed_count")?)
            .map_err(decode_error)?,
        average_score: row.try_get("average_score")?,
        processing_time_ms: u64::try_from(row.try_get::<i64, _>("processing_time_ms")?)
            .map_err(decode_error)?,
        created_at: row.try_get("created_at")?,
    })
}

fn candidate_from_row(row: &PgRow) -> Result<CandidateRecord, sqlx::Error> {
    Ok(CandidateRecord {
        id: row.try_get("id")?,
        job_id: row.try_get("job_id")?,
        file_name: row.try_get("file_name")?,
        position: u32::try_from(row.try_get::<i32, _>("position")?).map_err(decode_error)?,
        rank: u32::try_from(row.try_get::<i32, _>("rank")?).map_err(decode_error)?,
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        phone: row.try_get("phone")?,
        score: u8::try_from(row.try_get::<i16, _>("score")?).map_err(decode_error)?,
        status: row
            .try_get::<String, _>("status")?
            .parse()
            .map_err(decode_error)?,
        tier: row
            .try_get::<String, _>("tier")?
            .parse()
            .map_err(decode_error)?,
        summary: row.try_get("summary")?,
        experience: row.try_get("experience")?,
        skills: row.try_get("skills")?,
        education: row.try_get("education")?,
        location: row.try_get("location")?,
        raw_extracted_text: row.try_get("raw_extracted_text")?,
    })
}

fn email_from_row(row: &PgRow) -> Result<RejectionEmailDraft, sqlx::Error> {
    Ok(RejectionEmailDraft {
        candidate_id: row.try_get("candidate_id")?,
        job_id: row.try_get("job_id")?,
        candidate_name: row.try_get("candidate_name")?,
        candidate_email: row.try_get("candidate_email")?,
        subject: row.try_get("subject")?,
        content: row.try_get("content")?,
    })
}

fn failure_from_row(row: &PgRow) -> Result<FileFailure, sqlx::Error> {
    Ok(FileFailure {
        file_name: row.try_get("file_name")?,
        position: u32::try_from(row.try_get::<i32, _>("position")?).map_err(decode_error)?,
        kind: row
            .try_get::<String, _>("kind")?
            .parse()
            .map_err(decode_error)?,
        message: row.try_get("message")?,
    })
}
