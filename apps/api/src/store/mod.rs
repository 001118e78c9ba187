//! Job Store Gateway: create-once persistence for screening runs.
//!
//! A run is written as one unit (job, candidates, rejection emails, file
//! failures) and never updated afterwards. Reads are always scoped to the
//! owning user.

#[cfg(test)]
pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::screening::{JobRecords, ScreeningJob};

pub use self::postgres::PgJobStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Screening job {0} already exists")]
    AlreadyExists(Uuid),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait JobStore: Send + Sync {
    /// Persists a complete run. Either everything becomes visible or nothing does.
    async fn create_job(&self, records: &JobRecords) -> Result<(), StoreError>;

    /// Job summaries for an owner, most recent first.
    async fn list_jobs(&self, owner_id: Uuid) -> Result<Vec<ScreeningJob>, StoreError>;

    /// A run with all its records, or `None` if it does not exist for this owner.
    async fn find_job(&self, owner_id: Uuid, job_id: Uuid) -> Result<Option<JobRecords>, StoreError>;
}
