use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::screening::{JobRecords, ScreeningJob};
use crate::store::{JobStore, StoreError};

/// In-process store for tests. Can be told to fail writes.
#[derive(Default)]
pub struct MemoryJobStore {
    jobs: Mutex<Vec<JobRecords>>,
    fail_writes: AtomicBool,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        let store = Self::default();
        store.fail_writes.store(true, Ordering::SeqCst);
        store
    }

    pub fn len(&self) -> usize {
        self.jobs.lock().unwrap().len()
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn create_job(&self, records: &JobRecords) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("write rejected".to_string()));
        }
        let mut jobs = self.jobs.lock().unwrap();
        if jobs.iter().any(|r| r.job.id == records.job.id) {
            return Err(StoreError::AlreadyExists(records.job.id));
        }
        jobs.push(records.clone());
        Ok(())
    }

    async fn list_jobs(&self, owner_id: Uuid) -> Result<Vec<ScreeningJob>, StoreError> {
        let jobs = self.jobs.lock().unwrap();
        let mut summaries: Vec<ScreeningJob> = jobs
            .iter()
            .filter(|r| r.job.owner_id == owner_id)
            .map(|r| r.job.clone())
            .collect();
        summaries.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(summaries)
    }

    async fn find_job(&self, owner_id: Uuid, job_id: Uuid) -> Result<Option<JobRecords>, StoreError> {
        let jobs = self.jobs.lock().unwrap();
        Ok(jobs
            .iter()
            .find(|r| r.job.id == job_id && r.job.owner_id == owner_id)
            .cloned())
    }
}
