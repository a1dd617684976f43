//! [`JobQueue`] — the client-facing enqueue/inspect API over a
//! [`JobStore`].

use std::sync::Arc;

use uuid::Uuid;

use crate::error::StoreError;
use crate::job::Job;
use crate::record::{JobFilter, JobTypeFilter, NewJob};
use crate::store::JobStore;

#[derive(Clone)]
pub struct JobQueue {
    store: Arc<dyn JobStore>,
}

impl JobQueue {
    pub fn new(store: Arc<dyn JobStore>) -> Self {
        JobQueue { store }
    }

    /// Adds a new job. Idempotent on `(job_type, remote_id)` — see
    /// [`JobStore::add_job`]. `remote_id` defaults to a fresh UUID when
    /// `None`. `claim_after` is an absolute Unix timestamp; `interval` of
    /// `0` makes the job one-shot.
    pub async fn add_job(
        &self,
        job_type: impl Into<String>,
        details: serde_json::Value,
        remote_id: Option<String>,
        claim_after: i64,
        interval: i64,
    ) -> Result<Job, StoreError> {
        let remote_id = remote_id.unwrap_or_else(|| Uuid::new_v4().to_string());
        let now = now_unix();

        let record = self
            .store
            .add_job(NewJob {
                job_type: job_type.into(),
                remote_id,
                details,
                timestamp: now,
                timestamp_after: claim_after,
                interval,
            })
            .await?;

        Ok(Job::new(self.store.clone(), record))
    }

    /// The single eligible job of `job_type` with the smallest
    /// `timestamp`. Does not claim.
    pub async fn get_job(&self, job_type: &str) -> Result<Option<Job>, StoreError> {
        let record = self.store.get_job(job_type, now_unix()).await?;
        Ok(record.map(|r| Job::new(self.store.clone(), r)))
    }

    /// All jobs matching `filter`, ascending by `timestamp`.
    pub async fn get_all_jobs(&self, filter: JobFilter<'_>) -> Result<Vec<Job>, StoreError> {
        let records = self.store.get_all_jobs(filter, now_unix()).await?;
        Ok(records
            .into_iter()
            .map(|r| Job::new(self.store.clone(), r))
            .collect())
    }

    pub async fn get_job_count(&self, job_type: Option<&str>) -> Result<i64, StoreError> {
        self.store.get_job_count(job_type).await
    }

    /// Clears `timestamp_claimed` on every row. Called once at dispatcher
    /// startup.
    pub async fn release_all(&self) -> Result<u64, StoreError> {
        self.store.release_all().await
    }

    /// 0 if `job` is currently claimed; otherwise its 1-based position
    /// among jobs of the same type that are earlier (by `timestamp`) or
    /// currently claimed.
    pub async fn get_place_in_queue(&self, job: &Job) -> Result<usize, StoreError> {
        if job.record().is_claimed() {
            return Ok(0);
        }

        let filter = JobFilter::of_type(&job.record().job_type).claimable(false);
        let all = self.store.get_all_jobs(filter, now_unix()).await?;
        let our_timestamp = job.record().timestamp;

        Ok(all
            .iter()
            .filter(|queued| queued.timestamp < our_timestamp || queued.is_claimed())
            .count())
    }

    /// Has any job at all (used by `Scheduler::has_jobs`).
    pub async fn has_jobs(&self) -> Result<bool, StoreError> {
        let all = self
            .store
            .get_all_jobs(
                JobFilter {
                    job_type: JobTypeFilter::All,
                    remote_id: None,
                    restrict_claimable: false,
                },
                now_unix(),
            )
            .await?;
        Ok(!all.is_empty())
    }
}

pub(crate) fn now_unix() -> i64 {
    chrono::Utc::now().timestamp()
}
