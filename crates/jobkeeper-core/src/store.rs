//! The [`JobStore`] trait — the durable storage abstraction consumed by
//! [`crate::job::Job`] and [`crate::queue::JobQueue`].
//!
//! `jobkeeper-postgres` provides the production implementation
//! (`PgJobStore`); `jobkeeper-testing` provides an in-memory one for
//! tests that don't need a live database.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::{ClaimError, StoreError};
use crate::record::{JobFilter, JobRecord, NewJob};

#[async_trait]
pub trait JobStore: Send + Sync {
    /// Idempotent on `(job_type, remote_id)`: if a row with that pair
    /// already exists, the insert is a no-op and the existing row is
    /// returned — it remains authoritative (spec invariant 1).
    async fn add_job(&self, new_job: NewJob) -> Result<JobRecord, StoreError>;

    /// The single eligible job of `job_type` with the smallest
    /// `timestamp`, if any. Does not claim.
    async fn get_job(&self, job_type: &str, now: i64) -> Result<Option<JobRecord>, StoreError>;

    /// All jobs matching `filter`, ascending by `timestamp`.
    async fn get_all_jobs(&self, filter: JobFilter<'_>, now: i64) -> Result<Vec<JobRecord>, StoreError>;

    async fn get_job_count(&self, job_type: Option<&str>) -> Result<i64, StoreError>;

    /// Clears `timestamp_claimed` on every row. Returns the number of
    /// rows touched. Called once at dispatcher startup (see `SPEC_FULL.md`
    /// OQ-1) to recover from an unclean prior shutdown.
    async fn release_all(&self) -> Result<u64, StoreError>;

    /// Atomic CAS: `timestamp_claimed` 0 → `now` for exactly one caller.
    /// Losers get [`ClaimError::AlreadyClaimed`].
    async fn claim(&self, id: Uuid, now: i64) -> Result<JobRecord, ClaimError>;

    /// One-shot jobs are deleted; interval jobs are rearmed
    /// (`timestamp_claimed = 0`, `timestamp_lastclaimed = now`).
    async fn finish(&self, id: Uuid, interval: i64, now: i64) -> Result<(), StoreError>;

    /// Clears the claim, sets `timestamp_after = now + delay`, and
    /// increments `attempts`.
    async fn release(&self, id: Uuid, delay: i64, now: i64) -> Result<(), StoreError>;

    /// Best-effort, non-transactional status append.
    async fn add_status(&self, id: Uuid, text: &str) -> Result<(), StoreError>;
}
