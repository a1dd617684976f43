//! The persisted job row and the types used to query for it.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single persisted job row.
///
/// Mirrors the `jobs` table exactly (see the crate-level schema doc
/// comment). Timestamps are Unix seconds rather than `DateTime<Utc>` so
/// that the eligibility arithmetic (`timestamp_lastclaimed + interval <
/// now`) is plain integer comparison, matching the original queue's
/// predicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: Uuid,
    pub job_type: String,
    pub remote_id: String,
    pub details: serde_json::Value,
    pub timestamp: i64,
    pub timestamp_after: i64,
    pub timestamp_claimed: i64,
    pub timestamp_lastclaimed: i64,
    pub interval: i64,
    pub attempts: i32,
    pub status: String,
}

impl JobRecord {
    /// Whether this row is currently owned by a worker.
    pub fn is_claimed(&self) -> bool {
        self.timestamp_claimed > 0
    }

    /// Whether this row may be claimed at `now` (invariant 2 of the spec).
    pub fn is_eligible(&self, now: i64) -> bool {
        !self.is_claimed()
            && self.timestamp_after < now
            && (self.interval == 0 || self.timestamp_lastclaimed + self.interval < now)
    }

    /// `true` for jobs that are removed (rather than rearmed) on finish.
    pub fn is_one_shot(&self) -> bool {
        self.interval == 0
    }
}

/// Parameters for [`crate::queue::JobQueue::add_job`].
#[derive(Debug, Clone)]
pub struct NewJob {
    pub job_type: String,
    pub remote_id: String,
    pub details: serde_json::Value,
    pub timestamp: i64,
    pub timestamp_after: i64,
    pub interval: i64,
}

/// Selects which `job_type`s a query should consider.
#[derive(Debug, Clone, Copy)]
pub enum JobTypeFilter<'a> {
    All,
    Only(&'a str),
}

/// Parameters for [`crate::queue::JobQueue::get_all_jobs`] /
/// [`crate::store::JobStore::get_all_jobs`].
#[derive(Debug, Clone, Copy)]
pub struct JobFilter<'a> {
    pub job_type: JobTypeFilter<'a>,
    pub remote_id: Option<&'a str>,
    pub restrict_claimable: bool,
}

impl<'a> JobFilter<'a> {
    /// All claimable jobs of every type — what the dispatcher fetches
    /// each tick.
    pub fn claimable_all() -> Self {
        JobFilter {
            job_type: JobTypeFilter::All,
            remote_id: None,
            restrict_claimable: true,
        }
    }

    pub fn of_type(job_type: &'a str) -> Self {
        JobFilter {
            job_type: JobTypeFilter::Only(job_type),
            remote_id: None,
            restrict_claimable: false,
        }
    }

    pub fn claimable(mut self, restrict: bool) -> Self {
        self.restrict_claimable = restrict;
        self
    }

    pub fn remote_id(mut self, remote_id: &'a str) -> Self {
        self.remote_id = Some(remote_id);
        self
    }
}
