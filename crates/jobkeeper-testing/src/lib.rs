//! An in-memory [`JobStore`] for tests that don't need a live database.
//!
//! Mirrors the locking semantics of `jobkeeper-postgres`'s `PgJobStore`
//! closely enough that the same test suite can run against either: a
//! single mutex guards the whole table, and `claim` is a compare-and-swap
//! under that lock rather than a real `UPDATE ... WHERE`.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use jobkeeper_core::error::{ClaimError, StoreError};
use jobkeeper_core::record::{JobFilter, JobRecord, JobTypeFilter, NewJob};
use jobkeeper_core::store::JobStore;
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Default)]
pub struct MemoryJobStore {
    rows: Mutex<HashMap<Uuid, JobRecord>>,
}

impl MemoryJobStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Test helper: snapshot every row, for assertions that don't go
    /// through the `JobStore` query surface.
    pub async fn snapshot(&self) -> Vec<JobRecord> {
        self.rows.lock().await.values().cloned().collect()
    }
}

fn matches(record: &JobRecord, filter: &JobFilter<'_>, now: i64) -> bool {
    let type_matches = match filter.job_type {
        JobTypeFilter::All => true,
        JobTypeFilter::Only(t) => record.job_type == t,
    };
    if !type_matches {
        return false;
    }
    if let Some(remote_id) = filter.remote_id {
        if record.remote_id != remote_id {
            return false;
        }
    }
    if filter.restrict_claimable && !record.is_eligible(now) {
        return false;
    }
    true
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn add_job(&self, new_job: NewJob) -> Result<JobRecord, StoreError> {
        let mut rows = self.rows.lock().await;

        if let Some(existing) = rows.values().find(|r| {
            r.job_type == new_job.job_type && r.remote_id == new_job.remote_id
        }) {
            return Ok(existing.clone());
        }

        let record = JobRecord {
            id: Uuid::new_v4(),
            job_type: new_job.job_type,
            remote_id: new_job.remote_id,
            details: new_job.details,
            timestamp: new_job.timestamp,
            timestamp_after: new_job.timestamp_after,
            timestamp_claimed: 0,
            timestamp_lastclaimed: 0,
            interval: new_job.interval,
            attempts: 0,
            status: String::new(),
        };
        rows.insert(record.id, record.clone());
        Ok(record)
    }

    async fn get_job(&self, job_type: &str, now: i64) -> Result<Option<JobRecord>, StoreError> {
        let rows = self.rows.lock().await;
        let mut candidates: Vec<&JobRecord> = rows
            .values()
            .filter(|r| r.job_type == job_type && r.is_eligible(now))
            .collect();
        candidates.sort_by_key(|r| r.timestamp);
        Ok(candidates.into_iter().next().cloned())
    }

    async fn get_all_jobs(
        &self,
        filter: JobFilter<'_>,
        now: i64,
    ) -> Result<Vec<JobRecord>, StoreError> {
        let rows = self.rows.lock().await;
        let mut matching: Vec<JobRecord> = rows
            .values()
            .filter(|r| matches(r, &filter, now))
            .cloned()
            .collect();
        matching.sort_by_key(|r| r.timestamp);
        Ok(matching)
    }

    async fn get_job_count(&self, job_type: Option<&str>) -> Result<i64, StoreError> {
        let rows = self.rows.lock().await;
        let count = rows
            .values()
            .filter(|r| job_type.map(|t| r.job_type == t).unwrap_or(true))
            .count();
        Ok(count as i64)
    }

    async fn release_all(&self) -> Result<u64, StoreError> {
        let mut rows = self.rows.lock().await;
        let mut touched = 0u64;
        for record in rows.values_mut() {
            if record.timestamp_claimed != 0 {
                record.timestamp_claimed = 0;
                touched += 1;
            }
        }
        Ok(touched)
    }

    async fn claim(&self, id: Uuid, now: i64) -> Result<JobRecord, ClaimError> {
        let mut rows = self.rows.lock().await;
        let record = rows
            .get_mut(&id)
            .ok_or(ClaimError::Store(StoreError::NotFound(id)))?;
        if record.timestamp_claimed != 0 {
            return Err(ClaimError::AlreadyClaimed(id));
        }
        record.timestamp_claimed = now;
        record.timestamp_lastclaimed = now;
        record.attempts += 1;
        Ok(record.clone())
    }

    async fn finish(&self, id: Uuid, interval: i64, now: i64) -> Result<(), StoreError> {
        let mut rows = self.rows.lock().await;
        if interval == 0 {
            rows.remove(&id);
        } else if let Some(record) = rows.get_mut(&id) {
            record.timestamp_claimed = 0;
            record.timestamp_lastclaimed = now;
        }
        Ok(())
    }

    async fn release(&self, id: Uuid, delay: i64, now: i64) -> Result<(), StoreError> {
        let mut rows = self.rows.lock().await;
        let record = rows.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        record.timestamp_claimed = 0;
        record.timestamp_after = now + delay;
        record.attempts += 1;
        Ok(())
    }

    async fn add_status(&self, id: Uuid, text: &str) -> Result<(), StoreError> {
        let mut rows = self.rows.lock().await;
        let record = rows.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        record.status.push_str(text);
        record.status.push('\n');
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jobkeeper_core::queue::JobQueue;

    #[tokio::test]
    async fn add_job_is_idempotent_on_type_and_remote_id() {
        let store = MemoryJobStore::new();
        let queue = JobQueue::new(store.clone());

        let a = queue
            .add_job("email", serde_json::json!({}), Some("dup".into()), 0, 0)
            .await
            .unwrap();
        let b = queue
            .add_job("email", serde_json::json!({"x": 1}), Some("dup".into()), 0, 0)
            .await
            .unwrap();

        assert_eq!(a.id(), b.id());
        assert_eq!(queue.get_job_count(None).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn claim_is_exclusive() {
        let store = MemoryJobStore::new();
        let queue = JobQueue::new(store.clone());
        let job = queue
            .add_job("email", serde_json::json!({}), None, 0, 0)
            .await
            .unwrap();

        let id = job.id();
        let first = store.claim(id, 1000).await;
        assert!(first.is_ok());

        let second = store.claim(id, 1001).await;
        assert!(matches!(second, Err(ClaimError::AlreadyClaimed(claimed)) if claimed == id));
    }

    #[tokio::test]
    async fn one_shot_job_disappears_after_finish() {
        let store = MemoryJobStore::new();
        let queue = JobQueue::new(store.clone());
        let mut job = queue
            .add_job("email", serde_json::json!({}), None, 0, 0)
            .await
            .unwrap();

        job.claim(1000).await.unwrap();
        job.finish(1001).await.unwrap();

        assert_eq!(queue.get_job_count(None).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn interval_job_rearms_after_finish() {
        let store = MemoryJobStore::new();
        let queue = JobQueue::new(store.clone());
        let mut job = queue
            .add_job("email", serde_json::json!({}), None, 0, 60)
            .await
            .unwrap();

        job.claim(1000).await.unwrap();
        job.finish(1000).await.unwrap();

        let snapshot = store.snapshot().await;
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].timestamp_claimed, 0);
        assert_eq!(snapshot[0].timestamp_lastclaimed, 1000);
    }

    #[tokio::test]
    async fn release_reopens_job_after_delay() {
        let store = MemoryJobStore::new();
        let queue = JobQueue::new(store.clone());
        let mut job = queue
            .add_job("email", serde_json::json!({}), None, 0, 0)
            .await
            .unwrap();

        job.claim(1000).await.unwrap();
        job.release(10, 1000).await.unwrap();

        assert!(!job.record().is_claimed());
        assert_eq!(job.record().timestamp_after, 1010);
        assert_eq!(job.record().attempts, 1);
    }
}
