//! [`Job`] — a handle bound to one row, owned by whoever currently holds
//! the in-memory value (the queue, the dispatcher, or a worker).

use std::sync::Arc;

use uuid::Uuid;

use crate::error::{ClaimError, StoreError};
use crate::record::JobRecord;
use crate::store::JobStore;

#[derive(Clone)]
pub struct Job {
    store: Arc<dyn JobStore>,
    record: JobRecord,
}

impl Job {
    pub(crate) fn new(store: Arc<dyn JobStore>, record: JobRecord) -> Self {
        Job { store, record }
    }

    pub fn id(&self) -> Uuid {
        self.record.id
    }

    pub fn record(&self) -> &JobRecord {
        &self.record
    }

    /// Atomically transitions the row from unclaimed to claimed by this
    /// caller. On success, refreshes the in-memory record so callers see
    /// the new `timestamp_claimed`/`attempts`.
    pub async fn claim(&mut self, now: i64) -> Result<(), ClaimError> {
        let claimed = self.store.claim(self.record.id, now).await?;
        self.record = claimed;
        Ok(())
    }

    /// One-shot jobs are deleted; interval jobs are rearmed for the next
    /// cycle. Only the worker that holds the claim should call this.
    pub async fn finish(&mut self, now: i64) -> Result<(), StoreError> {
        self.store
            .finish(self.record.id, self.record.interval, now)
            .await?;
        if self.record.is_one_shot() {
            // row no longer exists; leave the in-memory snapshot as-is for
            // callers that still want to log/inspect it, just mark it claimed=0
            // so `record().is_claimed()` doesn't lie.
            self.record.timestamp_claimed = 0;
        } else {
            self.record.timestamp_claimed = 0;
            self.record.timestamp_lastclaimed = now;
        }
        Ok(())
    }

    /// Relinquishes the claim, making the job eligible again after
    /// `delay` seconds.
    pub async fn release(&mut self, delay: i64, now: i64) -> Result<(), StoreError> {
        self.store.release(self.record.id, delay, now).await?;
        self.record.timestamp_claimed = 0;
        self.record.timestamp_after = now + delay;
        self.record.attempts += 1;
        Ok(())
    }

    /// Best-effort: appends a status line. Failure is not propagated to
    /// callers that are mid-dispatch over a more important error.
    pub async fn add_status(&self, text: &str) {
        if let Err(err) = self.store.add_status(self.record.id, text).await {
            tracing::warn!(job_id = %self.record.id, error = %err, "failed to append job status");
        }
    }
}

impl std::fmt::Debug for Job {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Job").field("record", &self.record).finish()
    }
}
