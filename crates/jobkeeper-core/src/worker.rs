//! The [`Worker`] trait and the scaffolding that runs one claimed job to
//! a terminal transition.
//!
//! `work()` must poll [`WorkerContext::interrupt_level`] at whatever
//! points it can safely pause, and return `Ok(WorkSignal::Interrupted(_))`
//! to unwind cooperatively. There is no forced cancellation: a worker that
//! never checks the flag cannot be stopped short of the process exiting.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use crate::job::Job;
use crate::record::JobRecord;

/// Cooperative-abort policy requested of a running worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum InterruptLevel {
    /// No interrupt has been requested.
    None = 0,
    /// Requeue the job with a short delay.
    Retry = 1,
    /// Terminate the job outright.
    Cancel = 2,
}

impl InterruptLevel {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => InterruptLevel::Retry,
            2 => InterruptLevel::Cancel,
            _ => InterruptLevel::None,
        }
    }
}

/// The outcome of a normal (non-crashing) `work()` return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkSignal {
    /// Work completed; the job should be finished.
    Done,
    /// Work unwound because an interrupt was requested at `level`.
    Interrupted(InterruptLevel),
}

/// Shared state handed to a running worker: the claimed job's data and
/// the interrupt flag the dispatcher writes to.
pub struct WorkerContext {
    pub job: JobRecord,
    interrupt: Arc<AtomicU8>,
}

impl WorkerContext {
    pub(crate) fn new(job: JobRecord, interrupt: Arc<AtomicU8>) -> Self {
        WorkerContext { job, interrupt }
    }

    /// The current interrupt level. Safe to poll as often as needed.
    pub fn interrupt_level(&self) -> InterruptLevel {
        InterruptLevel::from_u8(self.interrupt.load(Ordering::Relaxed))
    }
}

/// A registered job handler. One instance serves every job of its
/// `job_type`, since `work` takes the job as a parameter rather than
/// being constructed per-claim — workers carry no per-job state.
#[async_trait]
pub trait Worker: Send + Sync {
    /// The tag this worker is registered under in the [`crate::registry::WorkerRegistry`].
    fn job_type(&self) -> &str;

    /// Maximum concurrently running jobs of this type.
    fn max_workers(&self) -> usize {
        1
    }

    async fn work(&self, ctx: &WorkerContext) -> Result<WorkSignal, anyhow::Error>;
}

/// Shared handle the dispatcher holds to set the interrupt flag of a
/// running worker task, used by `request_interrupt` and shutdown.
#[derive(Clone)]
pub struct InterruptHandle(pub(crate) Arc<AtomicU8>);

impl InterruptHandle {
    pub fn request(&self, level: InterruptLevel) {
        self.0.store(level as u8, Ordering::Relaxed);
    }
}

/// Runs `worker.work()` to a terminal job transition. This is the
/// scaffold described in `SPEC_FULL.md` §4.5: it never raises, it only
/// logs and mutates the job.
pub async fn run_worker(worker: Arc<dyn Worker>, mut job: Job, ctx: WorkerContext) {
    let now = crate::queue::now_unix();

    let outcome = worker.work(&ctx).await;

    match outcome {
        Ok(WorkSignal::Done) => {
            if let Err(err) = job.finish(now).await {
                tracing::error!(job_id = %job.id(), error = %err, "failed to finish completed job");
            }
        }
        Ok(WorkSignal::Interrupted(InterruptLevel::Retry)) => {
            tracing::info!(job_id = %job.id(), job_type = worker.job_type(), "worker interrupted, retrying");
            if let Err(err) = job.release(10, now).await {
                tracing::error!(job_id = %job.id(), error = %err, "failed to release interrupted job");
            }
        }
        Ok(WorkSignal::Interrupted(InterruptLevel::Cancel)) => {
            tracing::info!(job_id = %job.id(), job_type = worker.job_type(), "worker interrupted, cancelling");
            if let Err(err) = job.finish(now).await {
                tracing::error!(job_id = %job.id(), error = %err, "failed to finish cancelled job");
            }
        }
        Ok(WorkSignal::Interrupted(InterruptLevel::None)) => {
            // Unreachable by construction: a worker only returns
            // `Interrupted` after observing a non-`None` level.
            tracing::warn!(job_id = %job.id(), "worker reported an interrupt with no level; treating as cancel");
            if let Err(err) = job.finish(now).await {
                tracing::error!(job_id = %job.id(), error = %err, "failed to finish job");
            }
        }
        Err(err) => {
            tracing::error!(
                job_id = %job.id(),
                job_type = worker.job_type(),
                error = ?err,
                "worker raised an error and will abort"
            );
            job.add_status("Crash during execution").await;
            if let Err(err) = job.finish(now).await {
                tracing::error!(job_id = %job.id(), error = %err, "failed to finish crashed job");
            }
        }
    }
}
