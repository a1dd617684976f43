//! [`Dispatcher`] — the scheduling loop that claims eligible jobs and
//! hands them to registered workers.
//!
//! Replaces the original `WorkerManager(threading.Thread)`: one `tokio`
//! task per claimed job instead of one OS thread, a `DashMap` pool
//! instead of a manually-reaped thread list, and a registry lookup
//! instead of dynamic file loading.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::queue::{now_unix, JobQueue};
use crate::record::JobFilter;
use crate::registry::WorkerRegistry;
use crate::worker::{run_worker, InterruptHandle, InterruptLevel, WorkerContext};

const POLL_INTERVAL: Duration = Duration::from_millis(100);
const SHUTDOWN_SETTLE: Duration = Duration::from_secs(3);

struct RunningJob {
    job_id: Uuid,
    interrupt: InterruptHandle,
    handle: JoinHandle<()>,
}

/// Claims ready jobs and runs them against the registered [`Worker`]s.
///
/// [`Worker`]: crate::worker::Worker
pub struct Dispatcher {
    queue: JobQueue,
    registry: Arc<WorkerRegistry>,
    running: Arc<AtomicBool>,
    pool: Arc<DashMap<String, Vec<RunningJob>>>,
}

impl Dispatcher {
    pub fn new(queue: JobQueue, registry: WorkerRegistry) -> Self {
        Dispatcher {
            queue,
            registry: Arc::new(registry),
            running: Arc::new(AtomicBool::new(false)),
            pool: Arc::new(DashMap::new()),
        }
    }

    /// Whether the dispatch loop is currently running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Requests an interrupt on a specific running job, if it is still
    /// tracked in the pool. Returns `false` if no matching job is
    /// currently running (it may have already finished).
    pub fn request_interrupt(&self, job_type: &str, job_id: Uuid, level: InterruptLevel) -> bool {
        if let Some(running) = self.pool.get(job_type) {
            if let Some(job) = running.iter().find(|j| j.job_id == job_id) {
                job.interrupt.request(level);
                return true;
            }
        }
        false
    }

    /// Runs the dispatch loop until [`Dispatcher::stop`] is called from
    /// another task. Per `SPEC_FULL.md` OQ-1, calls
    /// [`JobQueue::release_all`] once up front to clear claims left over
    /// from an unclean prior shutdown.
    pub async fn run(&self) {
        self.running.store(true, Ordering::SeqCst);

        match self.queue.release_all().await {
            Ok(count) if count > 0 => {
                tracing::info!(count, "released stale claims from a prior run");
            }
            Ok(_) => {}
            Err(err) => {
                tracing::error!(error = %err, "failed to release stale claims at startup");
            }
        }

        while self.running.load(Ordering::SeqCst) {
            if let Err(err) = self.tick().await {
                tracing::error!(error = %err, "dispatch tick failed");
            }
            self.reap();
            tokio::time::sleep(POLL_INTERVAL).await;
        }

        self.shutdown().await;
    }

    /// Stops the loop and waits for every running worker task to unwind.
    /// Mirrors the original `abort()` + join-all + settle-sleep sequence.
    pub async fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    async fn shutdown(&self) {
        let job_types: Vec<String> = self.pool.iter().map(|e| e.key().clone()).collect();
        for job_type in job_types {
            if let Some((_, running)) = self.pool.remove(&job_type) {
                for job in &running {
                    job.interrupt.request(InterruptLevel::Cancel);
                }
                for job in running {
                    let _ = job.handle.await;
                }
            }
        }
        tokio::time::sleep(SHUTDOWN_SETTLE).await;
    }

    async fn tick(&self) -> Result<(), crate::error::StoreError> {
        let candidates = self.queue.get_all_jobs(JobFilter::claimable_all()).await?;

        for mut job in candidates {
            let job_type = job.record().job_type.clone();

            let Some(worker) = self.registry.get(&job_type) else {
                tracing::warn!(job_type = %job_type, "no worker registered for job type, cancelling");
                job.add_status(&format!(
                    "No worker registered for job type {job_type:?}. Cancelling."
                ))
                .await;
                if let Err(err) = job.finish(now_unix()).await {
                    tracing::error!(error = %err, "failed to finish job with no registered worker");
                }
                continue;
            };

            let running_count = self.pool.get(&job_type).map(|r| r.len()).unwrap_or(0);
            if running_count >= worker.max_workers() {
                continue;
            }

            let now = now_unix();
            match job.claim(now).await {
                Ok(()) => {}
                Err(crate::error::ClaimError::AlreadyClaimed(_)) => continue,
                Err(err) => {
                    tracing::error!(error = %err, "failed to claim job");
                    continue;
                }
            }

            let interrupt = Arc::new(AtomicU8::new(InterruptLevel::None as u8));
            let ctx = WorkerContext::new(job.record().clone(), interrupt.clone());
            let job_id = job.id();
            let worker_for_task = worker.clone();

            let handle = tokio::spawn(run_worker(worker_for_task, job, ctx));

            self.pool.entry(job_type).or_default().push(RunningJob {
                job_id,
                interrupt: InterruptHandle(interrupt),
                handle,
            });
        }

        Ok(())
    }

    fn reap(&self) {
        for mut entry in self.pool.iter_mut() {
            entry.value_mut().retain(|job| !job.handle.is_finished());
        }
    }
}
