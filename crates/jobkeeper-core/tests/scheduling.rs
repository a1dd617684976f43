//! Scenario-level tests for the dispatcher, run against the in-memory
//! store so they don't need a live Postgres instance.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use jobkeeper_core::{
    Dispatcher, InterruptLevel, JobFilter, JobStore, Scheduler, WorkSignal, Worker, WorkerContext,
    WorkerRegistry,
};
use jobkeeper_testing::MemoryJobStore;

fn now_unix() -> i64 {
    chrono::Utc::now().timestamp()
}

struct CountingWorker {
    job_type: String,
    runs: Arc<AtomicUsize>,
}

#[async_trait]
impl Worker for CountingWorker {
    fn job_type(&self) -> &str {
        &self.job_type
    }

    async fn work(&self, _ctx: &WorkerContext) -> Result<WorkSignal, anyhow::Error> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        Ok(WorkSignal::Done)
    }
}

struct CrashingWorker {
    job_type: String,
}

#[async_trait]
impl Worker for CrashingWorker {
    fn job_type(&self) -> &str {
        &self.job_type
    }

    async fn work(&self, _ctx: &WorkerContext) -> Result<WorkSignal, anyhow::Error> {
        anyhow::bail!("boom")
    }
}

struct InterruptibleWorker {
    job_type: String,
}

#[async_trait]
impl Worker for InterruptibleWorker {
    fn job_type(&self) -> &str {
        &self.job_type
    }

    async fn work(&self, ctx: &WorkerContext) -> Result<WorkSignal, anyhow::Error> {
        for _ in 0..50 {
            if ctx.interrupt_level() != InterruptLevel::None {
                return Ok(WorkSignal::Interrupted(ctx.interrupt_level()));
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        Ok(WorkSignal::Done)
    }
}

// S1 — basic lifecycle: a one-shot job disappears once its worker runs.
#[tokio::test]
async fn s1_basic_lifecycle() {
    let store = MemoryJobStore::new();
    let runs = Arc::new(AtomicUsize::new(0));
    let registry = WorkerRegistry::builder()
        .register(Arc::new(CountingWorker {
            job_type: "w".into(),
            runs: runs.clone(),
        }))
        .build();

    let mut scheduler = Scheduler::new(store, registry);
    scheduler
        .queue()
        .add_job("w", serde_json::json!({"n": 1}), Some("x".into()), 0, 0)
        .await
        .unwrap();

    scheduler.start();
    tokio::time::sleep(Duration::from_millis(300)).await;
    scheduler.end().await;

    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert!(!scheduler.has_jobs().await.unwrap());
}

// S2 — duplicate suppression.
#[tokio::test]
async fn s2_duplicate_suppression() {
    let store = MemoryJobStore::new();
    let queue = jobkeeper_core::JobQueue::new(store);

    queue
        .add_job("w", serde_json::json!({}), Some("x".into()), 0, 0)
        .await
        .unwrap();
    queue
        .add_job("w", serde_json::json!({}), Some("x".into()), 0, 0)
        .await
        .unwrap();

    assert_eq!(queue.get_job_count(Some("w")).await.unwrap(), 1);
}

// S3 — deferred jobs are not claimed before claim_after.
#[tokio::test]
async fn s3_deferred_job_waits() {
    let store = MemoryJobStore::new();
    let runs = Arc::new(AtomicUsize::new(0));
    let registry = WorkerRegistry::builder()
        .register(Arc::new(CountingWorker {
            job_type: "w".into(),
            runs: runs.clone(),
        }))
        .build();

    let now = now_unix();
    let mut scheduler = Scheduler::new(store, registry);
    scheduler
        .queue()
        .add_job("w", serde_json::json!({}), Some("y".into()), now + 3600, 0)
        .await
        .unwrap();

    scheduler.start();
    tokio::time::sleep(Duration::from_millis(300)).await;
    scheduler.end().await;

    assert_eq!(runs.load(Ordering::SeqCst), 0);
}

// S4 — interval jobs persist across multiple runs.
#[tokio::test]
async fn s4_interval_job_rearms() {
    let store = MemoryJobStore::new();
    let runs = Arc::new(AtomicUsize::new(0));
    let registry = WorkerRegistry::builder()
        .register(Arc::new(CountingWorker {
            job_type: "w".into(),
            runs: runs.clone(),
        }))
        .build();

    let mut scheduler = Scheduler::new(store, registry);
    scheduler
        .queue()
        .add_job("w", serde_json::json!({}), Some("z".into()), 0, 1)
        .await
        .unwrap();

    scheduler.start();
    tokio::time::sleep(Duration::from_millis(300)).await;
    scheduler.end().await;

    assert!(runs.load(Ordering::SeqCst) >= 1);
    assert_eq!(scheduler.queue().get_job_count(Some("w")).await.unwrap(), 1);
}

// A job whose type has no registered worker is cancelled (status note +
// finish), not left claimable forever.
#[tokio::test]
async fn unregistered_job_type_is_cancelled() {
    let store = MemoryJobStore::new();
    let registry = WorkerRegistry::builder().build();

    let mut scheduler = Scheduler::new(store, registry);
    scheduler
        .queue()
        .add_job("ghost", serde_json::json!({}), Some("x".into()), 0, 0)
        .await
        .unwrap();

    scheduler.start();
    tokio::time::sleep(Duration::from_millis(300)).await;
    scheduler.end().await;

    // one-shot: finish() deletes the row outright.
    assert!(!scheduler.has_jobs().await.unwrap());
}

#[tokio::test]
async fn unregistered_interval_job_type_is_cancelled_with_status_and_rearmed() {
    let store = MemoryJobStore::new();
    let registry = WorkerRegistry::builder().build();

    let mut scheduler = Scheduler::new(store, registry);
    scheduler
        .queue()
        .add_job("ghost", serde_json::json!({}), Some("x".into()), 0, 60)
        .await
        .unwrap();

    scheduler.start();
    tokio::time::sleep(Duration::from_millis(300)).await;
    scheduler.end().await;

    let all = scheduler
        .queue()
        .get_all_jobs(JobFilter::of_type("ghost").claimable(false))
        .await
        .unwrap();
    assert_eq!(all.len(), 1);
    assert!(all[0].record().status.contains("No worker registered"));
    assert!(!all[0].record().is_claimed());
}

// S5 — crash: a worker error still finishes (deletes) a one-shot job and
// records a status line, without taking down the dispatch loop.
#[tokio::test]
async fn s5_crash_finishes_one_shot_job() {
    let store = MemoryJobStore::new();
    let registry = WorkerRegistry::builder()
        .register(Arc::new(CrashingWorker {
            job_type: "w".into(),
        }))
        .build();

    let mut scheduler = Scheduler::new(store, registry);
    scheduler
        .queue()
        .add_job("w", serde_json::json!({}), Some("x".into()), 0, 0)
        .await
        .unwrap();

    scheduler.start();
    tokio::time::sleep(Duration::from_millis(300)).await;
    scheduler.end().await;

    assert!(!scheduler.has_jobs().await.unwrap());
}

// S6 — retry interrupt: a running job that observes Retry is released
// with a short delay and picked back up later, with attempts incremented
// across both the initial claim and the retried one.
#[tokio::test]
async fn s6_retry_interrupt_reschedules() {
    let store = MemoryJobStore::new();
    let registry = WorkerRegistry::builder()
        .register(Arc::new(InterruptibleWorker {
            job_type: "w".into(),
        }))
        .build();

    let queue = jobkeeper_core::JobQueue::new(store.clone());
    let job = queue
        .add_job("w", serde_json::json!({}), Some("x".into()), 0, 0)
        .await
        .unwrap();

    let dispatcher = Arc::new(Dispatcher::new(queue.clone(), registry));
    let dispatcher_task = {
        let d = dispatcher.clone();
        tokio::spawn(async move { d.run().await })
    };

    // give the dispatcher time to claim and start the job
    tokio::time::sleep(Duration::from_millis(250)).await;
    let requested = dispatcher.request_interrupt("w", job.id(), InterruptLevel::Retry);
    assert!(requested);

    // wait long enough for release(10) to land, then read the state back
    tokio::time::sleep(Duration::from_millis(300)).await;
    dispatcher.stop().await;
    let _ = dispatcher_task.await;

    let all = queue
        .get_all_jobs(JobFilter::of_type("w").claimable(false))
        .await
        .unwrap();
    assert_eq!(all.len(), 1);
    assert!(!all[0].record().is_claimed());
    assert!(all[0].record().timestamp_after > 0);
    assert!(all[0].record().attempts >= 1);
}

// S7 — race claim: concurrent claim attempts on the same row yield
// exactly one winner.
#[tokio::test]
async fn s7_race_claim_has_one_winner() {
    let store = MemoryJobStore::new();
    let queue = jobkeeper_core::JobQueue::new(store.clone());
    let job = queue
        .add_job("w", serde_json::json!({}), Some("x".into()), 0, 0)
        .await
        .unwrap();

    let id = job.id();
    let (a, b) = tokio::join!(store.claim(id, 1000), store.claim(id, 1000));

    let successes = [a.is_ok(), b.is_ok()].iter().filter(|x| **x).count();
    assert_eq!(successes, 1);
}
