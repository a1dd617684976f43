//! Durable, claim-based job queue and worker dispatcher.
//!
//! A [`store::JobStore`] persists job rows; a [`queue::JobQueue`] is the
//! client-facing enqueue/inspect API over one; a [`dispatcher::Dispatcher`]
//! polls a store for eligible jobs and runs them against a
//! [`registry::WorkerRegistry`] of [`worker::Worker`] implementations.
//! [`scheduler::Scheduler`] ties a store, a registry, and optional default
//! logging together into the thing a binary actually constructs.
//!
//! The `jobs` table this crate assumes:
//!
//! ```sql
//! CREATE TABLE jobs (
//!     id                    UUID PRIMARY KEY,
//!     job_type              TEXT NOT NULL,
//!     remote_id             TEXT NOT NULL,
//!     details               JSONB NOT NULL DEFAULT '{}'::jsonb,
//!     timestamp             BIGINT NOT NULL,
//!     timestamp_after       BIGINT NOT NULL DEFAULT 0,
//!     timestamp_claimed     BIGINT NOT NULL DEFAULT 0,
//!     timestamp_lastclaimed BIGINT NOT NULL DEFAULT 0,
//!     interval              BIGINT NOT NULL DEFAULT 0,
//!     attempts              INT NOT NULL DEFAULT 0,
//!     status                TEXT NOT NULL DEFAULT '',
//!     UNIQUE (job_type, remote_id)
//! );
//! ```
//!
//! `jobkeeper-postgres` provides the production [`store::JobStore`];
//! `jobkeeper-testing` provides an in-memory one for fast tests.

pub mod dispatcher;
pub mod error;
pub mod job;
pub mod logging;
pub mod queue;
pub mod record;
pub mod registry;
pub mod scheduler;
pub mod store;
pub mod worker;

pub use dispatcher::Dispatcher;
pub use error::{ClaimError, SchedulerError, StoreError};
pub use job::Job;
pub use queue::JobQueue;
pub use record::{JobFilter, JobRecord, JobTypeFilter, NewJob};
pub use registry::{WorkerRegistry, WorkerRegistryBuilder};
pub use scheduler::{DbConfig, LogConfig, LogFormat, Scheduler, SchedulerConfig};
pub use store::JobStore;
pub use worker::{InterruptHandle, InterruptLevel, Worker, WorkerContext, WorkSignal};
