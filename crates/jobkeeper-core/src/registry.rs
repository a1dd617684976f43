//! [`WorkerRegistry`] — the explicit, startup-populated map from
//! `job_type` to handler.
//!
//! Replaces the original scheduler's dynamic source-file loading (a
//! `pythonfile` column scanned off disk at runtime via `SourceFileLoader`).
//! Here, every `job_type` a deployment cares about is registered once at
//! startup, so an unrecognized `job_type` in storage is a configuration
//! error the dispatcher can log and skip rather than a file it tries to
//! import.

use std::collections::HashMap;
use std::sync::Arc;

use crate::worker::Worker;

#[derive(Default, Clone)]
pub struct WorkerRegistry {
    workers: HashMap<String, Arc<dyn Worker>>,
}

impl WorkerRegistry {
    pub fn builder() -> WorkerRegistryBuilder {
        WorkerRegistryBuilder::default()
    }

    pub fn get(&self, job_type: &str) -> Option<Arc<dyn Worker>> {
        self.workers.get(job_type).cloned()
    }

    pub fn job_types(&self) -> impl Iterator<Item = &str> {
        self.workers.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }
}

#[derive(Default)]
pub struct WorkerRegistryBuilder {
    workers: HashMap<String, Arc<dyn Worker>>,
}

impl WorkerRegistryBuilder {
    /// Registers `worker` under its own [`Worker::job_type`]. Panics if a
    /// worker is already registered under that type — two workers
    /// claiming the same job type is a startup-time configuration bug,
    /// not a runtime condition to handle gracefully.
    pub fn register(mut self, worker: Arc<dyn Worker>) -> Self {
        let job_type = worker.job_type().to_string();
        if self.workers.insert(job_type.clone(), worker).is_some() {
            panic!("duplicate worker registered for job type {job_type:?}");
        }
        self
    }

    pub fn build(self) -> WorkerRegistry {
        WorkerRegistry {
            workers: self.workers,
        }
    }
}
