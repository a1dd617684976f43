//! Fetches a URL as a one-shot job.
//!
//! Shows using `reqwest` directly inside a [`Worker`] — no adapter, just
//! standard library usage plus the HTTP client.

use anyhow::Result;
use async_trait::async_trait;
use jobkeeper_core::{
    Scheduler, SchedulerConfig, WorkSignal, Worker, WorkerContext, WorkerRegistry,
};
use jobkeeper_postgres::PgJobStore;
use std::sync::Arc;

struct FetchWorker {
    client: reqwest::Client,
}

#[async_trait]
impl Worker for FetchWorker {
    fn job_type(&self) -> &str {
        "fetch_url"
    }

    fn max_workers(&self) -> usize {
        4
    }

    async fn work(&self, ctx: &WorkerContext) -> Result<WorkSignal> {
        let url = ctx
            .job
            .details
            .get("url")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow::anyhow!("job details missing 'url'"))?;

        tracing::info!(url, "fetching");
        let response = self.client.get(url).send().await?;
        tracing::info!(url, status = %response.status(), "fetched");

        Ok(WorkSignal::Done)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = match std::env::var("JOBKEEPER_CONFIG") {
        Ok(path) => SchedulerConfig::from_file(path)?,
        Err(_) => SchedulerConfig::default(),
    };
    let _guard = jobkeeper_core::logging::init(&config.log)?;

    let store = Arc::new(
        PgJobStore::connect(&config.db.connection_string(), config.db.pool_size).await?,
    );
    store.migrate().await?;

    let registry = WorkerRegistry::builder()
        .register(Arc::new(FetchWorker {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(10))
                .build()?,
        }))
        .build();

    let mut scheduler = Scheduler::new(store, registry);
    scheduler.start();

    let queue = scheduler.queue();
    for url in ["https://example.com", "https://httpbin.org/status/200"] {
        queue
            .add_job("fetch_url", serde_json::json!({ "url": url }), None, 0, 0)
            .await?;
    }

    tokio::time::sleep(std::time::Duration::from_secs(5)).await;
    scheduler.end().await;

    Ok(())
}
