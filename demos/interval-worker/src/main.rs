//! Summarizes a piece of text on a fixed interval, demonstrating a
//! recurring (rather than one-shot) job: the job's `interval` is nonzero,
//! so [`Job::finish`] rearms it instead of deleting the row.
//!
//! Calls the Anthropic API directly with `reqwest` + `serde` — no
//! adapter layer.

use anyhow::{bail, Result};
use async_trait::async_trait;
use jobkeeper_core::{Scheduler, SchedulerConfig, WorkSignal, Worker, WorkerContext, WorkerRegistry};
use jobkeeper_postgres::PgJobStore;
use serde::{Deserialize, Serialize};
use std::env;
use std::sync::Arc;

#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<Message>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    text: Option<String>,
}

async fn call_anthropic(client: &reqwest::Client, api_key: &str, text: &str) -> Result<String> {
    let request = AnthropicRequest {
        model: "claude-3-5-sonnet-20241022".to_string(),
        max_tokens: 256,
        messages: vec![Message {
            role: "user".to_string(),
            content: format!("Summarize this text in one sentence:\n\n{text}"),
        }],
    };

    let response = client
        .post("https://api.anthropic.com/v1/messages")
        .header("x-api-key", api_key)
        .header("anthropic-version", "2023-06-01")
        .json(&request)
        .send()
        .await?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await?;
        bail!("API error {status}: {body}");
    }

    let parsed: AnthropicResponse = response.json().await?;
    Ok(parsed
        .content
        .first()
        .and_then(|c| c.text.clone())
        .unwrap_or_default())
}

struct SummarizeWorker {
    client: reqwest::Client,
    api_key: String,
}

#[async_trait]
impl Worker for SummarizeWorker {
    fn job_type(&self) -> &str {
        "summarize_feed"
    }

    async fn work(&self, ctx: &WorkerContext) -> Result<WorkSignal> {
        let text = ctx
            .job
            .details
            .get("text")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow::anyhow!("job details missing 'text'"))?;

        let summary = call_anthropic(&self.client, &self.api_key, text).await?;
        tracing::info!(job_id = %ctx.job.id, summary, "summarized");

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

    let api_key = env::var("ANTHROPIC_API_KEY").expect("ANTHROPIC_API_KEY must be set");

    let store = Arc::new(
        PgJobStore::connect(&config.db.connection_string(), config.db.pool_size).await?,
    );
    store.migrate().await?;

    let registry = WorkerRegistry::builder()
        .register(Arc::new(SummarizeWorker {
            client: reqwest::Client::new(),
            api_key,
        }))
        .build();

    let mut scheduler = Scheduler::new(store, registry);
    scheduler.start();

    // Runs every five minutes until the job is removed from the queue.
    scheduler
        .queue()
        .add_job(
            "summarize_feed",
            serde_json::json!({ "text": "Rust is a multi-paradigm, general-purpose programming language that emphasizes performance, type safety, and concurrency." }),
            Some("daily-digest".to_string()),
            0,
            300,
        )
        .await?;

    tokio::signal::ctrl_c().await?;
    scheduler.end().await;

    Ok(())
}
