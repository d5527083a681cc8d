//! Report Worker
//!
//! Consumes report-export jobs from the queue channel. One job runs at a
//! time: CSV generation is I/O-bound and the queue decouples it from
//! request latency, so there is no need for intra-worker concurrency.
//! There is no cooperative cancellation: a started job runs to completion
//! or failure.

use std::sync::Arc;

use sqlx::SqlitePool;
use tokio::sync::mpsc;

use super::JobQueue;
use crate::reports::{self, ReportConfig, ReportJobPayload};

/// Job type handled by this worker
pub const JOB_REPORT_EXPORT: &str = "report-export";

/// Worker consuming the report queue
pub struct ReportWorker {
    queue: Arc<JobQueue>,
    pool: SqlitePool,
    config: ReportConfig,
}

impl ReportWorker {
    pub fn new(queue: Arc<JobQueue>, pool: SqlitePool, config: ReportConfig) -> Self {
        Self {
            queue,
            pool,
            config,
        }
    }

    /// Run the worker (blocks until the queue channel closes)
    pub async fn run(self, mut rx: mpsc::Receiver<u64>) {
        tracing::info!("Report worker started");

        while let Some(id) = rx.recv().await {
            self.process(id).await;
        }

        tracing::info!("Report queue closed, worker stopping");
    }

    async fn process(&self, id: u64) {
        let Some(job) = self.queue.begin(id) else {
            tracing::warn!(job_id = id, "Job not claimable (evicted or not waiting)");
            return;
        };

        if job.job_type != JOB_REPORT_EXPORT {
            self.queue
                .retry_or_fail(id, format!("Unknown job type: {}", job.job_type));
            return;
        }

        let payload: ReportJobPayload = match serde_json::from_value(job.payload.clone()) {
            Ok(payload) => payload,
            Err(e) => {
                self.queue
                    .retry_or_fail(id, format!("Invalid report payload: {e}"));
                return;
            }
        };

        tracing::info!(
            job_id = id,
            report_type = ?payload.report_type,
            attempt = job.attempts_made,
            "Generating report"
        );

        let queue = Arc::clone(&self.queue);
        let progress = move |pct: u8| queue.set_progress(id, pct);
        match reports::generate(&self.pool, &self.config, &payload, &progress).await {
            Ok(result) => {
                tracing::info!(
                    job_id = id,
                    rows = result.rows,
                    file = %result.file_name,
                    "Report generated"
                );
                match serde_json::to_value(&result) {
                    Ok(value) => self.queue.complete(id, value),
                    Err(e) => self
                        .queue
                        .retry_or_fail(id, format!("Failed to serialize result: {e}")),
                }
            }
            Err(e) => {
                self.queue.retry_or_fail(id, e.to_string());
            }
        }
    }
}
