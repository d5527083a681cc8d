//! Job Queue
//!
//! Registry + dispatch channel. Worker-side transitions live here so the
//! state machine is in one place; the worker only decides *what* to run.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;

use crate::utils::{AppError, AppResult};
use shared::util::now_millis;

/// Job lifecycle state (wire form matches the polling contract)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Waiting,
    Active,
    Completed,
    Failed,
    Delayed,
}

/// Per-enqueue options
#[derive(Debug, Clone, Copy)]
pub struct JobOptions {
    /// Total attempts before a job is terminally failed
    pub attempts: u32,
    /// Base delay for exponential retry backoff
    pub backoff_base_ms: u64,
    /// How many completed jobs to retain for polling
    pub remove_on_complete: usize,
    /// How many failed jobs to retain for polling
    pub remove_on_fail: usize,
}

impl Default for JobOptions {
    fn default() -> Self {
        Self {
            attempts: 2,
            backoff_base_ms: 2000,
            remove_on_complete: 10,
            remove_on_fail: 5,
        }
    }
}

/// A tracked job
#[derive(Debug, Clone)]
pub struct JobRecord {
    pub id: u64,
    pub job_type: String,
    pub payload: Value,
    pub state: JobState,
    pub attempts_made: u32,
    pub max_attempts: u32,
    pub backoff_base_ms: u64,
    pub progress: u8,
    pub result: Option<Value>,
    pub failed_reason: Option<String>,
    pub created_at: i64,
    pub finished_at: Option<i64>,
}

/// Polling view of a job
#[derive(Debug, Clone, Serialize)]
pub struct JobStatus {
    pub state: JobState,
    pub progress: u8,
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_reason: Option<String>,
}

/// Job counts by state (admin queue inspection)
#[derive(Debug, Default, Clone, Serialize)]
pub struct QueueStats {
    pub waiting: usize,
    pub active: usize,
    pub completed: usize,
    pub failed: usize,
    pub delayed: usize,
}

/// In-process job queue
pub struct JobQueue {
    jobs: DashMap<u64, JobRecord>,
    tx: mpsc::Sender<u64>,
    next_id: AtomicU64,
    completed_ring: Mutex<VecDeque<u64>>,
    failed_ring: Mutex<VecDeque<u64>>,
    defaults: JobOptions,
}

impl JobQueue {
    /// Create the queue and the receiver its worker will consume
    pub fn new(buffer: usize, defaults: JobOptions) -> (Arc<Self>, mpsc::Receiver<u64>) {
        let (tx, rx) = mpsc::channel(buffer);
        let queue = Arc::new(Self {
            jobs: DashMap::new(),
            tx,
            next_id: AtomicU64::new(1),
            completed_ring: Mutex::new(VecDeque::new()),
            failed_ring: Mutex::new(VecDeque::new()),
            defaults,
        });
        (queue, rx)
    }

    /// Enqueue a job; returns its id for polling
    pub async fn enqueue(
        &self,
        job_type: impl Into<String>,
        payload: Value,
        opts: Option<JobOptions>,
    ) -> AppResult<u64> {
        let opts = opts.unwrap_or(self.defaults);
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let record = JobRecord {
            id,
            job_type: job_type.into(),
            payload,
            state: JobState::Waiting,
            attempts_made: 0,
            max_attempts: opts.attempts.max(1),
            backoff_base_ms: opts.backoff_base_ms,
            progress: 0,
            result: None,
            failed_reason: None,
            created_at: now_millis(),
            finished_at: None,
        };
        self.jobs.insert(id, record);
        self.tx
            .send(id)
            .await
            .map_err(|_| AppError::internal("Job queue is shut down"))?;
        Ok(id)
    }

    /// Polling view; None for unknown (or already evicted) jobs
    pub fn status(&self, id: u64) -> Option<JobStatus> {
        self.jobs.get(&id).map(|job| JobStatus {
            state: job.state,
            progress: job.progress,
            result: job.result.clone(),
            failed_reason: job.failed_reason.clone(),
        })
    }

    /// Completed-job result, if any
    pub fn result(&self, id: u64) -> Option<Value> {
        self.jobs.get(&id).and_then(|job| job.result.clone())
    }

    /// Worker: claim a job, marking it active and counting the attempt
    pub fn begin(&self, id: u64) -> Option<JobRecord> {
        let mut job = self.jobs.get_mut(&id)?;
        if !matches!(job.state, JobState::Waiting) {
            return None;
        }
        job.state = JobState::Active;
        job.attempts_made += 1;
        Some(job.clone())
    }

    /// Worker: report progress (0–100)
    pub fn set_progress(&self, id: u64, progress: u8) {
        if let Some(mut job) = self.jobs.get_mut(&id) {
            job.progress = progress.min(100);
        }
    }

    /// Worker: mark completion, storing the result and applying retention
    pub fn complete(&self, id: u64, result: Value) {
        let retain = {
            let Some(mut job) = self.jobs.get_mut(&id) else {
                return;
            };
            job.state = JobState::Completed;
            job.progress = 100;
            job.result = Some(result);
            job.finished_at = Some(now_millis());
            self.defaults.remove_on_complete
        };
        Self::push_ring(&self.completed_ring, &self.jobs, id, retain);
    }

    /// Worker: retry with backoff if attempts remain, else terminally fail.
    /// Retries transit `delayed` and re-enter the channel after the delay.
    pub fn retry_or_fail(self: &Arc<Self>, id: u64, reason: String) {
        let (attempts_made, max_attempts, backoff_base_ms) = {
            let Some(job) = self.jobs.get(&id) else { return };
            (job.attempts_made, job.max_attempts, job.backoff_base_ms)
        };

        if attempts_made < max_attempts {
            let delay =
                Duration::from_millis(backoff_base_ms * 2u64.pow(attempts_made.saturating_sub(1)));
            tracing::warn!(
                job_id = id,
                attempt = attempts_made,
                delay_ms = delay.as_millis() as u64,
                error = %reason,
                "Job failed, retrying with backoff"
            );
            if let Some(mut job) = self.jobs.get_mut(&id) {
                job.state = JobState::Delayed;
                job.failed_reason = Some(reason);
            }
            let queue = Arc::clone(self);
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                if let Some(mut job) = queue.jobs.get_mut(&id) {
                    job.state = JobState::Waiting;
                }
                if queue.tx.send(id).await.is_err() {
                    tracing::error!(job_id = id, "Job queue closed, retry dropped");
                }
            });
            return;
        }

        tracing::error!(job_id = id, error = %reason, "Job terminally failed");
        let retain = {
            let Some(mut job) = self.jobs.get_mut(&id) else {
                return;
            };
            job.state = JobState::Failed;
            job.failed_reason = Some(reason);
            job.finished_at = Some(now_millis());
            self.defaults.remove_on_fail
        };
        Self::push_ring(&self.failed_ring, &self.jobs, id, retain);
    }

    /// Counts of tracked jobs by state
    pub fn stats(&self) -> QueueStats {
        let mut stats = QueueStats::default();
        for job in self.jobs.iter() {
            match job.state {
                JobState::Waiting => stats.waiting += 1,
                JobState::Active => stats.active += 1,
                JobState::Completed => stats.completed += 1,
                JobState::Failed => stats.failed += 1,
                JobState::Delayed => stats.delayed += 1,
            }
        }
        stats
    }

    /// Retention: keep at most `retain` finished jobs of this kind
    fn push_ring(
        ring: &Mutex<VecDeque<u64>>,
        jobs: &DashMap<u64, JobRecord>,
        id: u64,
        retain: usize,
    ) {
        let mut ring = ring.lock().expect("retention ring mutex poisoned");
        ring.push_back(id);
        while ring.len() > retain {
            if let Some(evicted) = ring.pop_front() {
                jobs.remove(&evicted);
            }
        }
    }
}

impl std::fmt::Debug for JobQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobQueue")
            .field("jobs", &self.jobs.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn enqueue_then_poll_waiting() {
        let (queue, mut rx) = JobQueue::new(8, JobOptions::default());
        let id = queue.enqueue("report-export", json!({}), None).await.unwrap();
        assert_eq!(rx.recv().await, Some(id));
        let status = queue.status(id).unwrap();
        assert_eq!(status.state, JobState::Waiting);
        assert_eq!(status.progress, 0);
        assert!(status.result.is_none());
        assert!(queue.status(id + 100).is_none());
    }

    #[tokio::test]
    async fn begin_complete_lifecycle() {
        let (queue, mut rx) = JobQueue::new(8, JobOptions::default());
        let id = queue.enqueue("report-export", json!({}), None).await.unwrap();
        rx.recv().await.unwrap();

        let job = queue.begin(id).unwrap();
        assert_eq!(job.attempts_made, 1);
        assert_eq!(queue.status(id).unwrap().state, JobState::Active);
        // double-begin is rejected
        assert!(queue.begin(id).is_none());

        queue.set_progress(id, 40);
        assert_eq!(queue.status(id).unwrap().progress, 40);

        queue.complete(id, json!({"rows": 3}));
        let status = queue.status(id).unwrap();
        assert_eq!(status.state, JobState::Completed);
        assert_eq!(status.progress, 100);
        assert_eq!(status.result, Some(json!({"rows": 3})));
    }

    #[tokio::test]
    async fn failed_jobs_retry_then_terminally_fail() {
        let opts = JobOptions {
            attempts: 2,
            backoff_base_ms: 1,
            ..Default::default()
        };
        let (queue, mut rx) = JobQueue::new(8, opts);
        let id = queue.enqueue("report-export", json!({}), None).await.unwrap();
        rx.recv().await.unwrap();

        queue.begin(id).unwrap();
        queue.retry_or_fail(id, "first failure".into());
        // retry lands back on the channel after the backoff
        assert_eq!(rx.recv().await, Some(id));
        assert_eq!(queue.status(id).unwrap().state, JobState::Waiting);

        queue.begin(id).unwrap();
        queue.retry_or_fail(id, "second failure".into());
        let status = queue.status(id).unwrap();
        assert_eq!(status.state, JobState::Failed);
        assert_eq!(status.failed_reason.as_deref(), Some("second failure"));
    }

    #[tokio::test]
    async fn completed_retention_evicts_oldest() {
        let opts = JobOptions {
            remove_on_complete: 2,
            ..Default::default()
        };
        let (queue, mut rx) = JobQueue::new(16, opts);
        let mut ids = Vec::new();
        for _ in 0..3 {
            let id = queue.enqueue("report-export", json!({}), None).await.unwrap();
            rx.recv().await.unwrap();
            queue.begin(id).unwrap();
            queue.complete(id, json!({}));
            ids.push(id);
        }
        assert!(queue.status(ids[0]).is_none(), "oldest should be evicted");
        assert!(queue.status(ids[1]).is_some());
        assert!(queue.status(ids[2]).is_some());
    }
}
