//! Background Job Queue
//!
//! In-process queue with bull-style observable state: jobs move through
//! waiting → active → completed/failed (with delayed between retry
//! attempts), expose progress, and are polled by id. A bounded number of
//! finished jobs is retained, oldest evicted first.
//!
//! The report worker is the only consumer; it runs as a dedicated tokio
//! task decoupling CSV generation from request latency.

mod queue;
mod worker;

pub use queue::{JobOptions, JobQueue, JobRecord, JobState, JobStatus, QueueStats};
pub use worker::{JOB_REPORT_EXPORT, ReportWorker};
