//! Activity Writer
//!
//! Receives entries from the middleware over an mpsc channel and inserts
//! them into `activity_log`. Best-effort by contract: a full channel drops
//! the entry with a warning rather than applying backpressure to requests,
//! and insert failures are logged, never propagated.

use std::sync::Mutex;

use sqlx::SqlitePool;
use tokio::sync::mpsc;

use crate::db::repository::activity_log;
use shared::models::ActivityLogCreate;

/// Handle used by the middleware to record entries
pub struct ActivityLogService {
    tx: mpsc::Sender<ActivityLogCreate>,
    rx: Mutex<Option<mpsc::Receiver<ActivityLogCreate>>>,
}

impl ActivityLogService {
    pub fn new(buffer_size: usize) -> Self {
        let (tx, rx) = mpsc::channel(buffer_size);
        Self {
            tx,
            rx: Mutex::new(Some(rx)),
        }
    }

    /// Queue an entry for persistence (non-blocking)
    pub fn record(&self, entry: ActivityLogCreate) {
        if let Err(e) = self.tx.try_send(entry) {
            tracing::warn!(error = %e, "Activity log channel full, entry dropped");
        }
    }

    /// Spawn the writer task. Call once at startup.
    pub fn start_worker(&self, pool: SqlitePool) {
        let rx = self
            .rx
            .lock()
            .expect("activity receiver mutex poisoned")
            .take();
        let Some(mut rx) = rx else {
            tracing::warn!("Activity writer already started");
            return;
        };

        tokio::spawn(async move {
            tracing::info!("Activity writer started");
            while let Some(entry) = rx.recv().await {
                if let Err(e) = activity_log::insert(&pool, &entry).await {
                    tracing::error!(error = %e, "Failed to write activity log entry");
                }
            }
            tracing::info!("Activity channel closed, writer stopping");
        });
    }
}

impl std::fmt::Debug for ActivityLogService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActivityLogService").finish_non_exhaustive()
    }
}
