//! Activity Log Model
//!
//! Append-only audit record of each HTTP call. Written by the activity
//! worker, never mutated or deleted. The JSON snapshot columns store
//! already-redacted text.

use serde::{Deserialize, Serialize};

/// Activity log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct ActivityLog {
    pub id: i64,
    pub user_id: Option<i64>,
    pub user_email: Option<String>,
    pub method: String,
    pub path: String,
    pub route: Option<String>,
    pub status_code: i64,
    pub duration_ms: i64,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub referer: Option<String>,
    /// Redacted JSON snapshot of the query string
    pub query: Option<String>,
    /// Redacted JSON snapshot of the request body
    pub body: Option<String>,
    pub created_at: i64,
}

/// Payload sent from the activity middleware to the writer task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityLogCreate {
    pub user_id: Option<i64>,
    pub user_email: Option<String>,
    pub method: String,
    pub path: String,
    pub route: Option<String>,
    pub status_code: i64,
    pub duration_ms: i64,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub referer: Option<String>,
    pub query: Option<String>,
    pub body: Option<String>,
}
