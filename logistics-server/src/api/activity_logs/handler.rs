//! Activity Log API Handlers

use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;

use crate::core::ServerState;
use crate::db::repository::activity_log::{self, ActivityLogFilter};
use crate::utils::time::parse_date_bound;
use crate::utils::{ApiResponse, AppResult, paginated};
use shared::models::{ActivityLog, Pagination};

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
    pub user_id: Option<i64>,
    pub method: Option<String>,
    pub status_code: Option<i64>,
    pub path: Option<String>,
    pub ip: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub min_duration_ms: Option<i64>,
    pub max_duration_ms: Option<i64>,
}

fn default_page() -> i64 {
    1
}

fn default_limit() -> i64 {
    50
}

/// GET /api/activity
pub async fn list(
    State(state): State<ServerState>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<ApiResponse<Vec<ActivityLog>>>> {
    let filter = ActivityLogFilter {
        user_id: query.user_id,
        method: query.method,
        status_code: query.status_code,
        path: query.path,
        ip: query.ip,
        date_from: query
            .start_date
            .as_deref()
            .map(|d| parse_date_bound(d, false))
            .transpose()?,
        date_to: query
            .end_date
            .as_deref()
            .map(|d| parse_date_bound(d, true))
            .transpose()?,
        min_duration_ms: query.min_duration_ms,
        max_duration_ms: query.max_duration_ms,
    };
    let (logs, total) =
        activity_log::find_many(&state.pool, &filter, query.page, query.limit).await?;
    Ok(paginated(
        logs,
        Pagination::new(query.page.max(1), query.limit.clamp(1, 100), total),
        "Success",
    ))
}
