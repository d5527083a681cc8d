//! Dashboard API Handlers

use axum::{
    Json,
    extract::{Extension, Query, State},
};
use serde::Deserialize;

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::dashboard::{self, DashboardSummary, TrendSeries};
use crate::utils::{ApiResponse, AppResult, ok};

#[derive(Debug, Deserialize)]
pub struct SummaryQuery {
    #[serde(default = "default_range")]
    pub range: String,
}

#[derive(Debug, Deserialize)]
pub struct TrendsQuery {
    #[serde(default = "default_metric")]
    pub metric: String,
    #[serde(default = "default_range")]
    pub range: String,
}

fn default_range() -> String {
    "30d".to_string()
}

fn default_metric() -> String {
    "orders".to_string()
}

/// GET /api/dashboard/summary
pub async fn summary(
    State(state): State<ServerState>,
    Extension(current_user): Extension<CurrentUser>,
    Query(query): Query<SummaryQuery>,
) -> AppResult<Json<ApiResponse<DashboardSummary>>> {
    let summary = dashboard::summary(&state.pool, &current_user, &query.range).await?;
    Ok(ok(summary))
}

/// GET /api/dashboard/trends
pub async fn trends(
    State(state): State<ServerState>,
    Extension(current_user): Extension<CurrentUser>,
    Query(query): Query<TrendsQuery>,
) -> AppResult<Json<ApiResponse<TrendSeries>>> {
    let series =
        dashboard::trends(&state.pool, &current_user, &query.metric, &query.range).await?;
    Ok(ok(series))
}
