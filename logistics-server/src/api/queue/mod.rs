//! Queue API 模块
//!
//! Admin-only inspection of the in-process job queue.

use axum::{
    Json, Router,
    extract::State,
    middleware,
    routing::get,
};

use crate::auth::require_role;
use crate::core::ServerState;
use crate::jobs::QueueStats;
use crate::utils::{ApiResponse, AppResult, ok};
use shared::models::Role;

pub fn router() -> Router<ServerState> {
    Router::new().nest(
        "/api/queue",
        Router::new()
            .route("/stats", get(stats))
            .layer(middleware::from_fn(require_role(&[Role::Admin]))),
    )
}

/// GET /api/queue/stats
async fn stats(State(state): State<ServerState>) -> AppResult<Json<ApiResponse<QueueStats>>> {
    Ok(ok(state.queue.stats()))
}
