//! Report API 模块

mod handler;

use axum::{Router, middleware, routing::{get, post}};

use crate::auth::require_role;
use crate::core::ServerState;
use shared::models::Role;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/reports", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/export", post(handler::export))
        .route("/{job_id}/status", get(handler::status))
        .route("/{job_id}/download", get(handler::download))
        .layer(middleware::from_fn(require_role(&[Role::Manager])))
}
