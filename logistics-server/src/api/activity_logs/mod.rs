//! Activity Log API 模块

mod handler;

use axum::{Router, middleware, routing::get};

use crate::auth::require_role;
use crate::core::ServerState;
use shared::models::Role;

pub fn router() -> Router<ServerState> {
    Router::new().nest(
        "/api/activity",
        Router::new()
            .route("/", get(handler::list))
            .layer(middleware::from_fn(require_role(&[Role::Admin]))),
    )
}
