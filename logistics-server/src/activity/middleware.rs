//! Activity Middleware
//!
//! Outermost API layer: times the request, buffers a redacted body
//! snapshot for mutating JSON requests, and records the entry once the
//! response exists. The authenticated user arrives via response extensions
//! (placed there by `require_auth`, which runs inside this layer).

use axum::{
    body::{Body, to_bytes},
    extract::{MatchedPath, Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use serde_json::{Map, Value};
use std::time::Instant;

use super::snapshot;
use crate::auth::CurrentUser;
use crate::core::ServerState;
use shared::models::ActivityLogCreate;

/// Largest request body the snapshot path will buffer
const MAX_BUFFERED_BODY: usize = 10 * 1024 * 1024;

pub async fn activity_logger(State(state): State<ServerState>, req: Request, next: Next) -> Response {
    let path = req.uri().path().to_string();
    if !path.starts_with("/api") {
        return next.run(req).await;
    }

    let started = Instant::now();
    let method = req.method().as_str().to_string();
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|m| m.as_str().to_string());
    let query = req.uri().query().map(parse_query).unwrap_or(Value::Null);
    let headers = req.headers();
    let ip = headers
        .get("x-forwarded-for")
        .or_else(|| headers.get("x-real-ip"))
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string());
    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string());
    let referer = headers
        .get(header::REFERER)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string());

    // Body snapshot only for mutating JSON requests; the body is buffered
    // and handed back to the handler unchanged
    let (req, body_value) = capture_body(req).await;

    let response = next.run(req).await;

    let duration_ms = started.elapsed().as_millis() as i64;
    let user = response.extensions().get::<CurrentUser>();
    let entry = ActivityLogCreate {
        user_id: user.map(|u| u.id),
        user_email: user.map(|u| u.email.clone()),
        method,
        path,
        route,
        status_code: response.status().as_u16() as i64,
        duration_ms,
        ip,
        user_agent,
        referer,
        query: snapshot(&query),
        body: snapshot(&body_value),
    };
    state.activity.record(entry);

    response
}

async fn capture_body(req: Request) -> (Request, Value) {
    let is_mutating = matches!(req.method().as_str(), "POST" | "PUT" | "PATCH" | "DELETE");
    let is_json = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("application/json"))
        .unwrap_or(false);
    if !is_mutating || !is_json {
        return (req, Value::Null);
    }

    let (parts, body) = req.into_parts();
    match to_bytes(body, MAX_BUFFERED_BODY).await {
        Ok(bytes) => {
            let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
            (
                Request::from_parts(parts, Body::from(bytes)),
                value,
            )
        }
        Err(e) => {
            // Oversized or broken body: the handler sees an empty body and
            // rejects it with its own error
            tracing::warn!(error = %e, "Failed to buffer request body for activity log");
            (Request::from_parts(parts, Body::empty()), Value::Null)
        }
    }
}

/// Parse a raw query string into a JSON object (values kept as strings)
fn parse_query(query: &str) -> Value {
    let mut map = Map::new();
    for pair in query.split('&').filter(|p| !p.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        map.insert(key.to_string(), Value::String(value.to_string()));
    }
    Value::Object(map)
}
