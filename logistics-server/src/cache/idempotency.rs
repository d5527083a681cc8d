//! Idempotency Middleware
//!
//! Deduplicates retried mutating requests keyed by the client-supplied
//! `Idempotency-Key` header. The first completion stores the `(status, body)`
//! pair; a repeat within the TTL replays it verbatim with an
//! `Idempotent-Replay: true` marker and never re-executes the handler.
//!
//! The key is claimed atomically before the handler runs (`set_if_absent`),
//! so two racing requests with the same key cannot both execute: the loser
//! gets a 409 while the winner is still in flight. No header → no-op.

use axum::{
    body::{Body, to_bytes},
    extract::{Request, State},
    http::{HeaderValue, StatusCode, header},
    middleware::Next,
    response::Response,
};
use serde_json::{Value, json};

use crate::core::ServerState;
use crate::utils::{AppError, AppResult};

/// Replay marker header
pub const REPLAY_HEADER: &str = "Idempotent-Replay";

/// Upper bound on a buffered response body (matches the server body limit)
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

pub async fn idempotency(
    State(state): State<ServerState>,
    req: Request,
    next: Next,
) -> AppResult<Response> {
    let method = req.method().clone();
    if !matches!(
        method.as_str(),
        "POST" | "PUT" | "PATCH" | "DELETE"
    ) {
        return Ok(next.run(req).await);
    }

    let Some(key) = idempotency_key(&req) else {
        return Ok(next.run(req).await);
    };

    let path = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());
    let cache_key = format!("idemp:{method}:{path}:{key}");

    if let Some(stored) = state.cache.get(&cache_key)
        && stored.get("statusCode").is_some()
    {
        return Ok(replay_response(&stored));
    }

    // Claim the key before executing; the claim TTL only needs to outlive
    // the request timeout
    let claim_ttl = (state.config.request_timeout_ms / 1000).max(1) * 2;
    if !state
        .cache
        .set_if_absent(cache_key.clone(), json!({ "pending": true }), claim_ttl)
    {
        // Lost the race: either a response landed in the meantime, or the
        // winner is still executing
        if let Some(stored) = state.cache.get(&cache_key)
            && stored.get("statusCode").is_some()
        {
            return Ok(replay_response(&stored));
        }
        return Err(AppError::conflict(
            "A request with this idempotency key is already in flight",
        ));
    }

    let response = next.run(req).await;

    // Buffer the response so the byte-identical body can be stored and
    // forwarded unchanged
    let (parts, body) = response.into_parts();
    let bytes = match to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            state.cache.delete(&cache_key);
            return Err(AppError::internal(format!(
                "Failed to buffer response for idempotency store: {e}"
            )));
        }
    };

    match std::str::from_utf8(&bytes) {
        Ok(text) => {
            state.cache.set(
                cache_key,
                json!({ "statusCode": parts.status.as_u16(), "body": text }),
                state.config.idempotency_ttl_secs,
            );
        }
        Err(_) => {
            // Non-text bodies are not replayable; release the claim
            state.cache.delete(&cache_key);
        }
    }

    Ok(Response::from_parts(parts, Body::from(bytes)))
}

fn idempotency_key(req: &Request) -> Option<String> {
    let headers = req.headers();
    headers
        .get("Idempotency-Key")
        .or_else(|| headers.get("X-Idempotency-Key"))
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(|v| v.to_string())
}

fn replay_response(stored: &Value) -> Response {
    let status = stored
        .get("statusCode")
        .and_then(Value::as_u64)
        .and_then(|code| StatusCode::from_u16(code as u16).ok())
        .unwrap_or(StatusCode::OK);
    let body = stored
        .get("body")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let mut resp = Response::new(Body::from(body));
    *resp.status_mut() = status;
    resp.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    resp.headers_mut()
        .insert(REPLAY_HEADER, HeaderValue::from_static("true"));
    resp
}
