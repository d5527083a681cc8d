//! Event Bus
//!
//! Register-and-fire fan-out. `emit` returns as soon as every handler has
//! been dispatched onto the runtime: the HTTP response never waits on
//! observer completion. Each handler runs inside its own error boundary: a
//! failing observer is logged and swallowed, it cannot affect the emitter or
//! sibling observers.
//!
//! The listener registry is populated once at startup and read-mostly after
//! that.

use std::sync::Arc;

use dashmap::DashMap;
use futures::future::BoxFuture;
use serde_json::Value;

use crate::utils::AppResult;

/// Async event handler; the payload is a JSON object
pub type EventHandler = Arc<dyn Fn(Value) -> BoxFuture<'static, AppResult<()>> + Send + Sync>;

struct Listener {
    name: &'static str,
    handler: EventHandler,
}

/// In-process publish/subscribe bus
#[derive(Default)]
pub struct EventBus {
    listeners: DashMap<&'static str, Vec<Listener>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            listeners: DashMap::new(),
        }
    }

    /// Register a named handler for an event. Multiple handlers per event
    /// are supported and all are invoked on emit.
    pub fn on(&self, event: &'static str, name: &'static str, handler: EventHandler) {
        self.listeners
            .entry(event)
            .or_default()
            .push(Listener { name, handler });
    }

    /// Emit an event: log it (secrets redacted) and dispatch every handler
    /// fire-and-forget.
    pub fn emit(&self, event: &'static str, payload: Value) {
        tracing::info!(
            target: "events",
            event,
            payload = %redact(&payload),
            "event emitted"
        );

        let Some(listeners) = self.listeners.get(event) else {
            return;
        };

        for listener in listeners.iter() {
            let name = listener.name;
            let fut = (listener.handler)(payload.clone());
            tokio::spawn(async move {
                if let Err(e) = fut.await {
                    tracing::error!(target: "events", event, observer = name, error = %e, "observer failed");
                }
            });
        }
    }

    /// Number of handlers registered for an event
    pub fn listener_count(&self, event: &str) -> usize {
        self.listeners.get(event).map(|l| l.len()).unwrap_or(0)
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("events", &self.listeners.len())
            .finish_non_exhaustive()
    }
}

/// Shallow-redact the secret-bearing fields before logging
fn redact(payload: &Value) -> Value {
    const REDACTED_KEYS: &[&str] = &["password", "token", "refreshToken"];
    let mut cloned = payload.clone();
    if let Value::Object(map) = &mut cloned {
        for key in REDACTED_KEYS {
            if map.contains_key(*key) {
                map.insert((*key).to_string(), Value::String("[REDACTED]".into()));
            }
        }
    }
    cloned
}
