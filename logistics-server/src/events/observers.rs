//! Domain Observers
//!
//! Email side effects registered against the event bus at startup. An
//! observer that cannot find a recipient simply skips: only actual
//! delivery failures reach the bus's error boundary, where they are logged
//! and swallowed.

use std::sync::Arc;

use serde_json::Value;

use super::types;
use super::{EmailService, EventBus};

/// Register every observer on the bus. Called once at process start.
pub fn register_observers(bus: &EventBus, email: Arc<EmailService>) {
    {
        let email = email.clone();
        bus.on(
            types::AUTH_REGISTERED,
            "welcome-email",
            Arc::new(move |payload| {
                let email = email.clone();
                Box::pin(async move {
                    let Some(user) = payload_user(&payload) else {
                        return Ok(());
                    };
                    tracing::info!(target: "events", "observer:auth.registered");
                    email.send_welcome_email(&user).await
                })
            }),
        );
    }

    {
        let email = email.clone();
        bus.on(
            types::ORDER_CREATED,
            "order-confirmation-email",
            Arc::new(move |payload| {
                let email = email.clone();
                Box::pin(async move {
                    let Some(user) = payload_user(&payload) else {
                        return Ok(());
                    };
                    let order = payload.get("order").cloned().unwrap_or(Value::Null);
                    tracing::info!(
                        target: "events",
                        order = %order.get("order_number").and_then(|v| v.as_str()).unwrap_or(""),
                        "observer:order.created"
                    );
                    email.send_order_confirmation(&user, &order).await
                })
            }),
        );
    }

    bus.on(
        types::SHIPMENT_UPDATED,
        "shipment-notification-email",
        Arc::new(move |payload| {
            let email = email.clone();
            Box::pin(async move {
                let Some(user) = payload_user(&payload) else {
                    return Ok(());
                };
                let shipment = payload.get("shipment").cloned().unwrap_or(Value::Null);
                tracing::info!(
                    target: "events",
                    tracking = %shipment.get("tracking_number").and_then(|v| v.as_str()).unwrap_or(""),
                    "observer:shipment.updated"
                );
                email.send_shipment_notification(&user, &shipment).await
            })
        }),
    );
}

/// The payload's `user`, when present with a non-empty email
fn payload_user(payload: &Value) -> Option<Value> {
    let user = payload.get("user")?;
    user.get("email")
        .and_then(Value::as_str)
        .filter(|e| !e.is_empty())?;
    Some(user.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::RecordingTransport;
    use serde_json::json;
    use std::time::Duration;

    async fn wait_for_count(transport: &RecordingTransport, expected: usize) {
        for _ in 0..100 {
            if transport.sent_count() == expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("expected {expected} dispatches, got {}", transport.sent_count());
    }

    #[tokio::test]
    async fn order_created_with_user_sends_exactly_one_confirmation() {
        let bus = EventBus::new();
        let transport = Arc::new(RecordingTransport::new());
        register_observers(
            &bus,
            Arc::new(EmailService::with_transport(transport.clone())),
        );

        bus.emit(
            types::ORDER_CREATED,
            json!({
                "order": {"order_number": "ORD-1-XYZ", "total_amount": 100.0},
                "user": {"email": "u@example.com", "name": "U"}
            }),
        );
        wait_for_count(&transport, 1).await;
        assert_eq!(transport.sent()[0].to, "u@example.com");
    }

    #[tokio::test]
    async fn order_created_without_user_sends_nothing() {
        let bus = EventBus::new();
        let transport = Arc::new(RecordingTransport::new());
        register_observers(
            &bus,
            Arc::new(EmailService::with_transport(transport.clone())),
        );

        bus.emit(types::ORDER_CREATED, json!({"order": {"order_number": "ORD-2"}}));
        bus.emit(
            types::ORDER_CREATED,
            json!({"order": {}, "user": {"name": "no email"}}),
        );
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(transport.sent_count(), 0);
    }

    #[tokio::test]
    async fn shipment_updated_notifies_the_linked_user() {
        let bus = EventBus::new();
        let transport = Arc::new(RecordingTransport::new());
        register_observers(
            &bus,
            Arc::new(EmailService::with_transport(transport.clone())),
        );

        bus.emit(
            types::SHIPMENT_UPDATED,
            json!({
                "shipment": {"tracking_number": "TRK-9-AAA", "status": "DELIVERED"},
                "user": {"email": "u@example.com", "name": "U"}
            }),
        );
        wait_for_count(&transport, 1).await;
        assert!(transport.sent()[0].subject.contains("TRK-9-AAA"));
    }

    #[tokio::test]
    async fn delivery_failure_is_contained() {
        let bus = EventBus::new();
        let transport = Arc::new(RecordingTransport::failing());
        register_observers(
            &bus,
            Arc::new(EmailService::with_transport(transport.clone())),
        );

        bus.emit(
            types::AUTH_REGISTERED,
            json!({"user": {"email": "u@example.com", "name": "U"}}),
        );
        // one attempt, no propagation
        wait_for_count(&transport, 1).await;
    }
}
