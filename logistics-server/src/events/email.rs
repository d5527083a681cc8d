//! Email Service
//!
//! Notification dispatch behind a transport trait. With `MAIL_RELAY_URL`
//! configured the relay transport POSTs the message to the HTTP mail relay;
//! without it the log transport records the dispatch, which is what dev and
//! test environments want. Delivery is best-effort end to end: callers sit
//! behind the event bus's error boundary.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::utils::{AppError, AppResult};

/// A rendered outgoing message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn deliver(&self, mail: &OutgoingEmail) -> AppResult<()>;
}

/// Dev transport: logs the dispatch instead of sending
struct LogTransport;

#[async_trait]
impl MailTransport for LogTransport {
    async fn deliver(&self, mail: &OutgoingEmail) -> AppResult<()> {
        tracing::info!(
            target: "email",
            to = %mail.to,
            subject = %mail.subject,
            "email dispatch (log transport)"
        );
        Ok(())
    }
}

/// Production transport: POSTs the message to an HTTP mail relay
struct HttpRelayTransport {
    client: reqwest::Client,
    relay_url: String,
}

#[async_trait]
impl MailTransport for HttpRelayTransport {
    async fn deliver(&self, mail: &OutgoingEmail) -> AppResult<()> {
        let resp = self
            .client
            .post(&self.relay_url)
            .json(mail)
            .send()
            .await
            .map_err(|e| AppError::internal(format!("Mail relay request failed: {e}")))?;
        if !resp.status().is_success() {
            return Err(AppError::internal(format!(
                "Mail relay rejected message: {}",
                resp.status()
            )));
        }
        Ok(())
    }
}

/// Test transport: records every dispatch attempt, optionally failing each
/// one. Lives here (not behind `cfg(test)`) so integration suites can
/// inject it.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    sent: std::sync::Mutex<Vec<OutgoingEmail>>,
    pub fail_delivery: bool,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            sent: std::sync::Mutex::new(Vec::new()),
            fail_delivery: true,
        }
    }

    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().expect("transport mutex poisoned").clone()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().expect("transport mutex poisoned").len()
    }
}

#[async_trait]
impl MailTransport for RecordingTransport {
    async fn deliver(&self, mail: &OutgoingEmail) -> AppResult<()> {
        self.sent
            .lock()
            .expect("transport mutex poisoned")
            .push(mail.clone());
        if self.fail_delivery {
            return Err(AppError::internal("simulated delivery failure"));
        }
        Ok(())
    }
}

/// Notification email dispatcher
#[derive(Clone)]
pub struct EmailService {
    transport: Arc<dyn MailTransport>,
}

impl EmailService {
    /// Relay transport when a relay URL is configured, log transport
    /// otherwise
    pub fn from_relay_url(relay_url: Option<&str>) -> Self {
        match relay_url {
            Some(url) if !url.is_empty() => Self {
                transport: Arc::new(HttpRelayTransport {
                    client: reqwest::Client::new(),
                    relay_url: url.to_string(),
                }),
            },
            _ => Self {
                transport: Arc::new(LogTransport),
            },
        }
    }

    pub fn with_transport(transport: Arc<dyn MailTransport>) -> Self {
        Self { transport }
    }

    pub async fn send_welcome_email(&self, user: &Value) -> AppResult<()> {
        let (to, name) = recipient(user)?;
        self.transport
            .deliver(&OutgoingEmail {
                to,
                subject: "Welcome aboard".to_string(),
                body: format!("Hi {name}, your account has been created."),
            })
            .await
    }

    pub async fn send_order_confirmation(&self, user: &Value, order: &Value) -> AppResult<()> {
        let (to, name) = recipient(user)?;
        let order_number = order
            .get("order_number")
            .and_then(Value::as_str)
            .unwrap_or("(unknown)");
        let total = order
            .get("total_amount")
            .and_then(Value::as_f64)
            .unwrap_or(0.0);
        self.transport
            .deliver(&OutgoingEmail {
                to,
                subject: format!("Order confirmation {order_number}"),
                body: format!("Hi {name}, your order {order_number} totalling {total} was received."),
            })
            .await
    }

    pub async fn send_shipment_notification(&self, user: &Value, shipment: &Value) -> AppResult<()> {
        let (to, name) = recipient(user)?;
        let tracking = shipment
            .get("tracking_number")
            .and_then(Value::as_str)
            .unwrap_or("(unknown)");
        let status = shipment
            .get("status")
            .and_then(Value::as_str)
            .unwrap_or("(unknown)");
        self.transport
            .deliver(&OutgoingEmail {
                to,
                subject: format!("Shipment {tracking} update"),
                body: format!("Hi {name}, shipment {tracking} is now {status}."),
            })
            .await
    }
}

impl std::fmt::Debug for EmailService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailService").finish_non_exhaustive()
    }
}

fn recipient(user: &Value) -> AppResult<(String, String)> {
    let email = user
        .get("email")
        .and_then(Value::as_str)
        .filter(|e| !e.is_empty())
        .ok_or_else(|| AppError::internal("recipient has no email address"))?;
    let name = user.get("name").and_then(Value::as_str).unwrap_or("there");
    Ok((email.to_string(), name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn order_confirmation_goes_to_the_user() {
        let transport = Arc::new(RecordingTransport::new());
        let service = EmailService::with_transport(transport.clone());
        service
            .send_order_confirmation(
                &json!({"email": "v@example.com", "name": "Vendor"}),
                &json!({"order_number": "ORD-1-ABC", "total_amount": 5300.0}),
            )
            .await
            .unwrap();

        let sent = transport.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "v@example.com");
        assert!(sent[0].subject.contains("ORD-1-ABC"));
    }

    #[tokio::test]
    async fn missing_email_is_an_error() {
        let service = EmailService::with_transport(Arc::new(RecordingTransport::new()));
        let err = service
            .send_welcome_email(&json!({"name": "No Email"}))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Internal(_)));
    }

    #[tokio::test]
    async fn failing_transport_still_records_the_attempt() {
        let transport = Arc::new(RecordingTransport::failing());
        let service = EmailService::with_transport(transport.clone());
        let result = service
            .send_welcome_email(&json!({"email": "x@example.com", "name": "X"}))
            .await;
        assert!(result.is_err());
        assert_eq!(transport.sent_count(), 1);
    }
}
