//! Activity Logging
//!
//! Append-only audit trail of every API call. The middleware captures the
//! request/response facts after the response is produced and hands them to
//! a background writer over an mpsc channel: the request path never blocks
//! on the database and never fails because of logging.

mod middleware;
mod worker;

pub use middleware::activity_logger;
pub use worker::ActivityLogService;

use serde_json::Value;

/// Fields masked in query/body snapshots
const REDACT_FIELDS: &[&str] = &[
    "password",
    "token",
    "accessToken",
    "refreshToken",
    "authorization",
    "secret",
    "apiKey",
    "refresh_token",
    "access_token",
    "api_key",
];

/// Longest string kept per field in a snapshot
const MAX_FIELD_LENGTH: usize = 500;

/// Upper bound on a serialized snapshot
const MAX_SNAPSHOT_BYTES: usize = 2048;

/// Deep-redact a JSON value: secret-bearing keys are masked, strings
/// truncated.
fn redact_value(value: &Value) -> Value {
    match value {
        Value::Array(items) => Value::Array(items.iter().map(redact_value).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, val)| {
                    if REDACT_FIELDS.contains(&key.as_str()) {
                        (key.clone(), Value::String("***REDACTED***".to_string()))
                    } else {
                        (key.clone(), redact_value(val))
                    }
                })
                .collect(),
        ),
        Value::String(s) if s.len() > MAX_FIELD_LENGTH => {
            let cut = s
                .char_indices()
                .take_while(|(i, _)| *i < MAX_FIELD_LENGTH)
                .last()
                .map(|(i, c)| i + c.len_utf8())
                .unwrap_or(0);
            Value::String(s[..cut].to_string())
        }
        other => other.clone(),
    }
}

/// Redact and serialize a snapshot, bounding its total size
fn snapshot(value: &Value) -> Option<String> {
    if value.is_null() {
        return None;
    }
    let mut serialized = serde_json::to_string(&redact_value(value)).ok()?;
    if serialized.len() > MAX_SNAPSHOT_BYTES {
        let cut = serialized
            .char_indices()
            .take_while(|(i, _)| *i < MAX_SNAPSHOT_BYTES)
            .last()
            .map(|(i, c)| i + c.len_utf8())
            .unwrap_or(0);
        serialized.truncate(cut);
    }
    Some(serialized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn secrets_are_masked_recursively() {
        let value = json!({
            "email": "a@b.com",
            "password": "hunter2",
            "nested": {"refreshToken": "abc", "ok": 1},
            "list": [{"apiKey": "k"}]
        });
        let redacted = redact_value(&value);
        assert_eq!(redacted["password"], "***REDACTED***");
        assert_eq!(redacted["nested"]["refreshToken"], "***REDACTED***");
        assert_eq!(redacted["list"][0]["apiKey"], "***REDACTED***");
        assert_eq!(redacted["email"], "a@b.com");
        assert_eq!(redacted["nested"]["ok"], 1);
    }

    #[test]
    fn long_strings_are_truncated() {
        let long = "x".repeat(2000);
        let redacted = redact_value(&json!({ "notes": long }));
        assert_eq!(
            redacted["notes"].as_str().map(|s| s.len()),
            Some(MAX_FIELD_LENGTH)
        );
    }

    #[test]
    fn snapshot_is_bounded_and_skips_null() {
        assert_eq!(snapshot(&Value::Null), None);
        let wide: Vec<String> = (0..100).map(|i| format!("field-{i}-{}", "y".repeat(60))).collect();
        let text = snapshot(&json!(wide)).unwrap();
        assert!(text.len() <= MAX_SNAPSHOT_BYTES);
    }
}
