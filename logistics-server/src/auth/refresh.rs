//! Refresh Token Store
//!
//! Rotating refresh tokens over the TTL cache. Tokens are single-use:
//! rotation consumes the old record atomically (`CacheService::take`) before
//! a new token is issued, so replaying a rotated token always fails.

use std::sync::Arc;

use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::cache::CacheService;
use crate::utils::{AppError, AppResult};
use shared::util::now_millis;

/// Metadata stored per refresh token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshTokenRecord {
    pub user_id: i64,
    pub created_at: i64,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

/// Cache-backed refresh token store
#[derive(Debug, Clone)]
pub struct RefreshTokenStore {
    cache: Arc<CacheService>,
    ttl_secs: u64,
}

impl RefreshTokenStore {
    pub fn new(cache: Arc<CacheService>, ttl_secs: u64) -> Self {
        Self { cache, ttl_secs }
    }

    /// Issue a new refresh token for a user
    pub fn issue(
        &self,
        user_id: i64,
        ip: Option<String>,
        user_agent: Option<String>,
    ) -> AppResult<String> {
        let token = generate_token();
        let record = RefreshTokenRecord {
            user_id,
            created_at: now_millis(),
            ip,
            user_agent,
        };
        let value = serde_json::to_value(&record)
            .map_err(|e| AppError::internal(format!("Failed to serialize token record: {e}")))?;
        self.cache.set(storage_key(&token), value, self.ttl_secs);
        Ok(token)
    }

    /// Consume a refresh token (single-use). Unknown or expired tokens are
    /// Unauthorized.
    pub fn consume(&self, token: &str) -> AppResult<RefreshTokenRecord> {
        let value = self
            .cache
            .take(&storage_key(token))
            .ok_or_else(|| AppError::unauthorized_msg("Invalid or expired refresh token"))?;
        serde_json::from_value(value)
            .map_err(|e| AppError::internal(format!("Corrupt refresh token record: {e}")))
    }
}

fn storage_key(token: &str) -> String {
    format!("refresh:{token}")
}

/// 64 hex chars of CSPRNG-backed randomness
fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> RefreshTokenStore {
        RefreshTokenStore::new(Arc::new(CacheService::new()), 60)
    }

    #[test]
    fn issue_then_consume_round_trip() {
        let store = store();
        let token = store
            .issue(7, Some("10.0.0.1".into()), Some("curl/8".into()))
            .unwrap();
        assert_eq!(token.len(), 64);

        let record = store.consume(&token).unwrap();
        assert_eq!(record.user_id, 7);
        assert_eq!(record.ip.as_deref(), Some("10.0.0.1"));
    }

    #[test]
    fn tokens_are_single_use() {
        let store = store();
        let token = store.issue(7, None, None).unwrap();
        assert!(store.consume(&token).is_ok());
        let err = store.consume(&token).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[test]
    fn unknown_token_is_unauthorized() {
        let store = store();
        assert!(matches!(
            store.consume("deadbeef").unwrap_err(),
            AppError::Unauthorized(_)
        ));
    }

    #[test]
    fn tokens_do_not_collide() {
        assert_ne!(generate_token(), generate_token());
    }
}
