//! Cache Module
//!
//! In-process TTL key/value store shared by the idempotency middleware, the
//! refresh-token store and ad-hoc response caching. DashMap gives lock-free
//! concurrent access; `set_if_absent` is atomic through the map's entry API,
//! which is what makes the idempotency claim race-free.
//!
//! Expired entries are treated as absent on read and swept periodically by a
//! background task.

pub mod idempotency;

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde_json::Value;

use shared::util::now_millis;

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Value,
    expires_at: i64,
}

impl CacheEntry {
    fn expired(&self, now: i64) -> bool {
        self.expires_at <= now
    }
}

/// TTL key/value store
#[derive(Debug, Default)]
pub struct CacheService {
    entries: DashMap<String, CacheEntry>,
}

impl CacheService {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Get a live value; expired entries are evicted and reported absent
    pub fn get(&self, key: &str) -> Option<Value> {
        let now = now_millis();
        match self.entries.get(key) {
            Some(entry) if !entry.expired(now) => Some(entry.value.clone()),
            Some(_) => {
                drop(self.entries.remove(key));
                None
            }
            None => None,
        }
    }

    /// Set a value with a TTL, replacing any previous entry
    pub fn set(&self, key: impl Into<String>, value: Value, ttl_secs: u64) {
        self.entries.insert(
            key.into(),
            CacheEntry {
                value,
                expires_at: now_millis() + (ttl_secs as i64) * 1000,
            },
        );
    }

    /// Atomically claim a key: returns true if this caller inserted the
    /// value, false if a live entry already existed.
    pub fn set_if_absent(&self, key: impl Into<String>, value: Value, ttl_secs: u64) -> bool {
        let now = now_millis();
        let new_entry = CacheEntry {
            value,
            expires_at: now + (ttl_secs as i64) * 1000,
        };
        match self.entries.entry(key.into()) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().expired(now) {
                    occupied.insert(new_entry);
                    true
                } else {
                    false
                }
            }
            Entry::Vacant(vacant) => {
                vacant.insert(new_entry);
                true
            }
        }
    }

    /// Remove a key, returning whether a live entry was present
    pub fn delete(&self, key: &str) -> bool {
        match self.entries.remove(key) {
            Some((_, entry)) => !entry.expired(now_millis()),
            None => false,
        }
    }

    /// Atomically consume a key: remove it and return the live value.
    ///
    /// This is the single-use primitive behind refresh-token rotation: two
    /// concurrent rotations of the same token cannot both succeed.
    pub fn take(&self, key: &str) -> Option<Value> {
        match self.entries.remove(key) {
            Some((_, entry)) if !entry.expired(now_millis()) => Some(entry.value),
            _ => None,
        }
    }

    /// Evict every expired entry
    pub fn sweep(&self) -> usize {
        let now = now_millis();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.expired(now));
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Spawn the periodic sweeper task
    pub fn spawn_sweeper(self: &Arc<Self>, interval_secs: u64) {
        let cache = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
            interval.tick().await; // first tick fires immediately
            loop {
                interval.tick().await;
                let evicted = cache.sweep();
                if evicted > 0 {
                    tracing::debug!(evicted, "Cache sweep evicted expired entries");
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn set_get_delete_round_trip() {
        let cache = CacheService::new();
        cache.set("k", json!({"a": 1}), 60);
        assert_eq!(cache.get("k"), Some(json!({"a": 1})));
        assert!(cache.delete("k"));
        assert_eq!(cache.get("k"), None);
        assert!(!cache.delete("k"));
    }

    #[tokio::test]
    async fn expired_entries_read_as_absent() {
        let cache = CacheService::new();
        cache.set("k", json!(1), 0);
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(cache.get("k"), None);
    }

    #[test]
    fn take_is_single_use() {
        let cache = CacheService::new();
        cache.set("refresh:t", json!({"user_id": 7}), 60);
        assert!(cache.take("refresh:t").is_some());
        assert!(cache.take("refresh:t").is_none());
    }

    #[test]
    fn set_if_absent_respects_live_entries() {
        let cache = CacheService::new();
        assert!(cache.set_if_absent("k", json!(1), 60));
        assert!(!cache.set_if_absent("k", json!(2), 60));
        assert_eq!(cache.get("k"), Some(json!(1)));
    }

    #[tokio::test]
    async fn set_if_absent_reclaims_expired_entries() {
        let cache = CacheService::new();
        assert!(cache.set_if_absent("k", json!(1), 0));
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert!(cache.set_if_absent("k", json!(2), 60));
        assert_eq!(cache.get("k"), Some(json!(2)));
    }

    #[tokio::test]
    async fn concurrent_claims_have_exactly_one_winner() {
        let cache = Arc::new(CacheService::new());
        let mut handles = Vec::new();
        for i in 0..32 {
            let cache = Arc::clone(&cache);
            handles.push(tokio::spawn(async move {
                cache.set_if_absent("claim", json!(i), 60)
            }));
        }
        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }

    #[test]
    fn sweep_evicts_only_expired() {
        let cache = CacheService::new();
        cache.set("dead", json!(1), 0);
        cache.set("live", json!(2), 60);
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(cache.sweep(), 1);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("live"), Some(json!(2)));
    }
}
