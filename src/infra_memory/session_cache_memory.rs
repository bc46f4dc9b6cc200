use crate::domain_model::*;
use crate::domain_port::*;
use dashmap::DashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// Minimum gap between two full sweeps of expired entries.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug)]
struct Entry {
    value: String,
    deadline: Instant,
}

#[derive(Debug)]
pub struct MemorySessionCache {
    entries: DashMap<String, Entry>,
    keys: SessionKeys,
    next_sweep: Mutex<Instant>,
}

impl MemorySessionCache {
    pub fn new(prefix: impl Into<String>) -> Self {
        MemorySessionCache {
            entries: DashMap::new(),
            keys: SessionKeys::new(prefix),
            next_sweep: Mutex::new(Instant::now() + SWEEP_INTERVAL),
        }
    }

    fn put(&self, key: String, value: String, ttl: Duration) {
        let now = Instant::now();
        self.sweep_expired(now);
        let deadline = now + Duration::from_secs(ttl_secs(ttl));
        self.entries.insert(key, Entry { value, deadline });
    }

    /// Drop every entry past its deadline, at most once per `SWEEP_INTERVAL`.
    /// Keys that are never read again are only reclaimed here.
    fn sweep_expired(&self, now: Instant) {
        // Another writer holding the lock is already sweeping.
        let Ok(mut next_sweep) = self.next_sweep.try_lock() else {
            return;
        };
        if now < *next_sweep {
            return;
        }
        *next_sweep = now + SWEEP_INTERVAL;
        drop(next_sweep);

        self.entries.retain(|_, entry| entry.deadline > now);
    }

    /// Expired entries read as absent and are dropped on the way out.
    fn live(&self, key: &str) -> Option<String> {
        let now = Instant::now();
        let expired = match self.entries.get(key) {
            Some(entry) if entry.deadline > now => return Some(entry.value.clone()),
            Some(_) => true,
            None => false,
        };
        if expired {
            self.entries.remove_if(key, |_, entry| entry.deadline <= now);
        }
        None
    }
}

#[async_trait::async_trait]
impl SessionCache for MemorySessionCache {
    async fn store_refresh_token(
        &self,
        user_id: UserId,
        token: &str,
        ttl: Duration,
    ) -> Result<(), SessionCacheError> {
        self.put(self.keys.refresh(user_id), token.to_string(), ttl);
        Ok(())
    }

    async fn get_refresh_token(
        &self,
        user_id: UserId,
    ) -> Result<Option<String>, SessionCacheError> {
        Ok(self.live(&self.keys.refresh(user_id)))
    }

    async fn remove_refresh_token(&self, user_id: UserId) -> Result<(), SessionCacheError> {
        self.entries.remove(&self.keys.refresh(user_id));
        Ok(())
    }

    async fn blacklist_token(&self, token: &str, ttl: Duration) -> Result<(), SessionCacheError> {
        self.put(self.keys.blacklist(token), "1".to_string(), ttl);
        Ok(())
    }

    async fn is_blacklisted(&self, token: &str) -> Result<bool, SessionCacheError> {
        Ok(self.live(&self.keys.blacklist(token)).is_some())
    }
}
