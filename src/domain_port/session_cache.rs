use crate::domain_model::*;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum SessionCacheError {
    #[error("cache backend error: {0}")]
    Backend(String),
}

/// Revocable token state shared by every server instance.
///
/// Holds at most one refresh token per user and a blacklist of revoked
/// access tokens. Every entry carries its own TTL; nothing here is
/// transactional across keys.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait SessionCache: Send + Sync {
    /// Upsert the current refresh token of `user_id`, replacing any prior one.
    async fn store_refresh_token(
        &self,
        user_id: UserId,
        token: &str,
        ttl: Duration,
    ) -> Result<(), SessionCacheError>;

    async fn get_refresh_token(&self, user_id: UserId)
    -> Result<Option<String>, SessionCacheError>;

    /// Idempotent; removing an absent slot is not an error.
    async fn remove_refresh_token(&self, user_id: UserId) -> Result<(), SessionCacheError>;

    /// Mark `token` revoked until `ttl` elapses.
    async fn blacklist_token(&self, token: &str, ttl: Duration) -> Result<(), SessionCacheError>;

    async fn is_blacklisted(&self, token: &str) -> Result<bool, SessionCacheError>;
}

/// Cache TTLs are whole seconds and must be positive.
pub fn ttl_secs(ttl: Duration) -> u64 {
    let secs = ttl.as_secs() + u64::from(ttl.subsec_nanos() > 0);
    secs.max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ttl_rounds_up_to_whole_seconds() {
        assert_eq!(ttl_secs(Duration::from_millis(1500)), 2);
        assert_eq!(ttl_secs(Duration::from_secs(900)), 900);
    }

    #[test]
    fn ttl_is_never_zero() {
        assert_eq!(ttl_secs(Duration::ZERO), 1);
    }
}
