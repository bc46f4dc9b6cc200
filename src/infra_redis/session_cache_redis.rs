use crate::domain_model::*;
use crate::domain_port::*;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use std::time::Duration;
use tracing::info;

fn backend(e: redis::RedisError) -> SessionCacheError {
    SessionCacheError::Backend(e.to_string())
}

/// Session cache on a shared Redis instance. Each key carries its own
/// expiry, so revoked entries disappear once the token would have expired.
pub struct RedisSessionCache {
    conn: ConnectionManager,
    keys: SessionKeys,
}

impl RedisSessionCache {
    pub fn new(conn: ConnectionManager, prefix: impl Into<String>) -> Self {
        RedisSessionCache {
            conn,
            keys: SessionKeys::new(prefix),
        }
    }

    /// Open a managed connection and ping it, so an unreachable server
    /// fails at startup rather than on the first request.
    pub async fn connect(url: &str, prefix: impl Into<String>) -> Result<Self, SessionCacheError> {
        let client = redis::Client::open(url).map_err(backend)?;
        let mut conn = client.get_connection_manager().await.map_err(backend)?;
        let pong: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(backend)?;
        info!(%pong, "session cache connected");
        Ok(Self::new(conn, prefix))
    }
}

#[async_trait::async_trait]
impl SessionCache for RedisSessionCache {
    async fn store_refresh_token(
        &self,
        user_id: UserId,
        token: &str,
        ttl: Duration,
    ) -> Result<(), SessionCacheError> {
        let key = self.keys.refresh(user_id);
        let mut conn = self.conn.clone();
        let _: () = conn
            .set_ex(&key, token, ttl_secs(ttl))
            .await
            .map_err(backend)?;
        Ok(())
    }

    async fn get_refresh_token(
        &self,
        user_id: UserId,
    ) -> Result<Option<String>, SessionCacheError> {
        let key = self.keys.refresh(user_id);
        let mut conn = self.conn.clone();
        let token: Option<String> = conn.get(&key).await.map_err(backend)?;
        Ok(token)
    }

    async fn remove_refresh_token(&self, user_id: UserId) -> Result<(), SessionCacheError> {
        let key = self.keys.refresh(user_id);
        let mut conn = self.conn.clone();
        let _: () = conn.del(&key).await.map_err(backend)?;
        Ok(())
    }

    async fn blacklist_token(&self, token: &str, ttl: Duration) -> Result<(), SessionCacheError> {
        let key = self.keys.blacklist(token);
        let mut conn = self.conn.clone();
        let _: () = conn
            .set_ex(&key, 1_u8, ttl_secs(ttl))
            .await
            .map_err(backend)?;
        Ok(())
    }

    async fn is_blacklisted(&self, token: &str) -> Result<bool, SessionCacheError> {
        let key = self.keys.blacklist(token);
        let mut conn = self.conn.clone();
        let found: bool = conn.exists(&key).await.map_err(backend)?;
        Ok(found)
    }
}
