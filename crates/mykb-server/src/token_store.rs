//! Redis-backed ephemeral token store.
//!
//! Shares CSRF tokens, authorization codes and access/refresh tokens across
//! server instances. Expiry is delegated to Redis (`PSETEX`), and one-time
//! consumption uses `GETDEL`, which is atomic on the server.

use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::{Connection, Pool};
use redis::AsyncCommands;

use mykb_auth::storage::TokenStore;
use mykb_auth::{AuthError, AuthResult};

/// [`TokenStore`] backed by a Redis connection pool.
#[derive(Clone)]
pub struct RedisTokenStore {
    pool: Pool,
}

impl RedisTokenStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    async fn conn(&self) -> AuthResult<Connection> {
        self.pool
            .get()
            .await
            .map_err(|e| AuthError::storage(format!("redis connection: {e}")))
    }
}

#[async_trait]
impl TokenStore for RedisTokenStore {
    async fn put(&self, key: &str, value: &str, ttl: Duration) -> AuthResult<()> {
        let mut conn = self.conn().await?;
        conn.pset_ex::<_, _, ()>(key, value, ttl_millis(ttl))
            .await
            .map_err(|e| AuthError::storage(format!("redis PSETEX: {e}")))
    }

    async fn get(&self, key: &str) -> AuthResult<Option<String>> {
        let mut conn = self.conn().await?;
        conn.get::<_, Option<String>>(key)
            .await
            .map_err(|e| AuthError::storage(format!("redis GET: {e}")))
    }

    async fn get_and_delete(&self, key: &str) -> AuthResult<Option<String>> {
        let mut conn = self.conn().await?;
        conn.get_del::<_, Option<String>>(key)
            .await
            .map_err(|e| AuthError::storage(format!("redis GETDEL: {e}")))
    }

    async fn delete(&self, key: &str) -> AuthResult<()> {
        let mut conn = self.conn().await?;
        conn.del::<_, ()>(key)
            .await
            .map_err(|e| AuthError::storage(format!("redis DEL: {e}")))
    }
}

// Redis rejects a zero expiry.
fn ttl_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}
