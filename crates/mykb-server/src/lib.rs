pub mod config;
pub mod observability;
pub mod server;
pub mod token_store;

use std::io::BufRead;
use std::sync::Arc;
use std::time::Duration;

use mykb_auth::credentials::hash_operator_password;
use mykb_auth::storage::{ClientStorage, MemoryClientStorage, MemoryTokenStore, TokenStore};
use mykb_auth_postgres::PostgresClientStorage;

pub use config::{AppConfig, LoggingConfig, PostgresStorageConfig, RedisConfig, ServerConfig, StorageConfig};
pub use observability::init_tracing;
pub use server::{MykbServer, ServerBuilder, build_app, serve};
pub use token_store::RedisTokenStore;

/// How often the in-memory token store purges expired entries.
const REAPER_INTERVAL: Duration = Duration::from_secs(60);

/// Create the ephemeral token store based on configuration.
///
/// ## Store Modes
///
/// - **Redis disabled**: in-memory store with a background reaper
/// - **Redis enabled**: connects to Redis, falls back to in-memory on failure
///
/// ## Graceful Degradation
///
/// If the Redis connection fails, the server still starts with the in-memory
/// store. Tokens are then lost on restart and not shared between instances.
pub async fn create_token_store(config: &RedisConfig) -> Arc<dyn TokenStore> {
    if !config.enabled {
        tracing::warn!("Redis disabled, using in-memory token store");
        return memory_token_store();
    }

    tracing::info!(url = %config.url, "Connecting to Redis");

    // Create Redis pool configuration
    let mut redis_config = deadpool_redis::Config::from_url(&config.url);
    let timeout = config.timeout();
    let mut pool_config = deadpool_redis::PoolConfig::new(config.pool_size);
    pool_config.timeouts.wait = Some(timeout);
    pool_config.timeouts.create = Some(timeout);
    pool_config.timeouts.recycle = Some(timeout);
    redis_config.pool = Some(pool_config);

    let pool = match redis_config.create_pool(Some(deadpool_redis::Runtime::Tokio1)) {
        Ok(pool) => pool,
        Err(e) => {
            tracing::warn!(
                error = %e,
                "Failed to create Redis pool. Falling back to in-memory token store."
            );
            return memory_token_store();
        }
    };

    // Test connection
    match pool.get().await {
        Ok(_) => {
            tracing::info!("Connected to Redis");
            Arc::new(RedisTokenStore::new(pool))
        }
        Err(e) => {
            tracing::warn!(
                error = %e,
                "Failed to connect to Redis. Falling back to in-memory token store."
            );
            memory_token_store()
        }
    }
}

fn memory_token_store() -> Arc<dyn TokenStore> {
    let store = MemoryTokenStore::new();
    store.spawn_reaper(REAPER_INTERVAL);
    Arc::new(store)
}

/// Create the client registry backend based on configuration.
///
/// Unlike the token store, a configured but unreachable PostgreSQL is a
/// startup error.
pub async fn create_client_storage(
    config: &StorageConfig,
) -> anyhow::Result<Arc<dyn ClientStorage>> {
    let Some(pg) = &config.postgres else {
        tracing::warn!("storage.postgres not configured, using in-memory client registry");
        return Ok(Arc::new(MemoryClientStorage::new()));
    };

    let storage =
        PostgresClientStorage::connect(&pg.url, pg.pool_size, pg.connect_timeout()).await?;
    storage.migrate().await?;
    tracing::info!(pool_size = pg.pool_size, "PostgreSQL client registry ready");
    Ok(Arc::new(storage))
}

/// Reads a password from the first line of `input` and returns its Argon2id
/// PHC string for `auth.password_hash`.
pub fn hash_password_from(mut input: impl BufRead) -> anyhow::Result<String> {
    let mut line = String::new();
    input.read_line(&mut line)?;
    let password = line.trim_end_matches(['\r', '\n']);
    if password.is_empty() {
        anyhow::bail!("password must not be empty");
    }
    hash_operator_password(password).map_err(|e| anyhow::anyhow!("failed to hash password: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mykb_auth::{AuthConfig, OperatorCredentials};

    #[tokio::test]
    async fn test_hash_password_from_stdin_line() {
        let hash = hash_password_from(std::io::Cursor::new("correct horse\n")).unwrap();
        assert!(hash.starts_with("$argon2id$"));

        let config = AuthConfig {
            password_hash: Some(hash),
            ..AuthConfig::default()
        };
        assert!(config.validate().is_ok());
        let credentials = OperatorCredentials::from_config(&config).unwrap();
        assert!(credentials.verify("correct horse").await);
        assert!(!credentials.verify("correct horse\n").await);
    }

    #[test]
    fn test_hash_password_rejects_empty_input() {
        assert!(hash_password_from(std::io::Cursor::new("\n")).is_err());
        assert!(hash_password_from(std::io::Cursor::new("")).is_err());
    }
}
