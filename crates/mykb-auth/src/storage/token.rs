//! Ephemeral token store trait.

use std::time::Duration;

use async_trait::async_trait;

use crate::AuthResult;

/// Key-value store with per-entry expiry.
///
/// Holds CSRF tokens, authorization codes, access tokens and refresh
/// tokens. Expired entries must be indistinguishable from absent ones for
/// every read.
///
/// `get_and_delete` must be atomic: when several callers race on the same
/// key, exactly one of them observes the value.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Store `value` under `key`, replacing any previous value. The entry
    /// expires after `ttl`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unreachable.
    async fn put(&self, key: &str, value: &str, ttl: Duration) -> AuthResult<()>;

    /// Read a live entry without removing it.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unreachable.
    async fn get(&self, key: &str) -> AuthResult<Option<String>>;

    /// Atomically read and remove a live entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unreachable.
    async fn get_and_delete(&self, key: &str) -> AuthResult<Option<String>>;

    /// Remove an entry. Removing an absent key is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unreachable.
    async fn delete(&self, key: &str) -> AuthResult<()>;
}

/// Races `contenders` concurrent `get_and_delete` calls against a single
/// freshly written key and returns how many of them observed the value.
///
/// Any store honoring the [`TokenStore`] contract returns exactly 1.
///
/// # Errors
///
/// Returns the first store error encountered.
#[cfg(any(test, feature = "test-utils"))]
pub async fn count_concurrent_redemptions(
    store: std::sync::Arc<dyn TokenStore>,
    key: &str,
    contenders: usize,
) -> AuthResult<usize> {
    use std::sync::Arc;

    store.put(key, "payload", Duration::from_secs(60)).await?;

    let barrier = Arc::new(tokio::sync::Barrier::new(contenders));
    let mut handles = Vec::with_capacity(contenders);
    for _ in 0..contenders {
        let store = Arc::clone(&store);
        let barrier = Arc::clone(&barrier);
        let key = key.to_string();
        handles.push(tokio::spawn(async move {
            barrier.wait().await;
            store.get_and_delete(&key).await
        }));
    }

    let mut winners = 0;
    for handle in handles {
        let outcome = handle
            .await
            .map_err(|e| crate::AuthError::internal(format!("redemption task failed: {e}")))?;
        if outcome?.is_some() {
            winners += 1;
        }
    }
    Ok(winners)
}
