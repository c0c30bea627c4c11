//! Client registry: dynamic registration, lookup, usage tracking and
//! garbage collection of idle clients.

use std::sync::Arc;
use std::time::Duration;

use time::OffsetDateTime;

use crate::storage::ClientStorage;
use crate::types::{Client, ClientValidationError, validate_redirect_uri};
use crate::{AuthError, AuthResult};

/// Registry of OAuth clients over a [`ClientStorage`] backend.
#[derive(Clone)]
pub struct ClientRegistry {
    storage: Arc<dyn ClientStorage>,
    max_age: Duration,
}

impl ClientRegistry {
    /// Creates a registry. Clients idle for longer than `max_age` are
    /// removed by the sweep that precedes each registration.
    pub fn new(storage: Arc<dyn ClientStorage>, max_age: Duration) -> Self {
        Self { storage, max_age }
    }

    /// Registers a new client with a server-generated `client_id`.
    ///
    /// A stale-client sweep runs first. A failing sweep is logged and does
    /// not prevent registration.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidRedirectUri` if `redirect_uris` is empty or
    /// contains an unacceptable URI, and `AuthError::Storage` if the client
    /// cannot be persisted.
    pub async fn register(
        &self,
        client_name: Option<String>,
        redirect_uris: Vec<String>,
    ) -> AuthResult<Client> {
        if redirect_uris.is_empty() {
            return Err(AuthError::invalid_redirect_uri(
                ClientValidationError::NoRedirectUris.to_string(),
            ));
        }
        for uri in &redirect_uris {
            validate_redirect_uri(uri).map_err(|e| AuthError::invalid_redirect_uri(e.to_string()))?;
        }

        match self.sweep(self.max_age).await {
            Ok(0) => {}
            Ok(removed) => tracing::info!(removed, "removed stale clients"),
            Err(e) => tracing::warn!(error = %e, "stale client sweep failed"),
        }

        let client_name = client_name.filter(|name| !name.trim().is_empty());
        let client = Client::new(client_name, redirect_uris);
        self.storage.create(&client).await?;

        tracing::info!(
            client_id = %client.client_id,
            client_name = client.client_name.as_deref().unwrap_or(""),
            redirect_uris = client.redirect_uris.len(),
            "client registered"
        );
        Ok(client)
    }

    /// Looks up a client by id.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Storage` if the lookup fails.
    pub async fn lookup(&self, client_id: &str) -> AuthResult<Option<Client>> {
        if client_id.is_empty() {
            return Ok(None);
        }
        self.storage.find_by_client_id(client_id).await
    }

    /// Records that `client_id` was just issued tokens. Unknown clients are
    /// ignored.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Storage` if the update fails.
    pub async fn touch(&self, client_id: &str) -> AuthResult<()> {
        self.storage
            .touch(client_id, OffsetDateTime::now_utc())
            .await
    }

    /// Deletes clients idle for longer than `max_age`. Returns the number
    /// of deleted clients.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Storage` if the deletion fails.
    pub async fn sweep(&self, max_age: Duration) -> AuthResult<u64> {
        self.storage
            .delete_stale(cutoff(OffsetDateTime::now_utc(), max_age))
            .await
    }
}

/// `now - max_age`, saturating at the Unix epoch.
fn cutoff(now: OffsetDateTime, max_age: Duration) -> OffsetDateTime {
    time::Duration::try_from(max_age)
        .ok()
        .and_then(|age| now.checked_sub(age))
        .unwrap_or(OffsetDateTime::UNIX_EPOCH)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryClientStorage;
    use async_trait::async_trait;

    const NINETY_DAYS: Duration = Duration::from_secs(90 * 86_400);

    fn registry() -> (ClientRegistry, MemoryClientStorage) {
        let storage = MemoryClientStorage::new();
        (
            ClientRegistry::new(Arc::new(storage.clone()), NINETY_DAYS),
            storage,
        )
    }

    #[tokio::test]
    async fn test_register_and_lookup() {
        let (registry, _) = registry();
        let client = registry
            .register(
                Some("Test Client".into()),
                vec!["http://localhost:8080/callback".into()],
            )
            .await
            .unwrap();

        let found = registry.lookup(&client.client_id).await.unwrap().unwrap();
        assert_eq!(found.client_name.as_deref(), Some("Test Client"));
        assert_eq!(found.redirect_uris, vec!["http://localhost:8080/callback"]);
        assert!(registry.lookup("unknown").await.unwrap().is_none());
        assert!(registry.lookup("").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_register_generates_distinct_ids() {
        let (registry, _) = registry();
        let uris = vec!["https://app.example/cb".to_string()];
        let a = registry.register(None, uris.clone()).await.unwrap();
        let b = registry.register(None, uris).await.unwrap();
        assert_ne!(a.client_id, b.client_id);
    }

    #[tokio::test]
    async fn test_register_rejects_empty_redirect_uris() {
        let (registry, storage) = registry();
        let err = registry.register(None, vec![]).await.unwrap_err();
        assert_eq!(err.oauth_error_code(), "invalid_redirect_uri");
        assert!(storage.is_empty());
    }

    #[tokio::test]
    async fn test_register_rejects_non_loopback_http() {
        let (registry, _) = registry();
        let err = registry
            .register(
                None,
                vec![
                    "https://ok.example/cb".into(),
                    "http://evil.example/cb".into(),
                ],
            )
            .await
            .unwrap_err();
        assert_eq!(err.oauth_error_code(), "invalid_redirect_uri");
        assert!(err.to_string().contains("evil.example"));
    }

    #[tokio::test]
    async fn test_touch_sets_last_used_and_ignores_unknown() {
        let (registry, _) = registry();
        let client = registry
            .register(None, vec!["https://app.example/cb".into()])
            .await
            .unwrap();
        assert!(client.last_used_at.is_none());

        registry.touch(&client.client_id).await.unwrap();
        registry.touch("unknown").await.unwrap();

        let found = registry.lookup(&client.client_id).await.unwrap().unwrap();
        assert!(found.last_used_at.is_some());
    }

    #[tokio::test]
    async fn test_register_sweeps_stale_clients() {
        let (registry, storage) = registry();
        let mut stale = Client::new(None, vec!["https://old.example/cb".into()]);
        stale.created_at = OffsetDateTime::now_utc() - time::Duration::days(91);
        storage.create(&stale).await.unwrap();

        registry
            .register(None, vec!["https://new.example/cb".into()])
            .await
            .unwrap();

        assert!(registry.lookup(&stale.client_id).await.unwrap().is_none());
        assert_eq!(storage.len(), 1);
    }

    #[tokio::test]
    async fn test_sweep_with_explicit_age() {
        let (registry, storage) = registry();
        let mut idle = Client::new(None, vec!["https://a.example/cb".into()]);
        idle.created_at = OffsetDateTime::now_utc() - time::Duration::days(10);
        storage.create(&idle).await.unwrap();

        assert_eq!(registry.sweep(NINETY_DAYS).await.unwrap(), 0);
        assert_eq!(
            registry
                .sweep(Duration::from_secs(7 * 86_400))
                .await
                .unwrap(),
            1
        );
    }

    /// Storage whose sweep always fails.
    struct BrokenSweep(MemoryClientStorage);

    #[async_trait]
    impl ClientStorage for BrokenSweep {
        async fn create(&self, client: &Client) -> AuthResult<()> {
            self.0.create(client).await
        }
        async fn find_by_client_id(&self, client_id: &str) -> AuthResult<Option<Client>> {
            self.0.find_by_client_id(client_id).await
        }
        async fn touch(&self, client_id: &str, used_at: OffsetDateTime) -> AuthResult<()> {
            self.0.touch(client_id, used_at).await
        }
        async fn delete_stale(&self, _cutoff: OffsetDateTime) -> AuthResult<u64> {
            Err(AuthError::storage("sweep unavailable"))
        }
    }

    #[tokio::test]
    async fn test_failing_sweep_does_not_block_registration() {
        let registry = ClientRegistry::new(
            Arc::new(BrokenSweep(MemoryClientStorage::new())),
            NINETY_DAYS,
        );
        let client = registry
            .register(None, vec!["https://app.example/cb".into()])
            .await
            .unwrap();
        assert!(registry.lookup(&client.client_id).await.unwrap().is_some());
    }

    #[test]
    fn test_cutoff_saturates() {
        let now = OffsetDateTime::now_utc();
        assert_eq!(cutoff(now, Duration::MAX), OffsetDateTime::UNIX_EPOCH);
        assert_eq!(
            cutoff(now, Duration::from_secs(86_400)),
            now - time::Duration::days(1)
        );
    }
}
