//! In-memory storage backends.
//!
//! Suitable for single-instance deployments and tests. State is lost on
//! restart and is not shared between processes.

use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use time::OffsetDateTime;

use crate::storage::{ClientStorage, TokenStore};
use crate::types::Client;
use crate::{AuthError, AuthResult};

// =============================================================================
// Token store
// =============================================================================

#[derive(Debug)]
struct StoredToken {
    value: String,
    expires_at: Instant,
}

impl StoredToken {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// [`TokenStore`] backed by a concurrent hash map.
///
/// Expiry is lazy: an expired entry reads as absent and is removed on the
/// next access. [`MemoryTokenStore::spawn_reaper`] additionally purges
/// expired entries in the background.
#[derive(Debug, Clone, Default)]
pub struct MemoryTokenStore {
    entries: Arc<DashMap<String, StoredToken>>,
}

impl MemoryTokenStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries currently held, including expired ones that have
    /// not been purged yet.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the store holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes every expired entry. Returns the number removed.
    pub fn purge_expired(&self) -> usize {
        purge(&self.entries)
    }

    /// Spawns a task that purges expired entries every `interval`.
    ///
    /// The task exits once every clone of the store has been dropped.
    pub fn spawn_reaper(&self, interval: Duration) -> tokio::task::JoinHandle<()> {
        let entries: Weak<DashMap<String, StoredToken>> = Arc::downgrade(&self.entries);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(map) = entries.upgrade() else {
                    break;
                };
                let removed = purge(&map);
                if removed > 0 {
                    tracing::debug!(removed, "purged expired tokens");
                }
            }
        })
    }
}

fn purge(entries: &DashMap<String, StoredToken>) -> usize {
    let now = Instant::now();
    let before = entries.len();
    entries.retain(|_, entry| !entry.is_expired(now));
    before.saturating_sub(entries.len())
}

fn expiry(ttl: Duration) -> AuthResult<Instant> {
    Instant::now()
        .checked_add(ttl)
        .ok_or_else(|| AuthError::internal("token lifetime overflow"))
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn put(&self, key: &str, value: &str, ttl: Duration) -> AuthResult<()> {
        let entry = StoredToken {
            value: value.to_string(),
            expires_at: expiry(ttl)?,
        };
        self.entries.insert(key.to_string(), entry);
        Ok(())
    }

    async fn get(&self, key: &str) -> AuthResult<Option<String>> {
        let now = Instant::now();
        let live = match self.entries.get(key) {
            None => return Ok(None),
            Some(entry) if !entry.is_expired(now) => Some(entry.value.clone()),
            Some(_) => None,
        };
        if live.is_none() {
            self.entries.remove_if(key, |_, entry| entry.is_expired(now));
        }
        Ok(live)
    }

    async fn get_and_delete(&self, key: &str) -> AuthResult<Option<String>> {
        let now = Instant::now();
        Ok(self
            .entries
            .remove(key)
            .filter(|(_, entry)| !entry.is_expired(now))
            .map(|(_, entry)| entry.value))
    }

    async fn delete(&self, key: &str) -> AuthResult<()> {
        self.entries.remove(key);
        Ok(())
    }
}

// =============================================================================
// Client storage
// =============================================================================

/// [`ClientStorage`] backed by a concurrent hash map.
#[derive(Debug, Clone, Default)]
pub struct MemoryClientStorage {
    clients: Arc<DashMap<String, Client>>,
}

impl MemoryClientStorage {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered clients.
    #[must_use]
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    /// Returns `true` if no client is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

#[async_trait]
impl ClientStorage for MemoryClientStorage {
    async fn create(&self, client: &Client) -> AuthResult<()> {
        use dashmap::mapref::entry::Entry;

        match self.clients.entry(client.client_id.clone()) {
            Entry::Occupied(_) => Err(AuthError::storage(format!(
                "client '{}' already exists",
                client.client_id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(client.clone());
                Ok(())
            }
        }
    }

    async fn find_by_client_id(&self, client_id: &str) -> AuthResult<Option<Client>> {
        Ok(self.clients.get(client_id).map(|c| c.value().clone()))
    }

    async fn touch(&self, client_id: &str, used_at: OffsetDateTime) -> AuthResult<()> {
        if let Some(mut client) = self.clients.get_mut(client_id) {
            client.last_used_at = Some(used_at);
        }
        Ok(())
    }

    async fn delete_stale(&self, cutoff: OffsetDateTime) -> AuthResult<u64> {
        let before = self.clients.len();
        self.clients.retain(|_, client| !client.is_stale(cutoff));
        Ok(before.saturating_sub(self.clients.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::count_concurrent_redemptions;

    #[tokio::test]
    async fn test_put_get_delete() {
        let store = MemoryTokenStore::new();
        store.put("k", "v", Duration::from_secs(60)).await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));

        store.delete("k").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);
        store.delete("k").await.unwrap();
    }

    #[tokio::test]
    async fn test_get_and_delete_is_one_shot() {
        let store = MemoryTokenStore::new();
        store.put("code", "grant", Duration::from_secs(60)).await.unwrap();
        assert_eq!(
            store.get_and_delete("code").await.unwrap().as_deref(),
            Some("grant")
        );
        assert_eq!(store.get_and_delete("code").await.unwrap(), None);
        assert_eq!(store.get("code").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_expired_entries_read_as_absent() {
        let store = MemoryTokenStore::new();
        store.put("a", "1", Duration::from_millis(20)).await.unwrap();
        store.put("b", "2", Duration::from_millis(20)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(store.get("a").await.unwrap(), None);
        assert_eq!(store.get_and_delete("b").await.unwrap(), None);
        assert!(store.is_empty(), "expired entries are dropped on access");
    }

    #[tokio::test]
    async fn test_put_replaces_value_and_ttl() {
        let store = MemoryTokenStore::new();
        store.put("k", "old", Duration::from_millis(20)).await.unwrap();
        store.put("k", "new", Duration::from_secs(60)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("new"));
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let store = MemoryTokenStore::new();
        store.put("short", "1", Duration::from_millis(10)).await.unwrap();
        store.put("long", "2", Duration::from_secs(60)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;

        assert_eq!(store.purge_expired(), 1);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_reaper_purges_and_stops_when_dropped() {
        let store = MemoryTokenStore::new();
        store.put("short", "1", Duration::from_millis(10)).await.unwrap();
        let handle = store.spawn_reaper(Duration::from_millis(20));

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(store.is_empty());

        drop(store);
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("reaper exits after the store is dropped")
            .unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_get_and_delete_has_single_winner() {
        let store: Arc<dyn TokenStore> = Arc::new(MemoryTokenStore::new());
        for round in 0..20 {
            let key = format!("auth_code:{round}");
            let winners = count_concurrent_redemptions(Arc::clone(&store), &key, 16)
                .await
                .unwrap();
            assert_eq!(winners, 1, "round {round}");
        }
    }

    /// A store that reads then deletes in two steps.
    struct ReadThenDeleteStore(MemoryTokenStore);

    #[async_trait]
    impl TokenStore for ReadThenDeleteStore {
        async fn put(&self, key: &str, value: &str, ttl: Duration) -> AuthResult<()> {
            self.0.put(key, value, ttl).await
        }
        async fn get(&self, key: &str) -> AuthResult<Option<String>> {
            self.0.get(key).await
        }
        async fn get_and_delete(&self, key: &str) -> AuthResult<Option<String>> {
            let value = self.0.get(key).await?;
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.0.delete(key).await?;
            Ok(value)
        }
        async fn delete(&self, key: &str) -> AuthResult<()> {
            self.0.delete(key).await
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_redemption_check_detects_read_then_delete() {
        let store: Arc<dyn TokenStore> = Arc::new(ReadThenDeleteStore(MemoryTokenStore::new()));
        let winners = count_concurrent_redemptions(store, "csrf:racy", 8)
            .await
            .unwrap();
        assert!(winners > 1, "two-step redemption lets {winners} callers win");
    }

    #[tokio::test]
    async fn test_client_storage_crud() {
        let storage = MemoryClientStorage::new();
        let client = Client::new(Some("App".into()), vec!["https://a.example/cb".into()]);

        storage.create(&client).await.unwrap();
        assert!(storage.create(&client).await.is_err());

        let found = storage
            .find_by_client_id(&client.client_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found, client);
        assert!(storage.find_by_client_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_client_touch() {
        let storage = MemoryClientStorage::new();
        let client = Client::new(None, vec!["https://a.example/cb".into()]);
        storage.create(&client).await.unwrap();

        let now = OffsetDateTime::now_utc();
        storage.touch(&client.client_id, now).await.unwrap();
        storage.touch("missing", now).await.unwrap();

        let found = storage
            .find_by_client_id(&client.client_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.last_used_at, Some(now));
    }

    #[tokio::test]
    async fn test_client_delete_stale() {
        let storage = MemoryClientStorage::new();
        let now = OffsetDateTime::now_utc();

        let mut never_used_old = Client::new(None, vec!["https://a.example/cb".into()]);
        never_used_old.created_at = now - time::Duration::days(100);

        let mut used_recently = Client::new(None, vec!["https://b.example/cb".into()]);
        used_recently.created_at = now - time::Duration::days(300);
        used_recently.last_used_at = Some(now - time::Duration::days(1));

        let mut used_long_ago = Client::new(None, vec!["https://c.example/cb".into()]);
        used_long_ago.created_at = now - time::Duration::days(300);
        used_long_ago.last_used_at = Some(now - time::Duration::days(120));

        let fresh = Client::new(None, vec!["https://d.example/cb".into()]);

        for c in [&never_used_old, &used_recently, &used_long_ago, &fresh] {
            storage.create(c).await.unwrap();
        }

        let removed = storage
            .delete_stale(now - time::Duration::days(90))
            .await
            .unwrap();
        assert_eq!(removed, 2);
        assert_eq!(storage.len(), 2);
        assert!(
            storage
                .find_by_client_id(&used_recently.client_id)
                .await
                .unwrap()
                .is_some()
        );
        assert!(
            storage
                .find_by_client_id(&fresh.client_id)
                .await
                .unwrap()
                .is_some()
        );
    }
}
