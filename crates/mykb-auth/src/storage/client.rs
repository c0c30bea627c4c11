//! Client storage trait.
//!
//! Defines the interface for OAuth client persistence operations.
//! Implementations are provided by storage backends (in-memory here,
//! PostgreSQL in `mykb-auth-postgres`).

use async_trait::async_trait;
use time::OffsetDateTime;

use crate::AuthResult;
use crate::types::Client;

/// Storage operations for registered OAuth clients.
///
/// Every operation touches a single record, so implementations only need
/// single-row atomicity.
#[async_trait]
pub trait ClientStorage: Send + Sync {
    /// Persist a newly registered client.
    ///
    /// # Errors
    ///
    /// Returns an error if a client with the same `client_id` already exists
    /// or the storage operation fails.
    async fn create(&self, client: &Client) -> AuthResult<()>;

    /// Find a client by its OAuth client_id.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_client_id(&self, client_id: &str) -> AuthResult<Option<Client>>;

    /// Set `last_used_at` for a client. Does nothing if the client is absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn touch(&self, client_id: &str, used_at: OffsetDateTime) -> AuthResult<()>;

    /// Delete every client whose last activity (`last_used_at`, or
    /// `created_at` if never used) is older than `cutoff`.
    ///
    /// Returns the number of deleted clients.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn delete_stale(&self, cutoff: OffsetDateTime) -> AuthResult<u64>;
}
