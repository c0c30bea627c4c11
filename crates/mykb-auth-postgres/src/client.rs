//! OAuth client storage.
//!
//! Registered clients live in the `oauth_clients` table. Redirect URIs are
//! kept as a JSONB array.
//!
//! This module provides two layers:
//! - [`ClientTable`] - Low-level queries on `ClientRow`
//! - [`PostgresClientStorage`] - Implements the `ClientStorage` trait from `mykb-auth`

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sqlx_core::pool::PoolOptions;
use sqlx_core::query::query;
use sqlx_core::query_as::query_as;
use sqlx_postgres::Postgres;
use time::OffsetDateTime;
use tracing::{info, instrument};

use mykb_auth::storage::ClientStorage;
use mykb_auth::types::Client;
use mykb_auth::AuthResult;

use crate::{PgPool, StorageError, StorageResult};

// =============================================================================
// Types
// =============================================================================

type ClientTuple = (
    String,
    Option<String>,
    serde_json::Value,
    OffsetDateTime,
    Option<OffsetDateTime>,
);

/// Client record from database.
#[derive(Debug, Clone)]
pub struct ClientRow {
    pub client_id: String,
    pub client_name: Option<String>,
    /// JSONB array of redirect URIs.
    pub redirect_uris: serde_json::Value,
    pub created_at: OffsetDateTime,
    pub last_used_at: Option<OffsetDateTime>,
}

impl ClientRow {
    fn from_tuple(row: ClientTuple) -> Self {
        Self {
            client_id: row.0,
            client_name: row.1,
            redirect_uris: row.2,
            created_at: row.3,
            last_used_at: row.4,
        }
    }

    /// Convert the row into the domain client.
    ///
    /// # Errors
    ///
    /// Returns an error if `redirect_uris` is not an array of strings.
    pub fn into_client(self) -> StorageResult<Client> {
        let redirect_uris: Vec<String> = serde_json::from_value(self.redirect_uris)?;
        Ok(Client {
            client_id: self.client_id,
            client_name: self.client_name,
            redirect_uris,
            created_at: self.created_at,
            last_used_at: self.last_used_at,
        })
    }
}

// =============================================================================
// Client Table
// =============================================================================

/// Query operations on the `oauth_clients` table.
pub struct ClientTable<'a> {
    pool: &'a PgPool,
}

impl<'a> ClientTable<'a> {
    /// Create a new client table handle with a connection pool reference.
    #[must_use]
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Create the `oauth_clients` table and its activity index.
    ///
    /// # Errors
    ///
    /// Returns an error if the DDL statements fail.
    #[instrument(skip(self))]
    pub async fn create_table_if_not_exists(&self) -> StorageResult<()> {
        query(
            r#"
            CREATE TABLE IF NOT EXISTS oauth_clients (
                client_id TEXT PRIMARY KEY,
                client_name TEXT NULL,
                redirect_uris JSONB NOT NULL,
                created_at TIMESTAMPTZ NOT NULL,
                last_used_at TIMESTAMPTZ NULL
            )
            "#,
        )
        .execute(self.pool)
        .await?;

        // Stale-client sweeps filter on last activity
        query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_oauth_clients_last_activity
            ON oauth_clients ((COALESCE(last_used_at, created_at)))
            "#,
        )
        .execute(self.pool)
        .await?;

        info!("oauth_clients table ready");

        Ok(())
    }

    /// Insert a new client.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The database insert fails
    /// - A client with the same ID already exists
    pub async fn insert(&self, client: &Client) -> StorageResult<()> {
        let redirect_uris = serde_json::to_value(&client.redirect_uris)?;

        query(
            r#"
            INSERT INTO oauth_clients (client_id, client_name, redirect_uris, created_at, last_used_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(&client.client_id)
        .bind(&client.client_name)
        .bind(&redirect_uris)
        .bind(client.created_at)
        .bind(client.last_used_at)
        .execute(self.pool)
        .await
        .map_err(|e| {
            if let sqlx_core::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return StorageError::invalid_input(format!(
                    "client '{}' already exists",
                    client.client_id
                ));
            }
            StorageError::from(e)
        })?;

        Ok(())
    }

    /// Find a client by its OAuth client_id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_client_id(&self, client_id: &str) -> StorageResult<Option<ClientRow>> {
        let row: Option<ClientTuple> = query_as(
            r#"
            SELECT client_id, client_name, redirect_uris, created_at, last_used_at
            FROM oauth_clients
            WHERE client_id = $1
            "#,
        )
        .bind(client_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(ClientRow::from_tuple))
    }

    /// Set `last_used_at`. Unknown client ids are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the database update fails.
    pub async fn touch(&self, client_id: &str, used_at: OffsetDateTime) -> StorageResult<()> {
        query("UPDATE oauth_clients SET last_used_at = $2 WHERE client_id = $1")
            .bind(client_id)
            .bind(used_at)
            .execute(self.pool)
            .await?;

        Ok(())
    }

    /// Delete clients whose last activity is older than `cutoff`.
    ///
    /// Returns the number of deleted rows.
    ///
    /// # Errors
    ///
    /// Returns an error if the database delete fails.
    pub async fn delete_stale(&self, cutoff: OffsetDateTime) -> StorageResult<u64> {
        let result =
            query("DELETE FROM oauth_clients WHERE COALESCE(last_used_at, created_at) < $1")
                .bind(cutoff)
                .execute(self.pool)
                .await?;

        Ok(result.rows_affected())
    }
}

// =============================================================================
// PostgreSQL Client Storage
// =============================================================================

/// PostgreSQL implementation of [`ClientStorage`].
///
/// Owns an `Arc<PgPool>` so it can be shared as `Arc<dyn ClientStorage>`.
#[derive(Debug, Clone)]
pub struct PostgresClientStorage {
    pool: Arc<PgPool>,
}

impl PostgresClientStorage {
    /// Create new storage with an existing connection pool.
    #[must_use]
    pub fn from_pool(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// Create new storage by connecting to the database.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection fails.
    pub async fn connect(
        database_url: &str,
        max_connections: u32,
        connect_timeout: Duration,
    ) -> StorageResult<Self> {
        let pool = PoolOptions::<Postgres>::new()
            .max_connections(max_connections)
            .acquire_timeout(connect_timeout)
            .connect(database_url)
            .await?;
        Ok(Self::from_pool(Arc::new(pool)))
    }

    /// Get a reference to the connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Bootstrap the schema. Safe to call on every startup.
    ///
    /// # Errors
    ///
    /// Returns an error if the DDL statements fail.
    pub async fn migrate(&self) -> StorageResult<()> {
        ClientTable::new(&self.pool).create_table_if_not_exists().await
    }

    fn table(&self) -> ClientTable<'_> {
        ClientTable::new(&self.pool)
    }
}

#[async_trait]
impl ClientStorage for PostgresClientStorage {
    async fn create(&self, client: &Client) -> AuthResult<()> {
        self.table().insert(client).await?;
        Ok(())
    }

    async fn find_by_client_id(&self, client_id: &str) -> AuthResult<Option<Client>> {
        match self.table().find_by_client_id(client_id).await? {
            Some(row) => Ok(Some(row.into_client()?)),
            None => Ok(None),
        }
    }

    async fn touch(&self, client_id: &str, used_at: OffsetDateTime) -> AuthResult<()> {
        self.table().touch(client_id, used_at).await?;
        Ok(())
    }

    async fn delete_stale(&self, cutoff: OffsetDateTime) -> AuthResult<u64> {
        Ok(self.table().delete_stale(cutoff).await?)
    }
}
