//! PostgreSQL storage backend for MyKB Auth
//!
//! Provides durable storage for dynamically registered OAuth clients. The
//! ephemeral token store (CSRF tokens, authorization codes, access and
//! refresh tokens) is not kept here.
//!
//! # Example
//!
//! ```ignore
//! use mykb_auth_postgres::PostgresClientStorage;
//!
//! let storage = PostgresClientStorage::connect("postgres://localhost/mykb", 10, timeout).await?;
//! storage.migrate().await?;
//!
//! let state = OAuthState::new(&auth, base_url, Arc::new(storage), tokens, proxy)?;
//! ```

pub mod client;

use sqlx_core::pool::Pool;
use sqlx_postgres::Postgres;

use mykb_auth::AuthError;

pub type PgPool = Pool<Postgres>;

pub use client::{ClientRow, ClientTable, PostgresClientStorage};

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("postgres: {0}")]
    Database(#[from] sqlx_core::Error),

    /// `redirect_uris` column could not be encoded or decoded.
    #[error("redirect_uris column: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Rejected before reaching the database, or a constraint violation.
    #[error("rejected client row: {0}")]
    InvalidInput(String),
}

impl StorageError {
    #[must_use]
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    #[must_use]
    pub fn is_database_error(&self) -> bool {
        matches!(self, Self::Database(_))
    }

    #[must_use]
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Self::InvalidInput(_))
    }
}

impl From<StorageError> for AuthError {
    fn from(error: StorageError) -> Self {
        AuthError::storage(error.to_string())
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_invalid_input() {
        let err = StorageError::invalid_input("client already exists");
        assert!(err.is_invalid_input());
        assert!(!err.is_database_error());
        assert_eq!(err.to_string(), "rejected client row: client already exists");
    }

    #[test]
    fn test_storage_error_serialization() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let err = StorageError::from(json_err);
        assert!(matches!(err, StorageError::Serialization(_)));
    }

    #[test]
    fn test_storage_error_into_auth_error() {
        let auth: AuthError = StorageError::invalid_input("bad row").into();
        assert!(auth.is_server_error());
        assert_eq!(auth.oauth_error_code(), "server_error");
    }
}
