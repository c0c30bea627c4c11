//! # mykb-auth
//!
//! OAuth 2.0 authorization server for the MyKB knowledge base.
//!
//! This crate provides:
//! - Authorization code grant with mandatory PKCE (`S256`)
//! - Dynamic client registration with idle-client garbage collection
//! - CSRF-protected consent behind a single operator password
//! - Opaque, rotating access and refresh tokens in a TTL store
//! - A bearer-token guard for the protected resource
//!
//! ## Modules
//!
//! - [`config`] - Immutable auth configuration
//! - [`credentials`] - Operator password verification
//! - [`pkce`] - PKCE verifier and challenge
//! - [`token`] - Opaque token minting and storage keys
//! - [`storage`] - Token store and client storage traits, in-memory backends
//! - [`registry`] - Client registry
//! - [`oauth`] - Authorization and token exchange flows
//! - [`metadata`] - Discovery documents
//! - [`middleware`] - Bearer token extractor and error responses
//! - [`http`] - Axum HTTP handlers for OAuth endpoints

pub mod config;
pub mod credentials;
pub mod error;
pub mod http;
pub mod metadata;
pub mod middleware;
pub mod oauth;
pub mod pkce;
pub mod registry;
pub mod storage;
pub mod token;
pub mod types;

pub use config::{AuthConfig, ConfigError, OAuthConfig, RegistrationConfig};
pub use credentials::OperatorCredentials;
pub use error::{AuthError, ErrorCategory};
pub use http::{ClientIp, OAuthState, ProxyMode, oauth_router};
pub use metadata::MetadataPublisher;
pub use middleware::{BearerState, BearerToken};
pub use registry::ClientRegistry;
pub use storage::{
    ClientStorage, EphemeralTokens, MemoryClientStorage, MemoryTokenStore, TokenStore,
};
pub use types::{AuthorizationCodeGrant, Client, ClientValidationError, GrantType, TokenGrant};

/// Type alias for authentication/authorization results.
pub type AuthResult<T> = Result<T, AuthError>;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use mykb_auth::prelude::*;
/// ```
pub mod prelude {
    pub use crate::AuthResult;
    pub use crate::config::{AuthConfig, ConfigError};
    pub use crate::error::{AuthError, ErrorCategory};
    pub use crate::http::{OAuthState, ProxyMode, oauth_router};
    pub use crate::middleware::{BearerState, BearerToken};
    pub use crate::storage::{ClientStorage, TokenStore};
    pub use crate::types::{Client, TokenGrant};
}
