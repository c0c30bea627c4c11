//! HTTP handlers for the OAuth endpoints.
//!
//! | Route | Handler |
//! |---|---|
//! | `GET /.well-known/oauth-authorization-server[/<resource>]` | [`discovery::authorization_server_metadata`] |
//! | `GET /.well-known/oauth-protected-resource[/<resource>]` | [`discovery::protected_resource_metadata`] |
//! | `POST /register` | [`register::register_handler`] |
//! | `GET /authorize` | [`authorize::authorize_get`] |
//! | `POST /authorize` | [`authorize::authorize_post`] |
//! | `POST /token` | [`token::token_handler`] |

pub mod authorize;
pub mod client_ip;
pub mod discovery;
pub mod register;
pub mod templates;
pub mod token;

use std::sync::Arc;

use axum::{
    Router,
    extract::FromRef,
    routing::{get, post},
};

use crate::config::{AuthConfig, ConfigError};
use crate::credentials::OperatorCredentials;
use crate::error::{AuthError, ErrorCategory};
use crate::metadata::MetadataPublisher;
use crate::middleware::BearerState;
use crate::oauth::{AuthorizationSessionManager, TokenExchange};
use crate::registry::ClientRegistry;
use crate::storage::{ClientStorage, EphemeralTokens, TokenStore};

pub use client_ip::{ClientIp, ProxyMode};

/// Well-known path of the authorization server metadata document.
pub const AUTHORIZATION_SERVER_METADATA_PATH: &str = "/.well-known/oauth-authorization-server";

/// Well-known path of the protected resource metadata document.
pub const PROTECTED_RESOURCE_METADATA_PATH: &str = "/.well-known/oauth-protected-resource";

/// Shared state of the OAuth endpoints.
#[derive(Clone)]
pub struct OAuthState {
    /// Client registry.
    pub registry: ClientRegistry,
    /// `/authorize` orchestration.
    pub sessions: AuthorizationSessionManager,
    /// `/token` orchestration.
    pub exchange: TokenExchange,
    /// Discovery documents.
    pub metadata: MetadataPublisher,
    /// Ephemeral credential store.
    pub tokens: EphemeralTokens,
    /// How to resolve caller addresses.
    pub proxy: ProxyMode,
}

impl OAuthState {
    /// Wires every component from configuration and injected stores.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the auth configuration is invalid.
    pub fn new(
        config: &AuthConfig,
        base_url: &str,
        client_storage: Arc<dyn ClientStorage>,
        token_store: Arc<dyn TokenStore>,
        proxy: ProxyMode,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let credentials = OperatorCredentials::from_config(config)?;

        let registry = ClientRegistry::new(client_storage, config.registration.client_max_age);
        let tokens = EphemeralTokens::new(token_store, config.oauth.clone());

        Ok(Self {
            sessions: AuthorizationSessionManager::new(
                registry.clone(),
                tokens.clone(),
                credentials,
            ),
            exchange: TokenExchange::new(registry.clone(), tokens.clone()),
            metadata: MetadataPublisher::new(base_url, config.resource_path.clone()),
            registry,
            tokens,
            proxy,
        })
    }

    /// State for [`BearerToken`](crate::middleware::BearerToken) guards on
    /// protected resources.
    #[must_use]
    pub fn bearer_state(&self) -> BearerState {
        BearerState::new(self.tokens.clone(), self.proxy)
    }
}

impl FromRef<OAuthState> for ProxyMode {
    fn from_ref(state: &OAuthState) -> Self {
        state.proxy
    }
}

impl FromRef<OAuthState> for BearerState {
    fn from_ref(state: &OAuthState) -> Self {
        state.bearer_state()
    }
}

/// Builds the router serving every OAuth endpoint.
pub fn oauth_router(state: OAuthState) -> Router {
    let resource_path = state.metadata.resource_path().to_string();

    Router::new()
        .route(
            AUTHORIZATION_SERVER_METADATA_PATH,
            get(discovery::authorization_server_metadata),
        )
        .route(
            &format!("{AUTHORIZATION_SERVER_METADATA_PATH}{resource_path}"),
            get(discovery::authorization_server_metadata),
        )
        .route(
            PROTECTED_RESOURCE_METADATA_PATH,
            get(discovery::protected_resource_metadata),
        )
        .route(
            &format!("{PROTECTED_RESOURCE_METADATA_PATH}{resource_path}"),
            get(discovery::protected_resource_metadata),
        )
        .route("/register", post(register::register_handler))
        .route(
            "/authorize",
            get(authorize::authorize_get).post(authorize::authorize_post),
        )
        .route("/token", post(token::token_handler))
        .with_state(state)
}

/// Logs a rejected request. Authentication and grant failures are security
/// events and log at `warn` with the `AUTH FAILED` prefix.
pub(crate) fn log_rejection(endpoint: &'static str, client_ip: &ClientIp, error: &AuthError) {
    match error.category() {
        ErrorCategory::Authentication | ErrorCategory::Grant => tracing::warn!(
            endpoint,
            client_ip = %client_ip,
            reason = error.oauth_error_code(),
            detail = %error,
            "AUTH FAILED"
        ),
        ErrorCategory::Infrastructure | ErrorCategory::Internal => {}
        _ => tracing::debug!(
            endpoint,
            client_ip = %client_ip,
            reason = error.oauth_error_code(),
            detail = %error,
            "request rejected"
        ),
    }
}
