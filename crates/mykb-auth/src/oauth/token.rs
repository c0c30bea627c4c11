//! Token endpoint types and the token exchange engine.
//!
//! # Supported Grant Types
//!
//! - `authorization_code` - Redeem a single-use code with its PKCE verifier
//! - `refresh_token` - Rotate a refresh token into a fresh token pair

use serde::{Deserialize, Serialize};

use crate::pkce::{PkceChallenge, PkceChallengeMethod, PkceVerifier};
use crate::registry::ClientRegistry;
use crate::storage::{EphemeralTokens, IssuedTokens};
use crate::types::GrantType;
use crate::{AuthError, AuthResult};

/// Token request parameters (`POST /token` form body).
///
/// Different fields are required depending on the `grant_type`:
///
/// - `authorization_code`: code, redirect_uri, code_verifier, client_id
/// - `refresh_token`: refresh_token, (optional) client_id
#[derive(Clone, Default, Deserialize)]
pub struct TokenRequest {
    /// OAuth 2.0 grant type.
    pub grant_type: Option<String>,

    /// Authorization code (for authorization_code grant).
    #[serde(default)]
    pub code: Option<String>,

    /// Redirect URI (must match authorization request).
    #[serde(default)]
    pub redirect_uri: Option<String>,

    /// PKCE code verifier (for authorization_code grant).
    #[serde(default)]
    pub code_verifier: Option<String>,

    /// Client ID. Required for authorization_code, checked when present for
    /// refresh_token.
    #[serde(default)]
    pub client_id: Option<String>,

    /// Refresh token (for refresh_token grant).
    #[serde(default)]
    pub refresh_token: Option<String>,
}

impl std::fmt::Debug for TokenRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenRequest")
            .field("grant_type", &self.grant_type)
            .field("redirect_uri", &self.redirect_uri)
            .field("client_id", &self.client_id)
            .finish_non_exhaustive()
    }
}

/// Successful token response.
///
/// # Example Response
///
/// ```json
/// {
///   "access_token": "mF_9.B5f-4.1JqM...",
///   "token_type": "Bearer",
///   "expires_in": 3600,
///   "refresh_token": "tGzv3JOkF0XG5Qx2TlKWIA..."
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    /// Opaque access token.
    pub access_token: String,

    /// Token type, always "Bearer".
    pub token_type: String,

    /// Access token lifetime in seconds.
    pub expires_in: u64,

    /// Opaque refresh token. The previous one, if any, is now invalid.
    pub refresh_token: String,
}

impl From<IssuedTokens> for TokenResponse {
    fn from(issued: IssuedTokens) -> Self {
        Self {
            access_token: issued.access_token,
            token_type: "Bearer".to_string(),
            expires_in: issued.expires_in.as_secs(),
            refresh_token: issued.refresh_token,
        }
    }
}

/// Redeems authorization codes and rotates refresh tokens.
#[derive(Clone)]
pub struct TokenExchange {
    clients: ClientRegistry,
    tokens: EphemeralTokens,
}

impl TokenExchange {
    /// Creates the engine.
    pub fn new(clients: ClientRegistry, tokens: EphemeralTokens) -> Self {
        Self { clients, tokens }
    }

    /// Dispatches on `grant_type`.
    ///
    /// # Errors
    ///
    /// `missing_parameter`, `unsupported_grant_type`, `invalid_grant`, or a
    /// storage error.
    pub async fn exchange(&self, request: TokenRequest) -> AuthResult<TokenResponse> {
        let grant_type = required(request.grant_type.clone(), "grant_type")?;
        match GrantType::parse(&grant_type) {
            Some(GrantType::AuthorizationCode) => self.authorization_code(request).await,
            Some(GrantType::RefreshToken) => self.refresh_token(request).await,
            None => Err(AuthError::unsupported_grant_type(grant_type)),
        }
    }

    async fn authorization_code(&self, request: TokenRequest) -> AuthResult<TokenResponse> {
        let code = required(request.code, "code")?;
        let redirect_uri = required(request.redirect_uri, "redirect_uri")?;
        let code_verifier = required(request.code_verifier, "code_verifier")?;
        let client_id = required(request.client_id, "client_id")?;

        let grant = self
            .tokens
            .redeem_authorization_code(&code)
            .await?
            .ok_or_else(|| AuthError::invalid_grant("authorization code is invalid or expired"))?;

        if grant.client_id != client_id {
            return Err(AuthError::invalid_grant("client_id mismatch"));
        }
        if grant.redirect_uri != redirect_uri {
            return Err(AuthError::invalid_grant("redirect_uri mismatch"));
        }

        PkceChallengeMethod::parse(&grant.code_challenge_method)
            .map_err(|e| AuthError::invalid_grant(e.to_string()))?;
        let verifier = PkceVerifier::new(code_verifier)
            .map_err(|e| AuthError::invalid_grant(e.to_string()))?;
        PkceChallenge::from_stored(grant.code_challenge)
            .verify(&verifier)
            .map_err(|_| AuthError::invalid_grant("PKCE verification failed"))?;

        self.issue(&client_id, GrantType::AuthorizationCode).await
    }

    async fn refresh_token(&self, request: TokenRequest) -> AuthResult<TokenResponse> {
        let refresh_token = required(request.refresh_token, "refresh_token")?;

        // Removal happens here, before any further check.
        let grant = self
            .tokens
            .rotate_refresh_token(&refresh_token)
            .await?
            .ok_or_else(|| AuthError::invalid_grant("refresh token is invalid or expired"))?;

        if let Some(client_id) = optional(request.client_id) {
            if client_id != grant.client_id {
                return Err(AuthError::invalid_grant("client_id mismatch"));
            }
        }

        self.issue(&grant.client_id, GrantType::RefreshToken).await
    }

    async fn issue(&self, client_id: &str, grant_type: GrantType) -> AuthResult<TokenResponse> {
        let issued = self.tokens.issue_token_pair(client_id).await?;

        if let Err(e) = self.clients.touch(client_id).await {
            tracing::warn!(client_id = %client_id, error = %e, "failed to update client last_used_at");
        }

        tracing::info!(client_id = %client_id, grant_type = %grant_type, "tokens issued");
        Ok(issued.into())
    }
}

fn optional(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn required(value: Option<String>, name: &str) -> AuthResult<String> {
    optional(value).ok_or_else(|| AuthError::missing_parameter(name))
}
