//! Bearer token authentication extractor.
//!
//! Protected resources verify the access token with a single read-only
//! lookup in the ephemeral token store.
//!
//! # Example
//!
//! ```ignore
//! use axum::{Router, routing::post};
//! use mykb_auth::middleware::{BearerState, BearerToken};
//!
//! async fn mcp(BearerToken(grant): BearerToken) -> String {
//!     format!("hello, {}", grant.client_id)
//! }
//!
//! let app = Router::new()
//!     .route("/mcp", post(mcp))
//!     .with_state(bearer_state);
//! ```

use axum::{
    Json,
    extract::{FromRef, FromRequestParts},
    http::{HeaderValue, StatusCode, header, request::Parts},
    response::{IntoResponse, Response},
};

use crate::error::AuthError;
use crate::http::client_ip::{ClientIp, ProxyMode};
use crate::storage::EphemeralTokens;
use crate::types::TokenGrant;

use super::error::{OAuthErrorBody, www_authenticate};

// =============================================================================
// Bearer State
// =============================================================================

/// State required for bearer token authentication.
///
/// Make it available to [`BearerToken`] via `FromRef`.
#[derive(Clone)]
pub struct BearerState {
    /// Store holding issued access tokens.
    pub tokens: EphemeralTokens,
    /// How to resolve the caller address for failure logs.
    pub proxy: ProxyMode,
}

impl BearerState {
    /// Creates a new bearer state.
    pub fn new(tokens: EphemeralTokens, proxy: ProxyMode) -> Self {
        Self { tokens, proxy }
    }
}

// =============================================================================
// Bearer Token Extractor
// =============================================================================

/// Axum extractor that validates `Authorization: Bearer <token>`.
///
/// The scheme name is matched case-insensitively. On success the handler
/// receives the grant the access token is bound to.
#[derive(Debug, Clone)]
pub struct BearerToken(pub TokenGrant);

impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
    BearerState: FromRef<S>,
{
    type Rejection = BearerRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let bearer = BearerState::from_ref(state);

        let Some(token) = bearer_token(parts) else {
            tracing::warn!(
                client_ip = %ClientIp::resolve(parts, bearer.proxy),
                path = %parts.uri.path(),
                "AUTH FAILED: missing bearer token"
            );
            return Err(BearerRejection::Missing);
        };

        match bearer.tokens.verify_access_token(token).await {
            Ok(Some(grant)) => Ok(Self(grant)),
            Ok(None) => {
                tracing::warn!(
                    client_ip = %ClientIp::resolve(parts, bearer.proxy),
                    path = %parts.uri.path(),
                    "AUTH FAILED: invalid or expired access token"
                );
                Err(BearerRejection::InvalidToken)
            }
            Err(e) => Err(BearerRejection::Store(e)),
        }
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

// =============================================================================
// Rejection
// =============================================================================

/// Why a request was refused by [`BearerToken`].
#[derive(Debug)]
pub enum BearerRejection {
    /// No usable `Authorization: Bearer` header.
    Missing,
    /// A token was presented but is unknown or expired.
    InvalidToken,
    /// The token store could not be reached.
    Store(AuthError),
}

impl IntoResponse for BearerRejection {
    fn into_response(self) -> Response {
        let (challenge, body) = match self {
            Self::Missing => (
                www_authenticate(None),
                OAuthErrorBody {
                    error: "invalid_request".to_string(),
                    error_description: "Missing bearer token".to_string(),
                },
            ),
            Self::InvalidToken => (
                www_authenticate(Some("invalid_token")),
                OAuthErrorBody {
                    error: "invalid_token".to_string(),
                    error_description: "Invalid or expired access token".to_string(),
                },
            ),
            Self::Store(e) => return e.into_response(),
        };

        let mut response = (StatusCode::UNAUTHORIZED, Json(body)).into_response();
        if let Ok(value) = HeaderValue::from_str(&challenge) {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, value);
        }
        response
    }
}

// =============================================================================
// Tests
// =============================================================================
