//! Error response handling.
//!
//! This module implements `IntoResponse` for `AuthError`, producing the
//! OAuth 2.0 JSON error body (RFC 6749 Section 5.2).

use axum::{
    Json,
    http::{HeaderMap, HeaderValue, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::error::AuthError;

/// Realm advertised in `WWW-Authenticate` challenges.
pub const REALM: &str = "mykb";

/// OAuth 2.0 error response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthErrorBody {
    /// Machine-readable error code.
    pub error: String,
    /// Human-readable description.
    pub error_description: String,
}

impl From<&AuthError> for OAuthErrorBody {
    fn from(error: &AuthError) -> Self {
        Self {
            error: error.oauth_error_code().to_string(),
            error_description: error.public_description(),
        }
    }
}

// =============================================================================
// IntoResponse Implementation
// =============================================================================

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        if self.is_server_error() {
            tracing::error!(error = %self, category = %self.category(), "request failed");
        }

        let status = self.status_code();
        let mut headers = HeaderMap::new();
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
        headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
        if matches!(self, AuthError::InvalidCredentials)
            && let Ok(value) = HeaderValue::from_str(&www_authenticate(None))
        {
            headers.insert(header::WWW_AUTHENTICATE, value);
        }

        (status, headers, Json(OAuthErrorBody::from(&self))).into_response()
    }
}

/// Builds a `WWW-Authenticate` challenge, optionally naming an error.
///
/// Format: `Bearer realm="mykb", error="invalid_token"`
#[must_use]
pub fn www_authenticate(error: Option<&str>) -> String {
    match error {
        Some(error) => format!("Bearer realm=\"{REALM}\", error=\"{error}\""),
        None => format!("Bearer realm=\"{REALM}\""),
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use axum::http::StatusCode;

    async fn body_json(response: Response) -> serde_json::Value {
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_client_error_response() {
        let response = AuthError::invalid_grant("authorization code is invalid or expired")
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(!response.headers().contains_key(header::WWW_AUTHENTICATE));

        let json = body_json(response).await;
        assert_eq!(json["error"], "invalid_grant");
        assert_eq!(
            json["error_description"],
            "Invalid grant: authorization code is invalid or expired"
        );
    }

    #[tokio::test]
    async fn test_invalid_credentials_response() {
        let response = AuthError::InvalidCredentials.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get(header::WWW_AUTHENTICATE).unwrap(),
            "Bearer realm=\"mykb\""
        );
        assert_eq!(body_json(response).await["error"], "invalid_credentials");
    }

    #[tokio::test]
    async fn test_server_error_hides_details() {
        let response = AuthError::storage("redis://10.0.0.5:6379 refused").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let json = body_json(response).await;
        assert_eq!(json["error"], "server_error");
        assert!(!json["error_description"].as_str().unwrap().contains("10.0.0.5"));
    }

    #[test]
    fn test_www_authenticate() {
        assert_eq!(www_authenticate(None), "Bearer realm=\"mykb\"");
        assert_eq!(
            www_authenticate(Some("invalid_token")),
            "Bearer realm=\"mykb\", error=\"invalid_token\""
        );
    }
}
