//! Discovery HTTP handlers.

use axum::Json;
use axum::extract::State;
use axum::response::IntoResponse;

use super::OAuthState;

/// Handler for `GET /.well-known/oauth-authorization-server`.
///
/// # Example
///
/// ```text
/// GET /.well-known/oauth-authorization-server HTTP/1.1
///
/// HTTP/1.1 200 OK
/// Content-Type: application/json
///
/// {
///   "issuer": "https://kb.example.com",
///   "authorization_endpoint": "https://kb.example.com/authorize",
///   "token_endpoint": "https://kb.example.com/token",
///   "registration_endpoint": "https://kb.example.com/register",
///   ...
/// }
/// ```
pub async fn authorization_server_metadata(State(state): State<OAuthState>) -> impl IntoResponse {
    Json(state.metadata.authorization_server())
}

/// Handler for `GET /.well-known/oauth-protected-resource`.
pub async fn protected_resource_metadata(State(state): State<OAuthState>) -> impl IntoResponse {
    Json(state.metadata.protected_resource())
}
