//! Dynamic client registration handler.
//!
//! ```ignore
//! POST /register
//! Content-Type: application/json
//!
//! {"client_name": "Claude", "redirect_uris": ["http://localhost:6274/callback"]}
//!
//! HTTP/1.1 201 Created
//! {"client_id": "…", "client_name": "Claude", "redirect_uris": [...], ...}
//! ```

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::oauth::registration::{ClientRegistrationRequest, ClientRegistrationResponse};

use super::{ClientIp, OAuthState, log_rejection};

/// Handler for `POST /register`.
///
/// A body that is not valid JSON is treated as a request without redirect
/// URIs.
pub async fn register_handler(
    State(state): State<OAuthState>,
    client_ip: ClientIp,
    body: Result<Json<ClientRegistrationRequest>, JsonRejection>,
) -> Response {
    let request = match body {
        Ok(Json(request)) => request,
        Err(rejection) => {
            tracing::debug!(error = %rejection, "unparseable registration request");
            ClientRegistrationRequest::default()
        }
    };

    match state
        .registry
        .register(request.client_name, request.redirect_uris)
        .await
    {
        Ok(client) => (
            StatusCode::CREATED,
            Json(ClientRegistrationResponse::from(client)),
        )
            .into_response(),
        Err(e) => {
            log_rejection("register", &client_ip, &e);
            e.into_response()
        }
    }
}
