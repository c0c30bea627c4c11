//! OAuth 2.0 token endpoint handler.
//!
//! # Example
//!
//! ```ignore
//! // Authorization code grant
//! POST /token
//! Content-Type: application/x-www-form-urlencoded
//!
//! grant_type=authorization_code
//! &code=SplxlOBeZQQYbYS6WxSbIA
//! &redirect_uri=http://localhost/cb
//! &code_verifier=dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk
//! &client_id=5b0f6f1e-7d4c-4a8e-9d59-7f3a1c1b2e10
//!
//! // Refresh token grant
//! POST /token
//! Content-Type: application/x-www-form-urlencoded
//!
//! grant_type=refresh_token
//! &refresh_token=tGzv3JOkF0XG5Qx2TlKWIA
//! ```

use axum::{
    Form, Json,
    extract::{State, rejection::FormRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};

use crate::oauth::token::{TokenRequest, TokenResponse};

use super::{ClientIp, OAuthState, log_rejection};

/// Handler for `POST /token` with an `application/x-www-form-urlencoded`
/// body.
///
/// A body that cannot be parsed is treated as a request without
/// parameters and fails with `missing_parameter`.
pub async fn token_handler(
    State(state): State<OAuthState>,
    client_ip: ClientIp,
    form: Result<Form<TokenRequest>, FormRejection>,
) -> Response {
    let request = match form {
        Ok(Form(request)) => request,
        Err(rejection) => {
            tracing::debug!(error = %rejection, "unparseable token request");
            TokenRequest::default()
        }
    };

    match state.exchange.exchange(request).await {
        Ok(response) => token_success_response(response),
        Err(e) => {
            log_rejection("token", &client_ip, &e);
            e.into_response()
        }
    }
}

/// Build a successful token response.
fn token_success_response(response: TokenResponse) -> Response {
    (
        StatusCode::OK,
        [
            (header::CACHE_CONTROL, "no-store"),
            (header::PRAGMA, "no-cache"),
        ],
        Json(response),
    )
        .into_response()
}
