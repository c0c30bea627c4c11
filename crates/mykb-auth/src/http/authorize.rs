//! Authorization endpoint handlers.
//!
//! - `GET /authorize` validates the request and renders the consent form
//! - `POST /authorize` checks CSRF token and password, then redirects back
//!   to the client with `code` and `state`
//!
//! Errors are rendered as HTML pages because the caller is a browser.

use axum::{
    Form,
    extract::{Query, State, rejection::FormRejection, rejection::QueryRejection},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
};

use crate::error::AuthError;
use crate::oauth::authorize::{AuthorizationRequest, ConsentSubmission};

use super::templates::{render_consent_form, render_error_page};
use super::{ClientIp, OAuthState, log_rejection};

/// Handler for `GET /authorize`.
pub async fn authorize_get(
    State(state): State<OAuthState>,
    client_ip: ClientIp,
    query: Result<Query<AuthorizationRequest>, QueryRejection>,
) -> Response {
    let request = match query {
        Ok(Query(request)) => request,
        Err(rejection) => {
            tracing::debug!(error = %rejection, "unparseable authorization request");
            AuthorizationRequest::default()
        }
    };

    match state.sessions.begin(request).await {
        Ok(page) => (
            [(header::CACHE_CONTROL, "no-store")],
            Html(render_consent_form(&page)),
        )
            .into_response(),
        Err(e) => {
            log_rejection("authorize", &client_ip, &e);
            error_page(&e)
        }
    }
}

/// Handler for `POST /authorize`.
///
/// Responds with `302 Found` to the registered redirect URI.
pub async fn authorize_post(
    State(state): State<OAuthState>,
    client_ip: ClientIp,
    form: Result<Form<ConsentSubmission>, FormRejection>,
) -> Response {
    let submission = match form {
        Ok(Form(submission)) => submission,
        Err(rejection) => {
            tracing::debug!(error = %rejection, "unparseable consent submission");
            ConsentSubmission::default()
        }
    };

    let result = state.sessions.complete(submission).await.and_then(|response| {
        response
            .to_redirect_url()
            .map_err(|e| AuthError::internal(format!("unusable redirect_uri: {e}")))
    });

    match result {
        Ok(location) => (
            StatusCode::FOUND,
            [
                (header::LOCATION, location),
                (header::CACHE_CONTROL, "no-store".to_string()),
            ],
        )
            .into_response(),
        Err(e) => {
            log_rejection("authorize", &client_ip, &e);
            error_page(&e)
        }
    }
}

fn error_page(error: &AuthError) -> Response {
    if error.is_server_error() {
        tracing::error!(error = %error, "authorization request failed");
    }
    (
        error.status_code(),
        [(header::CACHE_CONTROL, "no-store")],
        Html(render_error_page(
            error.oauth_error_code(),
            &error.public_description(),
        )),
    )
        .into_response()
}
