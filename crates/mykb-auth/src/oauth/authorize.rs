//! Authorization endpoint: consent rendering and consent submission.
//!
//! The authorization code flow runs in two steps that share no server-side
//! session. [`AuthorizationSessionManager::begin`] validates the request and
//! mints a CSRF token; every validated parameter travels to the browser as
//! a hidden form field and comes back in the [`ConsentSubmission`], which
//! [`AuthorizationSessionManager::complete`] checks before minting a code.
//!
//! 1. Client redirects the operator to `GET /authorize`
//! 2. Operator enters the shared password on the consent page
//! 3. `POST /authorize` redirects back with `code` and `state`
//! 4. Client exchanges the code at the token endpoint

use serde::{Deserialize, Serialize};

use crate::credentials::OperatorCredentials;
use crate::pkce::PkceChallengeMethod;
use crate::registry::ClientRegistry;
use crate::storage::EphemeralTokens;
use crate::types::{AuthorizationCodeGrant, Client};
use crate::{AuthError, AuthResult};

/// The only supported `response_type`.
pub const RESPONSE_TYPE_CODE: &str = "code";

/// Authorization request parameters (`GET /authorize` query string).
///
/// Every field is optional at the parsing stage so that missing values
/// are reported as `missing_parameter` rather than as a framework
/// rejection.
///
/// # Example
///
/// ```ignore
/// GET /authorize?
///   response_type=code
///   &client_id=5b0f6f1e-7d4c-4a8e-9d59-7f3a1c1b2e10
///   &redirect_uri=http://localhost:3000/callback
///   &state=abc123xyz
///   &code_challenge=E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM
///   &code_challenge_method=S256
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthorizationRequest {
    /// Client identifier issued during registration.
    pub client_id: Option<String>,
    /// Must exactly match one of the registered redirect URIs.
    pub redirect_uri: Option<String>,
    /// Must be `code`.
    pub response_type: Option<String>,
    /// PKCE code challenge.
    pub code_challenge: Option<String>,
    /// PKCE method. Defaults to `S256`.
    pub code_challenge_method: Option<String>,
    /// Opaque client state, echoed back on the redirect.
    pub state: Option<String>,
}

/// Consent form submission (`POST /authorize` form body).
#[derive(Clone, Default, Deserialize)]
pub struct ConsentSubmission {
    /// CSRF token from the rendered consent page.
    pub csrf_token: Option<String>,
    /// Client identifier.
    pub client_id: Option<String>,
    /// Redirect URI.
    pub redirect_uri: Option<String>,
    /// Echoed `response_type`. Ignored when absent.
    pub response_type: Option<String>,
    /// PKCE code challenge.
    pub code_challenge: Option<String>,
    /// PKCE method. Defaults to `S256`.
    pub code_challenge_method: Option<String>,
    /// Opaque client state.
    pub state: Option<String>,
    /// Operator password.
    pub password: Option<String>,
}

impl std::fmt::Debug for ConsentSubmission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsentSubmission")
            .field("client_id", &self.client_id)
            .field("redirect_uri", &self.redirect_uri)
            .field("code_challenge_method", &self.code_challenge_method)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

/// Everything the consent page needs to render, including the values that
/// must round-trip as hidden fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsentPage {
    /// Fresh single-use CSRF token.
    pub csrf_token: String,
    /// Client identifier.
    pub client_id: String,
    /// Display name of the client, if it registered one.
    pub client_name: Option<String>,
    /// Validated redirect URI.
    pub redirect_uri: String,
    /// PKCE code challenge.
    pub code_challenge: String,
    /// PKCE method.
    pub code_challenge_method: PkceChallengeMethod,
    /// Client state, if any.
    pub state: Option<String>,
}

impl ConsentPage {
    /// Name shown to the operator. Falls back to the client id.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.client_name.as_deref().unwrap_or(&self.client_id)
    }
}

/// Successful authorization: where to send the browser.
///
/// # Example
///
/// ```ignore
/// HTTP/1.1 302 Found
/// Location: http://localhost:3000/callback?code=SplxlOBeZQQYbYS6WxSbIA&state=abc123xyz
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct AuthorizationResponse {
    /// Registered redirect URI the code is delivered to.
    #[serde(skip)]
    pub redirect_uri: String,
    /// Single-use authorization code.
    pub code: String,
    /// Echoed state, omitted when the request had none.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

impl AuthorizationResponse {
    /// Builds the redirect URL with `code` and, if present, `state`
    /// appended to any query the redirect URI already has.
    ///
    /// # Errors
    ///
    /// Returns `url::ParseError` if the redirect URI is not absolute.
    pub fn to_redirect_url(&self) -> Result<String, url::ParseError> {
        let mut url = url::Url::parse(&self.redirect_uri)?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("code", &self.code);
            if let Some(state) = &self.state {
                pairs.append_pair("state", state);
            }
        }
        Ok(url.to_string())
    }
}

/// Drives the two-step authorization transaction.
#[derive(Clone)]
pub struct AuthorizationSessionManager {
    clients: ClientRegistry,
    tokens: EphemeralTokens,
    credentials: OperatorCredentials,
}

impl AuthorizationSessionManager {
    /// Creates a manager.
    pub fn new(
        clients: ClientRegistry,
        tokens: EphemeralTokens,
        credentials: OperatorCredentials,
    ) -> Self {
        Self {
            clients,
            tokens,
            credentials,
        }
    }

    /// Validates an authorization request and prepares the consent page.
    ///
    /// Checks run in order: required parameters, client, redirect URI,
    /// response type, challenge method. A CSRF token is minted only after
    /// every check passed.
    ///
    /// # Errors
    ///
    /// `missing_parameter`, `invalid_client`, `invalid_redirect_uri`,
    /// `unsupported_response_type`, `unsupported_challenge_method`, or a
    /// storage error.
    pub async fn begin(&self, request: AuthorizationRequest) -> AuthResult<ConsentPage> {
        let client_id = required(request.client_id, "client_id")?;
        let redirect_uri = required(request.redirect_uri, "redirect_uri")?;
        let response_type = required(request.response_type, "response_type")?;
        let code_challenge = required(request.code_challenge, "code_challenge")?;

        let client = self.registered_client(&client_id, &redirect_uri).await?;

        if response_type != RESPONSE_TYPE_CODE {
            return Err(AuthError::unsupported_response_type(response_type));
        }
        let code_challenge_method = challenge_method(request.code_challenge_method)?;

        let csrf_token = self.tokens.issue_csrf().await?;

        Ok(ConsentPage {
            csrf_token,
            client_id: client.client_id,
            client_name: client.client_name,
            redirect_uri,
            code_challenge,
            code_challenge_method,
            state: optional(request.state),
        })
    }

    /// Processes the consent form and mints an authorization code.
    ///
    /// The CSRF token is consumed before the password is checked, so every
    /// submission (right or wrong password) needs a freshly rendered form.
    /// The hidden fields are re-validated against the registry because the
    /// browser can alter them.
    ///
    /// # Errors
    ///
    /// `missing_parameter`, `invalid_csrf`, `invalid_credentials`,
    /// `invalid_client`, `invalid_redirect_uri`,
    /// `unsupported_response_type`, `unsupported_challenge_method`, or a
    /// storage error.
    pub async fn complete(&self, submission: ConsentSubmission) -> AuthResult<AuthorizationResponse> {
        let client_id = required(submission.client_id, "client_id")?;
        let redirect_uri = required(submission.redirect_uri, "redirect_uri")?;
        let code_challenge = required(submission.code_challenge, "code_challenge")?;

        let csrf_token = submission.csrf_token.unwrap_or_default();
        if !self.tokens.consume_csrf(&csrf_token).await? {
            return Err(AuthError::InvalidCsrf);
        }

        let password = submission.password.unwrap_or_default();
        if !self.credentials.verify(&password).await {
            return Err(AuthError::InvalidCredentials);
        }

        self.registered_client(&client_id, &redirect_uri).await?;
        match optional(submission.response_type) {
            Some(response_type) if response_type != RESPONSE_TYPE_CODE => {
                return Err(AuthError::unsupported_response_type(response_type));
            }
            _ => {}
        }
        let code_challenge_method = challenge_method(submission.code_challenge_method)?;

        let grant = AuthorizationCodeGrant {
            client_id,
            redirect_uri,
            code_challenge,
            code_challenge_method: code_challenge_method.as_str().to_string(),
        };
        let code = self.tokens.issue_authorization_code(&grant).await?;

        tracing::info!(client_id = %grant.client_id, "authorization code issued");

        Ok(AuthorizationResponse {
            redirect_uri: grant.redirect_uri,
            code,
            state: optional(submission.state),
        })
    }

    async fn registered_client(&self, client_id: &str, redirect_uri: &str) -> AuthResult<Client> {
        let client = self
            .clients
            .lookup(client_id)
            .await?
            .ok_or_else(|| AuthError::invalid_client("unknown client_id"))?;
        if !client.has_redirect_uri(redirect_uri) {
            return Err(AuthError::invalid_redirect_uri(
                "redirect_uri is not registered for this client",
            ));
        }
        Ok(client)
    }
}

/// Treats empty strings as absent.
fn optional(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn required(value: Option<String>, name: &str) -> AuthResult<String> {
    optional(value).ok_or_else(|| AuthError::missing_parameter(name))
}

fn challenge_method(value: Option<String>) -> AuthResult<PkceChallengeMethod> {
    match optional(value) {
        None => Ok(PkceChallengeMethod::default()),
        Some(method) => PkceChallengeMethod::parse(&method)
            .map_err(|_| AuthError::unsupported_challenge_method(method)),
    }
}
