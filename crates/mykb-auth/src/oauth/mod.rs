//! OAuth 2.0 authorization server flows.
//!
//! - [`authorize`] - Authorization Session Manager (`begin`/`complete`)
//! - [`token`] - Token Exchange Engine (`authorization_code`, `refresh_token`)
//! - [`registration`] - RFC 7591 request/response types
//!
//! # Example
//!
//! ```ignore
//! use mykb_auth::oauth::{AuthorizationSessionManager, TokenExchange};
//! use mykb_auth::pkce::{PkceChallenge, PkceVerifier};
//!
//! // Client generates PKCE verifier and challenge
//! let verifier = PkceVerifier::generate();
//! let challenge = PkceChallenge::from_verifier(&verifier);
//!
//! // GET /authorize
//! let page = sessions.begin(request).await?;
//!
//! // POST /authorize
//! let response = sessions.complete(submission).await?;
//! let location = response.to_redirect_url()?;
//!
//! // POST /token
//! let tokens = exchange.exchange(token_request).await?;
//! ```

pub mod authorize;
pub mod registration;
pub mod token;

// Authorization endpoint types
pub use authorize::{
    AuthorizationRequest, AuthorizationResponse, AuthorizationSessionManager, ConsentPage,
    ConsentSubmission,
};

// Registration types
pub use registration::{ClientRegistrationRequest, ClientRegistrationResponse};

// Token endpoint types
pub use token::{TokenExchange, TokenRequest, TokenResponse};
