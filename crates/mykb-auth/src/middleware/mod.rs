//! HTTP middleware for protected resources.
//!
//! - [`BearerToken`] extracts and verifies `Authorization: Bearer` access tokens
//! - `IntoResponse` for [`AuthError`](crate::AuthError) renders OAuth JSON errors
//!
//! # Example
//!
//! ```ignore
//! use axum::{Router, routing::post};
//! use mykb_auth::middleware::{BearerState, BearerToken};
//!
//! async fn protected_handler(BearerToken(grant): BearerToken) -> String {
//!     format!("Hello, {}!", grant.client_id)
//! }
//!
//! let app = Router::new()
//!     .route("/mcp", post(protected_handler))
//!     .with_state(BearerState::new(tokens, ProxyMode::Direct));
//! ```

pub mod auth;
pub mod error;

pub use auth::{BearerRejection, BearerState, BearerToken};
pub use error::{OAuthErrorBody, REALM, www_authenticate};
