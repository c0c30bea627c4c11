//! Domain types shared across the authorization server.
//!
//! - [`Client`] - dynamically registered OAuth client
//! - [`GrantType`] - grants accepted at the token endpoint
//! - [`AuthorizationCodeGrant`], [`TokenGrant`] - payloads bound to ephemeral credentials

pub mod client;
pub mod grant;

pub use client::{Client, ClientValidationError, validate_redirect_uri};
pub use grant::{AuthorizationCodeGrant, GrantType, TokenGrant};
