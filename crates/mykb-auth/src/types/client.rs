//! OAuth 2.0 client registration record.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use url::Url;

// =============================================================================
// Client
// =============================================================================

/// A dynamically registered OAuth client.
///
/// Clients are public (no secret) and authenticate their token requests
/// through PKCE only. The record is never mutated after registration except
/// for `last_used_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    /// Server-generated opaque identifier.
    pub client_id: String,

    /// Optional display label. Not unique.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_name: Option<String>,

    /// Registered redirect URIs. Matched by exact string comparison.
    pub redirect_uris: Vec<String>,

    /// Registration time.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,

    /// Time of the last successful token issuance, if any.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub last_used_at: Option<OffsetDateTime>,
}

impl Client {
    /// Creates a client record with a fresh UUID v4 `client_id`.
    #[must_use]
    pub fn new(client_name: Option<String>, redirect_uris: Vec<String>) -> Self {
        Self {
            client_id: uuid::Uuid::new_v4().to_string(),
            client_name,
            redirect_uris,
            created_at: OffsetDateTime::now_utc(),
            last_used_at: None,
        }
    }

    /// Returns `true` if `redirect_uri` is one of the registered URIs.
    #[must_use]
    pub fn has_redirect_uri(&self, redirect_uri: &str) -> bool {
        self.redirect_uris.iter().any(|uri| uri == redirect_uri)
    }

    /// Time of last activity: last token issuance, or registration if the
    /// client was never used.
    #[must_use]
    pub fn last_activity(&self) -> OffsetDateTime {
        self.last_used_at.unwrap_or(self.created_at)
    }

    /// Returns `true` if the client has been idle since before `cutoff`.
    #[must_use]
    pub fn is_stale(&self, cutoff: OffsetDateTime) -> bool {
        self.last_activity() < cutoff
    }

    /// Validates the client record.
    ///
    /// # Errors
    ///
    /// Returns an error if the client_id is empty, no redirect URI is
    /// registered, or any redirect URI is unacceptable.
    pub fn validate(&self) -> Result<(), ClientValidationError> {
        if self.client_id.is_empty() {
            return Err(ClientValidationError::EmptyClientId);
        }
        if self.redirect_uris.is_empty() {
            return Err(ClientValidationError::NoRedirectUris);
        }
        for uri in &self.redirect_uris {
            validate_redirect_uri(uri)?;
        }
        Ok(())
    }
}

// =============================================================================
// Redirect URI validation
// =============================================================================

/// Checks that a redirect URI is safe to register.
///
/// Accepts absolute `https` URIs, and `http` URIs only for loopback hosts
/// (`localhost`, `127.0.0.1`, `::1`). Fragments are not allowed.
///
/// # Errors
///
/// Returns the reason the URI was rejected.
pub fn validate_redirect_uri(uri: &str) -> Result<(), ClientValidationError> {
    let parsed = Url::parse(uri).map_err(|_| ClientValidationError::InvalidRedirectUri {
        uri: uri.to_string(),
        reason: "not an absolute URL".to_string(),
    })?;

    let reject = |reason: &str| ClientValidationError::InvalidRedirectUri {
        uri: uri.to_string(),
        reason: reason.to_string(),
    };

    match parsed.scheme() {
        "https" => {}
        "http" => {
            let loopback = matches!(
                parsed.host(),
                Some(url::Host::Domain("localhost"))
                    | Some(url::Host::Ipv4(std::net::Ipv4Addr::LOCALHOST))
                    | Some(url::Host::Ipv6(std::net::Ipv6Addr::LOCALHOST))
            );
            if !loopback {
                return Err(reject("http is only allowed for localhost"));
            }
        }
        _ => return Err(reject("scheme must be http or https")),
    }

    if parsed.host().is_none() {
        return Err(reject("missing host"));
    }
    if parsed.fragment().is_some() {
        return Err(reject("fragments are not allowed"));
    }

    Ok(())
}

/// Client validation errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientValidationError {
    /// Client ID is empty.
    #[error("client_id cannot be empty")]
    EmptyClientId,

    /// No redirect URIs were supplied.
    #[error("redirect_uris must not be empty")]
    NoRedirectUris,

    /// A redirect URI is unacceptable.
    #[error("invalid redirect_uri '{uri}': {reason}")]
    InvalidRedirectUri {
        /// The rejected URI.
        uri: String,
        /// Why it was rejected.
        reason: String,
    },
}
