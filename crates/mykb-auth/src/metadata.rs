//! Discovery documents.
//!
//! - Authorization server metadata (RFC 8414), served at
//!   `/.well-known/oauth-authorization-server`
//! - Protected resource metadata (RFC 9728), served at
//!   `/.well-known/oauth-protected-resource`
//!
//! Every URL is derived from the single configured base URL.

use serde::{Deserialize, Serialize};

use crate::pkce::PkceChallengeMethod;
use crate::types::GrantType;

/// Authorization server metadata document.
///
/// # Example Response
///
/// ```json
/// {
///   "issuer": "https://kb.example.com",
///   "authorization_endpoint": "https://kb.example.com/authorize",
///   "token_endpoint": "https://kb.example.com/token",
///   "registration_endpoint": "https://kb.example.com/register",
///   "response_types_supported": ["code"],
///   "grant_types_supported": ["authorization_code", "refresh_token"],
///   "code_challenge_methods_supported": ["S256"],
///   "token_endpoint_auth_methods_supported": ["none"],
///   "scopes_supported": []
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationServerMetadata {
    /// Issuer identifier, equal to the base URL.
    pub issuer: String,
    /// URL of the authorization endpoint.
    pub authorization_endpoint: String,
    /// URL of the token endpoint.
    pub token_endpoint: String,
    /// URL of the dynamic client registration endpoint.
    pub registration_endpoint: String,
    /// Supported response types.
    pub response_types_supported: Vec<String>,
    /// Supported grant types.
    pub grant_types_supported: Vec<String>,
    /// Supported PKCE methods.
    pub code_challenge_methods_supported: Vec<String>,
    /// Supported token endpoint client authentication methods.
    pub token_endpoint_auth_methods_supported: Vec<String>,
    /// Supported scopes. Always empty.
    pub scopes_supported: Vec<String>,
}

/// Protected resource metadata document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtectedResourceMetadata {
    /// Identifier of the protected resource.
    pub resource: String,
    /// Authorization servers that issue tokens for the resource.
    pub authorization_servers: Vec<String>,
}

/// Builds discovery documents from the base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataPublisher {
    base_url: String,
    resource_path: String,
}

impl MetadataPublisher {
    /// Creates a publisher. A trailing `/` on `base_url` is ignored.
    pub fn new(base_url: impl AsRef<str>, resource_path: impl Into<String>) -> Self {
        Self {
            base_url: base_url.as_ref().trim_end_matches('/').to_string(),
            resource_path: resource_path.into(),
        }
    }

    /// Base URL without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Path of the protected resource.
    #[must_use]
    pub fn resource_path(&self) -> &str {
        &self.resource_path
    }

    /// Authorization server metadata.
    #[must_use]
    pub fn authorization_server(&self) -> AuthorizationServerMetadata {
        let base = &self.base_url;
        AuthorizationServerMetadata {
            issuer: base.clone(),
            authorization_endpoint: format!("{base}/authorize"),
            token_endpoint: format!("{base}/token"),
            registration_endpoint: format!("{base}/register"),
            response_types_supported: vec!["code".to_string()],
            grant_types_supported: vec![
                GrantType::AuthorizationCode.to_string(),
                GrantType::RefreshToken.to_string(),
            ],
            code_challenge_methods_supported: vec![PkceChallengeMethod::S256.to_string()],
            token_endpoint_auth_methods_supported: vec!["none".to_string()],
            scopes_supported: Vec::new(),
        }
    }

    /// Protected resource metadata.
    #[must_use]
    pub fn protected_resource(&self) -> ProtectedResourceMetadata {
        ProtectedResourceMetadata {
            resource: format!("{}{}", self.base_url, self.resource_path),
            authorization_servers: vec![self.base_url.clone()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authorization_server_metadata() {
        let publisher = MetadataPublisher::new("https://kb.example.com/", "/mcp");
        let doc = publisher.authorization_server();

        assert_eq!(doc.issuer, "https://kb.example.com");
        assert_eq!(doc.authorization_endpoint, "https://kb.example.com/authorize");
        assert_eq!(doc.token_endpoint, "https://kb.example.com/token");
        assert_eq!(doc.registration_endpoint, "https://kb.example.com/register");
        assert_eq!(doc.grant_types_supported, vec!["authorization_code", "refresh_token"]);
        assert_eq!(doc.code_challenge_methods_supported, vec!["S256"]);

        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["scopes_supported"], serde_json::json!([]));
        assert_eq!(json["response_types_supported"], serde_json::json!(["code"]));
    }

    #[test]
    fn test_protected_resource_metadata() {
        let publisher = MetadataPublisher::new("http://localhost:8000", "/mcp");
        let doc = publisher.protected_resource();
        assert_eq!(doc.resource, "http://localhost:8000/mcp");
        assert_eq!(doc.authorization_servers, vec!["http://localhost:8000"]);
    }
}
