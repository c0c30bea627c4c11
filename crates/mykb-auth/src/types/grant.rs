//! Payloads stored alongside ephemeral credentials.

use serde::{Deserialize, Serialize};

/// OAuth 2.0 grant types accepted at the token endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantType {
    /// Authorization Code flow with PKCE.
    AuthorizationCode,
    /// Refresh Token flow.
    RefreshToken,
}

impl GrantType {
    /// Returns the OAuth 2.0 grant_type parameter value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthorizationCode => "authorization_code",
            Self::RefreshToken => "refresh_token",
        }
    }

    /// Parses a `grant_type` parameter. Returns `None` for anything other
    /// than the two supported grants.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "authorization_code" => Some(Self::AuthorizationCode),
            "refresh_token" => Some(Self::RefreshToken),
            _ => None,
        }
    }
}

impl std::fmt::Display for GrantType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What an authorization code is bound to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationCodeGrant {
    /// Client the code was issued to.
    pub client_id: String,
    /// Redirect URI the code was delivered to.
    pub redirect_uri: String,
    /// PKCE challenge supplied at `/authorize`.
    pub code_challenge: String,
    /// PKCE method, always `S256`.
    pub code_challenge_method: String,
}

/// What an access or refresh token is bound to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenGrant {
    /// Client the token was issued to.
    pub client_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grant_type_parse() {
        assert_eq!(
            GrantType::parse("authorization_code"),
            Some(GrantType::AuthorizationCode)
        );
        assert_eq!(GrantType::parse("refresh_token"), Some(GrantType::RefreshToken));
        assert_eq!(GrantType::parse("client_credentials"), None);
        assert_eq!(GrantType::parse("password"), None);
        assert_eq!(GrantType::RefreshToken.to_string(), "refresh_token");
    }

    #[test]
    fn test_code_grant_json_shape() {
        let grant = AuthorizationCodeGrant {
            client_id: "c1".into(),
            redirect_uri: "http://localhost/cb".into(),
            code_challenge: "abc".into(),
            code_challenge_method: "S256".into(),
        };
        let value = serde_json::to_value(&grant).unwrap();
        assert_eq!(value["client_id"], "c1");
        assert_eq!(value["redirect_uri"], "http://localhost/cb");
        assert_eq!(value["code_challenge"], "abc");
        assert_eq!(value["code_challenge_method"], "S256");
    }
}
