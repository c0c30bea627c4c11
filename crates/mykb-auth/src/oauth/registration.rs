//! Dynamic client registration (RFC 7591) wire types.
//!
//! Clients are public: no secret is issued and the token endpoint does not
//! authenticate them (`token_endpoint_auth_method = "none"`).

use serde::{Deserialize, Serialize};

use crate::types::{Client, GrantType};

/// Client registration request body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClientRegistrationRequest {
    /// Redirect URIs for the authorization code flow. Must not be empty.
    #[serde(default)]
    pub redirect_uris: Vec<String>,
    /// Optional display name.
    #[serde(default)]
    pub client_name: Option<String>,
}

/// Client registration response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientRegistrationResponse {
    /// Server-generated client identifier.
    pub client_id: String,
    /// Display name, omitted when none was registered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_name: Option<String>,
    /// Registered redirect URIs.
    pub redirect_uris: Vec<String>,
    /// Registration time in seconds since the Unix epoch.
    pub client_id_issued_at: i64,
    /// Always `none`.
    pub token_endpoint_auth_method: String,
    /// Grant types the client may use.
    pub grant_types: Vec<String>,
    /// Response types the client may use.
    pub response_types: Vec<String>,
}

impl From<Client> for ClientRegistrationResponse {
    fn from(client: Client) -> Self {
        Self {
            client_id_issued_at: client.created_at.unix_timestamp(),
            client_id: client.client_id,
            client_name: client.client_name,
            redirect_uris: client.redirect_uris,
            token_endpoint_auth_method: "none".to_string(),
            grant_types: vec![
                GrantType::AuthorizationCode.as_str().to_string(),
                GrantType::RefreshToken.as_str().to_string(),
            ],
            response_types: vec!["code".to_string()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_deserialize() {
        let request: ClientRegistrationRequest = serde_json::from_str(
            r#"{"client_name":"Claude","redirect_uris":["http://localhost/cb"],"scope":"ignored"}"#,
        )
        .unwrap();
        assert_eq!(request.client_name.as_deref(), Some("Claude"));
        assert_eq!(request.redirect_uris, vec!["http://localhost/cb"]);

        let empty: ClientRegistrationRequest = serde_json::from_str("{}").unwrap();
        assert!(empty.redirect_uris.is_empty());
        assert!(empty.client_name.is_none());
    }

    #[test]
    fn test_response_from_client() {
        let client = Client::new(None, vec!["https://app.example/cb".into()]);
        let issued_at = client.created_at.unix_timestamp();
        let response = ClientRegistrationResponse::from(client.clone());

        assert_eq!(response.client_id, client.client_id);
        assert_eq!(response.client_id_issued_at, issued_at);
        assert_eq!(response.token_endpoint_auth_method, "none");
        assert_eq!(response.grant_types, vec!["authorization_code", "refresh_token"]);

        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("client_name").is_none());
        assert_eq!(json["response_types"], serde_json::json!(["code"]));
    }
}
