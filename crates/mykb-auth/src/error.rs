//! Authorization server error types.
//!
//! Every rejection the authorization server can produce maps onto one
//! variant here. Client-side variants carry the short machine-readable
//! reason that is returned to the caller; server-side variants surface
//! as `server_error` without exposing the underlying cause.

use std::fmt;

use axum::http::StatusCode;

/// Errors that can occur while registering clients, authorizing requests
/// and exchanging tokens.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The client is not registered.
    #[error("Invalid client: {message}")]
    InvalidClient {
        message: String,
    },

    /// The redirect URI is not registered for the client or is not acceptable.
    #[error("Invalid redirect URI: {message}")]
    InvalidRedirectUri {
        message: String,
    },

    /// The authorization server does not support the requested response type.
    #[error("Unsupported response type: {response_type}")]
    UnsupportedResponseType {
        response_type: String,
    },

    /// The PKCE challenge method is not `S256`.
    #[error("Unsupported code challenge method: {method}")]
    UnsupportedChallengeMethod {
        method: String,
    },

    /// The consent form CSRF token is missing, expired or already used.
    #[error("Invalid or expired CSRF token")]
    InvalidCsrf,

    /// The submitted operator password is wrong.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// The authorization code or refresh token is invalid, expired, already
    /// used, bound to another client, or failed PKCE verification.
    #[error("Invalid grant: {message}")]
    InvalidGrant {
        message: String,
    },

    /// The authorization server does not support the requested grant type.
    #[error("Unsupported grant type: {grant_type}")]
    UnsupportedGrantType {
        grant_type: String,
    },

    /// A required request parameter is absent or empty.
    #[error("Missing required parameter: {parameter}")]
    MissingParameter {
        parameter: String,
    },

    /// An error occurred while storing or retrieving auth data.
    #[error("Storage error: {message}")]
    Storage {
        message: String,
    },

    /// An unexpected internal error occurred.
    #[error("Internal error: {message}")]
    Internal {
        message: String,
    },
}

impl AuthError {
    #[must_use]
    pub fn invalid_client(message: impl Into<String>) -> Self {
        Self::InvalidClient {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn invalid_redirect_uri(message: impl Into<String>) -> Self {
        Self::InvalidRedirectUri {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn unsupported_response_type(response_type: impl Into<String>) -> Self {
        Self::UnsupportedResponseType {
            response_type: response_type.into(),
        }
    }

    #[must_use]
    pub fn unsupported_challenge_method(method: impl Into<String>) -> Self {
        Self::UnsupportedChallengeMethod {
            method: method.into(),
        }
    }

    #[must_use]
    pub fn invalid_grant(message: impl Into<String>) -> Self {
        Self::InvalidGrant {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn unsupported_grant_type(grant_type: impl Into<String>) -> Self {
        Self::UnsupportedGrantType {
            grant_type: grant_type.into(),
        }
    }

    #[must_use]
    pub fn missing_parameter(parameter: impl Into<String>) -> Self {
        Self::MissingParameter {
            parameter: parameter.into(),
        }
    }

    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns `true` if this is a client error (4xx category).
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        !self.is_server_error()
    }

    /// Returns `true` if this is a server error (5xx category).
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::Storage { .. } | Self::Internal { .. })
    }

    /// Returns the error category for logging purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidClient { .. } => ErrorCategory::Client,
            Self::InvalidRedirectUri { .. } => ErrorCategory::Client,
            Self::UnsupportedResponseType { .. } => ErrorCategory::Validation,
            Self::UnsupportedChallengeMethod { .. } => ErrorCategory::Validation,
            Self::InvalidCsrf => ErrorCategory::Authentication,
            Self::InvalidCredentials => ErrorCategory::Authentication,
            Self::InvalidGrant { .. } => ErrorCategory::Grant,
            Self::UnsupportedGrantType { .. } => ErrorCategory::Validation,
            Self::MissingParameter { .. } => ErrorCategory::Validation,
            Self::Storage { .. } => ErrorCategory::Infrastructure,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }

    /// Returns the machine-readable error code reported to the caller.
    #[must_use]
    pub fn oauth_error_code(&self) -> &'static str {
        match self {
            Self::InvalidClient { .. } => "invalid_client",
            Self::InvalidRedirectUri { .. } => "invalid_redirect_uri",
            Self::UnsupportedResponseType { .. } => "unsupported_response_type",
            Self::UnsupportedChallengeMethod { .. } => "unsupported_challenge_method",
            Self::InvalidCsrf => "invalid_csrf",
            Self::InvalidCredentials => "invalid_credentials",
            Self::InvalidGrant { .. } => "invalid_grant",
            Self::UnsupportedGrantType { .. } => "unsupported_grant_type",
            Self::MissingParameter { .. } => "missing_parameter",
            Self::Storage { .. } | Self::Internal { .. } => "server_error",
        }
    }

    /// Returns the HTTP status code this error is reported with.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::Storage { .. } | Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    /// Returns the description that is safe to show to the caller.
    ///
    /// Server errors are replaced with a generic message so that store
    /// details never reach the client.
    #[must_use]
    pub fn public_description(&self) -> String {
        if self.is_server_error() {
            "The server encountered an internal error".to_string()
        } else {
            self.to_string()
        }
    }
}

/// Categories of authorization server errors for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Unknown client or unacceptable redirect URI.
    Client,
    /// CSRF or operator credential failures.
    Authentication,
    /// Authorization code or refresh token failures.
    Grant,
    /// Request validation errors.
    Validation,
    /// Infrastructure/storage errors.
    Infrastructure,
    /// Internal server errors.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Client => write!(f, "client"),
            Self::Authentication => write!(f, "authentication"),
            Self::Grant => write!(f, "grant"),
            Self::Validation => write!(f, "validation"),
            Self::Infrastructure => write!(f, "infrastructure"),
            Self::Internal => write!(f, "internal"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AuthError::invalid_client("unknown client_id");
        assert_eq!(err.to_string(), "Invalid client: unknown client_id");

        let err = AuthError::missing_parameter("code_verifier");
        assert_eq!(
            err.to_string(),
            "Missing required parameter: code_verifier"
        );

        let err = AuthError::InvalidCsrf;
        assert_eq!(err.to_string(), "Invalid or expired CSRF token");
    }

    #[test]
    fn test_oauth_error_codes() {
        assert_eq!(
            AuthError::invalid_client("x").oauth_error_code(),
            "invalid_client"
        );
        assert_eq!(
            AuthError::invalid_redirect_uri("x").oauth_error_code(),
            "invalid_redirect_uri"
        );
        assert_eq!(
            AuthError::unsupported_response_type("token").oauth_error_code(),
            "unsupported_response_type"
        );
        assert_eq!(
            AuthError::unsupported_challenge_method("plain").oauth_error_code(),
            "unsupported_challenge_method"
        );
        assert_eq!(AuthError::InvalidCsrf.oauth_error_code(), "invalid_csrf");
        assert_eq!(
            AuthError::InvalidCredentials.oauth_error_code(),
            "invalid_credentials"
        );
        assert_eq!(
            AuthError::invalid_grant("x").oauth_error_code(),
            "invalid_grant"
        );
        assert_eq!(
            AuthError::unsupported_grant_type("password").oauth_error_code(),
            "unsupported_grant_type"
        );
        assert_eq!(
            AuthError::missing_parameter("code").oauth_error_code(),
            "missing_parameter"
        );
        assert_eq!(AuthError::storage("x").oauth_error_code(), "server_error");
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AuthError::InvalidCredentials.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(AuthError::InvalidCsrf.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AuthError::invalid_grant("x").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AuthError::storage("redis down").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_client_and_server_errors() {
        assert!(AuthError::invalid_grant("x").is_client_error());
        assert!(!AuthError::invalid_grant("x").is_server_error());
        assert!(AuthError::storage("x").is_server_error());
        assert!(AuthError::internal("x").is_server_error());
        assert!(!AuthError::internal("x").is_client_error());
    }

    #[test]
    fn test_public_description_hides_server_details() {
        let err = AuthError::storage("connection refused to 10.0.0.5:6379");
        assert!(!err.public_description().contains("10.0.0.5"));

        let err = AuthError::invalid_grant("authorization code expired");
        assert!(err.public_description().contains("authorization code expired"));
    }

    #[test]
    fn test_error_category() {
        assert_eq!(
            AuthError::invalid_client("x").category(),
            ErrorCategory::Client
        );
        assert_eq!(
            AuthError::InvalidCredentials.category(),
            ErrorCategory::Authentication
        );
        assert_eq!(AuthError::invalid_grant("x").category(), ErrorCategory::Grant);
        assert_eq!(
            AuthError::storage("x").category(),
            ErrorCategory::Infrastructure
        );
        assert_eq!(ErrorCategory::Grant.to_string(), "grant");
    }
}
