//! Authorization server configuration.
//!
//! The configuration is loaded once at startup and handed to component
//! constructors as an immutable value. Nothing in this crate reads
//! configuration from globals.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Root authorization server configuration.
///
/// # Example (TOML)
///
/// ```toml
/// [auth]
/// password_hash = "$argon2id$v=19$m=19456,t=2,p=1$..."
/// resource_path = "/mcp"
///
/// [auth.oauth]
/// access_token_lifetime = "1h"
/// refresh_token_lifetime = "30d"
///
/// [auth.registration]
/// client_max_age = "90d"
/// ```
#[derive(Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Plaintext operator password entered on the consent page.
    /// Mutually exclusive with `password_hash`.
    #[serde(skip_serializing)]
    pub password: Option<String>,

    /// Argon2 PHC hash of the operator password.
    /// Mutually exclusive with `password`.
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,

    /// Path of the protected resource, advertised in the protected
    /// resource metadata document.
    pub resource_path: String,

    /// Token lifetimes.
    pub oauth: OAuthConfig,

    /// Dynamic client registration settings.
    pub registration: RegistrationConfig,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            password: None,
            password_hash: None,
            resource_path: "/mcp".to_string(),
            oauth: OAuthConfig::default(),
            registration: RegistrationConfig::default(),
        }
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field(
                "password_hash",
                &self.password_hash.as_ref().map(|_| "<redacted>"),
            )
            .field("resource_path", &self.resource_path)
            .field("oauth", &self.oauth)
            .field("registration", &self.registration)
            .finish()
    }
}

/// Upper bound for every ephemeral credential lifetime.
pub const MAX_TOKEN_LIFETIME: Duration = Duration::from_secs(365 * 24 * 3600);

/// Lifetimes of the four ephemeral credential kinds.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OAuthConfig {
    /// Consent form CSRF token lifetime.
    #[serde(with = "humantime_serde")]
    pub csrf_token_lifetime: Duration,

    /// Authorization code lifetime.
    #[serde(with = "humantime_serde")]
    pub authorization_code_lifetime: Duration,

    /// Access token lifetime. Reported to clients as `expires_in`.
    #[serde(with = "humantime_serde")]
    pub access_token_lifetime: Duration,

    /// Refresh token lifetime.
    #[serde(with = "humantime_serde")]
    pub refresh_token_lifetime: Duration,
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            csrf_token_lifetime: Duration::from_secs(300),             // 5 minutes
            authorization_code_lifetime: Duration::from_secs(300),     // 5 minutes
            access_token_lifetime: Duration::from_secs(3600),          // 1 hour
            refresh_token_lifetime: Duration::from_secs(30 * 24 * 3600), // 30 days
        }
    }
}

/// Dynamic client registration settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RegistrationConfig {
    /// Clients unused for longer than this are removed by the sweep that
    /// runs before each registration.
    #[serde(with = "humantime_serde")]
    pub client_max_age: Duration,
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        Self {
            client_max_age: Duration::from_secs(90 * 24 * 3600), // 90 days
        }
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// An invalid configuration value was provided.
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    /// A required configuration value is missing.
    #[error("Missing required configuration: {0}")]
    Missing(String),
}

impl AuthConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if neither `password` nor
    /// `password_hash` is set, and `ConfigError::InvalidValue` if both are
    /// set, a lifetime is zero or longer than [`MAX_TOKEN_LIFETIME`], or
    /// `resource_path` is not absolute.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match (&self.password, &self.password_hash) {
            (None, None) => {
                return Err(ConfigError::Missing(
                    "auth.password or auth.password_hash".to_string(),
                ));
            }
            (Some(_), Some(_)) => {
                return Err(ConfigError::InvalidValue(
                    "auth.password and auth.password_hash are mutually exclusive".to_string(),
                ));
            }
            (Some(p), None) if p.is_empty() => {
                return Err(ConfigError::InvalidValue(
                    "auth.password cannot be empty".to_string(),
                ));
            }
            _ => {}
        }

        let lifetimes = [
            ("csrf_token_lifetime", self.oauth.csrf_token_lifetime),
            (
                "authorization_code_lifetime",
                self.oauth.authorization_code_lifetime,
            ),
            ("access_token_lifetime", self.oauth.access_token_lifetime),
            ("refresh_token_lifetime", self.oauth.refresh_token_lifetime),
        ];
        for (name, lifetime) in lifetimes {
            if lifetime.is_zero() {
                return Err(ConfigError::InvalidValue(format!(
                    "auth.oauth.{name} must be > 0"
                )));
            }
            if lifetime > MAX_TOKEN_LIFETIME {
                return Err(ConfigError::InvalidValue(format!(
                    "auth.oauth.{name} must not exceed 365 days"
                )));
            }
        }

        if self.registration.client_max_age.is_zero() {
            return Err(ConfigError::InvalidValue(
                "auth.registration.client_max_age must be > 0".to_string(),
            ));
        }

        if !self.resource_path.starts_with('/') {
            return Err(ConfigError::InvalidValue(format!(
                "auth.resource_path must start with '/': '{}'",
                self.resource_path
            )));
        }

        Ok(())
    }

    /// Convenience constructor for a plaintext operator password.
    #[must_use]
    pub fn with_password(password: impl Into<String>) -> Self {
        Self {
            password: Some(password.into()),
            ..Self::default()
        }
    }
}
