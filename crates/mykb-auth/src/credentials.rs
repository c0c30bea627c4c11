//! Operator credential verification.
//!
//! The consent page is protected by a single shared operator password. It
//! is configured either as plaintext (compared in constant time) or as an
//! Argon2 PHC hash.
//!
//! # Example
//!
//! ```
//! # tokio_test::block_on(async {
//! use mykb_auth::credentials::OperatorCredentials;
//!
//! let credentials = OperatorCredentials::plain("correct horse");
//! assert!(credentials.verify("correct horse").await);
//! assert!(!credentials.verify("battery staple").await);
//! # });
//! ```

use std::fmt;
use std::sync::Arc;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use subtle::ConstantTimeEq;

use crate::config::{AuthConfig, ConfigError};

/// The configured operator secret.
#[derive(Clone)]
pub enum OperatorCredentials {
    /// Plaintext password.
    Plain(Arc<str>),
    /// Argon2 PHC hash string.
    Hashed(Arc<str>),
}

impl OperatorCredentials {
    /// Plaintext operator password.
    #[must_use]
    pub fn plain(password: impl AsRef<str>) -> Self {
        Self::Plain(Arc::from(password.as_ref()))
    }

    /// Builds credentials from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if no secret is configured or the hash is not a
    /// valid PHC string.
    pub fn from_config(config: &AuthConfig) -> Result<Self, ConfigError> {
        match (&config.password, &config.password_hash) {
            (_, Some(hash)) => {
                PasswordHash::new(hash).map_err(|e| {
                    ConfigError::InvalidValue(format!("auth.password_hash is not a PHC string: {e}"))
                })?;
                Ok(Self::Hashed(Arc::from(hash.as_str())))
            }
            (Some(password), None) => Ok(Self::plain(password)),
            (None, None) => Err(ConfigError::Missing(
                "auth.password or auth.password_hash".to_string(),
            )),
        }
    }

    /// Checks a submitted password.
    ///
    /// Argon2 verification runs on the blocking thread pool.
    pub async fn verify(&self, submitted: &str) -> bool {
        match self {
            Self::Plain(expected) => {
                bool::from(expected.as_bytes().ct_eq(submitted.as_bytes()))
            }
            Self::Hashed(hash) => {
                let hash = Arc::clone(hash);
                let submitted = submitted.to_string();
                tokio::task::spawn_blocking(move || verify_hash(&hash, &submitted))
                    .await
                    .unwrap_or_else(|e| {
                        tracing::error!(error = %e, "password verification task failed");
                        false
                    })
            }
        }
    }
}

impl fmt::Debug for OperatorCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plain(_) => f.write_str("OperatorCredentials::Plain(<redacted>)"),
            Self::Hashed(_) => f.write_str("OperatorCredentials::Hashed(<redacted>)"),
        }
    }
}

fn verify_hash(hash: &str, submitted: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(submitted.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            tracing::error!(error = %e, "stored operator password hash is invalid");
            false
        }
    }
}

/// Hashes an operator password into an Argon2id PHC string suitable for
/// `auth.password_hash`. Exposed on the command line as
/// `mykb-server --hash-password`, which reads the password from stdin.
///
/// # Errors
///
/// Returns `argon2::password_hash::Error` if hashing fails.
pub fn hash_operator_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_plain_verify() {
        let credentials = OperatorCredentials::plain("s3cret");
        assert!(credentials.verify("s3cret").await);
        assert!(!credentials.verify("s3cre").await);
        assert!(!credentials.verify("s3cret ").await);
        assert!(!credentials.verify("").await);
    }

    #[tokio::test]
    async fn test_hashed_verify() {
        let hash = hash_operator_password("s3cret").unwrap();
        assert!(hash.starts_with("$argon2id$"));

        let mut config = AuthConfig::default();
        config.password_hash = Some(hash);
        let credentials = OperatorCredentials::from_config(&config).unwrap();
        assert!(matches!(credentials, OperatorCredentials::Hashed(_)));
        assert!(credentials.verify("s3cret").await);
        assert!(!credentials.verify("wrong").await);
    }

    #[test]
    fn test_from_config_rejects_malformed_hash() {
        let mut config = AuthConfig::default();
        config.password_hash = Some("not-a-phc-string".into());
        assert!(OperatorCredentials::from_config(&config).is_err());
    }

    #[test]
    fn test_from_config_requires_a_secret() {
        assert!(matches!(
            OperatorCredentials::from_config(&AuthConfig::default()),
            Err(ConfigError::Missing(_))
        ));
    }

    #[test]
    fn test_debug_redacts() {
        let debug = format!("{:?}", OperatorCredentials::plain("s3cret"));
        assert!(!debug.contains("s3cret"));
    }
}
