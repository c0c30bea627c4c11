//! Opaque token minting and storage key derivation.
//!
//! Every credential the server hands out (CSRF tokens, authorization codes,
//! access and refresh tokens) is 256 bits of randomness encoded as
//! base64url without padding. The raw value is never persisted: stores are
//! keyed by `<kind>:<sha256 hex of the token>`.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::Rng;
use sha2::{Digest, Sha256};

/// Number of random bytes in every minted token.
pub const TOKEN_BYTES: usize = 32;

/// Generate a cryptographically secure random token.
///
/// Returns a 256-bit random value encoded as base64url (43 characters).
#[must_use]
pub fn generate_token() -> String {
    let bytes: [u8; TOKEN_BYTES] = rand::thread_rng().r#gen();
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Hash a token value using SHA-256, hex encoded.
///
/// Used both when storing new tokens and when looking them up.
#[must_use]
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// The four kinds of ephemeral credentials kept in the token store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// One-time consent form anti-forgery token.
    Csrf,
    /// One-time authorization code bound to a PKCE challenge.
    AuthorizationCode,
    /// Bearer access token.
    AccessToken,
    /// Rotating refresh token.
    RefreshToken,
}

impl TokenKind {
    /// Key namespace for this kind.
    #[must_use]
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Csrf => "csrf",
            Self::AuthorizationCode => "auth_code",
            Self::AccessToken => "access_token",
            Self::RefreshToken => "refresh_token",
        }
    }

    /// Storage key for a raw token of this kind.
    #[must_use]
    pub fn storage_key(&self, token: &str) -> String {
        format!("{}:{}", self.prefix(), hash_token(token))
    }
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.prefix())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generate_token_shape() {
        let token = generate_token();
        assert_eq!(token.len(), 43);
        assert!(!token.contains('='));
        assert!(
            token
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }

    #[test]
    fn test_generate_token_uniqueness() {
        let tokens: HashSet<String> = (0..256).map(|_| generate_token()).collect();
        assert_eq!(tokens.len(), 256);
    }

    #[test]
    fn test_hash_token_is_deterministic_hex() {
        let h1 = hash_token("test-token");
        let h2 = hash_token("test-token");
        assert_eq!(h1, h2);
        assert_eq!(h1.len(), 64);
        assert_ne!(h1, "test-token");
        assert_ne!(h1, hash_token("test-token2"));
    }

    #[test]
    fn test_storage_key_never_contains_raw_token() {
        let token = generate_token();
        for kind in [
            TokenKind::Csrf,
            TokenKind::AuthorizationCode,
            TokenKind::AccessToken,
            TokenKind::RefreshToken,
        ] {
            let key = kind.storage_key(&token);
            assert!(key.starts_with(&format!("{}:", kind.prefix())));
            assert!(!key.contains(&token));
        }
    }

    #[test]
    fn test_kinds_do_not_collide() {
        let token = generate_token();
        assert_ne!(
            TokenKind::AccessToken.storage_key(&token),
            TokenKind::RefreshToken.storage_key(&token)
        );
    }
}
