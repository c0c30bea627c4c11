//! Typed access to the four ephemeral credential kinds.
//!
//! [`EphemeralTokens`] mints raw tokens, stores their payloads under hashed
//! keys with the configured lifetimes, and reads them back with the right
//! consumption semantics:
//!
//! | Kind | Issue | Read |
//! |---|---|---|
//! | CSRF | `issue_csrf` | `consume_csrf` (one-shot) |
//! | Authorization code | `issue_authorization_code` | `redeem_authorization_code` (one-shot) |
//! | Access token | `issue_token_pair` | `verify_access_token` (read-only) |
//! | Refresh token | `issue_token_pair` | `rotate_refresh_token` (one-shot) |

use std::sync::Arc;
use std::time::Duration;

use serde::{Serialize, de::DeserializeOwned};

use crate::config::OAuthConfig;
use crate::storage::TokenStore;
use crate::token::{TokenKind, generate_token};
use crate::types::{AuthorizationCodeGrant, TokenGrant};
use crate::{AuthError, AuthResult};

/// Freshly minted access and refresh tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedTokens {
    /// Raw access token handed to the client.
    pub access_token: String,
    /// Raw refresh token handed to the client.
    pub refresh_token: String,
    /// Access token lifetime.
    pub expires_in: Duration,
}

/// Typed facade over a shared [`TokenStore`].
#[derive(Clone)]
pub struct EphemeralTokens {
    store: Arc<dyn TokenStore>,
    lifetimes: OAuthConfig,
}

impl EphemeralTokens {
    /// Creates the facade over `store` with the given lifetimes.
    pub fn new(store: Arc<dyn TokenStore>, lifetimes: OAuthConfig) -> Self {
        Self { store, lifetimes }
    }

    /// Configured lifetimes.
    #[must_use]
    pub fn lifetimes(&self) -> &OAuthConfig {
        &self.lifetimes
    }

    // -------------------------------------------------------------------------
    // CSRF
    // -------------------------------------------------------------------------

    /// Mints a consent form CSRF token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Storage` if the store is unreachable.
    pub async fn issue_csrf(&self) -> AuthResult<String> {
        let token = generate_token();
        self.store
            .put(
                &TokenKind::Csrf.storage_key(&token),
                "1",
                self.lifetimes.csrf_token_lifetime,
            )
            .await?;
        Ok(token)
    }

    /// Consumes a CSRF token. Returns `true` exactly once per issued token,
    /// and `false` once it has expired.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Storage` if the store is unreachable.
    pub async fn consume_csrf(&self, token: &str) -> AuthResult<bool> {
        if token.is_empty() {
            return Ok(false);
        }
        Ok(self
            .store
            .get_and_delete(&TokenKind::Csrf.storage_key(token))
            .await?
            .is_some())
    }

    // -------------------------------------------------------------------------
    // Authorization codes
    // -------------------------------------------------------------------------

    /// Mints an authorization code bound to `grant`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Storage` if the store is unreachable.
    pub async fn issue_authorization_code(
        &self,
        grant: &AuthorizationCodeGrant,
    ) -> AuthResult<String> {
        let code = generate_token();
        self.put_json(
            TokenKind::AuthorizationCode,
            &code,
            grant,
            self.lifetimes.authorization_code_lifetime,
        )
        .await?;
        Ok(code)
    }

    /// Redeems an authorization code. A code can be redeemed once; later
    /// attempts and expired codes return `None`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Storage` if the store is unreachable or the
    /// stored payload is corrupt.
    pub async fn redeem_authorization_code(
        &self,
        code: &str,
    ) -> AuthResult<Option<AuthorizationCodeGrant>> {
        self.take_json(TokenKind::AuthorizationCode, code).await
    }

    // -------------------------------------------------------------------------
    // Access and refresh tokens
    // -------------------------------------------------------------------------

    /// Mints a new access token and refresh token for `client_id`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Storage` if the store is unreachable.
    pub async fn issue_token_pair(&self, client_id: &str) -> AuthResult<IssuedTokens> {
        let grant = TokenGrant {
            client_id: client_id.to_string(),
        };

        // The refresh token goes first so a failed write never leaves a
        // live access token behind.
        let refresh_token = generate_token();
        self.put_json(
            TokenKind::RefreshToken,
            &refresh_token,
            &grant,
            self.lifetimes.refresh_token_lifetime,
        )
        .await?;

        let access_token = generate_token();
        if let Err(e) = self
            .put_json(
                TokenKind::AccessToken,
                &access_token,
                &grant,
                self.lifetimes.access_token_lifetime,
            )
            .await
        {
            let refresh_key = TokenKind::RefreshToken.storage_key(&refresh_token);
            if let Err(cleanup) = self.store.delete(&refresh_key).await {
                tracing::warn!(error = %cleanup, "failed to discard orphaned refresh token");
            }
            return Err(e);
        }

        Ok(IssuedTokens {
            access_token,
            refresh_token,
            expires_in: self.lifetimes.access_token_lifetime,
        })
    }

    /// Looks up an access token without consuming it.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Storage` if the store is unreachable or the
    /// stored payload is corrupt.
    pub async fn verify_access_token(&self, token: &str) -> AuthResult<Option<TokenGrant>> {
        if token.is_empty() {
            return Ok(None);
        }
        let Some(raw) = self
            .store
            .get(&TokenKind::AccessToken.storage_key(token))
            .await?
        else {
            return Ok(None);
        };
        decode(&raw).map(Some)
    }

    /// Removes a refresh token and returns what it was bound to.
    ///
    /// The lookup and the removal happen in one atomic step, so a refresh
    /// token can be rotated at most once even under concurrent requests.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Storage` if the store is unreachable or the
    /// stored payload is corrupt.
    pub async fn rotate_refresh_token(&self, token: &str) -> AuthResult<Option<TokenGrant>> {
        self.take_json(TokenKind::RefreshToken, token).await
    }

    // -------------------------------------------------------------------------
    // Helpers
    // -------------------------------------------------------------------------

    async fn put_json<T: Serialize>(
        &self,
        kind: TokenKind,
        token: &str,
        payload: &T,
        ttl: Duration,
    ) -> AuthResult<()> {
        let value = serde_json::to_string(payload)
            .map_err(|e| AuthError::internal(format!("failed to encode {kind} payload: {e}")))?;
        self.store.put(&kind.storage_key(token), &value, ttl).await
    }

    async fn take_json<T: DeserializeOwned>(
        &self,
        kind: TokenKind,
        token: &str,
    ) -> AuthResult<Option<T>> {
        if token.is_empty() {
            return Ok(None);
        }
        match self.store.get_and_delete(&kind.storage_key(token)).await? {
            Some(raw) => decode(&raw).map(Some),
            None => Ok(None),
        }
    }
}

fn decode<T: DeserializeOwned>(raw: &str) -> AuthResult<T> {
    serde_json::from_str(raw).map_err(|e| AuthError::storage(format!("corrupt token record: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryTokenStore;

    fn tokens() -> (EphemeralTokens, MemoryTokenStore) {
        let store = MemoryTokenStore::new();
        let tokens = EphemeralTokens::new(Arc::new(store.clone()), OAuthConfig::default());
        (tokens, store)
    }

    fn code_grant() -> AuthorizationCodeGrant {
        AuthorizationCodeGrant {
            client_id: "client-1".into(),
            redirect_uri: "http://localhost/cb".into(),
            code_challenge: "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM".into(),
            code_challenge_method: "S256".into(),
        }
    }

    #[tokio::test]
    async fn test_csrf_is_single_use() {
        let (tokens, _) = tokens();
        let csrf = tokens.issue_csrf().await.unwrap();
        assert_eq!(csrf.len(), 43);

        assert!(tokens.consume_csrf(&csrf).await.unwrap());
        assert!(!tokens.consume_csrf(&csrf).await.unwrap());
        assert!(!tokens.consume_csrf("").await.unwrap());
        assert!(!tokens.consume_csrf("never-issued").await.unwrap());
    }

    #[tokio::test]
    async fn test_csrf_expires() {
        let store = MemoryTokenStore::new();
        let lifetimes = OAuthConfig {
            csrf_token_lifetime: Duration::from_millis(20),
            ..OAuthConfig::default()
        };
        let tokens = EphemeralTokens::new(Arc::new(store), lifetimes);
        let csrf = tokens.issue_csrf().await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!tokens.consume_csrf(&csrf).await.unwrap());
    }

    #[tokio::test]
    async fn test_authorization_code_roundtrip_is_single_use() {
        let (tokens, _) = tokens();
        let code = tokens.issue_authorization_code(&code_grant()).await.unwrap();

        let redeemed = tokens.redeem_authorization_code(&code).await.unwrap();
        assert_eq!(redeemed, Some(code_grant()));
        assert_eq!(tokens.redeem_authorization_code(&code).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_raw_tokens_are_not_stored_as_keys() {
        let (tokens, store) = tokens();
        let code = tokens.issue_authorization_code(&code_grant()).await.unwrap();
        assert_eq!(store.get(&code).await.unwrap(), None);
        assert!(
            store
                .get(&TokenKind::AuthorizationCode.storage_key(&code))
                .await
                .unwrap()
                .is_some()
        );
    }

    #[tokio::test]
    async fn test_token_pair_and_rotation() {
        let (tokens, _) = tokens();
        let pair = tokens.issue_token_pair("client-1").await.unwrap();
        assert_ne!(pair.access_token, pair.refresh_token);
        assert_eq!(pair.expires_in, Duration::from_secs(3600));

        let grant = tokens
            .verify_access_token(&pair.access_token)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(grant.client_id, "client-1");
        // verification is read-only
        assert!(
            tokens
                .verify_access_token(&pair.access_token)
                .await
                .unwrap()
                .is_some()
        );

        // kinds are namespaced: an access token is not a refresh token
        assert!(
            tokens
                .rotate_refresh_token(&pair.access_token)
                .await
                .unwrap()
                .is_none()
        );

        let rotated = tokens
            .rotate_refresh_token(&pair.refresh_token)
            .await
            .unwrap();
        assert_eq!(rotated.map(|g| g.client_id).as_deref(), Some("client-1"));
        assert!(
            tokens
                .rotate_refresh_token(&pair.refresh_token)
                .await
                .unwrap()
                .is_none()
        );
    }

    /// Rejects writes for one token kind, delegating everything else.
    struct RejectingStore {
        inner: MemoryTokenStore,
        rejected_prefix: &'static str,
    }

    #[async_trait::async_trait]
    impl TokenStore for RejectingStore {
        async fn put(&self, key: &str, value: &str, ttl: Duration) -> AuthResult<()> {
            if key.starts_with(self.rejected_prefix) {
                return Err(AuthError::storage("write rejected"));
            }
            self.inner.put(key, value, ttl).await
        }

        async fn get(&self, key: &str) -> AuthResult<Option<String>> {
            self.inner.get(key).await
        }

        async fn get_and_delete(&self, key: &str) -> AuthResult<Option<String>> {
            self.inner.get_and_delete(key).await
        }

        async fn delete(&self, key: &str) -> AuthResult<()> {
            self.inner.delete(key).await
        }
    }

    #[tokio::test]
    async fn test_failed_token_pair_leaves_no_live_tokens() {
        for kind in [TokenKind::AccessToken, TokenKind::RefreshToken] {
            let inner = MemoryTokenStore::new();
            let store = RejectingStore {
                inner: inner.clone(),
                rejected_prefix: kind.prefix(),
            };
            let tokens = EphemeralTokens::new(Arc::new(store), OAuthConfig::default());

            let err = tokens.issue_token_pair("client-1").await.unwrap_err();
            assert!(err.is_server_error());
            assert!(inner.is_empty(), "{kind} failure left entries behind");
        }
    }

    #[tokio::test]
    async fn test_corrupt_record_is_a_storage_error() {
        let (tokens, store) = tokens();
        store
            .put(
                &TokenKind::AccessToken.storage_key("tok"),
                "not json",
                Duration::from_secs(60),
            )
            .await
            .unwrap();
        let err = tokens.verify_access_token("tok").await.unwrap_err();
        assert!(err.is_server_error());
    }
}
