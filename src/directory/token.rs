//! Bearer tokens for the Graph API.
//!
//! Tokens come from an `azure_identity` client secret credential and are
//! cached as a pre-formatted `Bearer ...` header until shortly before expiry.

use std::{sync::Arc, time::Instant};

use async_trait::async_trait;
use azure_core::credentials::{AccessToken, Secret, TokenCredential};
use azure_identity::ClientSecretCredential;
use tokio::sync::RwLock;

use super::DirectoryError;
use crate::config::DirectoryCredentials;

/// Scope requesting the application permissions granted to the app registration.
pub const GRAPH_SCOPE: &str = "https://graph.microsoft.com/.default";

/// Refresh tokens this long before they expire.
const TOKEN_REFRESH_BUFFER_SECS: u64 = 300;

/// Source of `Authorization` header values.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn bearer_header(&self) -> Result<Arc<str>, DirectoryError>;
}

#[derive(Debug, Clone)]
struct CachedToken {
    bearer_header: Arc<str>,
    expires_at: Instant,
}

impl CachedToken {
    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// Client credential token source for the Graph API.
pub struct GraphTokenSource {
    credential: Arc<dyn TokenCredential>,
    cached_token: RwLock<Option<CachedToken>>,
}

impl std::fmt::Debug for GraphTokenSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphTokenSource").finish_non_exhaustive()
    }
}

impl GraphTokenSource {
    /// Build a token source from tenant id, client id and client secret.
    ///
    /// No token is requested until the first call.
    pub fn from_credentials(credentials: DirectoryCredentials<'_>) -> Result<Self, DirectoryError> {
        let credential = ClientSecretCredential::new(
            credentials.tenant_id,
            credentials.client_id.to_string(),
            Secret::new(credentials.client_secret.to_string()),
            None,
        )
        .map_err(|e| DirectoryError::Config(format!("Failed to create client secret credential: {e}")))?;

        Ok(Self {
            credential,
            cached_token: RwLock::new(None),
        })
    }
}

#[async_trait]
impl TokenProvider for GraphTokenSource {
    async fn bearer_header(&self) -> Result<Arc<str>, DirectoryError> {
        {
            let cache = self.cached_token.read().await;
            if let Some(ref cached) = *cache
                && !cached.is_expired()
            {
                return Ok(cached.bearer_header.clone());
            }
        }

        let mut cache = self.cached_token.write().await;

        // Another task may have refreshed while we waited for the lock
        if let Some(ref cached) = *cache
            && !cached.is_expired()
        {
            return Ok(cached.bearer_header.clone());
        }

        let access_token: AccessToken = self
            .credential
            .get_token(&[GRAPH_SCOPE], None)
            .await
            .map_err(|e| DirectoryError::Auth(format!("Failed to get Graph token: {e}")))?;

        let expires_in_secs = (access_token.expires_on - time::OffsetDateTime::now_utc())
            .whole_seconds()
            .max(0) as u64;
        let expires_at = Instant::now()
            + std::time::Duration::from_secs(expires_in_secs.saturating_sub(TOKEN_REFRESH_BUFFER_SECS));

        let bearer_header: Arc<str> = format!("Bearer {}", access_token.token.secret()).into();
        *cache = Some(CachedToken {
            bearer_header: bearer_header.clone(),
            expires_at,
        });

        tracing::debug!(expires_in_secs, "Acquired new Graph token");

        Ok(bearer_header)
    }
}

/// Fixed token, for pointing the client at a stub server.
#[cfg(test)]
pub(crate) struct StaticToken(pub &'static str);

#[cfg(test)]
#[async_trait]
impl TokenProvider for StaticToken {
    async fn bearer_header(&self) -> Result<Arc<str>, DirectoryError> {
        Ok(format!("Bearer {}", self.0).into())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_cached_token_expiry() {
        let token = CachedToken {
            bearer_header: "Bearer test".into(),
            expires_at: Instant::now() + Duration::from_secs(3600),
        };
        assert!(!token.is_expired());

        let expired = CachedToken {
            bearer_header: "Bearer test".into(),
            expires_at: Instant::now() - Duration::from_secs(1),
        };
        assert!(expired.is_expired());
    }

    #[test]
    fn test_from_credentials_does_not_fetch() {
        let source = GraphTokenSource::from_credentials(DirectoryCredentials {
            tenant_id: "00000000-0000-0000-0000-000000000000",
            client_id: "client",
            client_secret: "secret",
        })
        .unwrap();
        assert!(format!("{source:?}").starts_with("GraphTokenSource"));
    }

    #[tokio::test]
    async fn test_static_token_header() {
        assert_eq!(&*StaticToken("abc").bearer_header().await.unwrap(), "Bearer abc");
    }
}
