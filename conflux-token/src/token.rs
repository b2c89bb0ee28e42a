//! Per-connection credential refresh (§4.7). Decrypted once per run and
//! wrapped here so that concurrent workers share a single in-flight refresh.

use crate::error::TokenError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

#[derive(Debug, Clone)]
pub struct Credential {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
}

impl Credential {
    fn needs_refresh(&self, skew: Duration) -> bool {
        let skew = chrono::Duration::from_std(skew).unwrap_or(chrono::Duration::zero());
        self.expires_at <= Utc::now() + skew
    }
}

/// Integration-specific refresh endpoint. Implementations substitute either
/// the platform's default client credentials or a BYOC override.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh(&self, refresh_token: &str) -> Result<Credential, TokenError>;
}

/// Wraps a connection's credential with opportunistic refresh. Every caller
/// serializes on the same `Mutex`, so at most one refresh is ever in flight
/// per connection — concurrent callers that find a refresh already underway
/// simply wait for it and reuse the result.
pub struct TokenManager {
    state: Arc<Mutex<Credential>>,
    refresher: Arc<dyn TokenRefresher>,
    refresh_skew: Duration,
}

impl TokenManager {
    pub fn new(initial: Credential, refresher: Arc<dyn TokenRefresher>, refresh_skew: Duration) -> Self {
        Self { state: Arc::new(Mutex::new(initial)), refresher, refresh_skew }
    }

    /// Returns a valid access token, refreshing first if fewer than
    /// `refresh_skew` seconds remain before expiry.
    pub async fn access_token(&self) -> Result<String, TokenError> {
        let mut guard = self.state.lock().await;
        if guard.needs_refresh(self.refresh_skew) {
            let refresh_token = guard
                .refresh_token
                .clone()
                .ok_or_else(|| TokenError::RefreshFailed("no refresh token on file".into()))?;
            tracing::debug!("refreshing access token");
            *guard = self.refresher.refresh(&refresh_token).await?;
        }
        Ok(guard.access_token.clone())
    }

    /// Force a refresh regardless of expiry, used after a 401 response.
    pub async fn force_refresh(&self) -> Result<String, TokenError> {
        let mut guard = self.state.lock().await;
        let refresh_token = guard
            .refresh_token
            .clone()
            .ok_or_else(|| TokenError::AuthFailed("no refresh token on file".into()))?;
        *guard = self.refresher.refresh(&refresh_token).await?;
        Ok(guard.access_token.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingRefresher {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl TokenRefresher for CountingRefresher {
        async fn refresh(&self, _refresh_token: &str) -> Result<Credential, TokenError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Credential {
                access_token: "fresh".into(),
                refresh_token: Some("rt".into()),
                expires_at: Utc::now() + chrono::Duration::hours(1),
            })
        }
    }

    #[tokio::test]
    async fn does_not_refresh_when_far_from_expiry() {
        let calls = Arc::new(AtomicUsize::new(0));
        let manager = TokenManager::new(
            Credential { access_token: "initial".into(), refresh_token: Some("rt".into()), expires_at: Utc::now() + chrono::Duration::hours(1) },
            Arc::new(CountingRefresher { calls: calls.clone() }),
            Duration::from_secs(300),
        );
        assert_eq!(manager.access_token().await.unwrap(), "initial");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn refreshes_when_within_skew_window() {
        let calls = Arc::new(AtomicUsize::new(0));
        let manager = TokenManager::new(
            Credential { access_token: "stale".into(), refresh_token: Some("rt".into()), expires_at: Utc::now() + chrono::Duration::seconds(10) },
            Arc::new(CountingRefresher { calls: calls.clone() }),
            Duration::from_secs(300),
        );
        assert_eq!(manager.access_token().await.unwrap(), "fresh");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn missing_refresh_token_errors() {
        let manager = TokenManager::new(
            Credential { access_token: "stale".into(), refresh_token: None, expires_at: Utc::now() - chrono::Duration::seconds(1) },
            Arc::new(CountingRefresher { calls: Arc::new(AtomicUsize::new(0)) }),
            Duration::from_secs(300),
        );
        assert!(manager.access_token().await.is_err());
    }
}
