//! Bearer-token cache for platforms that use OAuth client credentials.
//!
//! The cache owns the token; callers only ever see the token string. A refresh
//! is performed while holding the state lock, so concurrent callers that find
//! the token stale queue behind the first one and reuse its outcome instead of
//! issuing their own exchange. That includes a failed exchange: callers that
//! were already waiting get the same error.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::error::AuthError;

/// Refresh this long before the issuer's reported expiry.
pub const DEFAULT_TOKEN_MARGIN: Duration = Duration::from_secs(60);

/// A freshly issued token as reported by the issuer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub access_token: String,
    pub expires_in: Duration,
}

/// Performs one credential exchange. Implemented over HTTP by [`ClientCredentials`].
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn fetch_token(&self) -> Result<IssuedToken, AuthError>;
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: Instant,
}

#[derive(Debug, Default)]
struct CacheState {
    token: Option<CachedToken>,
    last_error: Option<AuthError>,
}

pub struct TokenCache {
    source: Box<dyn TokenSource>,
    margin: Duration,
    /// Bumped after every finished exchange, read before queueing on `state`.
    exchanges: AtomicU64,
    state: Mutex<CacheState>,
}

impl TokenCache {
    pub fn new(source: impl TokenSource + 'static) -> Self {
        Self::with_margin(source, DEFAULT_TOKEN_MARGIN)
    }

    pub fn with_margin(source: impl TokenSource + 'static, margin: Duration) -> Self {
        Self {
            source: Box::new(source),
            margin,
            exchanges: AtomicU64::new(0),
            state: Mutex::new(CacheState::default()),
        }
    }

    /// Return a valid token, exchanging credentials at most once per expiry.
    ///
    /// On failure the previously cached token (if any) is kept as is, and
    /// every caller that queued behind the failed exchange receives its error.
    pub async fn get_token(&self) -> Result<String, AuthError> {
        let seen = self.exchanges.load(Ordering::Acquire);
        let mut state = self.state.lock().await;
        if let Some(cached) = state.token.as_ref() {
            if Instant::now() < cached.expires_at {
                return Ok(cached.value.clone());
            }
        }
        if self.exchanges.load(Ordering::Acquire) != seen {
            if let Some(err) = state.last_error.clone() {
                return Err(err);
            }
        }

        let outcome = self.source.fetch_token().await;
        self.exchanges.fetch_add(1, Ordering::AcqRel);
        match outcome {
            Ok(issued) => {
                let lifetime = issued.expires_in.saturating_sub(self.margin);
                tracing::debug!(valid_for_secs = lifetime.as_secs(), "refreshed access token");
                let value = issued.access_token.clone();
                state.token = Some(CachedToken {
                    value: issued.access_token,
                    expires_at: Instant::now() + lifetime,
                });
                state.last_error = None;
                Ok(value)
            }
            Err(err) => {
                tracing::warn!(error = %err, "access token exchange failed");
                state.last_error = Some(err.clone());
                Err(err)
            }
        }
    }
}

/// OAuth2 client-credentials grant against a token endpoint.
#[derive(Clone)]
pub struct ClientCredentials {
    http: reqwest::Client,
    token_url: String,
    client_id: Option<String>,
    client_secret: Option<String>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    expires_in: Option<u64>,
}

impl ClientCredentials {
    pub fn new(
        http: reqwest::Client,
        token_url: impl Into<String>,
        client_id: Option<String>,
        client_secret: Option<String>,
    ) -> Self {
        Self {
            http,
            token_url: token_url.into(),
            client_id,
            client_secret,
        }
    }
}

#[async_trait]
impl TokenSource for ClientCredentials {
    async fn fetch_token(&self) -> Result<IssuedToken, AuthError> {
        let (id, secret) = match (self.client_id.as_deref(), self.client_secret.as_deref()) {
            (Some(id), Some(secret)) if !id.is_empty() && !secret.is_empty() => (id, secret),
            _ => return Err(AuthError::MissingCredentials),
        };

        let resp = self
            .http
            .post(&self.token_url)
            .basic_auth(id, Some(secret))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body("grant_type=client_credentials")
            .send()
            .await
            .map_err(|e| AuthError::Network(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(AuthError::Rejected {
                status: status.as_u16(),
            });
        }

        let body: TokenResponse = resp
            .json()
            .await
            .map_err(|e| AuthError::MalformedResponse(e.to_string()))?;
        let access_token = body
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AuthError::MalformedResponse("missing access_token".to_string()))?;
        let expires_in = body
            .expires_in
            .ok_or_else(|| AuthError::MalformedResponse("missing expires_in".to_string()))?;

        Ok(IssuedToken {
            access_token,
            expires_in: Duration::from_secs(expires_in),
        })
    }
}
