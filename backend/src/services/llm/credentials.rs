//! LLM Provider Credentials
//!
//! Client-credentials exchange and bearer token cache. A cached token is handed
//! out only while it stays valid for at least [`REFRESH_MARGIN_SECS`]; otherwise a
//! fresh exchange runs and replaces the cache entry as a whole.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde::Deserialize;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::config::LlmConfig;
use crate::utils::AuthError;

/// Tokens closer than this to expiry are refreshed before use.
pub const REFRESH_MARGIN_SECS: i64 = 30;

/// Lifetime assumed when the provider sends neither `expires_at` nor `expires_in`.
pub const DEFAULT_EXPIRES_IN_SECS: i64 = 1500;

// ============================================================================
// Wire format
// ============================================================================

/// Token endpoint response body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    /// Absolute expiry, milliseconds since epoch
    #[serde(default)]
    pub expires_at: Option<f64>,
    /// Relative lifetime in seconds
    #[serde(default)]
    pub expires_in: Option<f64>,
}

// ============================================================================
// Cached token
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub value: String,
    pub expires_at: DateTime<Utc>,
}

impl AccessToken {
    /// Build a token from the provider response received at `now`.
    pub fn from_response(resp: TokenResponse, now: DateTime<Utc>) -> Result<Self, AuthError> {
        let value = resp
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::MissingToken)?;

        // Provider values are untrusted: out-of-range numbers must not reach chrono's
        // panicking arithmetic.
        let expires_at = match (resp.expires_at, resp.expires_in) {
            (Some(ms), _) => DateTime::from_timestamp_millis(ms as i64)
                .ok_or_else(|| AuthError::InvalidExpiry(format!("expires_at={}", ms)))?,
            (None, Some(secs)) => Duration::try_seconds(secs as i64)
                .and_then(|lifetime| now.checked_add_signed(lifetime))
                .ok_or_else(|| AuthError::InvalidExpiry(format!("expires_in={}", secs)))?,
            (None, None) => now + Duration::seconds(DEFAULT_EXPIRES_IN_SECS),
        };

        Ok(Self { value, expires_at })
    }

    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at
            .checked_sub_signed(Duration::seconds(REFRESH_MARGIN_SECS))
            .is_some_and(|deadline| now < deadline)
    }
}

// ============================================================================
// Exchange
// ============================================================================

/// One round trip to the provider's token endpoint.
#[async_trait]
pub trait TokenExchange: Send + Sync {
    async fn exchange(&self) -> Result<TokenResponse, AuthError>;
}

/// OAuth client-credentials exchange over HTTPS.
pub struct OAuthTokenExchange {
    http_client: reqwest::Client,
    oauth_url: String,
    auth_key: String,
    scope: String,
}

impl OAuthTokenExchange {
    pub fn new(http_client: reqwest::Client, config: &LlmConfig) -> Self {
        Self {
            http_client,
            oauth_url: config.oauth_url.clone(),
            auth_key: config.auth_key.clone(),
            scope: config.scope.clone(),
        }
    }
}

#[async_trait]
impl TokenExchange for OAuthTokenExchange {
    async fn exchange(&self) -> Result<TokenResponse, AuthError> {
        let rq_uid = Uuid::new_v4().to_string();
        tracing::debug!("Requesting LLM access token (RqUID={})", rq_uid);

        let response = self
            .http_client
            .post(&self.oauth_url)
            .header(AUTHORIZATION, format!("Basic {}", self.auth_key))
            .header(ACCEPT, "application/json")
            .header("RqUID", &rq_uid)
            .form(&[("scope", self.scope.as_str())])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            tracing::warn!("Token endpoint returned {} (RqUID={})", status, rq_uid);
            return Err(AuthError::Status { status: status.as_u16(), body });
        }

        Ok(serde_json::from_str(&body)?)
    }
}

// ============================================================================
// Manager
// ============================================================================

/// Owns the cached bearer token. Share it behind an `Arc`.
pub struct CredentialManager {
    exchange: Box<dyn TokenExchange>,
    cached: RwLock<Option<AccessToken>>,
}

impl CredentialManager {
    pub fn new(exchange: impl TokenExchange + 'static) -> Self {
        Self { exchange: Box::new(exchange), cached: RwLock::new(None) }
    }

    pub async fn get_token(&self) -> Result<String, AuthError> {
        self.get_token_at(Utc::now()).await
    }

    /// Two tasks may refresh at the same time; the later write wins and both
    /// tokens are valid.
    pub async fn get_token_at(&self, now: DateTime<Utc>) -> Result<String, AuthError> {
        {
            let cached = self.cached.read().await;
            if let Some(token) = cached.as_ref()
                && token.is_fresh(now)
            {
                return Ok(token.value.clone());
            }
        }

        let response = self.exchange.exchange().await?;
        let token = AccessToken::from_response(response, now)?;
        tracing::info!("LLM access token refreshed, expires at {}", token.expires_at);

        let value = token.value.clone();
        *self.cached.write().await = Some(token);
        Ok(value)
    }

    /// Drop the cached token so the next call exchanges again.
    pub async fn invalidate(&self) {
        self.cached.write().await.take();
    }
}
