//! LLM Service Module
//!
//! Translates analytics questions into SQL through a chat completion API.
//!
//! # Architecture
//! ```text
//! ┌───────────────────┐
//! │   SqlTranslator   │  ← Trait (consumed by MetricsService)
//! └─────────┬─────────┘
//!           │
//!    ┌──────┴───────┐
//!    ▼              ▼
//! ┌─────────┐  ┌─────────────────┐
//! │LLMClient│  │CredentialManager│ ← cached bearer token
//! └─────────┘  └─────────────────┘
//! ```

mod client;
mod credentials;
mod prompt;
mod translator;

pub use client::{LLMClient, build_http_client, extract_content};
pub use credentials::{
    AccessToken, CredentialManager, DEFAULT_EXPIRES_IN_SECS, OAuthTokenExchange,
    REFRESH_MARGIN_SECS, TokenExchange, TokenResponse,
};
pub use prompt::{build_system_prompt, system_prompt};
pub use translator::{LlmTranslator, SqlTranslator};

use std::sync::Arc;

use crate::config::LlmConfig;

/// Wire the HTTP client, credential cache and translator from config.
pub fn translator_from_config(config: &LlmConfig) -> Result<LlmTranslator, reqwest::Error> {
    let http_client = build_http_client(config)?;
    let credentials =
        Arc::new(CredentialManager::new(OAuthTokenExchange::new(http_client.clone(), config)));
    Ok(LlmTranslator::new(LLMClient::new(http_client, config), credentials))
}
