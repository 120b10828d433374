//! Question → SQL translation

use std::sync::Arc;

use async_trait::async_trait;

use super::client::LLMClient;
use super::credentials::CredentialManager;
use super::prompt;
use crate::utils::TranslationError;

/// Turns a free-text question into raw, untrusted model output.
#[async_trait]
pub trait SqlTranslator: Send + Sync {
    async fn translate(&self, question: &str) -> Result<String, TranslationError>;
}

/// Translator backed by the chat completion API.
pub struct LlmTranslator {
    client: LLMClient,
    credentials: Arc<CredentialManager>,
}

impl LlmTranslator {
    pub fn new(client: LLMClient, credentials: Arc<CredentialManager>) -> Self {
        Self { client, credentials }
    }
}

#[async_trait]
impl SqlTranslator for LlmTranslator {
    async fn translate(&self, question: &str) -> Result<String, TranslationError> {
        let token = self.credentials.get_token().await?;
        let system = prompt::system_prompt();

        let result = self.client.complete(&token, &system, question).await;
        if let Err(TranslationError::Status { status: 401, .. }) = &result {
            // Revoked before its advertised expiry; the next question exchanges again
            tracing::warn!("Completion endpoint rejected the cached token");
            self.credentials.invalidate().await;
        }
        let raw = result?;
        tracing::debug!("LLM produced: {}", raw);
        Ok(raw)
    }
}
