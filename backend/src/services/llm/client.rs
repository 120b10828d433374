//! Chat completion HTTP client

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::LlmConfig;
use crate::utils::TranslationError;

/// Shared HTTP client for the token and completion endpoints.
pub fn build_http_client(config: &LlmConfig) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .danger_accept_invalid_certs(config.accept_invalid_certs)
        .build()
}

// ============================================================================
// Wire format
// ============================================================================

#[derive(Debug, Serialize)]
pub struct ChatMessage<'a> {
    pub role: &'a str,
    pub content: &'a str,
}

#[derive(Debug, Serialize)]
pub struct ChatRequest<'a> {
    pub model: &'a str,
    pub messages: Vec<ChatMessage<'a>>,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    #[serde(default)]
    message: Option<ChatChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Pull `choices[0].message.content` out of a completion body, trimmed.
pub fn extract_content(body: &str) -> Result<String, TranslationError> {
    let resp: ChatResponse = serde_json::from_str(body)?;
    resp.choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message)
        .and_then(|message| message.content)
        .map(|content| content.trim().to_string())
        .ok_or(TranslationError::MissingContent)
}

// ============================================================================
// Client
// ============================================================================

#[derive(Clone)]
pub struct LLMClient {
    http_client: reqwest::Client,
    chat_url: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl LLMClient {
    pub fn new(http_client: reqwest::Client, config: &LlmConfig) -> Self {
        Self {
            http_client,
            chat_url: config.chat_url.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }

    pub fn request<'a>(&'a self, system: &'a str, user: &'a str) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage { role: "system", content: system },
                ChatMessage { role: "user", content: user },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }

    /// Single non-streaming completion round trip.
    pub async fn complete(
        &self,
        token: &str,
        system: &str,
        user: &str,
    ) -> Result<String, TranslationError> {
        let payload = self.request(system, user);

        let response = self
            .http_client
            .post(&self.chat_url)
            .bearer_auth(token)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("LLM request failed: {}", e);
                TranslationError::Request(e)
            })?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            tracing::warn!("LLM endpoint returned {}: {}", status, truncate(&body, 200));
            return Err(TranslationError::Status { status: status.as_u16(), body });
        }

        extract_content(&body)
    }
}

fn truncate(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::common::StubServer;

    fn client() -> LLMClient {
        LLMClient::new(reqwest::Client::new(), &LlmConfig::default())
    }

    #[test]
    fn test_request_body_shape() {
        let client = client();
        let body = serde_json::to_value(client.request("sys", "сколько лайков?")).unwrap();

        assert_eq!(body["model"], "GigaChat");
        assert_eq!(body["temperature"], 0.0);
        assert_eq!(body["max_tokens"], 260);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], "sys");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["messages"][1]["content"], "сколько лайков?");
        assert_eq!(body["messages"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_extract_content_trims() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"  SELECT 1\n"}}]}"#;
        assert_eq!(extract_content(body).unwrap(), "SELECT 1");
    }

    #[test]
    fn test_extract_content_first_choice_only() {
        let body = r#"{"choices":[{"message":{"content":"SELECT 1"}},{"message":{"content":"SELECT 2"}}]}"#;
        assert_eq!(extract_content(body).unwrap(), "SELECT 1");
    }

    #[test]
    fn test_extract_content_missing_field() {
        for body in [r#"{"choices":[]}"#, r#"{}"#, r#"{"choices":[{"message":{}}]}"#] {
            assert!(matches!(extract_content(body), Err(TranslationError::MissingContent)));
        }
    }

    #[test]
    fn test_extract_content_malformed_json() {
        assert!(matches!(extract_content("<html>502</html>"), Err(TranslationError::Malformed(_))));
    }

    fn client_for(server: &StubServer) -> LLMClient {
        let config = LlmConfig {
            chat_url: format!("{}/api/v1/chat/completions", server.url),
            ..LlmConfig::default()
        };
        LLMClient::new(reqwest::Client::new(), &config)
    }

    #[tokio::test]
    async fn test_complete_request_shape() {
        let server = StubServer::start(
            200,
            r#"{"choices":[{"message":{"role":"assistant","content":"SELECT 1\n"}}]}"#,
        )
        .await;

        let sql = client_for(&server).complete("tok-123", "sys", "сколько видео?").await.unwrap();
        assert_eq!(sql, "SELECT 1");

        let requests = server.requests();
        assert_eq!(requests.len(), 1);
        let req = &requests[0];
        assert!(req.request_line().starts_with("POST /api/v1/chat/completions "));
        assert_eq!(req.header("authorization"), Some("Bearer tok-123"));
        assert_eq!(req.header("content-type"), Some("application/json"));

        let body: serde_json::Value = serde_json::from_str(&req.body).unwrap();
        assert_eq!(body["model"], "GigaChat");
        assert_eq!(body["temperature"], 0.0);
        assert_eq!(body["max_tokens"], 260);
        assert_eq!(body["messages"][0]["content"], "sys");
        assert_eq!(body["messages"][1]["content"], "сколько видео?");
    }

    #[tokio::test]
    async fn test_complete_error_status() {
        let server = StubServer::start(503, r#"{"message":"overloaded"}"#).await;

        let err = client_for(&server).complete("tok", "sys", "q").await.unwrap_err();

        assert!(matches!(err, TranslationError::Status { status: 503, .. }));
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("привет", 3), "при");
        assert_eq!(truncate("ok", 10), "ok");
    }
}
