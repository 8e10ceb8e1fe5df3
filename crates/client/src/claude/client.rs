//! Claude API client for completions.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue, RETRY_AFTER};
use secrecy::ExposeSecret;
use tracing::instrument;

use crate::config::ClaudeConfig;

use super::CompletionProvider;
use super::error::{ClaudeError, ErrorBody};
use super::types::{ChatRequest, ChatResponse, Message};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Claude API client.
#[derive(Clone)]
pub struct ClaudeClient {
    inner: Arc<ClaudeClientInner>,
}

struct ClaudeClientInner {
    client: reqwest::Client,
    api_url: String,
    model: String,
    max_tokens: u32,
}

impl ClaudeClient {
    /// Create a new Claude client.
    ///
    /// # Errors
    ///
    /// Returns `ClaudeError::Config` if the API key contains invalid header
    /// characters or the HTTP client cannot be built.
    pub fn new(config: &ClaudeConfig) -> Result<Self, ClaudeError> {
        let api_key = HeaderValue::from_str(config.api_key.expose_secret())
            .map_err(|_| ClaudeError::Config("API key is not a valid header value".to_string()))?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert("x-api-key", api_key);
        headers.insert(
            "anthropic-version",
            HeaderValue::from_static(ANTHROPIC_VERSION),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ClaudeError::Config(e.to_string()))?;

        Ok(Self {
            inner: Arc::new(ClaudeClientInner {
                client,
                api_url: config.api_url.clone(),
                model: config.model.clone(),
                max_tokens: config.max_tokens,
            }),
        })
    }

    /// Model this client sends requests to.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.inner.model
    }

    /// Send a chat request and get a complete response.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or returns an error response.
    #[instrument(skip(self, messages, system), fields(model = %self.inner.model))]
    pub async fn chat(
        &self,
        messages: Vec<Message>,
        system: Option<String>,
    ) -> Result<ChatResponse, ClaudeError> {
        let request = ChatRequest {
            model: self.inner.model.clone(),
            max_tokens: self.inner.max_tokens,
            messages,
            system,
            temperature: Some(0.0),
        };

        let response = self
            .inner
            .client
            .post(&self.inner.api_url)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(ClaudeError::RateLimited(retry_after(response.headers())));
        }
        if status == StatusCode::UNAUTHORIZED {
            return Err(ClaudeError::Unauthorized);
        }

        let body = response.text().await?;
        if !status.is_success() {
            return Err(api_error(status, body));
        }

        let response: ChatResponse =
            serde_json::from_str(&body).map_err(|e| ClaudeError::Decode(e.to_string()))?;
        tracing::debug!(
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            stop_reason = ?response.stop_reason,
            "Completion received"
        );
        Ok(response)
    }
}

/// Seconds from a `Retry-After` header, 60 when absent or not a number.
fn retry_after(headers: &HeaderMap) -> u64 {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(60)
}

fn api_error(status: StatusCode, body: String) -> ClaudeError {
    match serde_json::from_str::<ErrorBody>(&body) {
        Ok(ErrorBody { error }) => ClaudeError::Api {
            status: status.as_u16(),
            kind: error.kind,
            message: error.message,
        },
        Err(_) => ClaudeError::Api {
            status: status.as_u16(),
            kind: format!("http_{}", status.as_u16()),
            message: body,
        },
    }
}

#[async_trait]
impl CompletionProvider for ClaudeClient {
    async fn complete(&self, system: &str, user: &str) -> Result<String, ClaudeError> {
        let response = self
            .chat(vec![Message::user(user)], Some(system.to_string()))
            .await?;
        response
            .first_text()
            .map(str::to_string)
            .ok_or(ClaudeError::EmptyResponse)
    }
}

#[cfg(test)]
mod tests {
    use secrecy::SecretString;

    use super::*;

    fn config(api_key: &str) -> ClaudeConfig {
        ClaudeConfig {
            api_key: SecretString::from(api_key),
            model: "claude-sonnet-4-20250514".to_string(),
            api_url: "http://127.0.0.1:1/v1/messages".to_string(),
            max_tokens: 256,
        }
    }

    #[test]
    fn test_new_rejects_invalid_header_key() {
        let result = ClaudeClient::new(&config("bad\nkey"));
        assert!(matches!(result, Err(ClaudeError::Config(_))));
    }

    #[test]
    fn test_new_keeps_model() {
        let client = ClaudeClient::new(&config("sk-ant-api03-Zx9")).expect("client");
        assert_eq!(client.model(), "claude-sonnet-4-20250514");
    }

    #[test]
    fn test_api_error_body() {
        let body = r#"{"type":"error","error":{"type":"overloaded_error","message":"Overloaded"}}"#;
        let err = api_error(StatusCode::SERVICE_UNAVAILABLE, body.to_string());
        assert!(matches!(
            err,
            ClaudeError::Api { status: 503, ref kind, .. } if kind == "overloaded_error"
        ));

        let err = api_error(StatusCode::BAD_GATEWAY, "<html>".to_string());
        assert!(matches!(
            err,
            ClaudeError::Api { ref kind, ref message, .. } if kind == "http_502" && message == "<html>"
        ));
    }

    #[test]
    fn test_retry_after_header() {
        let mut headers = HeaderMap::new();
        assert_eq!(retry_after(&headers), 60);

        headers.insert(RETRY_AFTER, HeaderValue::from_static("12"));
        assert_eq!(retry_after(&headers), 12);

        headers.insert(RETRY_AFTER, HeaderValue::from_static("Wed, 21 Oct 2026 07:28:00 GMT"));
        assert_eq!(retry_after(&headers), 60);
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_http_error() {
        let client = ClaudeClient::new(&config("sk-ant-api03-Zx9")).expect("client");
        let err = client
            .complete("system", "question")
            .await
            .expect_err("nothing listens on port 1");
        assert!(matches!(err, ClaudeError::Http(_)));
        assert!(err.is_transient());
    }

    #[test]
    fn test_claude_client_is_send_sync() {
        fn assert_send_sync<T: Send + Sync + Clone>() {}
        assert_send_sync::<ClaudeClient>();
    }
}
