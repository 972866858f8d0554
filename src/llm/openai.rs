//! OpenAI-compatible chat completions backend (Groq, OpenAI, Ollama, ...).

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::BackendConfig;
use crate::error::GenerationError;
use crate::llm::backend::{Completion, TextBackend};

/// Phrases backends use when a request is over the context window.
const PAYLOAD_TOO_LARGE_MARKERS: [&str; 4] = [
    "context_length",
    "context length",
    "too large",
    "maximum context",
];

/// Chat message in a request
#[derive(Serialize, Debug)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

/// Chat completions request body
#[derive(Serialize, Debug)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    stream: bool,
}

#[derive(Deserialize, Debug)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize, Debug)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize, Debug)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Backend speaking the OpenAI chat completions protocol.
pub struct OpenAiCompatibleBackend {
    client: Client,
    /// Base URL without the `/v1/chat/completions` suffix.
    base_url: String,
}

impl OpenAiCompatibleBackend {
    pub fn new(config: &BackendConfig) -> Result<Self, GenerationError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GenerationError::unknown(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl TextBackend for OpenAiCompatibleBackend {
    async fn complete(
        &self,
        prompt: &str,
        model: &str,
        credential: &str,
    ) -> Result<Completion, GenerationError> {
        let url = self.endpoint();
        let body = ChatRequest {
            model,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
            stream: false,
        };

        debug!(url = %url, model, prompt_len = prompt.len(), "Sending chat completion request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(credential)
            .json(&body)
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &text));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::unknown(format!("Invalid response body: {e}")))?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| GenerationError::unknown("Backend returned no choices"))?;

        debug!("Received chat completion response");

        Ok(Completion {
            text: choice.message.content.unwrap_or_default(),
        })
    }
}

fn classify_transport_error(e: reqwest::Error) -> GenerationError {
    if e.is_timeout() || e.is_connect() || e.is_request() {
        GenerationError::transient(e.to_string())
    } else {
        GenerationError::unknown(e.to_string())
    }
}

/// Map a non-success HTTP status (and its body) to a generation error.
pub(crate) fn classify_status(status: StatusCode, body: &str) -> GenerationError {
    let detail = format!("HTTP {}: {}", status.as_u16(), truncate(body, 300));

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => GenerationError::auth_missing(detail),
        StatusCode::PAYLOAD_TOO_LARGE => GenerationError::payload_too_large(detail),
        StatusCode::BAD_REQUEST if mentions_payload_size(body) => {
            GenerationError::payload_too_large(detail)
        }
        StatusCode::REQUEST_TIMEOUT | StatusCode::TOO_MANY_REQUESTS => {
            GenerationError::transient(detail)
        }
        s if s.is_server_error() => GenerationError::transient(detail),
        _ => GenerationError::unknown(detail),
    }
}

fn mentions_payload_size(body: &str) -> bool {
    let lower = body.to_lowercase();
    PAYLOAD_TOO_LARGE_MARKERS.iter().any(|m| lower.contains(m))
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GenerationErrorKind;

    #[test]
    fn test_classify_auth_statuses() {
        assert_eq!(
            classify_status(StatusCode::UNAUTHORIZED, "invalid api key").kind,
            GenerationErrorKind::AuthMissing
        );
        assert_eq!(
            classify_status(StatusCode::FORBIDDEN, "").kind,
            GenerationErrorKind::AuthMissing
        );
    }

    #[test]
    fn test_classify_payload_too_large() {
        assert_eq!(
            classify_status(StatusCode::PAYLOAD_TOO_LARGE, "").kind,
            GenerationErrorKind::PayloadTooLarge
        );
        let body = r#"{"error":{"code":"context_length_exceeded","message":"Please reduce the length of the messages."}}"#;
        assert_eq!(
            classify_status(StatusCode::BAD_REQUEST, body).kind,
            GenerationErrorKind::PayloadTooLarge
        );
    }

    #[test]
    fn test_classify_other_bad_request_is_unknown() {
        assert_eq!(
            classify_status(StatusCode::BAD_REQUEST, "model not found").kind,
            GenerationErrorKind::Unknown
        );
    }

    #[test]
    fn test_classify_transient_statuses() {
        for status in [
            StatusCode::TOO_MANY_REQUESTS,
            StatusCode::REQUEST_TIMEOUT,
            StatusCode::INTERNAL_SERVER_ERROR,
            StatusCode::BAD_GATEWAY,
            StatusCode::SERVICE_UNAVAILABLE,
        ] {
            assert_eq!(
                classify_status(status, "").kind,
                GenerationErrorKind::Transient,
                "{status}"
            );
        }
    }

    #[test]
    fn test_endpoint_strips_trailing_slash() {
        let config = BackendConfig {
            base_url: "http://localhost:11434/".to_string(),
            ..BackendConfig::default()
        };
        let backend = OpenAiCompatibleBackend::new(&config).unwrap();
        assert_eq!(backend.endpoint(), "http://localhost:11434/v1/chat/completions");
    }

    #[test]
    fn test_detail_is_truncated() {
        let body = "x".repeat(1000);
        let err = classify_status(StatusCode::BAD_GATEWAY, &body);
        assert!(err.message.len() < 400);
    }
}
