//! LLM client: the single point of entry for all model calls in AutoCare.
//!
//! ARCHITECTURAL RULE: No other module may call a model endpoint directly.
//! Chat completions and embeddings both go through `OllamaClient`.
//!
//! No retries: a failed call surfaces to the caller immediately. Timeouts are
//! enforced by the underlying HTTP client.
use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("LLM returned empty content")]
    EmptyContent,

    #[error("Embedding count mismatch: sent {expected} inputs, got {actual} vectors")]
    EmbeddingCount { expected: usize, actual: usize },
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
    options: ChatOptions,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatOptions {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    pub message: AssistantMessage,
    #[serde(default)]
    pub prompt_eval_count: Option<u32>,
    #[serde(default)]
    pub eval_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct AssistantMessage {
    #[serde(default)]
    pub content: String,
}

impl ChatResponse {
    /// Returns the assistant text, or `None` when the model produced only whitespace.
    pub fn text(&self) -> Option<&str> {
        let text = self.message.content.trim();
        (!text.is_empty()).then_some(text)
    }
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Debug, Deserialize)]
struct OllamaError {
    error: String,
}

/// HTTP client for an Ollama-compatible endpoint (local daemon or ollama.com).
#[derive(Clone)]
pub struct OllamaClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl OllamaClient {
    /// Builds a client for `base_url`. An empty `api_key` sends no Authorization header.
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self, LlmError> {
        let client = Client::builder().timeout(timeout).build()?;
        let api_key = (!api_key.trim().is_empty()).then(|| api_key.trim().to_string());

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Sends a non-streaming chat completion with one system and one user message.
    pub async fn chat(
        &self,
        model: &str,
        system: &str,
        user: &str,
        temperature: f32,
    ) -> Result<ChatResponse, LlmError> {
        let body = ChatRequest {
            model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            stream: false,
            options: ChatOptions { temperature },
        };

        let request = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&body);
        let response: ChatResponse = self.send(request).await?.json().await?;

        debug!(
            "Chat call succeeded: model={}, prompt_tokens={:?}, output_tokens={:?}",
            model, response.prompt_eval_count, response.eval_count
        );

        Ok(response)
    }

    /// Embeds each input string, returning one vector per input in the same order.
    pub async fn embed(&self, model: &str, inputs: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let request = self
            .client
            .post(format!("{}/api/embed", self.base_url))
            .json(&EmbedRequest {
                model,
                input: inputs,
            });
        let response: EmbedResponse = self.send(request).await?.json().await?;

        if response.embeddings.len() != inputs.len() {
            return Err(LlmError::EmbeddingCount {
                expected: inputs.len(),
                actual: response.embeddings.len(),
            });
        }

        debug!("Embedded {} inputs with {}", inputs.len(), model);
        Ok(response.embeddings)
    }

    async fn send(&self, request: RequestBuilder) -> Result<reqwest::Response, LlmError> {
        let request = match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        };

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                message: extract_error_message(body),
            });
        }

        Ok(response)
    }
}

/// Pulls the `error` field out of an Ollama error body, falling back to the raw body.
fn extract_error_message(body: String) -> String {
    serde_json::from_str::<OllamaError>(&body)
        .map(|e| e.error)
        .unwrap_or(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_error_message_from_json() {
        let body = r#"{"error": "model 'gemma3:4b' not found"}"#.to_string();
        assert_eq!(extract_error_message(body), "model 'gemma3:4b' not found");
    }

    #[test]
    fn test_extract_error_message_falls_back_to_body() {
        let body = "upstream connect error".to_string();
        assert_eq!(extract_error_message(body), "upstream connect error");
    }

    #[test]
    fn test_chat_response_text_trims() {
        let response: ChatResponse = serde_json::from_str(
            r#"{"message": {"role": "assistant", "content": "  Olá!  "}, "eval_count": 3}"#,
        )
        .unwrap();
        assert_eq!(response.text(), Some("Olá!"));
        assert_eq!(response.eval_count, Some(3));
    }

    #[test]
    fn test_chat_response_blank_content_is_none() {
        let response: ChatResponse =
            serde_json::from_str(r#"{"message": {"role": "assistant", "content": "   "}}"#)
                .unwrap();
        assert!(response.text().is_none());
    }

    #[test]
    fn test_new_trims_base_url_and_blank_key() {
        let client = OllamaClient::new("http://localhost:11434/", "  ", Duration::from_secs(5))
            .unwrap();
        assert_eq!(client.base_url(), "http://localhost:11434");
        assert!(client.api_key.is_none());
    }
}
