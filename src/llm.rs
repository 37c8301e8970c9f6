//! Completion backend — the external text generator.
//!
//! The backend is an injectable trait so the composer can be exercised with
//! a stub generator in tests. The real implementation talks to an
//! OpenAI-compatible chat-completions endpoint over HTTPS. No retries: a
//! failed completion propagates and the affected inquiry is skipped.

use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

use crate::config::CompletionConfig;
use crate::error::GenerationError;

/// Upper bound for one generated reply.
const REPLY_MAX_TOKENS: u32 = 1024;

/// Low temperature — replies should track the policy text closely.
const REPLY_TEMPERATURE: f32 = 0.2;

/// External text-generation service.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Generate a completion for the given policy instruction and inquiry
    /// text. Returns the raw generated reply.
    async fn complete(
        &self,
        instruction: &str,
        inquiry: &str,
    ) -> Result<String, GenerationError>;

    /// Model identifier, for diagnostics.
    fn model_id(&self) -> &str;
}

// ── Wire types ──────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

// ── Backend ─────────────────────────────────────────────────────────

/// Chat-completions backend over HTTPS.
pub struct OpenAiBackend {
    config: CompletionConfig,
    client: reqwest::Client,
}

impl OpenAiBackend {
    pub fn new(config: CompletionConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl CompletionBackend for OpenAiBackend {
    async fn complete(
        &self,
        instruction: &str,
        inquiry: &str,
    ) -> Result<String, GenerationError> {
        let request = ChatRequest {
            model: self.config.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: instruction.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: inquiry.to_string(),
                },
            ],
            max_tokens: REPLY_MAX_TOKENS,
            temperature: REPLY_TEMPERATURE,
        };

        let response = self
            .client
            .post(&self.config.base_url)
            .header("content-type", "application/json")
            .header(
                "authorization",
                format!("Bearer {}", self.config.api_key.expose_secret()),
            )
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(GenerationError::HttpStatus {
                status: status.as_u16(),
                body: truncate_error_body(&body),
            });
        }

        parse_completion(&body)
    }

    fn model_id(&self) -> &str {
        &self.config.model
    }
}

/// Extract the generated text from a chat-completions response body.
fn parse_completion(body: &str) -> Result<String, GenerationError> {
    let response: ChatResponse =
        serde_json::from_str(body).map_err(|e| GenerationError::Parse(e.to_string()))?;
    let content = response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .map(|text| text.trim().to_string())
        .unwrap_or_default();
    if content.is_empty() {
        return Err(GenerationError::EmptyCompletion);
    }
    Ok(content)
}

/// Keep error bodies log-sized.
fn truncate_error_body(raw: &str) -> String {
    const MAX_CHARS: usize = 256;
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() > MAX_CHARS {
        let mut shortened: String = collapsed.chars().take(MAX_CHARS).collect();
        shortened.push('…');
        shortened
    } else {
        collapsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_completion_content() {
        let body = r#"{"choices":[{"message":{"content":"  Dear Ms. Lee,\nWelcome.  "}}]}"#;
        let text = parse_completion(body).unwrap();
        assert_eq!(text, "Dear Ms. Lee,\nWelcome.");
    }

    #[test]
    fn empty_choices_is_an_error() {
        let body = r#"{"choices":[]}"#;
        assert!(matches!(
            parse_completion(body),
            Err(GenerationError::EmptyCompletion)
        ));
    }

    #[test]
    fn null_content_is_an_error() {
        let body = r#"{"choices":[{"message":{"content":null}}]}"#;
        assert!(matches!(
            parse_completion(body),
            Err(GenerationError::EmptyCompletion)
        ));
    }

    #[test]
    fn malformed_body_is_a_parse_error() {
        assert!(matches!(
            parse_completion("not json"),
            Err(GenerationError::Parse(_))
        ));
    }

    #[test]
    fn error_bodies_are_truncated() {
        let long = "x".repeat(1000);
        let shortened = truncate_error_body(&long);
        assert!(shortened.chars().count() <= 257);
    }
}
