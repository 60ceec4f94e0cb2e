//! Chat-completions client for fact generation.
//!
//! The client is intentionally small: one non-streaming completion per call,
//! no tools, no retries. Rate limiting is handled by the caller spacing its
//! requests.

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::LlmError;

const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1/chat/completions";
const DEFAULT_MODEL: &str = "gpt-4o-mini";

const REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(120);

/// Completion length cap. Low on purpose: the prompt asks for at most 200
/// words and the stored event should stay card-sized.
const MAX_COMPLETION_TOKENS: u32 = 150;
const TEMPERATURE: f32 = 0.7;

/// A model that can draft one fact from a system persona and a user prompt.
#[allow(async_fn_in_trait)]
pub trait FactModel {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, LlmError>;
}

/// OpenAI-compatible chat-completions client.
pub struct OpenAiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

// -- Response types (private, only model what we read) --

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: String,
}

impl OpenAiClient {
    pub fn new(config: &Config) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            base_url: config
                .openai_base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
            api_key: config.openai_api_key.clone(),
            model: config
                .openai_model
                .clone()
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        })
    }

    fn parse_response(body: &str) -> Result<String, LlmError> {
        let response: ChatResponse = serde_json::from_str(body)?;
        let text = response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .unwrap_or_default();

        let text = text.trim();
        if text.is_empty() {
            return Err(LlmError::EmptyCompletion);
        }
        Ok(text.to_string())
    }
}

impl FactModel for OpenAiClient {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, LlmError> {
        let request = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            max_tokens: MAX_COMPLETION_TOKENS,
            temperature: TEMPERATURE,
        };

        let response = self
            .client
            .post(&self.base_url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(LlmError::Rejected { status, body });
        }

        Self::parse_response(&body)
    }
}
