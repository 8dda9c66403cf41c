//! Direct provider transport (fallback path).
//!
//! Calls the upstream OpenAI-compatible chat-completion endpoint with the
//! same request, rendered as a prompt, and parses the `{content, insights}`
//! object out of the assistant message.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::debug;

use crate::error::TransportError;

use super::managed::truncate;
use super::prompts::{parse_generation_reply, system_prompt, user_prompt};
use super::transport::GenerationTransport;
use super::types::{GenerationRequest, GenerationResult};

const TRANSPORT_NAME: &str = "direct";

/// Settings for the direct provider call.
#[derive(Debug, Clone)]
pub struct DirectConfig {
    pub base_url: String,
    pub api_key: SecretString,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout: Duration,
}

/// Calls the upstream chat-completion API directly.
pub struct DirectTransport {
    client: reqwest::Client,
    config: DirectConfig,
}

impl DirectTransport {
    pub fn new(config: DirectConfig) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Self::error(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }

    fn error(reason: impl Into<String>) -> TransportError {
        TransportError::RequestFailed {
            transport: TRANSPORT_NAME.to_string(),
            reason: reason.into(),
        }
    }

    fn invalid(reason: impl Into<String>) -> TransportError {
        TransportError::InvalidResponse {
            transport: TRANSPORT_NAME.to_string(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[async_trait]
impl GenerationTransport for DirectTransport {
    fn name(&self) -> &str {
        TRANSPORT_NAME
    }

    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResult, TransportError> {
        let body = serde_json::json!({
            "model": self.config.model,
            "messages": [
                {"role": "system", "content": system_prompt()},
                {"role": "user", "content": user_prompt(request)},
            ],
            "temperature": self.config.temperature,
            "max_tokens": self.config.max_tokens,
            "response_format": {"type": "json_object"},
        });

        let resp = self
            .client
            .post(self.endpoint())
            .bearer_auth(self.config.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TransportError::Timeout {
                        transport: TRANSPORT_NAME.to_string(),
                        timeout: self.config.timeout,
                    }
                } else {
                    Self::error(e.to_string())
                }
            })?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| Self::error(format!("failed to read body: {e}")))?;

        if !status.is_success() {
            return Err(TransportError::Status {
                transport: TRANSPORT_NAME.to_string(),
                status: status.as_u16(),
                body: truncate(&text, 200),
            });
        }

        let parsed: ChatCompletionResponse =
            serde_json::from_str(&text).map_err(|e| Self::invalid(e.to_string()))?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| Self::invalid("response has no choices"))?;

        if choice.finish_reason.as_deref() == Some("length") {
            return Err(Self::invalid("reply was cut off at max_tokens"));
        }

        let reply = choice
            .message
            .content
            .ok_or_else(|| Self::invalid("response has no message content"))?;

        debug!(model = %self.config.model, "Provider responded");
        parse_generation_reply(&reply)
            .map_err(|e| Self::invalid(format!("reply is not a content object: {e}")))
    }
}
