//! Managed remote procedure transport (primary path).
//!
//! POSTs the payload in a callable-function envelope `{"data": payload}` and
//! reads `{"result": {content, insights}}` back. A bare `{content, insights}`
//! body is accepted as well.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::debug;

use crate::error::TransportError;

use super::transport::GenerationTransport;
use super::types::{GenerationRequest, GenerationResult};

const TRANSPORT_NAME: &str = "managed";

/// Calls the hosted generation procedure.
pub struct ManagedTransport {
    client: reqwest::Client,
    endpoint: String,
    token: Option<SecretString>,
}

impl ManagedTransport {
    pub fn new(endpoint: impl Into<String>, token: Option<SecretString>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            token,
        }
    }

    fn error(reason: impl Into<String>) -> TransportError {
        TransportError::RequestFailed {
            transport: TRANSPORT_NAME.to_string(),
            reason: reason.into(),
        }
    }
}

/// Response envelope; `result` wraps the payload for callable functions.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ManagedResponse {
    Wrapped { result: GenerationResult },
    Bare(GenerationResult),
}

#[async_trait]
impl GenerationTransport for ManagedTransport {
    fn name(&self) -> &str {
        TRANSPORT_NAME
    }

    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResult, TransportError> {
        let body = serde_json::json!({ "data": request.payload() });

        let mut builder = self.client.post(&self.endpoint).json(&body);
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token.expose_secret());
        }

        let resp = builder
            .send()
            .await
            .map_err(|e| Self::error(e.to_string()))?;

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

        let parsed: ManagedResponse =
            serde_json::from_str(&text).map_err(|e| TransportError::InvalidResponse {
                transport: TRANSPORT_NAME.to_string(),
                reason: e.to_string(),
            })?;

        debug!(endpoint = %self.endpoint, "Managed procedure responded");
        Ok(match parsed {
            ManagedResponse::Wrapped { result } => result,
            ManagedResponse::Bare(result) => result,
        })
    }
}

pub(crate) fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{cut}…")
}
