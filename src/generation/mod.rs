//! Message generation.
//!
//! Two transports reach the same upstream capability:
//! - **managed**: a hosted remote procedure (primary)
//! - **direct**: the provider's chat-completion API (fallback)
//!
//! [`GenerationGateway`] tries the primary once and falls back at most once.

pub mod direct;
pub mod gateway;
pub mod managed;
pub mod prompts;
pub mod transport;
pub mod types;

pub use direct::{DirectConfig, DirectTransport};
pub use gateway::GenerationGateway;
pub use managed::ManagedTransport;
pub use transport::GenerationTransport;
pub use types::{GenerationRequest, GenerationResult};

use std::sync::Arc;

use crate::config::ComposerConfig;
use crate::error::TransportError;

/// Create the gateway (managed primary, direct fallback) from configuration.
pub fn create_gateway(config: &ComposerConfig) -> Result<GenerationGateway, TransportError> {
    let primary = ManagedTransport::new(&config.primary_url, config.primary_token.clone());
    let fallback = DirectTransport::new(DirectConfig {
        base_url: config.provider_url.clone(),
        api_key: config.provider_api_key.clone(),
        model: config.model.clone(),
        temperature: config.temperature,
        max_tokens: config.max_tokens,
        timeout: config.fallback_timeout,
    })?;

    tracing::info!(
        primary = %config.primary_url,
        provider = %config.provider_url,
        model = %config.model,
        "Generation gateway ready"
    );
    Ok(GenerationGateway::new(
        Arc::new(primary),
        Arc::new(fallback),
        config.primary_timeout,
    ))
}

/// Request used across the generation tests (Sam, sister, gratitude, warm,
/// short text).
#[cfg(test)]
pub(crate) fn sample_request() -> GenerationRequest {
    use crate::wizard::model::{
        Advanced, Format, FormatKind, Intent, IntentKind, MessageLength, Recipient, Style, Tone,
        ToneKind,
    };

    GenerationRequest {
        recipient: Recipient {
            name: "Sam".into(),
            relationship: "sister".into(),
            external_id: None,
        },
        intent: Intent::new(IntentKind::Gratitude),
        tone: Tone::new(ToneKind::Warm),
        format: Format::new(FormatKind::Text, MessageLength::Short),
        style: Style::default(),
        advanced: Advanced::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_gateway_from_config() {
        let config = ComposerConfig {
            primary_url: "http://localhost:5001/generateMessage".to_string(),
            provider_api_key: secrecy::SecretString::from("sk-test"),
            ..Default::default()
        };
        assert!(create_gateway(&config).is_ok());
    }
}
