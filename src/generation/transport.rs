//! Transport trait — one network path to the generation capability.

use async_trait::async_trait;

use crate::error::TransportError;

use super::types::{GenerationRequest, GenerationResult};

/// A single way of turning a request into a result.
///
/// Implementations make exactly one attempt per call; retry and fallback
/// policy lives in [`super::gateway::GenerationGateway`].
#[async_trait]
pub trait GenerationTransport: Send + Sync {
    /// Short identifier used in logs and error messages.
    fn name(&self) -> &str;

    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResult, TransportError>;
}
