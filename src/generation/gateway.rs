//! GenerationGateway — primary transport with a single fallback.
//!
//! The primary attempt is bounded by a fixed timeout. If it fails for any
//! reason (network, non-2xx, malformed body, timeout) exactly one fallback
//! attempt is made, strictly after the primary has finished. There is no
//! third attempt and no caching.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::error::{GenerationError, TransportError};

use super::transport::GenerationTransport;
use super::types::{GenerationRequest, GenerationResult};

/// Dispatches generation requests, hiding which transport answered.
pub struct GenerationGateway {
    primary: Arc<dyn GenerationTransport>,
    fallback: Arc<dyn GenerationTransport>,
    primary_timeout: Duration,
}

impl GenerationGateway {
    pub fn new(
        primary: Arc<dyn GenerationTransport>,
        fallback: Arc<dyn GenerationTransport>,
        primary_timeout: Duration,
    ) -> Self {
        Self {
            primary,
            fallback,
            primary_timeout,
        }
    }

    /// Generate a message for `request`.
    ///
    /// Every call makes a fresh upstream request; the same request submitted
    /// twice may yield different content.
    pub async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResult, GenerationError> {
        let primary_err = match self.try_primary(request).await {
            Ok(result) => return Ok(result),
            Err(e) => e,
        };

        warn!(
            primary = self.primary.name(),
            fallback = self.fallback.name(),
            error = %primary_err,
            "Primary generation failed, trying fallback"
        );

        match self.fallback.generate(request).await.and_then(|r| {
            normalize(r, self.fallback.name())
        }) {
            Ok(result) => {
                info!(
                    transport = self.fallback.name(),
                    "Generation recovered via fallback"
                );
                Ok(result)
            }
            Err(fallback_err) => {
                warn!(
                    transport = self.fallback.name(),
                    error = %fallback_err,
                    "Fallback generation failed"
                );
                Err(GenerationError::Unavailable {
                    primary: primary_err.to_string(),
                    fallback: fallback_err.to_string(),
                })
            }
        }
    }

    async fn try_primary(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResult, TransportError> {
        let outcome = tokio::time::timeout(self.primary_timeout, self.primary.generate(request))
            .await
            .map_err(|_| TransportError::Timeout {
                transport: self.primary.name().to_string(),
                timeout: self.primary_timeout,
            })?;
        normalize(outcome?, self.primary.name())
    }
}

/// Trim the content and drop blank insights. Blank content means the
/// transport returned a malformed body.
fn normalize(result: GenerationResult, transport: &str) -> Result<GenerationResult, TransportError> {
    let content = result.content.trim().to_string();
    if content.is_empty() {
        return Err(TransportError::InvalidResponse {
            transport: transport.to_string(),
            reason: "empty content".to_string(),
        });
    }
    let insights = result
        .insights
        .into_iter()
        .map(|i| i.trim().to_string())
        .filter(|i| !i.is_empty())
        .collect();
    Ok(GenerationResult { content, insights })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use secrecy::SecretString;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::generation::{DirectConfig, DirectTransport, sample_request};

    /// Stub transport that counts calls and returns a fixed outcome.
    struct StubTransport {
        name: &'static str,
        reply: Option<GenerationResult>,
        delay: Option<Duration>,
        calls: AtomicUsize,
    }

    impl StubTransport {
        fn ok(name: &'static str, content: &str, insights: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                name,
                reply: Some(GenerationResult {
                    content: content.to_string(),
                    insights: insights.iter().map(|s| s.to_string()).collect(),
                }),
                delay: None,
                calls: AtomicUsize::new(0),
            })
        }

        fn failing(name: &'static str) -> Arc<Self> {
            Arc::new(Self {
                name,
                reply: None,
                delay: None,
                calls: AtomicUsize::new(0),
            })
        }

        fn slow(name: &'static str, delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                name,
                reply: Some(GenerationResult {
                    content: "too late".to_string(),
                    insights: vec![],
                }),
                delay: Some(delay),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl GenerationTransport for StubTransport {
        fn name(&self) -> &str {
            self.name
        }

        async fn generate(
            &self,
            _request: &GenerationRequest,
        ) -> Result<GenerationResult, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.reply.clone().ok_or_else(|| TransportError::RequestFailed {
                transport: self.name.to_string(),
                reason: "connection refused".to_string(),
            })
        }
    }

    fn gateway(
        primary: &Arc<StubTransport>,
        fallback: &Arc<StubTransport>,
    ) -> GenerationGateway {
        GenerationGateway::new(
            primary.clone(),
            fallback.clone(),
            Duration::from_millis(200),
        )
    }

    #[tokio::test]
    async fn primary_success_skips_fallback() {
        let primary = StubTransport::ok("primary", "from primary", &["a"]);
        let fallback = StubTransport::ok("fallback", "from fallback", &[]);

        let result = gateway(&primary, &fallback)
            .generate(&sample_request())
            .await
            .unwrap();

        assert_eq!(result.content, "from primary");
        assert_eq!(primary.calls(), 1);
        assert_eq!(fallback.calls(), 0);
    }

    #[tokio::test]
    async fn primary_failure_uses_fallback_once() {
        let primary = StubTransport::failing("primary");
        let fallback = StubTransport::ok("fallback", "X", &[]);

        let result = gateway(&primary, &fallback)
            .generate(&sample_request())
            .await
            .unwrap();

        assert_eq!(
            result,
            GenerationResult {
                content: "X".to_string(),
                insights: vec![],
            }
        );
        assert_eq!(primary.calls(), 1);
        assert_eq!(fallback.calls(), 1);
    }

    #[tokio::test]
    async fn double_failure_is_unavailable_after_two_calls() {
        let primary = StubTransport::failing("primary");
        let fallback = StubTransport::failing("fallback");

        let err = gateway(&primary, &fallback)
            .generate(&sample_request())
            .await
            .unwrap_err();

        assert!(matches!(err, GenerationError::Unavailable { .. }));
        assert_eq!(primary.calls() + fallback.calls(), 2);
    }

    #[tokio::test]
    async fn primary_timeout_triggers_fallback() {
        let primary = StubTransport::slow("primary", Duration::from_secs(5));
        let fallback = StubTransport::ok("fallback", "fallback content", &[]);

        let result = gateway(&primary, &fallback)
            .generate(&sample_request())
            .await
            .unwrap();

        assert_eq!(result.content, "fallback content");
        assert_eq!(fallback.calls(), 1);
    }

    #[tokio::test]
    async fn blank_primary_content_counts_as_failure() {
        let primary = StubTransport::ok("primary", "   ", &[]);
        let fallback = StubTransport::ok("fallback", "real message", &[]);

        let result = gateway(&primary, &fallback)
            .generate(&sample_request())
            .await
            .unwrap();
        assert_eq!(result.content, "real message");
    }

    #[tokio::test]
    async fn result_shape_is_normalized() {
        let primary = StubTransport::failing("primary");
        let fallback = StubTransport::ok("fallback", "  Hi Sam \n", &["", " kept it brief "]);

        let result = gateway(&primary, &fallback)
            .generate(&sample_request())
            .await
            .unwrap();
        assert_eq!(result.content, "Hi Sam");
        assert_eq!(result.insights, vec!["kept it brief"]);
    }

    #[tokio::test]
    async fn no_caching_between_calls() {
        let primary = StubTransport::ok("primary", "hello", &[]);
        let fallback = StubTransport::failing("fallback");
        let gw = gateway(&primary, &fallback);
        let req = sample_request();

        gw.generate(&req).await.unwrap();
        gw.generate(&req).await.unwrap();
        assert_eq!(primary.calls(), 2);
    }

    /// Direct transport whose provider answers every call with `content`.
    async fn direct_fallback(
        content: &str,
        finish_reason: &str,
    ) -> (MockServer, Arc<DirectTransport>) {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{
                    "index": 0,
                    "message": {"role": "assistant", "content": content},
                    "finish_reason": finish_reason
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let transport = DirectTransport::new(DirectConfig {
            base_url: server.uri(),
            api_key: SecretString::from("sk-test"),
            model: "gpt-4o-mini".to_string(),
            temperature: 0.8,
            max_tokens: 64,
            timeout: Duration::from_secs(5),
        })
        .unwrap();
        (server, Arc::new(transport))
    }

    #[tokio::test]
    async fn truncated_fallback_reply_is_unavailable() {
        let primary = StubTransport::failing("primary");
        let (_server, fallback) =
            direct_fallback(r#"{"content": "Dear Sam, thank you for"#, "length").await;

        let err = GenerationGateway::new(primary.clone(), fallback, Duration::from_millis(200))
            .generate(&sample_request())
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::Unavailable { .. }));
        assert_eq!(primary.calls(), 1);
    }

    #[tokio::test]
    async fn wrong_keys_fallback_reply_is_unavailable() {
        let primary = StubTransport::failing("primary");
        let (_server, fallback) =
            direct_fallback(r#"{"message": "Hi Sam", "notes": []}"#, "stop").await;

        let err = GenerationGateway::new(primary, fallback, Duration::from_millis(200))
            .generate(&sample_request())
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::Unavailable { .. }));
    }

    #[tokio::test]
    async fn prose_fallback_reply_is_the_message() {
        let primary = StubTransport::failing("primary");
        let (_server, fallback) =
            direct_fallback("Sam, thank you for everything this year.", "stop").await;

        let result = GenerationGateway::new(primary, fallback, Duration::from_millis(200))
            .generate(&sample_request())
            .await
            .unwrap();
        assert_eq!(result.content, "Sam, thank you for everything this year.");
        assert!(result.insights.is_empty());
    }
}
