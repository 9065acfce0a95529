//! Text generation boundary used by every subsystem.

use crate::error::GenerationError;
use async_trait::async_trait;
use autoagents_llm::LLMProvider;
use autoagents_llm::chat::{ChatMessage, ChatRole, MessageType};
use autoagents_llm::error::LLMError;
use log::debug;
use std::sync::Arc;
use std::time::Duration;

/// Produces free text for a prompt.
///
/// `shape_hint` describes the document the caller expects back; it is
/// advisory and implementations may ignore it.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    async fn generate(
        &self,
        prompt: &str,
        temperature: f32,
        shape_hint: &str,
    ) -> Result<String, GenerationError>;
}

/// `GenerationClient` backed by autoagents LLM providers.
///
/// Providers fix their temperature at build time, so callers register one
/// provider per temperature they use. Requests for an unregistered
/// temperature go to the default provider.
#[derive(Clone)]
pub struct LlmGenerationClient {
    default: Arc<dyn LLMProvider>,
    tuned: Vec<(f32, Arc<dyn LLMProvider>)>,
}

impl LlmGenerationClient {
    pub fn new(default: Arc<dyn LLMProvider>) -> Self {
        Self {
            default,
            tuned: Vec::new(),
        }
    }

    pub fn with_tuned_provider(mut self, temperature: f32, provider: Arc<dyn LLMProvider>) -> Self {
        self.tuned
            .retain(|(existing, _)| (existing - temperature).abs() > f32::EPSILON);
        self.tuned.push((temperature, provider));
        self
    }

    fn provider_for(&self, temperature: f32) -> &Arc<dyn LLMProvider> {
        self.tuned
            .iter()
            .find(|(existing, _)| (existing - temperature).abs() <= f32::EPSILON)
            .map(|(_, provider)| provider)
            .unwrap_or(&self.default)
    }
}

#[async_trait]
impl GenerationClient for LlmGenerationClient {
    async fn generate(
        &self,
        prompt: &str,
        temperature: f32,
        shape_hint: &str,
    ) -> Result<String, GenerationError> {
        let mut messages = Vec::with_capacity(2);
        if !shape_hint.trim().is_empty() {
            messages.push(ChatMessage {
                role: ChatRole::System,
                message_type: MessageType::Text,
                content: shape_hint.to_string(),
            });
        }
        messages.push(ChatMessage {
            role: ChatRole::User,
            message_type: MessageType::Text,
            content: prompt.to_string(),
        });

        let response = self
            .provider_for(temperature)
            .chat_with_tools(&messages, None, None)
            .await
            .map_err(map_llm_error)?;
        let text = response.text().unwrap_or_default();
        if text.trim().is_empty() {
            return Err(GenerationError::Empty);
        }
        debug!(
            "generation complete (temperature={}, chars={})",
            temperature,
            text.len()
        );
        Ok(text)
    }
}

/// Transport and credential failures mean the service cannot be reached;
/// anything else is a failure of this one call.
fn map_llm_error(err: LLMError) -> GenerationError {
    match err {
        LLMError::HttpError(message) | LLMError::AuthError(message) => {
            GenerationError::Unavailable(message)
        }
        LLMError::ProviderError(message) => GenerationError::Failed(message),
        other => GenerationError::Failed(other.to_string()),
    }
}

/// Run one generation call under a deadline.
pub async fn generate_within(
    client: &dyn GenerationClient,
    prompt: &str,
    temperature: f32,
    shape_hint: &str,
    timeout: Duration,
) -> Result<String, GenerationError> {
    match tokio::time::timeout(timeout, client.generate(prompt, temperature, shape_hint)).await {
        Ok(result) => result,
        Err(_) => Err(GenerationError::TimedOut(timeout)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use wellspring_rs_test_utils::{FailingLLM, FixedLLM, RecordingChatLLM};

    /// The shape hint travels as a system message ahead of the prompt.
    #[tokio::test]
    async fn sends_hint_then_prompt() {
        let llm = Arc::new(RecordingChatLLM::new("{}"));
        let client = LlmGenerationClient::new(llm.clone());
        let text = client
            .generate("hello", 0.3, "reply with JSON")
            .await
            .expect("generate");
        assert_eq!(text, "{}");

        let messages = llm.last_messages();
        assert_eq!(messages.len(), 2);
        assert!(matches!(messages[0].role, ChatRole::System));
        assert_eq!(messages[0].content, "reply with JSON");
        assert_eq!(messages[1].content, "hello");
    }

    /// Requests are routed to the provider tuned for their temperature.
    #[tokio::test]
    async fn picks_tuned_provider() {
        let default = Arc::new(RecordingChatLLM::new("default"));
        let cold = Arc::new(RecordingChatLLM::new("cold"));
        let client = LlmGenerationClient::new(default.clone()).with_tuned_provider(0.1, cold.clone());

        let text = client.generate("q", 0.1, "").await.expect("cold");
        assert_eq!(text, "cold");
        let text = client.generate("q", 0.7, "").await.expect("default");
        assert_eq!(text, "default");
        assert_eq!(cold.call_count(), 1);
        assert_eq!(default.call_count(), 1);
        assert_eq!(cold.last_messages().len(), 1);
    }

    /// Provider errors and blank replies map onto the generation taxonomy.
    #[tokio::test]
    async fn maps_failures() {
        let client = LlmGenerationClient::new(Arc::new(FailingLLM::new("bad request")));
        let err = client.generate("q", 0.5, "").await.expect_err("fails");
        assert_eq!(err, GenerationError::Failed("bad request".to_string()));

        let client = LlmGenerationClient::new(Arc::new(FixedLLM::new("   ")));
        let err = client.generate("q", 0.5, "").await.expect_err("empty");
        assert_eq!(err, GenerationError::Empty);
    }

    /// Only transport and auth errors make the service unavailable.
    #[tokio::test]
    async fn classifies_llm_errors() {
        let client = LlmGenerationClient::new(Arc::new(FailingLLM::with_error(
            "connection refused",
            LLMError::HttpError,
        )));
        let err = client.generate("q", 0.5, "").await.expect_err("http");
        assert_eq!(err, GenerationError::Unavailable("connection refused".to_string()));

        let client = LlmGenerationClient::new(Arc::new(FailingLLM::with_error(
            "bad key",
            LLMError::AuthError,
        )));
        let err = client.generate("q", 0.5, "").await.expect_err("auth");
        assert!(err.is_unavailable());

        for error in [LLMError::JsonError as fn(String) -> LLMError, LLMError::InvalidRequest] {
            let client =
                LlmGenerationClient::new(Arc::new(FailingLLM::with_error("malformed body", error)));
            let err = client.generate("q", 0.5, "").await.expect_err("per-call");
            assert!(matches!(err, GenerationError::Failed(_)), "got {err:?}");
        }
    }

    struct Slow;

    #[async_trait]
    impl GenerationClient for Slow {
        async fn generate(&self, _: &str, _: f32, _: &str) -> Result<String, GenerationError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok("late".to_string())
        }
    }

    /// Deadlines turn slow calls into `TimedOut`.
    #[tokio::test]
    async fn generate_within_times_out() {
        let timeout = Duration::from_millis(20);
        let err = generate_within(&Slow, "q", 0.5, "", timeout)
            .await
            .expect_err("timeout");
        assert_eq!(err, GenerationError::TimedOut(timeout));
    }
}
