use crate::llm::FixedChatResponse;
use async_trait::async_trait;
use autoagents_llm::LLMProvider;
use autoagents_llm::chat::{
    ChatMessage, ChatProvider, ChatResponse, StructuredOutputFormat, Tool,
};
use autoagents_llm::completion::{CompletionProvider, CompletionRequest, CompletionResponse};
use autoagents_llm::embedding::EmbeddingProvider;
use autoagents_llm::error::LLMError;
use autoagents_llm::models::ModelsProvider;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
enum ScriptReply {
    Text(String),
    Fail(String),
}

/// One scripted reaction: when the prompt contains `needle`, reply.
#[derive(Debug, Clone)]
pub struct ScriptRule {
    needle: String,
    reply: ScriptReply,
    delay: Option<Duration>,
}

/// Provider that answers by matching substrings of the incoming prompt.
///
/// Rules are checked in insertion order against the concatenated message
/// contents; the first match wins. Every prompt is logged so tests can count
/// calls per agent.
#[derive(Debug, Clone, Default)]
pub struct ScriptedLLM {
    rules: Vec<ScriptRule>,
    default_reply: String,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl ScriptedLLM {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reply used when no rule matches.
    pub fn with_default(mut self, reply: impl Into<String>) -> Self {
        self.default_reply = reply.into();
        self
    }

    pub fn on(self, needle: impl Into<String>, reply: impl Into<String>) -> Self {
        self.push(needle, ScriptReply::Text(reply.into()), None)
    }

    /// Reply after sleeping for `delay`.
    pub fn on_delayed(
        self,
        needle: impl Into<String>,
        reply: impl Into<String>,
        delay: Duration,
    ) -> Self {
        self.push(needle, ScriptReply::Text(reply.into()), Some(delay))
    }

    /// Fail with a provider error.
    pub fn failing_on(self, needle: impl Into<String>, message: impl Into<String>) -> Self {
        self.push(needle, ScriptReply::Fail(message.into()), None)
    }

    fn push(mut self, needle: impl Into<String>, reply: ScriptReply, delay: Option<Duration>) -> Self {
        self.rules.push(ScriptRule {
            needle: needle.into(),
            reply,
            delay,
        });
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().len()
    }

    /// Number of recorded prompts containing `needle`.
    pub fn calls_matching(&self, needle: &str) -> usize {
        self.prompts
            .lock()
            .iter()
            .filter(|prompt| prompt.contains(needle))
            .count()
    }
}

#[async_trait]
impl ChatProvider for ScriptedLLM {
    async fn chat_with_tools(
        &self,
        messages: &[ChatMessage],
        _tools: Option<&[Tool]>,
        _json_schema: Option<StructuredOutputFormat>,
    ) -> Result<Box<dyn ChatResponse>, LLMError> {
        let prompt = messages
            .iter()
            .map(|message| message.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        self.prompts.lock().push(prompt.clone());

        let rule = self
            .rules
            .iter()
            .find(|rule| prompt.contains(&rule.needle))
            .cloned();
        let Some(rule) = rule else {
            return Ok(Box::new(FixedChatResponse::new(self.default_reply.clone())));
        };
        if let Some(delay) = rule.delay {
            tokio::time::sleep(delay).await;
        }
        match rule.reply {
            ScriptReply::Text(text) => Ok(Box::new(FixedChatResponse::new(text))),
            ScriptReply::Fail(message) => Err(LLMError::ProviderError(message)),
        }
    }
}

#[async_trait]
impl CompletionProvider for ScriptedLLM {
    async fn complete(
        &self,
        _req: &CompletionRequest,
        _json_schema: Option<StructuredOutputFormat>,
    ) -> Result<CompletionResponse, LLMError> {
        Ok(CompletionResponse {
            text: self.default_reply.clone(),
        })
    }
}

#[async_trait]
impl EmbeddingProvider for ScriptedLLM {
    async fn embed(&self, input: Vec<String>) -> Result<Vec<Vec<f32>>, LLMError> {
        Ok(input.into_iter().map(|_| vec![0.0, 0.0]).collect())
    }
}

#[async_trait]
impl ModelsProvider for ScriptedLLM {}

impl LLMProvider for ScriptedLLM {}
