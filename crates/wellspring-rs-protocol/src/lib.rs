//! Wire types shared by the Wellspring orchestration crates.
//!
//! Everything that crosses a crate boundary or leaves the process (profiles,
//! expert answers, plans and the final response envelope) lives here so the
//! core, the profile store and the CLI agree on a single schema.

mod domain;
mod envelope;
mod knowledge;
pub mod lenient;
mod plan;
mod profile;

pub use domain::{ExpertDomain, UnknownDomain};
pub use envelope::ResponseEnvelope;
pub use knowledge::{DomainExtension, ExpertAnswer, FoodGroups, KnowledgeBundle, Subtopic};
pub use plan::{
    DietPlan, Exercise, FitnessPlan, Macros, Meal, Plan, PlanType, Routine, RoutineStep,
    WorkoutDay,
};
pub use profile::{ProfileValue, UserProfile};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier attached to every handled request for log correlation.
pub type RequestId = Uuid;

/// Opaque identifier for the person a profile belongs to.
pub type UserId = String;

/// Inbound request handed to the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InboundRequest {
    /// Free-form user text.
    pub message: String,
    /// Owner of the profile read and written during the request.
    pub user_id: UserId,
}

impl InboundRequest {
    pub fn new(message: impl Into<String>, user_id: impl Into<UserId>) -> Self {
        Self {
            message: message.into(),
            user_id: user_id.into(),
        }
    }
}

/// Author of a conversation message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// One immutable conversation entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            created_at: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Append-only transcript of a conversation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message; earlier entries are never rewritten.
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Render the transcript as JSON lines, one message per line.
    pub fn to_jsonl(&self) -> Result<String, serde_json::Error> {
        let mut out = String::new();
        for message in &self.messages {
            out.push_str(&serde_json::to_string(message)?);
            out.push('\n');
        }
        Ok(out)
    }
}
