//! Test helpers shared across Wellspring crates.

pub mod llm;
pub mod scripted;

pub use llm::{FailingLLM, FixedChatResponse, FixedLLM, RecordingChatLLM};
pub use scripted::{ScriptRule, ScriptedLLM};
