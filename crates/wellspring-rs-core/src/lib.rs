//! Core orchestration for the Wellspring health and fitness assistant.
//!
//! A single inbound message is routed by the [`strategist::Strategist`],
//! fanned out to the subsystems it selects (knowledge council, plan
//! generator, mental wellness guide), merged with a concurrent profile
//! update, and returned as one [`ResponseEnvelope`].
//!
//! Every generation call goes through [`generation::GenerationClient`], and
//! every structured reply goes through [`extract::extract`], so malformed
//! model output degrades a single section instead of failing the request.

pub mod council;
pub mod error;
pub mod experts;
pub mod extract;
pub mod generation;
pub mod orchestrator;
pub mod plan;
pub mod profile;
pub mod strategist;
pub mod types;
pub mod wellness;

pub use council::KnowledgeCouncil;
pub use error::{CoreError, ExpertError, GenerationError};
pub use experts::{Expert, ExpertResponder};
pub use extract::{Extraction, extract};
pub use generation::{GenerationClient, LlmGenerationClient};
pub use orchestrator::{HandledRequest, Orchestrator, OrchestratorBuilder};
pub use plan::PlanGenerator;
pub use profile::{ProfileHints, ProfileManager, ProfileUpdate};
pub use strategist::Strategist;
pub use types::{IntentCategory, RoutingDecision, SubsystemId};
pub use wellness::MentalWellnessGuide;
pub use wellspring_rs_protocol::ResponseEnvelope;
