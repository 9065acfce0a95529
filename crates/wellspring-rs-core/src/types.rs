//! Routing vocabulary shared by the strategist and orchestrator.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use wellspring_rs_protocol::PlanType;

/// Subsystems the orchestrator can dispatch to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SubsystemId {
    KnowledgeQuery,
    PlanGeneration,
    ProfileUpdate,
    MentalWellness,
}

impl SubsystemId {
    pub const ALL: [SubsystemId; 4] = [
        SubsystemId::KnowledgeQuery,
        SubsystemId::PlanGeneration,
        SubsystemId::ProfileUpdate,
        SubsystemId::MentalWellness,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SubsystemId::KnowledgeQuery => "knowledge_query",
            SubsystemId::PlanGeneration => "plan_generation",
            SubsystemId::ProfileUpdate => "profile_update",
            SubsystemId::MentalWellness => "mental_wellness",
        }
    }

    /// One-line description used in the routing prompt.
    pub fn describe(self) -> &'static str {
        match self {
            SubsystemId::KnowledgeQuery => {
                "answers health, nutrition, fitness and wellbeing questions through a council of experts"
            }
            SubsystemId::PlanGeneration => "builds personalized diet and/or fitness plans",
            SubsystemId::ProfileUpdate => {
                "records personal details the user shares (age, weight, goals, preferences)"
            }
            SubsystemId::MentalWellness => {
                "gives supportive stress management and relief exercise guidance"
            }
        }
    }
}

impl fmt::Display for SubsystemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubsystemId {
    type Err = String;

    /// Accepts the canonical ids plus the historical agent names.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        match normalized.as_str() {
            "knowledge_query" | "knowledge" | "knowledge_council" | "healthknowledgecouncilagent"
            | "health_knowledge_council" => Ok(SubsystemId::KnowledgeQuery),
            "plan_generation" | "plan" | "plan_request" | "plangenerationcouncilagent"
            | "plan_generator" => Ok(SubsystemId::PlanGeneration),
            "profile_update" | "profile" | "userprofileagent" | "user_profile" => {
                Ok(SubsystemId::ProfileUpdate)
            }
            "mental_wellness" | "wellness" | "mentalwellnessagent" => {
                Ok(SubsystemId::MentalWellness)
            }
            _ => Err(raw.to_string()),
        }
    }
}

/// Coarse classification of what the user wants.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum IntentCategory {
    KnowledgeQuery,
    PlanRequest,
    ProfileUpdate,
    MentalWellness,
    #[default]
    Other,
}

impl IntentCategory {
    /// Parse a category; greetings and off-topic chatter are `Other`.
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        match normalized.as_str() {
            "knowledge_query" | "knowledge" | "question" | "health_query" => {
                Some(IntentCategory::KnowledgeQuery)
            }
            "plan_request" | "plan" | "plan_generation" => Some(IntentCategory::PlanRequest),
            "profile_update" | "profile" => Some(IntentCategory::ProfileUpdate),
            "mental_wellness" | "wellness" | "stress" => Some(IntentCategory::MentalWellness),
            "other" | "greeting" | "off_topic" | "general" | "chitchat" => {
                Some(IntentCategory::Other)
            }
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            IntentCategory::KnowledgeQuery => "knowledge_query",
            IntentCategory::PlanRequest => "plan_request",
            IntentCategory::ProfileUpdate => "profile_update",
            IntentCategory::MentalWellness => "mental_wellness",
            IntentCategory::Other => "other",
        }
    }

    /// The subsystem this category implies, if any.
    pub fn implied_subsystem(self) -> Option<SubsystemId> {
        match self {
            IntentCategory::KnowledgeQuery => Some(SubsystemId::KnowledgeQuery),
            IntentCategory::PlanRequest => Some(SubsystemId::PlanGeneration),
            IntentCategory::ProfileUpdate => Some(SubsystemId::ProfileUpdate),
            IntentCategory::MentalWellness => Some(SubsystemId::MentalWellness),
            IntentCategory::Other => None,
        }
    }
}

/// Output of the strategist for one message.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RoutingDecision {
    pub intent_category: IntentCategory,
    pub required_subsystems: BTreeSet<SubsystemId>,
    pub profile_extraction_needed: bool,
    pub follow_up_suggestions: Vec<String>,
    /// Short restatement of the request; used as the plan goal.
    pub intent_analysis: String,
    pub plan_type: PlanType,
    /// Direct reply for greetings and off-topic messages.
    pub immediate_response: Option<String>,
}

impl RoutingDecision {
    /// Routing used when the strategist's reply cannot be trusted.
    pub fn safe_default(message: &str) -> Self {
        Self {
            intent_category: IntentCategory::Other,
            required_subsystems: BTreeSet::from([SubsystemId::KnowledgeQuery]),
            profile_extraction_needed: false,
            follow_up_suggestions: Vec::new(),
            intent_analysis: message.trim().to_string(),
            plan_type: PlanType::General,
            immediate_response: None,
        }
    }

    pub fn requires(&self, subsystem: SubsystemId) -> bool {
        self.required_subsystems.contains(&subsystem)
    }

    /// Whether the profile manager should run for this request.
    pub fn wants_profile_update(&self) -> bool {
        self.profile_extraction_needed || self.requires(SubsystemId::ProfileUpdate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// Historical agent names map onto subsystem ids.
    #[test]
    fn legacy_agent_names_parse() {
        assert_eq!(
            "HealthKnowledgeCouncilAgent".parse::<SubsystemId>(),
            Ok(SubsystemId::KnowledgeQuery)
        );
        assert_eq!(
            "MentalWellnessAgent".parse::<SubsystemId>(),
            Ok(SubsystemId::MentalWellness)
        );
        assert!("WeatherAgent".parse::<SubsystemId>().is_err());
    }

    /// Greeting-like categories collapse to `Other`.
    #[test]
    fn greeting_is_other() {
        assert_eq!(IntentCategory::parse("greeting"), Some(IntentCategory::Other));
        assert_eq!(IntentCategory::parse("Off-Topic"), Some(IntentCategory::Other));
        assert_eq!(IntentCategory::parse("nonsense"), None);
    }

    /// The safe default always asks the knowledge council.
    #[test]
    fn safe_default_routes_to_knowledge() {
        let decision = RoutingDecision::safe_default("  what is fiber?  ");
        assert_eq!(decision.intent_category, IntentCategory::Other);
        assert!(decision.requires(SubsystemId::KnowledgeQuery));
        assert_eq!(decision.required_subsystems.len(), 1);
        assert_eq!(decision.intent_analysis, "what is fiber?");
        assert!(!decision.wants_profile_update());
    }
}
