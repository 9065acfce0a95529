//! Intent routing: one generation call per message.

use crate::error::GenerationError;
use crate::extract::{Extraction, extract};
use crate::generation::{GenerationClient, generate_within};
use crate::profile::ProfileHints;
use crate::types::{IntentCategory, RoutingDecision, SubsystemId};
use log::{debug, warn};
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::Arc;
use wellspring_rs_config::StrategistConfig;
use wellspring_rs_protocol::{PlanType, UserProfile, lenient};

pub const GREETING: &str = "Hello! I'm your AI Health and Fitness assistant. How can I help you with your health and fitness goals today?";

const GREETING_PATTERN: &str =
    r"(?i)^\W*(?:hello|hi|hiya|hey|greetings|good (?:morning|afternoon|evening))\b";

/// Longest message still treated as a bare greeting.
const GREETING_MAX_WORDS: usize = 5;

const SHAPE_HINT: &str = r#"You are the Chief Strategist for a health and fitness assistant.
Reply with a single JSON object and nothing else:
{
  "intent_analysis": "the topic or goal itself, never 'user is asking about ...'",
  "intent_category": "knowledge_query|plan_request|profile_update|mental_wellness|greeting|off_topic",
  "required_subsystems": ["knowledge_query", "plan_generation", "profile_update", "mental_wellness"],
  "response": "direct reply, only for greetings or off-topic messages",
  "profile_extraction_needed": true,
  "follow_up_suggestions": ["question 1?", "question 2?"]
}"#;

#[derive(Debug, Default, Deserialize)]
struct StrategistReply {
    #[serde(default, deserialize_with = "lenient::text")]
    intent_analysis: String,
    #[serde(default, deserialize_with = "lenient::text")]
    intent_category: String,
    #[serde(
        default,
        alias = "required_agents",
        deserialize_with = "lenient::string_list"
    )]
    required_subsystems: Vec<String>,
    #[serde(default, deserialize_with = "lenient::opt_text")]
    response: Option<String>,
    #[serde(default, deserialize_with = "lenient::flag")]
    profile_extraction_needed: bool,
    #[serde(default)]
    follow_up_suggestions: Value,
}

/// Classifies a message and picks the subsystems that should handle it.
#[derive(Clone)]
pub struct Strategist {
    client: Arc<dyn GenerationClient>,
    config: StrategistConfig,
    hints: Arc<ProfileHints>,
}

impl Strategist {
    pub fn new(
        client: Arc<dyn GenerationClient>,
        config: StrategistConfig,
        hints: Arc<ProfileHints>,
    ) -> Self {
        Self {
            client,
            config,
            hints,
        }
    }

    /// Route one message.
    ///
    /// A degraded extraction carries [`RoutingDecision::safe_default`] (with a
    /// canned greeting when the message looks like one) rather than an empty
    /// decision.
    pub async fn route(
        &self,
        message: &str,
        profile: Option<&UserProfile>,
    ) -> Result<Extraction<RoutingDecision>, GenerationError> {
        let prompt = build_prompt(message, profile);
        let raw = generate_within(
            self.client.as_ref(),
            &prompt,
            self.config.temperature,
            SHAPE_HINT,
            self.config.timeout(),
        )
        .await?;

        let hinted = self.hints.detect(message);
        let extraction = extract::<StrategistReply>(&raw);
        let outcome = match extraction {
            Extraction::Degraded { reason, .. } => {
                let mut decision = self.fallback_decision(message, hinted);
                decision.follow_up_suggestions = recover_questions(&raw);
                Extraction::Degraded {
                    value: decision,
                    reason,
                }
            }
            other => other.map(|reply| decide(message, reply, hinted)),
        };
        let decision = outcome.value();
        debug!(
            "routing decided (category={}, subsystems={:?}, profile_extraction={}, degraded={})",
            decision.intent_category.as_str(),
            decision.required_subsystems,
            decision.profile_extraction_needed,
            outcome.is_degraded()
        );
        Ok(outcome)
    }

    /// Decision used when the routing call fails for a recoverable reason.
    pub fn fallback_decision(&self, message: &str, hinted: bool) -> RoutingDecision {
        let mut decision = RoutingDecision::safe_default(message);
        decision.profile_extraction_needed = hinted;
        if looks_like_greeting(message) {
            decision.immediate_response = Some(GREETING.to_string());
        }
        decision
    }

    pub fn hints(&self) -> &ProfileHints {
        &self.hints
    }
}

fn build_prompt(message: &str, profile: Option<&UserProfile>) -> String {
    let mut prompt = String::new();
    if let Some(profile) = profile.filter(|profile| !profile.is_empty()) {
        prompt.push_str("Current User Profile:\n");
        prompt.push_str(&profile.to_prompt_json());
        prompt.push_str("\n\n");
    }
    prompt.push_str("Available subsystems:\n");
    for subsystem in SubsystemId::ALL {
        prompt.push_str(&format!("- {}: {}\n", subsystem.as_str(), subsystem.describe()));
    }
    prompt.push_str(&format!(
        "\nAnalyze the following user message and decide how to respond.\n\nUser Query: \"{}\"\n\n\
         Set profile_extraction_needed to true when the message shares personal information.",
        message.trim()
    ));
    prompt
}

fn decide(message: &str, reply: StrategistReply, hinted: bool) -> RoutingDecision {
    let category = IntentCategory::parse(&reply.intent_category).unwrap_or_else(|| {
        if !reply.intent_category.is_empty() {
            warn!(
                "unknown intent category (category={})",
                reply.intent_category
            );
        }
        IntentCategory::Other
    });

    let mut required = BTreeSet::new();
    for name in &reply.required_subsystems {
        match name.parse::<SubsystemId>() {
            Ok(subsystem) => {
                required.insert(subsystem);
            }
            Err(unknown) => debug!("dropping unknown subsystem (name={})", unknown),
        }
    }
    if let Some(implied) = category.implied_subsystem() {
        required.insert(implied);
    }

    let intent_analysis = if reply.intent_analysis.is_empty() {
        message.trim().to_string()
    } else {
        reply.intent_analysis
    };
    let plan_type = infer_plan_type(&format!("{message} {intent_analysis}"));
    let immediate_response = match category {
        IntentCategory::Other => reply
            .response
            .or_else(|| looks_like_greeting(message).then(|| GREETING.to_string())),
        _ => None,
    };

    RoutingDecision {
        intent_category: category,
        required_subsystems: required,
        profile_extraction_needed: reply.profile_extraction_needed || hinted,
        follow_up_suggestions: follow_ups_from_value(&reply.follow_up_suggestions),
        intent_analysis,
        plan_type,
        immediate_response,
    }
}

/// A short message that opens with a greeting word.
fn looks_like_greeting(message: &str) -> bool {
    if message.split_whitespace().count() > GREETING_MAX_WORDS {
        return false;
    }
    Regex::new(GREETING_PATTERN)
        .map(|pattern| pattern.is_match(message))
        .unwrap_or(false)
}

/// Diet, fitness or both, judged from keywords in the request.
pub fn infer_plan_type(text: &str) -> PlanType {
    let lower = text.to_lowercase();
    let diet = ["diet", "meal", "nutrition", "eating", "food", "calorie"]
        .iter()
        .any(|word| lower.contains(word));
    let fitness = ["workout", "exercise", "fitness", "training", "routine", "strength"]
        .iter()
        .any(|word| lower.contains(word));
    match (diet, fitness) {
        (true, false) => PlanType::Diet,
        (false, true) => PlanType::Fitness,
        _ => PlanType::General,
    }
}

fn follow_ups_from_value(value: &Value) -> Vec<String> {
    match value {
        Value::String(text) => {
            let recovered = recover_questions(text);
            if recovered.is_empty() {
                lenient::list_from_value(value)
            } else {
                recovered
            }
        }
        Value::Object(map) => map
            .get("questions")
            .map(lenient::list_from_value)
            .unwrap_or_default(),
        other => lenient::list_from_value(other),
    }
}

/// Pull questions out of prose: list items first, then quoted questions,
/// then any line with a question mark.
pub fn recover_questions(text: &str) -> Vec<String> {
    if let Ok(listed) = Regex::new(r"(?m)(?:^|\n)\s*(?:\d+\.|\*|-)\s*(.*?\?)") {
        let found = collect_captures(&listed, text);
        if !found.is_empty() {
            return found;
        }
    }
    if let Ok(quoted) = Regex::new(r#""([^"]*?\?)""#) {
        let found = collect_captures(&quoted, text);
        if !found.is_empty() {
            return found;
        }
    }
    text.lines()
        .map(str::trim)
        .filter(|line| line.contains('?'))
        .map(str::to_string)
        .collect()
}

fn collect_captures(pattern: &Regex, text: &str) -> Vec<String> {
    pattern
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|question| !question.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::LlmGenerationClient;
    use pretty_assertions::assert_eq;
    use wellspring_rs_test_utils::{FixedLLM, RecordingChatLLM};

    fn strategist(reply: &str) -> Strategist {
        let client = LlmGenerationClient::new(Arc::new(FixedLLM::new(reply)));
        Strategist::new(
            Arc::new(client),
            StrategistConfig::default(),
            Arc::new(ProfileHints::new()),
        )
    }

    /// Legacy agent names are mapped and the category's subsystem is implied.
    #[tokio::test]
    async fn maps_agent_names() {
        let reply = r#"{
            "intent_analysis": "weight loss meal plan",
            "intent_category": "plan_request",
            "required_agents": ["HealthKnowledgeCouncilAgent", "WeatherAgent"],
            "profile_extraction_needed": "no",
            "follow_up_suggestions": ["How much protein?", "Which snacks?"]
        }"#;
        let outcome = strategist(reply)
            .route("Make me a meal plan", None)
            .await
            .expect("route");
        assert!(!outcome.is_degraded());
        let decision = outcome.into_value();
        assert_eq!(decision.intent_category, IntentCategory::PlanRequest);
        assert_eq!(
            decision.required_subsystems,
            BTreeSet::from([SubsystemId::KnowledgeQuery, SubsystemId::PlanGeneration])
        );
        assert_eq!(decision.plan_type, PlanType::Diet);
        assert_eq!(decision.follow_up_suggestions.len(), 2);
        assert!(!decision.profile_extraction_needed);
    }

    /// Unreadable replies degrade to the safe default with recovered follow-ups.
    #[tokio::test]
    async fn degraded_reply_uses_safe_default() {
        let reply = "I think the user wants help.\n1. What should I eat?\n2. How often should I train?";
        let outcome = strategist(reply)
            .route("hello there", None)
            .await
            .expect("route");
        assert!(outcome.is_degraded());
        let decision = outcome.into_value();
        assert_eq!(
            decision.required_subsystems,
            BTreeSet::from([SubsystemId::KnowledgeQuery])
        );
        assert_eq!(decision.immediate_response.as_deref(), Some(GREETING));
        assert_eq!(
            decision.follow_up_suggestions,
            vec!["What should I eat?", "How often should I train?"]
        );
    }

    /// Greeting words only count as whole words in a short message.
    #[test]
    fn greeting_needs_whole_word() {
        for greeting in ["hello there", "Hey!", "hi", "Good morning, coach"] {
            assert!(looks_like_greeting(greeting), "expected greeting for {greeting:?}");
        }
        for question in [
            "Is whey protein good for recovery?",
            "they say carbs are bad",
            "sushi before a run?",
            "Hi, how much protein should I eat after lifting?",
        ] {
            assert!(!looks_like_greeting(question), "unexpected greeting for {question:?}");
        }
    }

    /// A degraded route for a question mentioning whey carries no greeting.
    #[tokio::test]
    async fn degraded_question_has_no_greeting() {
        let outcome = strategist("not json at all")
            .route("Is whey protein good for recovery?", None)
            .await
            .expect("route");
        assert!(outcome.is_degraded());
        assert_eq!(outcome.into_value().immediate_response, None);
    }

    /// Personal details in the message force profile extraction.
    #[tokio::test]
    async fn hints_force_profile_extraction() {
        let reply = r#"{"intent_analysis": "protein", "intent_category": "knowledge_query", "required_subsystems": ["knowledge_query"]}"#;
        let outcome = strategist(reply)
            .route("I'm 34 years old, how much protein do I need?", None)
            .await
            .expect("route");
        assert!(outcome.value().profile_extraction_needed);
    }

    /// The prompt lists every subsystem and includes the stored profile.
    #[tokio::test]
    async fn prompt_includes_profile_and_subsystems() {
        let llm = Arc::new(RecordingChatLLM::new("{}"));
        let client = LlmGenerationClient::new(llm.clone());
        let strategist = Strategist::new(
            Arc::new(client),
            StrategistConfig::default(),
            Arc::new(ProfileHints::new()),
        );
        let profile: UserProfile = serde_json::from_str(r#"{"age": 30}"#).expect("profile");
        strategist
            .route("What is fiber?", Some(&profile))
            .await
            .expect("route");

        let messages = llm.last_messages();
        let prompt = &messages.last().expect("prompt").content;
        assert!(prompt.contains("Current User Profile"));
        assert!(prompt.contains("\"age\": 30"));
        for subsystem in SubsystemId::ALL {
            assert!(prompt.contains(subsystem.as_str()));
        }
        assert_eq!(llm.call_count(), 1);
    }

    /// Question recovery prefers list items, then quotes, then bare lines.
    #[test]
    fn recovers_questions_from_prose() {
        assert_eq!(
            recover_questions("Try asking \"Is rice healthy?\" or \"How much water?\""),
            vec!["Is rice healthy?", "How much water?"]
        );
        assert_eq!(
            recover_questions("Some thoughts\nCan I swim daily?\nok"),
            vec!["Can I swim daily?"]
        );
        assert!(recover_questions("no questions here").is_empty());
    }

    /// Plan type follows the diet and fitness keywords.
    #[test]
    fn infers_plan_type() {
        assert_eq!(infer_plan_type("a keto meal plan"), PlanType::Diet);
        assert_eq!(infer_plan_type("home workout"), PlanType::Fitness);
        assert_eq!(infer_plan_type("diet and exercise"), PlanType::General);
        assert_eq!(infer_plan_type("get healthier"), PlanType::General);
    }
}
