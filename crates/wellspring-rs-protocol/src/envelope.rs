use crate::{DietPlan, FitnessPlan, KnowledgeBundle, UserProfile};
use serde::{Deserialize, Serialize};

/// Final structured reply for one inbound message.
///
/// Absent sections mean the subsystem was not requested or did not produce a
/// usable result; there is no error field.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ResponseEnvelope {
    pub chat_response: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub knowledge: Option<KnowledgeBundle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diet_plan: Option<DietPlan>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fitness_plan: Option<FitnessPlan>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub lifestyle_recommendations: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub personalized_notes: Option<String>,
    #[serde(default)]
    pub follow_up_suggestions: Vec<String>,
    #[serde(default)]
    pub disclaimers: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_profile_updates: Option<UserProfile>,
}

impl ResponseEnvelope {
    /// Envelope that carries only conversational text.
    pub fn text(chat_response: impl Into<String>) -> Self {
        Self {
            chat_response: chat_response.into(),
            ..Self::default()
        }
    }

    pub fn has_plan(&self) -> bool {
        self.diet_plan.is_some() || self.fitness_plan.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    /// Missing sections are omitted while the suggestion list is always present.
    #[test]
    fn text_envelope_shape() {
        let value = serde_json::to_value(ResponseEnvelope::text("hi")).expect("json");
        assert_eq!(
            value,
            json!({"chat_response": "hi", "follow_up_suggestions": [], "disclaimers": []})
        );
    }
}
