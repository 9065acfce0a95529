use crate::error::{CoreError, GenerationError};
use crate::extract::{Extraction, extract};
use crate::generation::{GenerationClient, generate_within};
use crate::profile::hints::ProfileHints;
use crate::profile::validate::sanitize;
use log::{info, warn};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use wellspring_rs_config::ProfileConfig;
use wellspring_rs_profile::ProfileStore;
use wellspring_rs_protocol::{ProfileValue, UserProfile, lenient};

const SHAPE_HINT: &str = r#"You are the Profile Analyst for a health and fitness assistant.
You never talk to the user. Extract only what the message states; never invent values.
Reply with one JSON object and nothing else:
{
  "extracted_information": {"age": 35, "weight_lbs": 180, "fitness_goals": ["lose weight"]},
  "new_information": {"fitness_goals": ["lose weight"]},
  "updated_information": {"weight_lbs": 180},
  "confidence_scores": {"age": 0.95, "weight_lbs": 0.9, "fitness_goals": 0.8},
  "missing_information": ["height_inches", "activity_level"]
}
Use the field names age, weight_lbs, height_inches, gender, activity_level, fitness_level,
fitness_goals, dietary_preferences, dietary_restrictions, allergies, health_conditions,
physical_limitations, available_equipment and stress_level when they apply."#;

#[derive(Debug, Default, Deserialize)]
struct ProfileReply {
    #[serde(default, alias = "extracted_profile")]
    extracted_information: Value,
    #[serde(default)]
    new_information: Value,
    #[serde(default)]
    updated_information: Value,
    #[serde(default)]
    confidence_scores: Value,
    #[serde(default, deserialize_with = "lenient::string_list")]
    missing_information: Vec<String>,
}

impl ProfileReply {
    /// Extracted fields; the new/updated split stands in when the full set is absent.
    fn fields(&self) -> Map<String, Value> {
        if let Value::Object(map) = &self.extracted_information
            && !map.is_empty()
        {
            return map.clone();
        }
        let mut combined = Map::new();
        for part in [&self.new_information, &self.updated_information] {
            if let Value::Object(map) = part {
                combined.extend(map.iter().map(|(key, value)| (key.clone(), value.clone())));
            }
        }
        combined
    }

    fn confidence(&self, field: &str) -> Option<f64> {
        let score = self.confidence_scores.get(field)?;
        score
            .as_f64()
            .or_else(|| score.as_str().and_then(|text| text.trim().parse().ok()))
    }
}

/// Result of one profile extraction.
///
/// `profile` is the complete replacement for the stored profile.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileUpdate {
    pub profile: UserProfile,
    pub new_fields: Vec<String>,
    pub updated_fields: Vec<String>,
    pub missing_information: Vec<String>,
    /// Set when the model reply was unusable and only hints were applied.
    pub degraded: Option<String>,
}

impl ProfileUpdate {
    /// Whether this update should be written to the store.
    pub fn should_write(&self) -> bool {
        self.degraded.is_none() || !self.profile.is_empty()
    }
}

/// Extracts profile fields from messages and replaces stored profiles.
#[derive(Clone)]
pub struct ProfileManager {
    client: Arc<dyn GenerationClient>,
    config: ProfileConfig,
    hints: Arc<ProfileHints>,
}

impl ProfileManager {
    pub fn new(
        client: Arc<dyn GenerationClient>,
        config: ProfileConfig,
        hints: Arc<ProfileHints>,
    ) -> Self {
        Self {
            client,
            config,
            hints,
        }
    }

    /// Extract the profile stated by `message`.
    ///
    /// Only `Unavailable` is returned as an error; other generation failures
    /// fall back to pattern hints.
    pub async fn extract_and_merge(
        &self,
        message: &str,
        existing: &UserProfile,
    ) -> Result<ProfileUpdate, GenerationError> {
        let hinted = self.hints.extract(message);
        let prompt = build_prompt(message, existing);
        let raw = match generate_within(
            self.client.as_ref(),
            &prompt,
            self.config.temperature,
            SHAPE_HINT,
            self.config.timeout(),
        )
        .await
        {
            Ok(raw) => raw,
            Err(err) if err.is_unavailable() => return Err(err),
            Err(err) => {
                warn!("profile extraction failed, using hints (error={})", err);
                return Ok(self.finish(hinted, existing, Vec::new(), Some(err.to_string())));
            }
        };

        let reply = match extract::<ProfileReply>(&raw) {
            Extraction::Degraded { reason, .. } => {
                return Ok(self.finish(hinted, existing, Vec::new(), Some(reason)));
            }
            other => other.into_value(),
        };

        let mut profile = UserProfile::new();
        for (field, value) in reply.fields() {
            if let Some(score) = reply.confidence(&field)
                && score < self.config.confidence_threshold
            {
                continue;
            }
            if let Some(value) = ProfileValue::from_json(&value) {
                profile.insert(field, value);
            }
        }
        for (field, value) in hinted.iter() {
            profile.insert(field.clone(), value.clone());
        }
        Ok(self.finish(profile, existing, reply.missing_information, None))
    }

    /// Extract and, when warranted, replace the stored profile for `user_id`.
    ///
    /// Returns the update together with whether the store was written.
    pub async fn update(
        &self,
        store: &dyn ProfileStore,
        user_id: &str,
        message: &str,
        existing: &UserProfile,
    ) -> Result<(ProfileUpdate, bool), CoreError> {
        let update = self
            .extract_and_merge(message, existing)
            .await
            .map_err(|err| CoreError::SubsystemOmitted {
                subsystem: "profile_update".to_string(),
                reason: err.to_string(),
            })?;
        if !update.should_write() {
            return Ok((update, false));
        }
        store.replace(user_id, update.profile.clone()).await?;
        info!(
            "profile replaced (user_id={}, fields={}, new={}, updated={})",
            user_id,
            update.profile.len(),
            update.new_fields.len(),
            update.updated_fields.len()
        );
        Ok((update, true))
    }

    fn finish(
        &self,
        profile: UserProfile,
        existing: &UserProfile,
        missing_information: Vec<String>,
        degraded: Option<String>,
    ) -> ProfileUpdate {
        let profile = sanitize(profile);
        let mut new_fields = Vec::new();
        let mut updated_fields = Vec::new();
        for (field, value) in profile.iter() {
            match existing.get(field) {
                None => new_fields.push(field.clone()),
                Some(previous) if previous != value => updated_fields.push(field.clone()),
                Some(_) => {}
            }
        }
        ProfileUpdate {
            profile,
            new_fields,
            updated_fields,
            missing_information,
            degraded,
        }
    }
}

fn build_prompt(message: &str, existing: &UserProfile) -> String {
    let mut prompt = String::new();
    if !existing.is_empty() {
        prompt.push_str("Existing User Profile:\n");
        prompt.push_str(&existing.to_prompt_json());
        prompt.push_str("\n\n");
    }
    prompt.push_str(&format!(
        "Extract user profile information from this message:\n\"{}\"\n\n\
         Report which fields are new and which update the existing profile.",
        message.trim()
    ));
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::LlmGenerationClient;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use wellspring_rs_profile::InMemoryProfileStore;
    use wellspring_rs_test_utils::FixedLLM;

    fn manager(reply: &str) -> ProfileManager {
        let client = LlmGenerationClient::new(Arc::new(FixedLLM::new(reply)));
        ProfileManager::new(
            Arc::new(client),
            ProfileConfig::default(),
            Arc::new(ProfileHints::new()),
        )
    }

    fn profile(value: Value) -> UserProfile {
        serde_json::from_value(value).expect("profile")
    }

    /// The stored profile is replaced, not merged.
    #[tokio::test]
    async fn replaces_stored_profile() {
        let existing = profile(json!({"age": 30}));
        let store = InMemoryProfileStore::new().with_profile("u1", existing.clone());
        let manager = manager(
            r#"{"extracted_information": {"weight": 150}, "new_information": {"weight": 150}, "updated_information": {}}"#,
        );

        let (update, written) = manager
            .update(&store, "u1", "Now I'm at 150", &existing)
            .await
            .expect("update");
        assert!(written);
        assert_eq!(update.new_fields, vec!["weight".to_string()]);
        let stored = store.get("u1").await.expect("get");
        assert_eq!(stored.to_json(), json!({"weight": 150}));
    }

    /// Low-confidence fields are dropped and hints override model values.
    #[tokio::test]
    async fn filters_confidence_and_prefers_hints() {
        let manager = manager(
            r#"{"extracted_profile": {"age": 40, "gender": "male", "activity_level": "moderate"},
                "confidence_scores": {"age": 0.9, "gender": 0.3, "activity_level": "0.8"},
                "missing_information": ["height_inches"]}"#,
        );
        let update = manager
            .extract_and_merge("I'm 41 years old and fairly active", &UserProfile::new())
            .await
            .expect("extract");
        assert_eq!(
            update.profile.to_json(),
            json!({"age": 41, "activity_level": "moderate"})
        );
        assert_eq!(update.missing_information, vec!["height_inches".to_string()]);
        assert_eq!(update.degraded, None);
    }

    /// Unreadable replies fall back to hints; no hints means no write.
    #[tokio::test]
    async fn degraded_reply_uses_hints_only() {
        let store = InMemoryProfileStore::new().with_profile("u1", profile(json!({"age": 30})));
        let manager = manager("I could not find anything.");

        let (update, written) = manager
            .update(&store, "u1", "What is a calorie?", &UserProfile::new())
            .await
            .expect("update");
        assert!(!written);
        assert!(update.degraded.is_some());
        assert_eq!(
            store.get("u1").await.expect("get").to_json(),
            json!({"age": 30})
        );

        let (update, written) = manager
            .update(&store, "u1", "My weight is 200 lbs", &UserProfile::new())
            .await
            .expect("update");
        assert!(written);
        assert_eq!(update.profile.to_json(), json!({"weight_lbs": 200.0}));
    }

    struct Down;

    #[async_trait]
    impl GenerationClient for Down {
        async fn generate(&self, _: &str, _: f32, _: &str) -> Result<String, GenerationError> {
            Err(GenerationError::Unavailable("offline".to_string()))
        }
    }

    /// An unreachable generation service is reported, not masked by hints.
    #[tokio::test]
    async fn unavailable_is_an_error() {
        let manager = ProfileManager::new(
            Arc::new(Down),
            ProfileConfig::default(),
            Arc::new(ProfileHints::new()),
        );
        let err = manager
            .extract_and_merge("I'm 30 years old", &UserProfile::new())
            .await
            .expect_err("unavailable");
        assert!(err.is_unavailable());
    }
}
