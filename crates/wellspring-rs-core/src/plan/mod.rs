//! Plan generation: diet, fitness and lifestyle sections built concurrently.

pub mod fallback;

use crate::error::CoreError;
use crate::extract::{Extraction, extract};
use crate::generation::{GenerationClient, generate_within};
use log::{debug, warn};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use wellspring_rs_config::PlansConfig;
use wellspring_rs_protocol::{DietPlan, FitnessPlan, Plan, PlanType, UserProfile, lenient};

const DIET_HINT: &str = r#"You are the Diet Plan Creator, a nutrition specialist building practical meal plans.
Reply with one JSON object and nothing else:
{
  "goal": "primary nutritional goal",
  "description": "brief overview of the approach",
  "duration_days": 7,
  "daily_calorie_target": 2000,
  "macros": {"protein": "30%", "carbs": "40%", "fats": "30%"},
  "meals": [{"meal_type": "Breakfast", "food_items": ["..."], "notes": "..."}],
  "foods_to_emphasize": ["..."],
  "foods_to_limit": ["..."],
  "hydration": "...",
  "notes": "..."
}"#;

const FITNESS_HINT: &str = r#"You are the Fitness Plan Creator, a certified trainer building safe, progressive programs.
Reply with one JSON object and nothing else:
{
  "goal": "primary fitness goal",
  "description": "brief overview of the approach",
  "duration_weeks": 4,
  "frequency_per_week": 3,
  "session_duration_minutes": 30,
  "equipment_needed": ["..."],
  "workout_schedule": [{
    "day": "Monday",
    "focus": "...",
    "warm_up": {"duration": "5 minutes", "exercises": [{"name": "...", "duration": "1 minute"}]},
    "exercises": [{"name": "...", "sets": 3, "reps": "8-12", "rest_seconds": 60, "notes": "...", "target_areas": ["..."]}],
    "cool_down": {"duration": "5 minutes", "exercises": [{"name": "...", "duration": "1 minute"}]}
  }],
  "progression_guidelines": ["..."],
  "rest_days_recommendation": "...",
  "notes": "..."
}"#;

const LIFESTYLE_HINT: &str = r#"You are the Lifestyle Coach. Give habits that support the user's plan.
Reply with one JSON object and nothing else:
{"lifestyle_recommendations": ["..."], "personalized_notes": "..."}"#;

#[derive(Debug, Default, Deserialize)]
struct LifestyleReply {
    #[serde(default, deserialize_with = "lenient::string_list", alias = "recommendations")]
    lifestyle_recommendations: Vec<String>,
    #[serde(default, deserialize_with = "lenient::text", alias = "notes")]
    personalized_notes: String,
}

/// Plan plus the sections that fell back to rules.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlanOutcome {
    pub plan: Plan,
    pub degraded: Vec<CoreError>,
}

/// Builds diet, fitness and lifestyle plans from a goal and profile.
#[derive(Clone)]
pub struct PlanGenerator {
    client: Arc<dyn GenerationClient>,
    config: PlansConfig,
}

impl PlanGenerator {
    pub fn new(client: Arc<dyn GenerationClient>, config: PlansConfig) -> Self {
        Self { client, config }
    }

    pub async fn generate(
        &self,
        goal: &str,
        plan_type: PlanType,
        profile: Option<&UserProfile>,
    ) -> Plan {
        self.generate_detailed(goal, plan_type, profile).await.plan
    }

    /// Generate every section `plan_type` calls for. Sections never go
    /// missing: a failed section is replaced by its rule-based version.
    pub async fn generate_detailed(
        &self,
        goal: &str,
        plan_type: PlanType,
        profile: Option<&UserProfile>,
    ) -> PlanOutcome {
        let context = plan_context(goal, profile);
        let diet = async {
            if !plan_type.includes_diet() {
                return None;
            }
            Some(self.diet_section(goal, &context, profile).await)
        };
        let fitness = async {
            if !plan_type.includes_fitness() {
                return None;
            }
            Some(self.fitness_section(goal, &context, profile).await)
        };
        let lifestyle = self.lifestyle_section(goal, &context, profile);
        let (diet, fitness, (lifestyle, lifestyle_degraded)) = tokio::join!(diet, fitness, lifestyle);

        let mut degraded = Vec::new();
        let diet_plan = diet.map(|(plan, issue)| {
            degraded.extend(issue);
            plan
        });
        let fitness_plan = fitness.map(|(plan, issue)| {
            degraded.extend(issue);
            plan
        });
        degraded.extend(lifestyle_degraded);
        let (lifestyle_recommendations, personalized_notes) = lifestyle;

        debug!(
            "plan generated (plan_type={}, diet={}, fitness={}, degraded={})",
            plan_type,
            diet_plan.is_some(),
            fitness_plan.is_some(),
            degraded.len()
        );
        PlanOutcome {
            plan: Plan {
                diet_plan,
                fitness_plan,
                lifestyle_recommendations,
                personalized_notes,
            },
            degraded,
        }
    }

    /// Revise a diet plan from feedback; the current plan is kept on failure.
    pub async fn refine_diet_plan(&self, current: &DietPlan, feedback: &str) -> DietPlan {
        self.refine(current, feedback, "diet", DIET_HINT, DietPlan::is_usable)
            .await
    }

    /// Revise a fitness plan from feedback; the current plan is kept on failure.
    pub async fn refine_fitness_plan(&self, current: &FitnessPlan, feedback: &str) -> FitnessPlan {
        self.refine(current, feedback, "fitness", FITNESS_HINT, FitnessPlan::is_usable)
            .await
    }

    async fn refine<T>(
        &self,
        current: &T,
        feedback: &str,
        kind: &str,
        hint: &str,
        usable: fn(&T) -> bool,
    ) -> T
    where
        T: DeserializeOwned + Default + Clone + serde::Serialize,
    {
        let current_json = serde_json::to_string_pretty(current).unwrap_or_default();
        let prompt = format!(
            "Refine this {kind} plan based on the user's feedback.\n\nCurrent Plan:\n{current_json}\n\n\
             User Feedback:\n\"{}\"\n\nKeep the overall structure and address the user's concerns.",
            feedback.trim()
        );
        match self.call::<T>(&prompt, self.config.temperature, hint).await {
            Ok(refined) if usable(&refined) => refined,
            Ok(_) => {
                warn!("refined plan unusable, keeping current (kind={})", kind);
                current.clone()
            }
            Err(reason) => {
                warn!("plan refinement failed, keeping current (kind={}, reason={})", kind, reason);
                current.clone()
            }
        }
    }

    async fn diet_section(
        &self,
        goal: &str,
        context: &str,
        profile: Option<&UserProfile>,
    ) -> (DietPlan, Option<CoreError>) {
        let prompt = format!("Create a personalized diet plan.\n\n{context}");
        match self.call::<DietPlan>(&prompt, self.config.temperature, DIET_HINT).await {
            Ok(plan) if plan.is_usable() => (plan, None),
            outcome => (
                fallback::diet_plan(goal, profile),
                Some(omitted("diet_plan", outcome.err())),
            ),
        }
    }

    async fn fitness_section(
        &self,
        goal: &str,
        context: &str,
        profile: Option<&UserProfile>,
    ) -> (FitnessPlan, Option<CoreError>) {
        let prompt = format!("Create a personalized fitness plan.\n\n{context}");
        match self.call::<FitnessPlan>(&prompt, self.config.temperature, FITNESS_HINT).await {
            Ok(plan) if plan.is_usable() => (plan, None),
            outcome => (
                fallback::fitness_plan(goal, profile),
                Some(omitted("fitness_plan", outcome.err())),
            ),
        }
    }

    async fn lifestyle_section(
        &self,
        goal: &str,
        context: &str,
        profile: Option<&UserProfile>,
    ) -> ((Vec<String>, String), Option<CoreError>) {
        let prompt = format!("Suggest lifestyle habits that support this plan.\n\n{context}");
        match self
            .call::<LifestyleReply>(&prompt, self.config.lifestyle_temperature, LIFESTYLE_HINT)
            .await
        {
            Ok(reply) if !reply.lifestyle_recommendations.is_empty() => {
                let notes = if reply.personalized_notes.is_empty() {
                    fallback::lifestyle(goal, profile).1
                } else {
                    reply.personalized_notes
                };
                ((reply.lifestyle_recommendations, notes), None)
            }
            outcome => (
                fallback::lifestyle(goal, profile),
                Some(omitted("lifestyle", outcome.err())),
            ),
        }
    }

    /// One generation call and extraction; any failure is a reason string.
    async fn call<T>(&self, prompt: &str, temperature: f32, hint: &str) -> Result<T, String>
    where
        T: DeserializeOwned + Default,
    {
        let raw = generate_within(
            self.client.as_ref(),
            prompt,
            temperature,
            hint,
            self.config.timeout(),
        )
        .await
        .map_err(|err| err.to_string())?;
        match extract::<T>(&raw) {
            Extraction::Degraded { reason, .. } => Err(reason),
            other => Ok(other.into_value()),
        }
    }
}

fn omitted(section: &str, reason: Option<String>) -> CoreError {
    let reason = reason.unwrap_or_else(|| "reply had no usable content".to_string());
    warn!("plan section fell back to rules (section={}, reason={})", section, reason);
    CoreError::ExtractionDegraded {
        shape: section.to_string(),
        reason,
    }
}

fn plan_context(goal: &str, profile: Option<&UserProfile>) -> String {
    let profile_json = profile
        .filter(|profile| !profile.is_empty())
        .map(UserProfile::to_prompt_json)
        .unwrap_or_else(|| "No profile information available".to_string());
    format!("Goal: \"{}\"\n\nUser Profile:\n{profile_json}", goal.trim())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::LlmGenerationClient;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use wellspring_rs_test_utils::ScriptedLLM;

    fn generator(llm: ScriptedLLM) -> PlanGenerator {
        let client: Arc<dyn GenerationClient> = Arc::new(LlmGenerationClient::new(Arc::new(llm)));
        PlanGenerator::new(client, PlansConfig::default())
    }

    fn diet_reply() -> String {
        json!({
            "goal": "Lose weight",
            "meals": [{"meal_type": "Breakfast", "food_items": ["Oats"]}]
        })
        .to_string()
    }

    /// Diet requests skip the fitness call but still get lifestyle advice.
    #[tokio::test]
    async fn diet_only_plan() {
        let llm = ScriptedLLM::new()
            .on("Diet Plan Creator", diet_reply())
            .on(
                "Lifestyle Coach",
                r#"{"lifestyle_recommendations": ["Sleep 8 hours"], "personalized_notes": "Go slow."}"#,
            );
        let outcome = generator(llm.clone())
            .generate_detailed("Lose weight", PlanType::Diet, None)
            .await;

        assert!(outcome.degraded.is_empty());
        assert_eq!(outcome.plan.fitness_plan, None);
        let diet = outcome.plan.diet_plan.expect("diet");
        assert_eq!(diet.meals[0].food_items, vec!["Oats".to_string()]);
        assert_eq!(outcome.plan.lifestyle_recommendations, vec!["Sleep 8 hours".to_string()]);
        assert_eq!(outcome.plan.personalized_notes, "Go slow.");
        assert_eq!(llm.calls_matching("Fitness Plan Creator"), 0);
    }

    /// General plans fall back to rules for every unusable section.
    #[tokio::test]
    async fn general_plan_falls_back() {
        let llm = ScriptedLLM::new()
            .on("Diet Plan Creator", "not json")
            .failing_on("Fitness Plan Creator", "overloaded")
            .on("Lifestyle Coach", "{}");
        let outcome = generator(llm)
            .generate_detailed("", PlanType::General, None)
            .await;

        let diet = outcome.plan.diet_plan.expect("diet fallback");
        assert_eq!(diet.goal, "Balanced nutrition for general health");
        let fitness = outcome.plan.fitness_plan.expect("fitness fallback");
        assert!(fitness.is_usable());
        assert!(!outcome.plan.lifestyle_recommendations.is_empty());
        assert!(!outcome.plan.personalized_notes.is_empty());
        assert_eq!(outcome.degraded.len(), 3);
    }

    /// Refinement keeps the current plan when the reply is unusable.
    #[tokio::test]
    async fn refine_keeps_current_on_failure() {
        let current = fallback::diet_plan("Eat better", None);
        let llm = ScriptedLLM::new().on("Refine this diet plan", "I cannot do that");
        let refined = generator(llm).refine_diet_plan(&current, "less rice").await;
        assert_eq!(refined, current);

        let llm = ScriptedLLM::new().on("Refine this diet plan", diet_reply());
        let refined = generator(llm).refine_diet_plan(&current, "less rice").await;
        assert_eq!(refined.goal, "Lose weight");
    }
}
