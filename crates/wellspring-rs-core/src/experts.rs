//! Domain experts consulted by the knowledge council.

use crate::error::ExpertError;
use crate::extract::{Extraction, extract};
use crate::generation::{GenerationClient, generate_within};
use async_trait::async_trait;
use log::debug;
use std::sync::Arc;
use std::time::Duration;
use wellspring_rs_protocol::{DomainExtension, ExpertAnswer, ExpertDomain, UserProfile};

const GENERAL_FIELDS: &[&str] = &[
    "age",
    "weight_lbs",
    "height_inches",
    "gender",
    "activity_level",
    "dietary_preferences",
    "health_conditions",
];

const NUTRITION_FIELDS: &[&str] = &[
    "age",
    "weight_lbs",
    "height_inches",
    "gender",
    "activity_level",
    "dietary_preferences",
    "dietary_restrictions",
    "allergies",
    "health_conditions",
    "fitness_goals",
];

const FITNESS_FIELDS: &[&str] = &[
    "age",
    "weight_lbs",
    "height_inches",
    "gender",
    "activity_level",
    "fitness_level",
    "fitness_goals",
    "physical_limitations",
    "available_equipment",
    "health_conditions",
];

const MENTAL_FIELDS: &[&str] = &["age", "activity_level", "health_conditions"];

/// A domain-scoped responder.
#[async_trait]
pub trait Expert: Send + Sync {
    fn domain(&self) -> ExpertDomain;

    async fn answer(
        &self,
        query: &str,
        profile: Option<&UserProfile>,
    ) -> Result<ExpertAnswer, ExpertError>;
}

/// Profile fields an expert of `domain` is allowed to see.
pub fn profile_fields(domain: ExpertDomain) -> &'static [&'static str] {
    match domain {
        ExpertDomain::GeneralHealth => GENERAL_FIELDS,
        ExpertDomain::Nutrition => NUTRITION_FIELDS,
        ExpertDomain::Fitness => FITNESS_FIELDS,
        ExpertDomain::MentalWellness => MENTAL_FIELDS,
    }
}

fn shape_hint(domain: ExpertDomain) -> String {
    let (focus, recommendations, extension) = match domain {
        ExpertDomain::GeneralHealth => (
            "evidence-based general health and preventive care",
            "health_recommendations",
            "",
        ),
        ExpertDomain::Nutrition => (
            "evidence-based nutrition and dietary guidance",
            "dietary_recommendations",
            ",\n  \"food_groups\": {\"recommended\": [\"...\"], \"moderate\": [\"...\"], \"limit\": [\"...\"]}",
        ),
        ExpertDomain::Fitness => (
            "safe, effective exercise and physical activity",
            "exercise_recommendations",
            ",\n  \"activity_guidelines\": {\"beginner\": \"...\", \"intermediate\": \"...\", \"advanced\": \"...\"}",
        ),
        ExpertDomain::MentalWellness => (
            "stress management, sleep and emotional wellbeing",
            "wellness_techniques",
            ",\n  \"stress_management\": {\"techniques\": \"...\", \"daily_habits\": \"...\"}",
        ),
    };
    format!(
        "You are the {title} Expert, specializing in {focus}.\n\
         Reply with one JSON object and nothing else:\n\
         {{\n  \"title\": \"main topic\",\n  \"content\": \"detailed explanation\",\n  \
         \"subtopics\": [{{\"title\": \"...\", \"content\": \"...\"}}],\n  \
         \"{recommendations}\": [\"...\"],\n  \"references\": [\"...\"],\n  \
         \"disclaimers\": [\"...\"]{extension}\n}}",
        title = domain.title(),
    )
}

/// Expert backed by one generation call per answer.
#[derive(Clone)]
pub struct ExpertResponder {
    domain: ExpertDomain,
    client: Arc<dyn GenerationClient>,
    temperature: f32,
    timeout: Duration,
}

impl ExpertResponder {
    pub fn new(
        domain: ExpertDomain,
        client: Arc<dyn GenerationClient>,
        temperature: f32,
        timeout: Duration,
    ) -> Self {
        Self {
            domain,
            client,
            temperature,
            timeout,
        }
    }

    fn prompt(&self, query: &str, profile: Option<&UserProfile>) -> String {
        let mut prompt = String::new();
        if let Some(profile) = profile {
            let view = profile.view(profile_fields(self.domain));
            if !view.is_empty() {
                prompt.push_str("User Profile:\n");
                prompt.push_str(&view.to_prompt_json());
                prompt.push_str("\n\n");
            }
        }
        prompt.push_str(&format!(
            "User Query: \"{}\"\n\nProvide your expert response as the JSON object described.",
            query.trim()
        ));
        prompt
    }

    /// Keep only the extension field that belongs to this domain.
    fn scope_extension(&self, extension: DomainExtension) -> DomainExtension {
        match self.domain {
            ExpertDomain::Nutrition => DomainExtension {
                food_groups: extension.food_groups,
                ..DomainExtension::default()
            },
            ExpertDomain::Fitness => DomainExtension {
                activity_guidelines: extension.activity_guidelines,
                ..DomainExtension::default()
            },
            ExpertDomain::MentalWellness => DomainExtension {
                stress_management: extension.stress_management,
                ..DomainExtension::default()
            },
            ExpertDomain::GeneralHealth => DomainExtension::default(),
        }
    }
}

#[async_trait]
impl Expert for ExpertResponder {
    fn domain(&self) -> ExpertDomain {
        self.domain
    }

    async fn answer(
        &self,
        query: &str,
        profile: Option<&UserProfile>,
    ) -> Result<ExpertAnswer, ExpertError> {
        let prompt = self.prompt(query, profile);
        let raw = generate_within(
            self.client.as_ref(),
            &prompt,
            self.temperature,
            &shape_hint(self.domain),
            self.timeout,
        )
        .await
        .map_err(|source| ExpertError::Generation {
            domain: self.domain,
            source,
        })?;

        let mut answer = match extract::<ExpertAnswer>(&raw) {
            Extraction::Degraded { reason, .. } => {
                return Err(ExpertError::Degraded {
                    domain: self.domain,
                    reason,
                });
            }
            other => other.into_value(),
        };
        if answer.content.trim().is_empty() {
            return Err(ExpertError::EmptyAnswer(self.domain));
        }
        if answer.title.trim().is_empty() {
            answer.title = format!("{} guidance", self.domain.title());
        }
        answer.extension = self.scope_extension(answer.extension);
        debug!(
            "expert answered (domain={}, subtopics={}, references={})",
            self.domain,
            answer.subtopics.len(),
            answer.references.len()
        );
        Ok(answer)
    }
}
