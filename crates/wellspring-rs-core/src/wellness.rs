//! Mental wellness guide: conversational stress guidance in prose.

use crate::error::{CoreError, GenerationError};
use crate::experts::profile_fields;
use crate::generation::{GenerationClient, generate_within};
use log::{debug, warn};
use std::sync::Arc;
use wellspring_rs_config::WellnessConfig;
use wellspring_rs_protocol::{ExpertDomain, UserProfile};

const PERSONA: &str = "You are the Mental Wellness Guide, specializing in the psychological side of \
health and fitness. Be conversational, empathetic and professional. Open with a one or two \
sentence acknowledgment, give specific techniques with bold names and numbered steps, and close \
with brief encouragement and a mental health disclaimer. Do not analyze the user's query in \
your reply. Reply in markdown prose, not JSON.";

/// Canned stress management guidance used when generation fails.
pub const STRESS_FALLBACK: &str = "I understand managing stress can be challenging. Here are some \
helpful techniques: deep breathing (inhale for 4, hold for 7, exhale for 8), progressive muscle \
relaxation, and short mindful walks. These simple practices can help reduce stress during \
difficult times.";

/// Canned relief exercises used when generation fails.
pub const RELIEF_FALLBACK: &str = "Taking short breaks for stress relief exercises can make a big \
difference during intense study sessions. Here are some effective techniques you can try:

**Deep Breathing Exercise (4-7-8 Technique)**
This simple breathing pattern helps activate your parasympathetic nervous system, reducing stress quickly.
1. Sit comfortably with your back straight
2. Inhale quietly through your nose for 4 seconds
3. Hold your breath for 7 seconds
4. Exhale completely through your mouth for 8 seconds
5. Repeat 3-5 times
Duration: 2-3 minutes
Benefits: Reduces anxiety, improves focus, and helps regulate emotional responses

**Progressive Muscle Relaxation**
This technique helps release physical tension that accumulates during studying.
1. Start with your feet and focus on that muscle group
2. Tense the muscles tightly for 5 seconds
3. Release and relax for 10 seconds, noticing the difference
4. Move upward through each muscle group to your face
Duration: 5-10 minutes
Benefits: Releases physical tension, increases body awareness, and promotes mental relaxation

**Quick Mindfulness Break**
This grounding exercise brings you back to the present moment.
1. Pause and take a deep breath
2. Notice 5 things you can see around you
3. Acknowledge 4 things you can touch or feel
4. Listen for 3 things you can hear
5. Identify 2 things you can smell
6. Notice 1 thing you can taste
Duration: 2-3 minutes
Benefits: Reduces rumination, improves present-moment awareness, and resets mental focus

Remember that even short breaks using these techniques can significantly improve your study \
effectiveness and mental wellbeing.";

/// Kind of guidance a message asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuidanceKind {
    StressManagement,
    ReliefExercises,
}

impl GuidanceKind {
    pub fn for_message(message: &str) -> Self {
        let lower = message.to_lowercase();
        if lower.contains("relief exercises") || lower.contains("stress relief") {
            GuidanceKind::ReliefExercises
        } else {
            GuidanceKind::StressManagement
        }
    }

    pub fn fallback(self) -> &'static str {
        match self {
            GuidanceKind::StressManagement => STRESS_FALLBACK,
            GuidanceKind::ReliefExercises => RELIEF_FALLBACK,
        }
    }

    fn instructions(self) -> &'static str {
        match self {
            GuidanceKind::StressManagement => {
                "Provide practical, evidence-based guidance on stress management techniques, \
                 with clear headings and specific techniques."
            }
            GuidanceKind::ReliefExercises => {
                "The user is looking for relief exercises they can do quickly. Give 3-5 \
                 exercises, each with a bold name, a short description, numbered steps, a \
                 duration and its benefits."
            }
        }
    }
}

/// Produces prose guidance for stress and wellbeing messages.
#[derive(Clone)]
pub struct MentalWellnessGuide {
    client: Arc<dyn GenerationClient>,
    config: WellnessConfig,
}

impl MentalWellnessGuide {
    pub fn new(client: Arc<dyn GenerationClient>, config: WellnessConfig) -> Self {
        Self { client, config }
    }

    /// One generation call; the reply is returned as written.
    pub async fn guide(
        &self,
        message: &str,
        profile: Option<&UserProfile>,
    ) -> Result<String, GenerationError> {
        let kind = GuidanceKind::for_message(message);
        let prompt = build_prompt(message, profile, kind);
        let reply = generate_within(
            self.client.as_ref(),
            &prompt,
            self.config.temperature,
            PERSONA,
            self.config.timeout(),
        )
        .await?;
        debug!("wellness guidance generated (kind={:?}, chars={})", kind, reply.len());
        Ok(reply.trim().to_string())
    }

    /// Guidance that never fails: canned text replaces a failed call.
    pub async fn guide_or_fallback(
        &self,
        message: &str,
        profile: Option<&UserProfile>,
    ) -> (String, Option<CoreError>) {
        match self.guide(message, profile).await {
            Ok(text) => (text, None),
            Err(err) => {
                warn!("wellness guidance failed, using canned text (error={})", err);
                let text = GuidanceKind::for_message(message).fallback().to_string();
                let omitted = CoreError::SubsystemOmitted {
                    subsystem: "mental_wellness".to_string(),
                    reason: err.to_string(),
                };
                (text, Some(omitted))
            }
        }
    }
}

fn build_prompt(message: &str, profile: Option<&UserProfile>, kind: GuidanceKind) -> String {
    let mut prompt = String::new();
    if let Some(profile) = profile {
        let view = profile.view(profile_fields(ExpertDomain::MentalWellness));
        if !view.is_empty() {
            prompt.push_str("User Profile:\n");
            prompt.push_str(&view.to_prompt_json());
            prompt.push_str("\n\n");
        }
    }
    prompt.push_str(&format!(
        "User Query: \"{}\"\n\n{}",
        message.trim(),
        kind.instructions()
    ));
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::LlmGenerationClient;
    use pretty_assertions::assert_eq;
    use wellspring_rs_test_utils::{FailingLLM, RecordingChatLLM};

    fn guide(llm: Arc<dyn autoagents_llm::LLMProvider>) -> MentalWellnessGuide {
        MentalWellnessGuide::new(
            Arc::new(LlmGenerationClient::new(llm)),
            WellnessConfig::default(),
        )
    }

    /// Relief wording selects the exercise instructions.
    #[test]
    fn detects_guidance_kind() {
        assert_eq!(
            GuidanceKind::for_message("Any stress relief ideas?"),
            GuidanceKind::ReliefExercises
        );
        assert_eq!(
            GuidanceKind::for_message("I'm overwhelmed at work"),
            GuidanceKind::StressManagement
        );
    }

    /// The persona travels as the system message and the reply is trimmed.
    #[tokio::test]
    async fn returns_prose_reply() {
        let llm = Arc::new(RecordingChatLLM::new("  **Box breathing** helps.  "));
        let text = guide(llm.clone())
            .guide("Give me relief exercises", None)
            .await
            .expect("guidance");
        assert_eq!(text, "**Box breathing** helps.");
        let messages = llm.last_messages();
        assert!(messages[0].content.contains("Mental Wellness Guide"));
        assert!(messages[1].content.contains("3-5"));
    }

    /// Failures fall back to the canned text for the detected kind.
    #[tokio::test]
    async fn falls_back_to_canned_text() {
        let guide = guide(Arc::new(FailingLLM::new("quota")));
        let (text, omitted) = guide.guide_or_fallback("stress relief please", None).await;
        assert_eq!(text, RELIEF_FALLBACK);
        assert!(omitted.is_some());

        let (text, _) = guide.guide_or_fallback("so stressed", None).await;
        assert_eq!(text, STRESS_FALLBACK);
    }
}
