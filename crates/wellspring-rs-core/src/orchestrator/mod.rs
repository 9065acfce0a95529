//! Request pipeline: route, dispatch, update the profile and merge.

mod compose;
mod registry;

pub use compose::{CONSULT_DISCLAIMER, DEFAULT_PROMPT, EDUCATIONAL_DISCLAIMER, WELLNESS_DISCLAIMER};
pub use registry::{
    KnowledgeSubsystem, PlanSubsystem, Subsystem, SubsystemOutput, SubsystemRegistry,
    SubsystemRequest, WellnessSubsystem,
};

use crate::council::KnowledgeCouncil;
use crate::error::CoreError;
use crate::experts::Expert;
use crate::extract::Extraction;
use crate::generation::GenerationClient;
use crate::plan::PlanGenerator;
use crate::profile::{ProfileHints, ProfileManager, ProfileUpdate};
use crate::strategist::Strategist;
use crate::types::{RoutingDecision, SubsystemId};
use crate::wellness::MentalWellnessGuide;
use compose::Draft;
use futures_util::future::join_all;
use log::{debug, error, info, warn};
use std::collections::BTreeSet;
use std::sync::Arc;
use uuid::Uuid;
use wellspring_rs_config::{OrchestratorConfig, WellspringConfig};
use wellspring_rs_profile::ProfileStore;
use wellspring_rs_protocol::{
    InboundRequest, KnowledgeBundle, RequestId, ResponseEnvelope, UserProfile,
};

/// Envelope plus what was absorbed while producing it.
#[derive(Debug, Clone, PartialEq)]
pub struct HandledRequest {
    pub request_id: RequestId,
    pub envelope: ResponseEnvelope,
    /// Degradations recorded for observability; never shown to the user.
    pub degradations: Vec<CoreError>,
}

/// Builder for [`Orchestrator`]; every dependency is injected here.
pub struct OrchestratorBuilder {
    client: Arc<dyn GenerationClient>,
    store: Arc<dyn ProfileStore>,
    config: WellspringConfig,
    experts: Vec<Arc<dyn Expert>>,
    subsystems: Vec<Arc<dyn Subsystem>>,
}

impl OrchestratorBuilder {
    pub fn new(client: Arc<dyn GenerationClient>, store: Arc<dyn ProfileStore>) -> Self {
        Self {
            client,
            store,
            config: WellspringConfig::default(),
            experts: Vec::new(),
            subsystems: Vec::new(),
        }
    }

    pub fn config(mut self, config: WellspringConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the council's expert for the expert's domain.
    pub fn expert(mut self, expert: Arc<dyn Expert>) -> Self {
        self.experts.push(expert);
        self
    }

    /// Replace the default subsystem registered under the same id.
    pub fn subsystem(mut self, subsystem: Arc<dyn Subsystem>) -> Self {
        self.subsystems.push(subsystem);
        self
    }

    pub fn build(self) -> Orchestrator {
        let config = self.config;
        let hints = Arc::new(ProfileHints::new());
        let client = self.client;

        let council = self
            .experts
            .into_iter()
            .fold(KnowledgeCouncil::new(client.clone(), &config.council), |council, expert| {
                council.with_expert(expert)
            });
        let plans = PlanGenerator::new(client.clone(), config.plans.clone());
        let wellness = MentalWellnessGuide::new(client.clone(), config.wellness.clone());

        let registry = SubsystemRegistry::new()
            .with(Arc::new(KnowledgeSubsystem(council.clone())))
            .with(Arc::new(PlanSubsystem(plans.clone())))
            .with(Arc::new(WellnessSubsystem(wellness)));
        let registry = self
            .subsystems
            .into_iter()
            .fold(registry, |registry, subsystem| registry.with(subsystem));

        Orchestrator {
            strategist: Strategist::new(client.clone(), config.strategist.clone(), hints.clone()),
            profile_manager: ProfileManager::new(client, config.profile.clone(), hints),
            council,
            plans,
            registry,
            store: self.store,
            config: config.orchestrator,
        }
    }
}

/// Handles one inbound message end to end.
#[derive(Clone)]
pub struct Orchestrator {
    strategist: Strategist,
    profile_manager: ProfileManager,
    council: KnowledgeCouncil,
    plans: PlanGenerator,
    registry: SubsystemRegistry,
    store: Arc<dyn ProfileStore>,
    config: OrchestratorConfig,
}

impl Orchestrator {
    pub fn builder(
        client: Arc<dyn GenerationClient>,
        store: Arc<dyn ProfileStore>,
    ) -> OrchestratorBuilder {
        OrchestratorBuilder::new(client, store)
    }

    pub async fn handle(&self, message: &str, user_id: &str) -> ResponseEnvelope {
        self.handle_detailed(message, user_id).await.envelope
    }

    pub async fn handle_request(&self, request: &InboundRequest) -> ResponseEnvelope {
        self.handle(&request.message, &request.user_id).await
    }

    /// Handle a message and report the degradations absorbed on the way.
    pub async fn handle_detailed(&self, message: &str, user_id: &str) -> HandledRequest {
        let request_id = Uuid::new_v4();
        let mut degradations = Vec::new();
        info!(
            "request received (request_id={}, user_id={}, chars={})",
            request_id,
            user_id,
            message.len()
        );

        let existing = match self.store.get(user_id).await {
            Ok(profile) => profile,
            Err(err) => {
                warn!("profile load failed, using empty profile (user_id={}, error={})", user_id, err);
                degradations.push(CoreError::from(err));
                UserProfile::new()
            }
        };

        let snapshot = (!existing.is_empty()).then_some(&existing);
        let decision = match self.strategist.route(message, snapshot).await {
            Ok(Extraction::Degraded { value, reason }) => {
                degradations.push(CoreError::RoutingAmbiguous(reason));
                value
            }
            Ok(extraction) => extraction.into_value(),
            Err(err) if err.is_unavailable() => {
                error!("generation unavailable, apologizing (request_id={}, error={})", request_id, err);
                degradations.push(CoreError::GenerationUnavailable(err.to_string()));
                return HandledRequest {
                    request_id,
                    envelope: ResponseEnvelope::text(self.config.apology_message.clone()),
                    degradations,
                };
            }
            Err(err) => {
                warn!("routing failed, using safe default (request_id={}, error={})", request_id, err);
                degradations.push(CoreError::RoutingAmbiguous(err.to_string()));
                let hinted = self.strategist.hints().detect(message);
                self.strategist.fallback_decision(message, hinted)
            }
        };

        let targets = dispatch_targets(&decision);
        let mut request = SubsystemRequest {
            message: message.to_string(),
            goal: decision.intent_analysis.clone(),
            plan_type: decision.plan_type,
            profile: existing.clone(),
        };

        let wants_profile = decision.wants_profile_update();
        let (profile_result, outputs) = if self.config.sequential_profile_update {
            let profile_result = self.update_profile(wants_profile, user_id, message, &existing).await;
            if let Some(Ok((update, true))) = &profile_result {
                request.profile = update.profile.clone();
            }
            let outputs = self.dispatch(&targets, &request).await;
            (profile_result, outputs)
        } else {
            tokio::join!(
                self.update_profile(wants_profile, user_id, message, &existing),
                self.dispatch(&targets, &request)
            )
        };

        let mut profile_changed = None;
        match profile_result {
            Some(Ok((update, written))) => {
                if let Some(reason) = update.degraded.clone() {
                    degradations.push(CoreError::ExtractionDegraded {
                        shape: "profile".to_string(),
                        reason,
                    });
                }
                if written && update.profile != existing {
                    profile_changed = Some(update.profile);
                }
            }
            Some(Err(err)) => {
                warn!("profile update omitted (request_id={}, error={})", request_id, err);
                degradations.push(err);
            }
            None => {}
        }

        let envelope = self.merge(&decision, outputs, profile_changed, &mut degradations);
        info!(
            "request handled (request_id={}, category={}, subsystems={}, degradations={})",
            request_id,
            decision.intent_category.as_str(),
            targets.len(),
            degradations.len()
        );
        HandledRequest {
            request_id,
            envelope,
            degradations,
        }
    }

    /// Comprehensive information on a topic from its primary expert.
    pub async fn topic(&self, topic: &str) -> KnowledgeBundle {
        self.council.topic(topic).await.bundle
    }

    pub async fn profile(&self, user_id: &str) -> Result<UserProfile, CoreError> {
        Ok(self.store.get(user_id).await?)
    }

    /// Replace a stored profile directly, bypassing extraction.
    pub async fn set_profile(&self, user_id: &str, profile: UserProfile) -> Result<(), CoreError> {
        let profile = crate::profile::sanitize(profile);
        self.store.replace(user_id, profile).await?;
        info!("profile set directly (user_id={})", user_id);
        Ok(())
    }

    pub fn plan_generator(&self) -> &PlanGenerator {
        &self.plans
    }

    pub fn registry(&self) -> &SubsystemRegistry {
        &self.registry
    }

    async fn update_profile(
        &self,
        wanted: bool,
        user_id: &str,
        message: &str,
        existing: &UserProfile,
    ) -> Option<Result<(ProfileUpdate, bool), CoreError>> {
        if !wanted {
            return None;
        }
        Some(
            self.profile_manager
                .update(self.store.as_ref(), user_id, message, existing)
                .await,
        )
    }

    /// Run every target concurrently and wait for all of them.
    async fn dispatch(
        &self,
        targets: &BTreeSet<SubsystemId>,
        request: &SubsystemRequest,
    ) -> Vec<(SubsystemId, Result<SubsystemOutput, CoreError>)> {
        let runs = targets.iter().map(|id| async move {
            let result = match self.registry.get(*id) {
                Ok(subsystem) => subsystem.run(request).await,
                Err(err) => Err(err),
            };
            (*id, result)
        });
        join_all(runs).await
    }

    fn merge(
        &self,
        decision: &RoutingDecision,
        outputs: Vec<(SubsystemId, Result<SubsystemOutput, CoreError>)>,
        profile_changed: Option<UserProfile>,
        degradations: &mut Vec<CoreError>,
    ) -> ResponseEnvelope {
        let mut envelope = ResponseEnvelope::default();
        let mut wellness = None;
        for (id, result) in outputs {
            let output = match result {
                Ok(output) => output,
                Err(err) => {
                    warn!("subsystem omitted (id={}, error={})", id, err);
                    degradations.push(err);
                    continue;
                }
            };
            degradations.extend(output.degradations());
            match output {
                SubsystemOutput::Knowledge(consultation) => {
                    if consultation.bundle.is_empty() {
                        debug!("knowledge bundle empty, omitting section");
                    } else {
                        envelope.knowledge = Some(consultation.bundle);
                    }
                }
                SubsystemOutput::Plan(outcome) => {
                    let plan = outcome.plan;
                    envelope.diet_plan = plan.diet_plan;
                    envelope.fitness_plan = plan.fitness_plan;
                    envelope.lifestyle_recommendations = plan.lifestyle_recommendations;
                    envelope.personalized_notes =
                        (!plan.personalized_notes.is_empty()).then_some(plan.personalized_notes);
                }
                SubsystemOutput::Wellness { text, .. } => wellness = Some(text),
            }
        }

        let mut follow_ups = decision.follow_up_suggestions.clone();
        follow_ups.truncate(self.config.follow_up_limit);

        let has_plan = envelope.has_plan();
        envelope.chat_response = compose::chat_response(&Draft {
            intent_analysis: &decision.intent_analysis,
            immediate_response: decision.immediate_response.as_deref(),
            wellness: wellness.as_deref(),
            knowledge: envelope.knowledge.as_ref(),
            has_plan,
            profile_updated: profile_changed.is_some(),
            follow_ups: &follow_ups,
        });
        envelope.disclaimers =
            compose::disclaimers(envelope.knowledge.as_ref(), has_plan, wellness.is_some());
        envelope.follow_up_suggestions = follow_ups;
        envelope.user_profile_updates = profile_changed;
        envelope
    }
}

/// Subsystems to dispatch; never empty. Profile updates run separately.
fn dispatch_targets(decision: &RoutingDecision) -> BTreeSet<SubsystemId> {
    let mut targets = decision
        .required_subsystems
        .iter()
        .copied()
        .filter(|id| *id != SubsystemId::ProfileUpdate)
        .collect::<BTreeSet<_>>();
    if decision.required_subsystems.is_empty() {
        targets.insert(SubsystemId::KnowledgeQuery);
    }
    targets
}
