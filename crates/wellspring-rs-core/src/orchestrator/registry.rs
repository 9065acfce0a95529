//! Static dispatch table from subsystem id to implementation.

use crate::council::{Consultation, KnowledgeCouncil};
use crate::error::CoreError;
use crate::plan::{PlanGenerator, PlanOutcome};
use crate::types::SubsystemId;
use crate::wellness::MentalWellnessGuide;
use async_trait::async_trait;
use log::debug;
use std::collections::BTreeMap;
use std::sync::Arc;
use wellspring_rs_protocol::{PlanType, UserProfile};

/// Everything a subsystem may read while handling one message.
#[derive(Debug, Clone, Default)]
pub struct SubsystemRequest {
    pub message: String,
    /// Restated intent; the goal for plan generation.
    pub goal: String,
    pub plan_type: PlanType,
    pub profile: UserProfile,
}

impl SubsystemRequest {
    /// Profile to hand to subsystems, `None` when nothing is known yet.
    pub fn profile(&self) -> Option<&UserProfile> {
        (!self.profile.is_empty()).then_some(&self.profile)
    }
}

/// Output of one subsystem run.
#[derive(Debug, Clone, PartialEq)]
pub enum SubsystemOutput {
    Knowledge(Consultation),
    Plan(PlanOutcome),
    Wellness {
        text: String,
        degraded: Option<CoreError>,
    },
}

impl SubsystemOutput {
    /// Degradations absorbed while producing this output.
    pub fn degradations(&self) -> Vec<CoreError> {
        match self {
            SubsystemOutput::Knowledge(consultation) => consultation.omitted.clone(),
            SubsystemOutput::Plan(outcome) => outcome.degraded.clone(),
            SubsystemOutput::Wellness { degraded, .. } => degraded.iter().cloned().collect(),
        }
    }
}

/// A dispatchable unit of the orchestrator.
#[async_trait]
pub trait Subsystem: Send + Sync {
    fn id(&self) -> SubsystemId;

    async fn run(&self, request: &SubsystemRequest) -> Result<SubsystemOutput, CoreError>;
}

/// Immutable map of subsystems, built once at startup.
#[derive(Clone, Default)]
pub struct SubsystemRegistry {
    subsystems: BTreeMap<SubsystemId, Arc<dyn Subsystem>>,
}

impl SubsystemRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subsystem under its id, replacing any previous entry.
    pub fn with(mut self, subsystem: Arc<dyn Subsystem>) -> Self {
        debug!("registering subsystem (id={})", subsystem.id());
        self.subsystems.insert(subsystem.id(), subsystem);
        self
    }

    pub fn get(&self, id: SubsystemId) -> Result<Arc<dyn Subsystem>, CoreError> {
        self.subsystems
            .get(&id)
            .cloned()
            .ok_or_else(|| CoreError::UnknownSubsystem(id.to_string()))
    }

    pub fn list(&self) -> Vec<SubsystemId> {
        self.subsystems.keys().copied().collect()
    }
}

/// Knowledge council behind the dispatch table.
pub struct KnowledgeSubsystem(pub KnowledgeCouncil);

#[async_trait]
impl Subsystem for KnowledgeSubsystem {
    fn id(&self) -> SubsystemId {
        SubsystemId::KnowledgeQuery
    }

    async fn run(&self, request: &SubsystemRequest) -> Result<SubsystemOutput, CoreError> {
        let consultation = self
            .0
            .consult_detailed(&request.message, request.profile())
            .await;
        Ok(SubsystemOutput::Knowledge(consultation))
    }
}

/// Plan generator behind the dispatch table.
pub struct PlanSubsystem(pub PlanGenerator);

#[async_trait]
impl Subsystem for PlanSubsystem {
    fn id(&self) -> SubsystemId {
        SubsystemId::PlanGeneration
    }

    async fn run(&self, request: &SubsystemRequest) -> Result<SubsystemOutput, CoreError> {
        let outcome = self
            .0
            .generate_detailed(&request.goal, request.plan_type, request.profile())
            .await;
        Ok(SubsystemOutput::Plan(outcome))
    }
}

/// Mental wellness guide behind the dispatch table.
pub struct WellnessSubsystem(pub MentalWellnessGuide);

#[async_trait]
impl Subsystem for WellnessSubsystem {
    fn id(&self) -> SubsystemId {
        SubsystemId::MentalWellness
    }

    async fn run(&self, request: &SubsystemRequest) -> Result<SubsystemOutput, CoreError> {
        let (text, degraded) = self
            .0
            .guide_or_fallback(&request.message, request.profile())
            .await;
        Ok(SubsystemOutput::Wellness { text, degraded })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    struct Echo(SubsystemId);

    #[async_trait]
    impl Subsystem for Echo {
        fn id(&self) -> SubsystemId {
            self.0
        }

        async fn run(&self, request: &SubsystemRequest) -> Result<SubsystemOutput, CoreError> {
            Ok(SubsystemOutput::Wellness {
                text: request.message.clone(),
                degraded: None,
            })
        }
    }

    /// Lookups resolve registered ids and report missing ones.
    #[tokio::test]
    async fn registry_resolves_ids() {
        let registry = SubsystemRegistry::new()
            .with(Arc::new(Echo(SubsystemId::MentalWellness)))
            .with(Arc::new(Echo(SubsystemId::KnowledgeQuery)));
        assert_eq!(
            registry.list(),
            vec![SubsystemId::KnowledgeQuery, SubsystemId::MentalWellness]
        );

        let request = SubsystemRequest {
            message: "breathe".to_string(),
            ..SubsystemRequest::default()
        };
        let output = registry
            .get(SubsystemId::MentalWellness)
            .expect("registered")
            .run(&request)
            .await
            .expect("run");
        assert_eq!(
            output,
            SubsystemOutput::Wellness {
                text: "breathe".to_string(),
                degraded: None
            }
        );

        let missing = registry.get(SubsystemId::PlanGeneration).err().expect("missing");
        assert_eq!(missing, CoreError::UnknownSubsystem("plan_generation".to_string()));
    }

    /// Empty profiles are withheld from subsystems.
    #[test]
    fn empty_profile_is_withheld() {
        let request = SubsystemRequest::default();
        assert!(request.profile().is_none());
    }
}
