//! Knowledge council: expert selection, concurrent fan-out and merge.

use crate::error::{CoreError, ExpertError};
use crate::experts::{Expert, ExpertResponder};
use crate::extract::extract;
use crate::generation::{GenerationClient, generate_within};
use futures_util::future::join_all;
use log::{info, warn};
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;
use wellspring_rs_config::CouncilConfig;
use wellspring_rs_protocol::{ExpertDomain, KnowledgeBundle, UserProfile, lenient};

const SELECTION_HINT: &str = "You are the Health Knowledge Council Coordinator. \
Select the experts that should answer. Reply with a JSON array of expert names only, \
for example [\"general_health\", \"nutrition\"].";

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SelectionReply {
    List(Vec<Value>),
    Object {
        #[serde(alias = "required_experts", alias = "selected_experts")]
        experts: Value,
    },
}

impl Default for SelectionReply {
    fn default() -> Self {
        SelectionReply::List(Vec::new())
    }
}

impl SelectionReply {
    fn names(&self) -> Vec<String> {
        match self {
            SelectionReply::List(items) => lenient::list_from_value(&Value::Array(items.clone())),
            SelectionReply::Object { experts } => lenient::list_from_value(experts),
        }
    }
}

/// Bundle plus the experts that were left out of it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Consultation {
    pub bundle: KnowledgeBundle,
    pub selected: BTreeSet<ExpertDomain>,
    pub omitted: Vec<CoreError>,
}

/// Routes a query to the relevant experts and merges their answers.
#[derive(Clone)]
pub struct KnowledgeCouncil {
    client: Arc<dyn GenerationClient>,
    selection_temperature: f32,
    selection_timeout: Duration,
    expert_timeout: Duration,
    experts: BTreeMap<ExpertDomain, Arc<dyn Expert>>,
}

impl KnowledgeCouncil {
    /// Council with one [`ExpertResponder`] per domain.
    pub fn new(client: Arc<dyn GenerationClient>, config: &CouncilConfig) -> Self {
        let experts = ExpertDomain::ALL
            .into_iter()
            .map(|domain| {
                let expert: Arc<dyn Expert> = Arc::new(ExpertResponder::new(
                    domain,
                    client.clone(),
                    config.expert_temperature,
                    config.expert_timeout(),
                ));
                (domain, expert)
            })
            .collect();
        Self {
            client,
            selection_temperature: config.selection_temperature,
            selection_timeout: config.expert_timeout(),
            expert_timeout: config.expert_timeout(),
            experts,
        }
    }

    /// Replace the expert registered for its domain.
    pub fn with_expert(mut self, expert: Arc<dyn Expert>) -> Self {
        self.experts.insert(expert.domain(), expert);
        self
    }

    pub async fn consult(&self, query: &str, profile: Option<&UserProfile>) -> KnowledgeBundle {
        self.consult_detailed(query, profile).await.bundle
    }

    pub async fn consult_detailed(
        &self,
        query: &str,
        profile: Option<&UserProfile>,
    ) -> Consultation {
        let selected = self.select(query).await;
        let (bundle, omitted) = self.dispatch(&selected, query, profile).await;
        info!(
            "council consulted (selected={}, answered={}, omitted={})",
            selected.len(),
            bundle.answers.len(),
            omitted.len()
        );
        Consultation {
            bundle,
            selected,
            omitted,
        }
    }

    /// Comprehensive information on `topic` from its primary expert.
    pub async fn topic(&self, topic: &str) -> Consultation {
        let domain = primary_domain_for_topic(topic);
        let selected = BTreeSet::from([domain]);
        let query = format!("Provide comprehensive information about {}", topic.trim());
        let (bundle, omitted) = self.dispatch(&selected, &query, None).await;
        Consultation {
            bundle,
            selected,
            omitted,
        }
    }

    /// Pick the relevant experts; never returns an empty set.
    pub async fn select(&self, query: &str) -> BTreeSet<ExpertDomain> {
        let prompt = format!(
            "Analyze this health/fitness query: \"{}\"\n\n\
             Determine which experts should respond. Choose from:\n\
             - general_health: general medical and health information\n\
             - nutrition: dietary and nutritional information\n\
             - fitness: exercise and physical activity information\n\
             - mental_wellness: psychological and mental health aspects",
            query.trim()
        );
        let fallback = BTreeSet::from([ExpertDomain::GeneralHealth]);
        let raw = match generate_within(
            self.client.as_ref(),
            &prompt,
            self.selection_temperature,
            SELECTION_HINT,
            self.selection_timeout,
        )
        .await
        {
            Ok(raw) => raw,
            Err(err) => {
                warn!("expert selection failed, using general health (error={})", err);
                return fallback;
            }
        };

        let Some(reply) = extract::<SelectionReply>(&raw).into_parsed() else {
            return fallback;
        };
        let selected = reply
            .names()
            .iter()
            .filter_map(|name| name.parse::<ExpertDomain>().ok())
            .filter(|domain| self.experts.contains_key(domain))
            .collect::<BTreeSet<_>>();
        if selected.is_empty() { fallback } else { selected }
    }

    async fn dispatch(
        &self,
        selected: &BTreeSet<ExpertDomain>,
        query: &str,
        profile: Option<&UserProfile>,
    ) -> (KnowledgeBundle, Vec<CoreError>) {
        let calls = selected.iter().filter_map(|domain| {
            let expert = self.experts.get(domain)?.clone();
            let timeout = self.expert_timeout;
            let domain = *domain;
            Some(async move {
                let result = match tokio::time::timeout(timeout, expert.answer(query, profile)).await
                {
                    Ok(result) => result,
                    Err(_) => Err(ExpertError::TimedOut { domain, timeout }),
                };
                (domain, result)
            })
        });
        let settled = join_all(calls).await;

        let mut answers = BTreeMap::new();
        let mut omitted = Vec::new();
        for (domain, result) in settled {
            match result {
                Ok(answer) => {
                    answers.insert(domain, answer);
                }
                Err(err) => {
                    warn!("expert omitted (domain={}, error={})", domain, err);
                    omitted.push(CoreError::SubsystemOmitted {
                        subsystem: format!("{domain}_expert"),
                        reason: err.to_string(),
                    });
                }
            }
        }
        (KnowledgeBundle::from_answers(answers), omitted)
    }
}

/// Primary expert for a topic, by keyword.
pub fn primary_domain_for_topic(topic: &str) -> ExpertDomain {
    let lower = topic.to_lowercase();
    let mentions = |words: &[&str]| words.iter().any(|word| lower.contains(word));
    if mentions(&["diet", "nutrition", "food"]) {
        ExpertDomain::Nutrition
    } else if mentions(&["exercise", "workout", "fitness"]) {
        ExpertDomain::Fitness
    } else if mentions(&["mental", "stress", "anxiety"]) {
        ExpertDomain::MentalWellness
    } else {
        ExpertDomain::GeneralHealth
    }
}
