use crate::ExpertDomain;
use crate::lenient;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A titled section inside an expert answer.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Subtopic {
    #[serde(default, deserialize_with = "lenient::text", alias = "name")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient::text", alias = "description")]
    pub content: String,
}

/// Nutrition grouping of foods by how often to eat them.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FoodGroups {
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub recommended: Vec<String>,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub moderate: Vec<String>,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub limit: Vec<String>,
}

/// Domain-specific fields carried alongside the common answer fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DomainExtension {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub food_groups: Option<FoodGroups>,
    #[serde(
        default,
        deserialize_with = "lenient::opt_text_map",
        skip_serializing_if = "Option::is_none"
    )]
    pub activity_guidelines: Option<BTreeMap<String, String>>,
    #[serde(
        default,
        deserialize_with = "lenient::opt_text_map",
        skip_serializing_if = "Option::is_none"
    )]
    pub stress_management: Option<BTreeMap<String, String>>,
}

impl DomainExtension {
    pub fn is_empty(&self) -> bool {
        self.food_groups.is_none()
            && self.activity_guidelines.is_none()
            && self.stress_management.is_none()
    }
}

/// Structured answer produced by one expert.
///
/// Domain recommendations arrive under a domain-specific key
/// (`dietary_recommendations`, `exercise_recommendations`, ...) and are
/// normalized into one field.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ExpertAnswer {
    #[serde(default, deserialize_with = "lenient::text")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient::text", alias = "answer")]
    pub content: String,
    #[serde(default)]
    pub subtopics: Vec<Subtopic>,
    #[serde(
        default,
        deserialize_with = "lenient::string_list",
        alias = "recommendations",
        alias = "health_recommendations",
        alias = "dietary_recommendations",
        alias = "exercise_recommendations",
        alias = "wellness_techniques"
    )]
    pub domain_recommendations: Vec<String>,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub references: Vec<String>,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub disclaimers: Vec<String>,
    #[serde(flatten)]
    pub extension: DomainExtension,
}

/// Merged output of the knowledge council.
///
/// Answers serialize as top-level keys named after their domain, next to the
/// combined reference and disclaimer lists.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct KnowledgeBundle {
    #[serde(flatten)]
    pub answers: BTreeMap<ExpertDomain, ExpertAnswer>,
    #[serde(default)]
    pub references: Vec<String>,
    #[serde(default)]
    pub disclaimers: Vec<String>,
}

impl KnowledgeBundle {
    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }

    pub fn domains(&self) -> Vec<ExpertDomain> {
        self.answers.keys().copied().collect()
    }

    /// Merge answers in domain order, deduplicating references and disclaimers
    /// by exact text while keeping first appearance.
    pub fn from_answers(answers: BTreeMap<ExpertDomain, ExpertAnswer>) -> Self {
        let mut references = Vec::new();
        let mut disclaimers = Vec::new();
        for answer in answers.values() {
            push_unique(&mut references, &answer.references);
            push_unique(&mut disclaimers, &answer.disclaimers);
        }
        Self {
            answers,
            references,
            disclaimers,
        }
    }
}

fn push_unique(target: &mut Vec<String>, items: &[String]) {
    for item in items {
        if !target.iter().any(|existing| existing == item) {
            target.push(item.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn answer(references: &[&str], disclaimers: &[&str]) -> ExpertAnswer {
        ExpertAnswer {
            title: "t".to_string(),
            content: "c".to_string(),
            references: references.iter().map(|s| s.to_string()).collect(),
            disclaimers: disclaimers.iter().map(|s| s.to_string()).collect(),
            ..ExpertAnswer::default()
        }
    }

    /// Domain-specific recommendation keys land in one field.
    #[test]
    fn parses_domain_recommendation_aliases() {
        let answer: ExpertAnswer = serde_json::from_value(json!({
            "title": "Protein",
            "content": "Eat enough protein.",
            "dietary_recommendations": ["Include legumes"],
            "food_groups": {"recommended": ["beans"], "limit": "soda"}
        }))
        .expect("answer");
        assert_eq!(answer.domain_recommendations, vec!["Include legumes"]);
        let groups = answer.extension.food_groups.expect("food groups");
        assert_eq!(groups.limit, vec!["soda"]);
        assert!(groups.moderate.is_empty());
    }

    /// Shared references and disclaimers appear once, in domain order.
    #[test]
    fn merge_dedups_in_domain_order() {
        let mut answers = BTreeMap::new();
        answers.insert(
            ExpertDomain::Fitness,
            answer(&["ACSM", "WHO"], &["Consult a doctor"]),
        );
        answers.insert(
            ExpertDomain::GeneralHealth,
            answer(&["WHO"], &["Consult a doctor", "General info"]),
        );
        let bundle = KnowledgeBundle::from_answers(answers);
        assert_eq!(bundle.references, vec!["WHO", "ACSM"]);
        assert_eq!(bundle.disclaimers, vec!["Consult a doctor", "General info"]);
    }

    /// Answers serialize under their domain names.
    #[test]
    fn bundle_serializes_domain_keys() {
        let mut answers = BTreeMap::new();
        answers.insert(ExpertDomain::Nutrition, answer(&[], &[]));
        let value = serde_json::to_value(KnowledgeBundle::from_answers(answers)).expect("json");
        assert_eq!(value["nutrition"]["title"], json!("t"));
        assert_eq!(value["references"], json!([]));
    }
}
