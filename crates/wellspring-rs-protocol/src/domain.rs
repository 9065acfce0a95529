use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Expert knowledge domains consulted by the council.
///
/// The derived ordering is the canonical merge order for knowledge bundles.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ExpertDomain {
    GeneralHealth,
    Nutrition,
    Fitness,
    MentalWellness,
}

impl ExpertDomain {
    pub const ALL: [ExpertDomain; 4] = [
        ExpertDomain::GeneralHealth,
        ExpertDomain::Nutrition,
        ExpertDomain::Fitness,
        ExpertDomain::MentalWellness,
    ];

    /// Wire name used in envelopes and selection replies.
    pub fn as_str(self) -> &'static str {
        match self {
            ExpertDomain::GeneralHealth => "general_health",
            ExpertDomain::Nutrition => "nutrition",
            ExpertDomain::Fitness => "fitness",
            ExpertDomain::MentalWellness => "mental_wellness",
        }
    }

    /// Human readable name used in prompts.
    pub fn title(self) -> &'static str {
        match self {
            ExpertDomain::GeneralHealth => "General Health",
            ExpertDomain::Nutrition => "Nutrition",
            ExpertDomain::Fitness => "Fitness",
            ExpertDomain::MentalWellness => "Mental Wellness",
        }
    }
}

impl fmt::Display for ExpertDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a domain name is outside the known set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownDomain(pub String);

impl fmt::Display for UnknownDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown expert domain: {}", self.0)
    }
}

impl std::error::Error for UnknownDomain {}

impl FromStr for ExpertDomain {
    type Err = UnknownDomain;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw
            .trim()
            .to_ascii_lowercase()
            .replace([' ', '-'], "_");
        let normalized = normalized.trim_end_matches("_expert");
        match normalized {
            "general_health" | "general" | "health" => Ok(ExpertDomain::GeneralHealth),
            "nutrition" | "diet" => Ok(ExpertDomain::Nutrition),
            "fitness" | "exercise" => Ok(ExpertDomain::Fitness),
            "mental_wellness" | "mental_health" | "mental" => Ok(ExpertDomain::MentalWellness),
            _ => Err(UnknownDomain(raw.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// Selection replies use loose spellings; they normalize to one domain.
    #[test]
    fn parses_loose_domain_names() {
        assert_eq!(
            "Mental Wellness".parse::<ExpertDomain>(),
            Ok(ExpertDomain::MentalWellness)
        );
        assert_eq!(
            "nutrition_expert".parse::<ExpertDomain>(),
            Ok(ExpertDomain::Nutrition)
        );
        assert_eq!(
            "general-health".parse::<ExpertDomain>(),
            Ok(ExpertDomain::GeneralHealth)
        );
        assert!("astrology".parse::<ExpertDomain>().is_err());
    }

    /// Ordering follows the declaration order.
    #[test]
    fn ordering_is_canonical() {
        let mut domains = vec![
            ExpertDomain::MentalWellness,
            ExpertDomain::Nutrition,
            ExpertDomain::GeneralHealth,
        ];
        domains.sort();
        assert_eq!(
            domains,
            vec![
                ExpertDomain::GeneralHealth,
                ExpertDomain::Nutrition,
                ExpertDomain::MentalWellness
            ]
        );
    }
}
