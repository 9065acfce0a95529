use log::warn;
use regex::Regex;
use wellspring_rs_protocol::{ProfileValue, UserProfile};

const KG_TO_LBS: f64 = 2.20462;

const AGE_PATTERNS: [&str; 2] = [
    r"(?i)(?:I am|I'm)\s+(\d+)(?:\s+years old|\s+years|\s+yo\b)",
    r"(?i)(?:age|aged?)[:\s]+(\d+)",
];

const WEIGHT_PATTERN: &str = r"(?i)(?:I weigh|my weight is|weight[:\s]+)(?:about|around|approximately)?\s*(\d+\.?\d*)\s*(kg|kilos?|pounds?|lbs?)";

const HEIGHT_PATTERN: &str = r#"(?i)(?:I am|I'm|height[:\s]+)(?:about|around|approximately)?\s*(\d+)['"]?\s*(?:feet|foot|ft)\.?\s*(?:and|,)?\s*(\d+)?['"]?\s*(?:inches|inch|in)?"#;

const LIST_PATTERNS: [(&str, &str); 5] = [
    (
        r"(?i)\b(?:I am|I'm)\s+(?:a\s+)?(vegan|vegetarian|pescatarian|flexitarian|carnivore|omnivore)\b",
        "dietary_preferences",
    ),
    (
        r"(?i)\b(?:I follow|I'm on|I do)\s+(?:a\s+)?(keto|paleo|mediterranean|dash|low[\s-]carb|high[\s-]protein)\s+(?:diet|eating plan)\b",
        "dietary_preferences",
    ),
    (r"(?i)\bI don't eat\s+([\w\s,]+)", "dietary_restrictions"),
    (r"(?i)\bI'm allergic to\s+([\w\s,]+)", "allergies"),
    (r"(?i)\bI can't have\s+([\w\s,]+)", "dietary_restrictions"),
];

const GOAL_PATTERN: &str = r"(?i)(?:I want to|I'd like to|looking to|goal is to|I'm trying to|I aim to|I need to)\s+(lose weight|build muscle|get stronger|improve endurance|increase flexibility|tone up|bulk up)";

/// Pattern-based detection of personal details in a message.
///
/// Values found here are trusted over model extraction for the same field.
#[derive(Debug, Clone)]
pub struct ProfileHints {
    age: Vec<Regex>,
    weight: Option<Regex>,
    height: Option<Regex>,
    lists: Vec<(Regex, &'static str)>,
    goals: Option<Regex>,
}

impl Default for ProfileHints {
    fn default() -> Self {
        Self::new()
    }
}

impl ProfileHints {
    pub fn new() -> Self {
        Self {
            age: AGE_PATTERNS.iter().filter_map(|pattern| compile(pattern)).collect(),
            weight: compile(WEIGHT_PATTERN),
            height: compile(HEIGHT_PATTERN),
            lists: LIST_PATTERNS
                .iter()
                .filter_map(|(pattern, field)| compile(pattern).map(|re| (re, *field)))
                .collect(),
            goals: compile(GOAL_PATTERN),
        }
    }

    /// True when the message mentions any recognizable personal detail.
    pub fn detect(&self, message: &str) -> bool {
        !self.extract(message).is_empty()
    }

    pub fn extract(&self, message: &str) -> UserProfile {
        let mut profile = UserProfile::new();

        let age = self
            .age
            .iter()
            .find_map(|re| re.captures(message))
            .and_then(|caps| caps.get(1)?.as_str().parse::<u32>().ok());
        if let Some(age) = age {
            profile.insert("age", ProfileValue::Number(age.into()));
        }

        if let Some(caps) = self.weight.as_ref().and_then(|re| re.captures(message))
            && let Some(amount) = caps.get(1).and_then(|m| m.as_str().parse::<f64>().ok())
        {
            let unit = caps.get(2).map(|m| m.as_str().to_lowercase()).unwrap_or_default();
            let pounds = if unit.contains("kg") || unit.contains("kilo") {
                amount * KG_TO_LBS
            } else {
                amount
            };
            if let Some(value) = ProfileValue::number((pounds * 10.0).round() / 10.0) {
                profile.insert("weight_lbs", value);
            }
        }

        if let Some(caps) = self.height.as_ref().and_then(|re| re.captures(message))
            && let Some(feet) = caps.get(1).and_then(|m| m.as_str().parse::<u32>().ok())
        {
            let inches = caps
                .get(2)
                .and_then(|m| m.as_str().parse::<u32>().ok())
                .unwrap_or(0);
            profile.insert("height_inches", ProfileValue::Number((feet * 12 + inches).into()));
        }

        for (re, field) in &self.lists {
            for caps in re.captures_iter(message) {
                let Some(found) = caps.get(1) else {
                    continue;
                };
                push_list_item(&mut profile, field, found.as_str());
            }
        }

        if let Some(re) = &self.goals {
            for caps in re.captures_iter(message) {
                if let Some(goal) = caps.get(1) {
                    push_list_item(&mut profile, "fitness_goals", goal.as_str());
                }
            }
        }

        profile
    }
}

fn compile(pattern: &str) -> Option<Regex> {
    match Regex::new(pattern) {
        Ok(re) => Some(re),
        Err(err) => {
            warn!("profile hint pattern rejected (error={})", err);
            None
        }
    }
}

fn push_list_item(profile: &mut UserProfile, field: &str, raw: &str) {
    let item = raw.trim().to_lowercase();
    if item.is_empty() {
        return;
    }
    let mut items = profile.get(field).map(ProfileValue::as_list).unwrap_or_default();
    if !items.contains(&item) {
        items.push(item);
    }
    profile.insert(field, ProfileValue::List(items));
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    /// Age, metric weight and imperial height are normalized.
    #[test]
    fn extracts_body_metrics() {
        let hints = ProfileHints::new();
        let profile = hints.extract("I'm 34 years old, I weigh 80 kg and I'm 5 feet 10 inches tall");
        assert_eq!(
            profile.to_json(),
            json!({"age": 34, "weight_lbs": 176.4, "height_inches": 70})
        );
    }

    /// Diet preferences, restrictions, allergies and goals become lists.
    #[test]
    fn extracts_lists() {
        let hints = ProfileHints::new();
        let profile = hints.extract(
            "I'm vegetarian. I'm allergic to peanuts. I want to build muscle and I need to lose weight",
        );
        assert_eq!(
            profile.get("dietary_preferences"),
            Some(&ProfileValue::list(["vegetarian"]))
        );
        assert_eq!(profile.get("allergies"), Some(&ProfileValue::list(["peanuts"])));
        assert_eq!(
            profile.get("fitness_goals"),
            Some(&ProfileValue::list(["build muscle", "lose weight"]))
        );
    }

    /// Ordinary questions carry no hints.
    #[test]
    fn plain_question_has_no_hints() {
        let hints = ProfileHints::new();
        assert!(!hints.detect("How many calories should I eat to lose weight?"));
        assert!(hints.detect("My weight is 150 lbs"));
    }
}
