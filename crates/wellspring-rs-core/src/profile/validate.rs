use log::debug;
use wellspring_rs_protocol::{ProfileValue, UserProfile};

const ACTIVITY_LEVELS: [&str; 5] = ["sedentary", "light", "moderate", "active", "very active"];
const FITNESS_LEVELS: [&str; 3] = ["beginner", "intermediate", "advanced"];
const STRESS_LEVELS: [&str; 3] = ["low", "moderate", "high"];

/// Drop values that are out of range or outside their vocabulary.
///
/// Numeric fields given as text are normalized to numbers; enumerated
/// fields are lowercased. Unknown fields pass through untouched.
pub fn sanitize(profile: UserProfile) -> UserProfile {
    profile
        .iter()
        .filter_map(|(field, value)| {
            let kept = check(field, value);
            if kept.is_none() {
                debug!("dropping invalid profile value (field={}, value={})", field, value);
            }
            kept.map(|value| (field.clone(), value))
        })
        .collect()
}

fn check(field: &str, value: &ProfileValue) -> Option<ProfileValue> {
    match field {
        "age" => numeric(value, |age| (13.0..=120.0).contains(&age)),
        "weight_lbs" | "height_inches" => numeric(value, |amount| amount > 0.0),
        "activity_level" => enumerated(value, &ACTIVITY_LEVELS),
        "fitness_level" => enumerated(value, &FITNESS_LEVELS),
        "stress_level" => enumerated(value, &STRESS_LEVELS),
        _ => Some(value.clone()),
    }
}

fn numeric(value: &ProfileValue, accept: impl Fn(f64) -> bool) -> Option<ProfileValue> {
    let amount = value.as_f64().filter(|amount| accept(*amount))?;
    match value {
        ProfileValue::Number(_) => Some(value.clone()),
        _ => ProfileValue::number(amount),
    }
}

fn enumerated(value: &ProfileValue, allowed: &[&str]) -> Option<ProfileValue> {
    let text = value.as_text()?.trim().to_lowercase().replace(['_', '-'], " ");
    allowed
        .contains(&text.as_str())
        .then(|| ProfileValue::Text(text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn profile(value: serde_json::Value) -> UserProfile {
        serde_json::from_value(value).expect("profile")
    }

    /// Out-of-range numbers and unknown levels are dropped.
    #[test]
    fn drops_invalid_values() {
        let cleaned = sanitize(profile(json!({
            "age": 7,
            "weight_lbs": -3,
            "activity_level": "Very_Active",
            "fitness_level": "elite",
            "gender": "female"
        })));
        assert_eq!(
            cleaned.to_json(),
            json!({"activity_level": "very active", "gender": "female"})
        );
    }

    /// Numeric text is normalized.
    #[test]
    fn normalizes_numeric_text() {
        let cleaned = sanitize(profile(json!({"age": "42", "height_inches": "70.5"})));
        assert_eq!(cleaned.to_json(), json!({"age": 42.0, "height_inches": 70.5}));
        let kept = sanitize(profile(json!({"age": 34})));
        assert_eq!(kept.to_json(), json!({"age": 34}));
    }
}
