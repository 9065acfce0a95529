//! Forgiving `deserialize_with` helpers for model-produced JSON.
//!
//! Generated documents routinely put a number where a string belongs, a single
//! string where a list belongs, or `"3-4"` where a count belongs. These helpers
//! accept the reasonable variants instead of failing the whole document.

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::BTreeMap;

/// Render a scalar as text; objects and arrays fall back to compact JSON.
pub fn value_to_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text.trim().to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Number(number) => Some(number.to_string()),
        other => Some(other.to_string()),
    }
}

/// Collect a list of strings from an array, a single string, or null.
pub fn string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(list_from_value(&value))
}

pub fn list_from_value(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::Object(map) => map
                    .get("name")
                    .or_else(|| map.get("title"))
                    .and_then(value_to_text)
                    .or_else(|| Some(item.to_string())),
                other => value_to_text(other),
            })
            .filter(|text| !text.is_empty())
            .collect(),
        Value::String(text) if text.trim().is_empty() => Vec::new(),
        Value::String(text) => vec![text.trim().to_string()],
        Value::Null => Vec::new(),
        other => value_to_text(other).into_iter().collect(),
    }
}

/// Required text field; null becomes the empty string.
pub fn text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value_to_text(&value).unwrap_or_default())
}

/// Optional text field; blank strings collapse to `None`.
pub fn opt_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value_to_text(&value).filter(|text| !text.is_empty()))
}

/// Optional count; accepts integers, floats and strings led by digits ("3-4 times").
pub fn opt_count<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(count_from_value(&value))
}

pub fn count_from_value(value: &Value) -> Option<u32> {
    match value {
        Value::Number(number) => number
            .as_u64()
            .map(|n| n.min(u32::MAX as u64) as u32)
            .or_else(|| {
                number
                    .as_f64()
                    .filter(|n| n.is_finite() && *n >= 0.0)
                    .map(|n| n.round().min(u32::MAX as f64) as u32)
            }),
        Value::String(text) => {
            let digits = text
                .trim()
                .chars()
                .take_while(|ch| ch.is_ascii_digit())
                .collect::<String>();
            digits.parse().ok()
        }
        _ => None,
    }
}

/// Boolean that also accepts `"yes"`, `"true"` and non-zero numbers.
pub fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Bool(flag) => flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => matches!(
            text.trim().to_ascii_lowercase().as_str(),
            "true" | "yes" | "y" | "1"
        ),
        _ => false,
    })
}

/// Optional string map; non-string values are rendered as text.
pub fn opt_text_map<'de, D>(deserializer: D) -> Result<Option<BTreeMap<String, String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let Value::Object(map) = value else {
        return Ok(None);
    };
    let entries = map
        .iter()
        .filter_map(|(key, value)| {
            let text = match value {
                Value::Array(_) => list_from_value(value).join("; "),
                other => value_to_text(other)?,
            };
            Some((key.clone(), text))
        })
        .collect::<BTreeMap<_, _>>();
    Ok((!entries.is_empty()).then_some(entries))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Sample {
        #[serde(default, deserialize_with = "string_list")]
        items: Vec<String>,
        #[serde(default, deserialize_with = "opt_count")]
        count: Option<u32>,
        #[serde(default, deserialize_with = "opt_text")]
        note: Option<String>,
        #[serde(default, deserialize_with = "flag")]
        enabled: bool,
    }

    /// Single strings and mixed scalars still yield a list.
    #[test]
    fn string_list_accepts_scalars() {
        let sample: Sample = serde_json::from_value(json!({"items": "oats"})).expect("single");
        assert_eq!(sample.items, vec!["oats".to_string()]);

        let sample: Sample =
            serde_json::from_value(json!({"items": ["eggs", 2, {"name": "tofu"}, ""]}))
                .expect("mixed");
        assert_eq!(sample.items, vec!["eggs", "2", "tofu"]);
    }

    /// Counts tolerate ranges written as text and float literals.
    #[test]
    fn opt_count_reads_leading_digits() {
        let sample: Sample = serde_json::from_value(json!({"count": "3-4 times"})).expect("text");
        assert_eq!(sample.count, Some(3));
        let sample: Sample = serde_json::from_value(json!({"count": 2.6})).expect("float");
        assert_eq!(sample.count, Some(3));
        let sample: Sample = serde_json::from_value(json!({"count": "often"})).expect("words");
        assert_eq!(sample.count, None);
    }

    /// Blank notes are treated as absent.
    #[test]
    fn opt_text_drops_blank() {
        let sample: Sample = serde_json::from_value(json!({"note": "  "})).expect("blank");
        assert_eq!(sample.note, None);
        let sample: Sample = serde_json::from_value(json!({"note": 45})).expect("number");
        assert_eq!(sample.note.as_deref(), Some("45"));
    }

    /// Stringly booleans are understood.
    #[test]
    fn flag_accepts_text() {
        let sample: Sample = serde_json::from_value(json!({"enabled": "Yes"})).expect("text");
        assert!(sample.enabled);
        let sample: Sample = serde_json::from_value(json!({"enabled": 0})).expect("zero");
        assert!(!sample.enabled);
    }
}
