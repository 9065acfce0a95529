use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;
use std::fmt;

/// A single profile attribute value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ProfileValue {
    Number(Number),
    Text(String),
    List(Vec<String>),
}

impl ProfileValue {
    pub fn number(value: f64) -> Option<Self> {
        Number::from_f64(value).map(ProfileValue::Number)
    }

    pub fn text(value: impl Into<String>) -> Self {
        ProfileValue::Text(value.into())
    }

    pub fn list<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ProfileValue::List(values.into_iter().map(Into::into).collect())
    }

    /// Coerce a JSON value into the profile vocabulary.
    ///
    /// Booleans become text, arrays become text lists, and null or nested
    /// objects have no representation.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(number) => Some(ProfileValue::Number(number.clone())),
            Value::String(text) => {
                let text = text.trim();
                (!text.is_empty()).then(|| ProfileValue::Text(text.to_string()))
            }
            Value::Bool(flag) => Some(ProfileValue::Text(flag.to_string())),
            Value::Array(items) => {
                let list = items
                    .iter()
                    .filter_map(|item| match item {
                        Value::String(text) => Some(text.trim().to_string()),
                        Value::Null | Value::Object(_) => None,
                        other => Some(other.to_string()),
                    })
                    .filter(|text| !text.is_empty())
                    .collect::<Vec<_>>();
                Some(ProfileValue::List(list))
            }
            Value::Null | Value::Object(_) => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            ProfileValue::Number(number) => Value::Number(number.clone()),
            ProfileValue::Text(text) => Value::String(text.clone()),
            ProfileValue::List(items) => {
                Value::Array(items.iter().cloned().map(Value::String).collect())
            }
        }
    }

    /// Numeric view; numeric text such as `"165"` also qualifies.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ProfileValue::Number(number) => number.as_f64(),
            ProfileValue::Text(text) => text.trim().parse().ok(),
            ProfileValue::List(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ProfileValue::Text(text) => Some(text),
            _ => None,
        }
    }

    /// List view; a lone text value is treated as a one-item list.
    pub fn as_list(&self) -> Vec<String> {
        match self {
            ProfileValue::List(items) => items.clone(),
            ProfileValue::Text(text) => vec![text.clone()],
            ProfileValue::Number(number) => vec![number.to_string()],
        }
    }
}

impl fmt::Display for ProfileValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProfileValue::Number(number) => write!(f, "{number}"),
            ProfileValue::Text(text) => f.write_str(text),
            ProfileValue::List(items) => f.write_str(&items.join(", ")),
        }
    }
}

impl<'de> Deserialize<'de> for ProfileValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        ProfileValue::from_json(&value)
            .ok_or_else(|| D::Error::custom("profile values must be numbers, text, or lists"))
    }
}

/// Persistent attribute map for one user.
///
/// Field names are free-form; at most one value exists per field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserProfile {
    fields: BTreeMap<String, ProfileValue>,
}

impl UserProfile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a profile from a JSON object, dropping values with no profile form.
    pub fn from_json_object(map: &Map<String, Value>) -> Self {
        let fields = map
            .iter()
            .filter_map(|(key, value)| {
                ProfileValue::from_json(value).map(|value| (key.clone(), value))
            })
            .collect();
        Self { fields }
    }

    pub fn get(&self, field: &str) -> Option<&ProfileValue> {
        self.fields.get(field)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: ProfileValue) -> Option<ProfileValue> {
        self.fields.insert(field.into(), value)
    }

    pub fn remove(&mut self, field: &str) -> Option<ProfileValue> {
        self.fields.remove(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ProfileValue)> {
        self.fields.iter()
    }

    pub fn field_names(&self) -> Vec<String> {
        self.fields.keys().cloned().collect()
    }

    /// Subset of the profile restricted to `fields`.
    pub fn view(&self, fields: &[&str]) -> UserProfile {
        let fields = self
            .fields
            .iter()
            .filter(|(key, _)| fields.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        UserProfile { fields }
    }

    /// Text of a field, lowercased, for rule matching.
    pub fn text_lower(&self, field: &str) -> Option<String> {
        self.get(field).map(|value| value.to_string().to_lowercase())
    }

    /// Body mass index from `weight_lbs` and `height_inches`.
    pub fn bmi(&self) -> Option<f64> {
        let weight = self.get("weight_lbs")?.as_f64()?;
        let height = self.get("height_inches")?.as_f64()?;
        if weight <= 0.0 || height <= 0.0 {
            return None;
        }
        let bmi = weight * 703.0 / (height * height);
        Some((bmi * 10.0).round() / 10.0)
    }

    pub fn to_json(&self) -> Value {
        Value::Object(
            self.fields
                .iter()
                .map(|(key, value)| (key.clone(), value.to_json()))
                .collect(),
        )
    }

    /// Pretty JSON used inside prompts.
    pub fn to_prompt_json(&self) -> String {
        serde_json::to_string_pretty(&self.to_json()).unwrap_or_else(|_| "{}".to_string())
    }
}

impl FromIterator<(String, ProfileValue)> for UserProfile {
    fn from_iter<T: IntoIterator<Item = (String, ProfileValue)>>(iter: T) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

impl Serialize for UserProfile {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.fields.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for UserProfile {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Value::deserialize(deserializer)? {
            Value::Object(map) => Ok(UserProfile::from_json_object(&map)),
            Value::Null => Ok(UserProfile::default()),
            _ => Err(D::Error::custom("user profile must be an object")),
        }
    }
}
