//! Schema validation for Wellspring JSON5 configuration layers.
//!
//! Runs on every layer before merging so a typo is reported against the file
//! that contains it rather than the merged result.

use crate::ConfigError;
use serde_json::{Map, Value};

/// Validate a single config layer against the schema.
pub(super) fn validate_layer_schema(value: &Value, layer: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, "")?;
    let allowed = [
        "$schema",
        "model",
        "strategist",
        "council",
        "profile",
        "plans",
        "wellness",
        "orchestrator",
    ];
    ensure_allowed_keys(map, &allowed, layer, "")?;

    if let Some(value) = map.get("$schema") {
        expect_string(value, layer, "$schema")?;
    }
    if let Some(value) = map.get("model") {
        validate_model(value, layer, "model")?;
    }
    if let Some(value) = map.get("strategist") {
        validate_call_settings(value, layer, "strategist", &["temperature"], &["timeout_secs"])?;
    }
    if let Some(value) = map.get("council") {
        validate_call_settings(
            value,
            layer,
            "council",
            &["selection_temperature", "expert_temperature"],
            &["expert_timeout_secs"],
        )?;
    }
    if let Some(value) = map.get("profile") {
        validate_profile(value, layer, "profile")?;
    }
    if let Some(value) = map.get("plans") {
        validate_call_settings(
            value,
            layer,
            "plans",
            &["temperature", "lifestyle_temperature"],
            &["timeout_secs"],
        )?;
    }
    if let Some(value) = map.get("wellness") {
        validate_call_settings(value, layer, "wellness", &["temperature"], &["timeout_secs"])?;
    }
    if let Some(value) = map.get("orchestrator") {
        validate_orchestrator(value, layer, "orchestrator")?;
    }

    Ok(())
}

fn validate_model(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, path)?;
    ensure_allowed_keys(map, &["provider", "name"], layer, path)?;
    for key in ["provider", "name"] {
        if let Some(value) = map.get(key) {
            expect_string(value, layer, &join_path(path, key))?;
        }
    }
    Ok(())
}

/// Sections made of float temperatures and integer timeouts.
fn validate_call_settings(
    value: &Value,
    layer: &str,
    path: &str,
    float_keys: &[&str],
    integer_keys: &[&str],
) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, path)?;
    let allowed = float_keys
        .iter()
        .chain(integer_keys.iter())
        .copied()
        .collect::<Vec<_>>();
    ensure_allowed_keys(map, &allowed, layer, path)?;
    for key in float_keys {
        if let Some(value) = map.get(*key) {
            expect_f64(value, layer, &join_path(path, key))?;
        }
    }
    for key in integer_keys {
        if let Some(value) = map.get(*key) {
            expect_u64(value, layer, &join_path(path, key))?;
        }
    }
    Ok(())
}

fn validate_profile(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, path)?;
    ensure_allowed_keys(
        map,
        &["temperature", "timeout_secs", "confidence_threshold", "store"],
        layer,
        path,
    )?;
    if let Some(value) = map.get("temperature") {
        expect_f64(value, layer, &join_path(path, "temperature"))?;
    }
    if let Some(value) = map.get("timeout_secs") {
        expect_u64(value, layer, &join_path(path, "timeout_secs"))?;
    }
    if let Some(value) = map.get("confidence_threshold") {
        expect_f64(value, layer, &join_path(path, "confidence_threshold"))?;
    }
    if let Some(value) = map.get("store") {
        validate_profile_store(value, layer, &join_path(path, "store"))?;
    }
    Ok(())
}

fn validate_profile_store(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, path)?;
    ensure_allowed_keys(map, &["provider", "path"], layer, path)?;
    if let Some(value) = map.get("provider") {
        let provider_path = join_path(path, "provider");
        match value.as_str() {
            Some("memory" | "file") => {}
            Some(_) => {
                return Err(invalid_field(
                    layer,
                    &provider_path,
                    "expected one of: memory, file",
                ));
            }
            None => return Err(invalid_field(layer, &provider_path, "expected string")),
        }
    }
    if let Some(value) = map.get("path") {
        expect_string(value, layer, &join_path(path, "path"))?;
    }
    Ok(())
}

fn validate_orchestrator(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, path)?;
    ensure_allowed_keys(
        map,
        &[
            "sequential_profile_update",
            "follow_up_limit",
            "apology_message",
        ],
        layer,
        path,
    )?;
    if let Some(value) = map.get("sequential_profile_update") {
        expect_bool(value, layer, &join_path(path, "sequential_profile_update"))?;
    }
    if let Some(value) = map.get("follow_up_limit") {
        expect_u64(value, layer, &join_path(path, "follow_up_limit"))?;
    }
    if let Some(value) = map.get("apology_message") {
        expect_string(value, layer, &join_path(path, "apology_message"))?;
    }
    Ok(())
}

fn expect_object<'a>(
    value: &'a Value,
    layer: &str,
    path: &str,
) -> Result<&'a Map<String, Value>, ConfigError> {
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(invalid_field(layer, path, "expected object")),
    }
}

fn expect_string(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    if value.is_string() {
        Ok(())
    } else {
        Err(invalid_field(layer, path, "expected string"))
    }
}

fn expect_bool(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    if value.is_boolean() {
        Ok(())
    } else {
        Err(invalid_field(layer, path, "expected bool"))
    }
}

/// Non-negative integers only; timeouts and limits cannot be negative.
fn expect_u64(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    if value.is_u64() {
        Ok(())
    } else {
        Err(invalid_field(layer, path, "expected non-negative integer"))
    }
}

fn expect_f64(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    if value.is_number() {
        Ok(())
    } else {
        Err(invalid_field(layer, path, "expected number"))
    }
}

fn ensure_allowed_keys(
    map: &Map<String, Value>,
    allowed: &[&str],
    layer: &str,
    path: &str,
) -> Result<(), ConfigError> {
    match map.keys().find(|key| !allowed.contains(&key.as_str())) {
        Some(key) => Err(invalid_field(layer, &join_path(path, key), "unknown key")),
        None => Ok(()),
    }
}

fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}

fn invalid_field(layer: &str, path: &str, message: &str) -> ConfigError {
    let path = if path.is_empty() { "root" } else { path };
    ConfigError::InvalidField {
        path: format!("{layer}:{path}"),
        message: message.to_string(),
    }
}
