//! Tests for configuration loading and validation.

use super::*;
use crate::ProfileStoreProvider;
use pretty_assertions::assert_eq;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Write JSON5 contents to a path, creating parent directories if needed.
fn write_json5(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("dir");
    }
    fs::write(path, contents).expect("write");
}

fn isolated_options(root: &Path, cwd: &Path) -> LayeredConfigOptions {
    LayeredConfigOptions {
        cwd: cwd.to_path_buf(),
        system_config_path: Some(root.join("system.json5")),
        user_config_path: Some(root.join("user.json5")),
        runtime_paths: Vec::new(),
    }
}

/// An empty document yields the documented defaults.
#[test]
fn parse_minimal_config() {
    let config = WellspringConfig::load_from_str("{}").expect("config");
    assert_eq!(config.strategist.temperature, 0.3);
    assert_eq!(config.profile.temperature, 0.1);
    assert_eq!(config.council.expert_temperature, 0.7);
    assert_eq!(config.wellness.temperature, 0.5);
    assert_eq!(config.profile.confidence_threshold, 0.6);
    assert_eq!(config.orchestrator.follow_up_limit, 3);
    assert!(!config.orchestrator.sequential_profile_update);
    assert_eq!(config.profile.store.provider, ProfileStoreProvider::Memory);
}

/// JSON5 comments and unquoted keys are accepted.
#[test]
fn parses_json5_features() {
    let json5 = r#"{
        // route conservatively
        strategist: { temperature: 0.2, timeout_secs: 15 },
        profile: { store: { provider: "file", path: "/tmp/profiles" } },
    }"#;
    let config = WellspringConfig::load_from_str(json5).expect("config");
    assert_eq!(config.strategist.timeout_secs, 15);
    assert_eq!(config.profile.store.provider, ProfileStoreProvider::File);
    assert_eq!(
        config.profile.store.resolved_path(),
        Some(std::path::PathBuf::from("/tmp/profiles"))
    );
}

/// Reject unexpected top-level config keys.
#[test]
fn rejects_unknown_top_level_key() {
    let err = WellspringConfig::load_from_str("{ unexpected: true }").unwrap_err();
    assert!(format!("{err}").contains("unknown key"));
}

/// Reject unknown nested keys with the full path.
#[test]
fn rejects_unknown_nested_key() {
    let err = WellspringConfig::load_from_str("{ council: { experts: 2 } }").unwrap_err();
    let msg = format!("{err}");
    assert!(msg.contains("council.experts"), "{msg}");
}

/// Type errors name the offending field.
#[test]
fn rejects_wrong_types() {
    let err =
        WellspringConfig::load_from_str(r#"{ orchestrator: { follow_up_limit: "3" } }"#)
            .unwrap_err();
    assert!(format!("{err}").contains("orchestrator.follow_up_limit"));

    let err = WellspringConfig::load_from_str(r#"{ profile: { store: { provider: "redis" } } }"#)
        .unwrap_err();
    assert!(format!("{err}").contains("profile.store.provider"));
}

/// Range checks run after decoding.
#[test]
fn rejects_out_of_range_values() {
    let err = WellspringConfig::load_from_str("{ plans: { temperature: 3.5 } }").unwrap_err();
    assert!(format!("{err}").contains("plans.temperature"));

    let err = WellspringConfig::load_from_str("{ wellness: { timeout_secs: 0 } }").unwrap_err();
    assert!(format!("{err}").contains("wellness.timeout_secs"));

    let err = WellspringConfig::load_from_str("{ profile: { confidence_threshold: 1.5 } }")
        .unwrap_err();
    assert!(format!("{err}").contains("confidence_threshold"));
}

/// Later layers override earlier ones field by field.
#[test]
fn layered_config_merges_in_precedence_order() {
    let temp = TempDir::new().expect("tmp");
    let root = temp.path();
    let cwd = root.join("work");
    fs::create_dir_all(&cwd).expect("cwd");

    write_json5(
        &root.join("system.json5"),
        "{ strategist: { temperature: 0.1, timeout_secs: 10 } }",
    );
    write_json5(
        &root.join("user.json5"),
        "{ strategist: { temperature: 0.2 }, council: { expert_timeout_secs: 5 } }",
    );
    write_json5(
        &cwd.join(DEFAULT_CONFIG_FILE),
        "{ strategist: { temperature: 0.25 } }",
    );
    let runtime = root.join("runtime.json5");
    write_json5(&runtime, "{ orchestrator: { sequential_profile_update: true } }");

    let options = isolated_options(root, &cwd).with_runtime_path(&runtime);
    let layered = WellspringConfig::load_layered_with_options(options).expect("layered");

    assert_eq!(layered.layers.len(), 4);
    assert_eq!(layered.layers[0].source, ConfigLayerSource::System);
    assert_eq!(layered.layers[3].source, ConfigLayerSource::Runtime);
    assert_eq!(layered.config.strategist.temperature, 0.25);
    assert_eq!(layered.config.strategist.timeout_secs, 10);
    assert_eq!(layered.config.council.expert_timeout_secs, 5);
    assert!(layered.config.orchestrator.sequential_profile_update);
}

/// Missing optional layers are skipped.
#[test]
fn layered_config_without_files_uses_defaults() {
    let temp = TempDir::new().expect("tmp");
    let options = isolated_options(temp.path(), temp.path());
    let layered = WellspringConfig::load_layered_with_options(options).expect("layered");
    assert!(layered.layers.is_empty());
    assert_eq!(layered.config.plans.temperature, 0.7);
}

/// A bad layer is reported with its label.
#[test]
fn layer_errors_name_the_layer() {
    let temp = TempDir::new().expect("tmp");
    write_json5(&temp.path().join("user.json5"), "{ bogus: 1 }");
    let options = isolated_options(temp.path(), temp.path());
    let err = WellspringConfig::load_layered_with_options(options).unwrap_err();
    let msg = format!("{err}");
    assert!(msg.contains("user("), "{msg}");
    assert!(msg.contains("unknown key"), "{msg}");
}

/// A runtime path that does not exist is an error, not a silent skip.
#[test]
fn missing_runtime_layer_fails() {
    let temp = TempDir::new().expect("tmp");
    let options = isolated_options(temp.path(), temp.path())
        .with_runtime_path(temp.path().join("absent.json5"));
    let err = WellspringConfig::load_layered_with_options(options).unwrap_err();
    assert!(matches!(err, ConfigError::ReadFailed(_)));
}

/// The builder starts from defaults.
#[test]
fn builder_overrides_sections() {
    let config = WellspringConfig::builder()
        .orchestrator(crate::OrchestratorConfig {
            sequential_profile_update: true,
            ..crate::OrchestratorConfig::default()
        })
        .build();
    assert!(config.orchestrator.sequential_profile_update);
    assert_eq!(config.orchestrator.follow_up_limit, 3);
    config.validate().expect("valid");
}
