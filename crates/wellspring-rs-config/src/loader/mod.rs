//! Layered configuration loader.
//!
//! Discovers configuration layers (system, user, cwd, runtime), validates each
//! against the schema, merges them in precedence order, and produces the final
//! `WellspringConfig`.

mod layer_io;
mod schema;

#[cfg(test)]
mod tests;

use crate::{ConfigError, WellspringConfig};
use log::{debug, info};
use serde_json::Value;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Default config filename in local layers.
const DEFAULT_CONFIG_FILE: &str = "wellspring.json5";
/// Default config directory under the home directory.
const DEFAULT_CONFIG_DIR: &str = ".wellspring";

#[cfg(unix)]
const SYSTEM_CONFIG_PATH: &str = "/etc/wellspring/wellspring.json5";
#[cfg(windows)]
const SYSTEM_CONFIG_PATH: &str = "C:\\ProgramData\\wellspring\\wellspring.json5";

/// Effective config plus metadata about which layers were loaded.
#[derive(Debug, Clone)]
pub struct LayeredConfig {
    pub config: WellspringConfig,
    pub layers: Vec<ConfigLayer>,
}

/// Origin for a single config layer in the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigLayerSource {
    /// System-wide configuration.
    System,
    /// User-specific configuration.
    User,
    /// Current working directory configuration.
    Cwd,
    /// Runtime overrides (highest precedence).
    Runtime,
}

/// Metadata about a loaded config layer.
#[derive(Debug, Clone)]
pub struct ConfigLayer {
    pub source: ConfigLayerSource,
    pub path: Option<PathBuf>,
}

/// Options controlling layered config discovery and overrides.
#[derive(Debug, Clone)]
pub struct LayeredConfigOptions {
    /// Working directory searched for `wellspring.json5`.
    pub cwd: PathBuf,
    pub system_config_path: Option<PathBuf>,
    /// Defaults to `~/.wellspring/wellspring.json5`.
    pub user_config_path: Option<PathBuf>,
    /// Applied last, in order.
    pub runtime_paths: Vec<PathBuf>,
}

impl LayeredConfigOptions {
    /// Create options with default layer locations for the provided cwd.
    pub fn new(cwd: impl AsRef<Path>) -> Self {
        Self {
            cwd: cwd.as_ref().to_path_buf(),
            system_config_path: layer_io::default_system_config_path(),
            user_config_path: layer_io::default_user_config_path(),
            runtime_paths: Vec::new(),
        }
    }

    /// Add a runtime override config path that is applied last.
    pub fn with_runtime_path(mut self, path: impl AsRef<Path>) -> Self {
        self.runtime_paths.push(path.as_ref().to_path_buf());
        self
    }
}

impl WellspringConfig {
    /// Load a single config from a path (no layering).
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        info!("loading config from path: {}", path.as_ref().display());
        let contents = fs::read_to_string(path)?;
        let value: Value = json5::from_str(&contents)?;
        config_from_value(value, "config")
    }

    /// Load a single config from JSON5 contents (no layering).
    pub fn load_from_str(contents: &str) -> Result<Self, ConfigError> {
        debug!("loading config from raw contents (len={})", contents.len());
        let value: Value = json5::from_str(contents)?;
        config_from_value(value, "config")
    }

    /// Load a layered config stack using the default layer locations.
    pub fn load_layered(cwd: impl AsRef<Path>) -> Result<LayeredConfig, ConfigError> {
        info!(
            "loading layered config with defaults (cwd={})",
            cwd.as_ref().display()
        );
        Self::load_layered_with_options(LayeredConfigOptions::new(cwd))
    }

    /// Load a layered config stack.
    ///
    /// Layer precedence (low -> high): system, user, cwd, runtime overrides.
    /// A path reached through two layers is only applied once.
    pub fn load_layered_with_options(
        options: LayeredConfigOptions,
    ) -> Result<LayeredConfig, ConfigError> {
        let cwd = layer_io::normalize_path(&options.cwd)?;
        let mut layers = Vec::new();
        let mut values = Vec::new();
        let mut seen_paths = HashSet::new();

        let cwd_config = cwd.join(DEFAULT_CONFIG_FILE);
        for (source, path) in [
            (
                ConfigLayerSource::System,
                options.system_config_path.as_deref(),
            ),
            (ConfigLayerSource::User, options.user_config_path.as_deref()),
            (ConfigLayerSource::Cwd, Some(cwd_config.as_path())),
        ] {
            let Some(path) = path else {
                continue;
            };
            if path.exists() && !seen_paths.insert(layer_io::unique_path(path)) {
                debug!(
                    "skipping duplicate layer (source={:?}, path={})",
                    source,
                    path.display()
                );
                continue;
            }
            if let Some(layer) = layer_io::load_optional_layer(source, path)? {
                debug!("loaded {:?} layer", source);
                layers.push(layer.meta);
                values.push(layer.value);
            }
        }

        for runtime_path in &options.runtime_paths {
            let loaded = layer_io::load_required_layer(ConfigLayerSource::Runtime, runtime_path)?;
            debug!("loaded runtime layer (path={})", runtime_path.display());
            layers.push(loaded.meta);
            values.push(loaded.value);
        }

        let mut merged = Value::Object(serde_json::Map::new());
        for value in &values {
            merge_json_values(&mut merged, value);
        }

        let config = config_from_value(merged, "effective")?;
        info!("layered config loaded (layers={})", layers.len());
        Ok(LayeredConfig { config, layers })
    }

    /// Validate ranges and cross-field rules serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (path, temperature) in [
            ("strategist.temperature", self.strategist.temperature),
            ("council.selection_temperature", self.council.selection_temperature),
            ("council.expert_temperature", self.council.expert_temperature),
            ("profile.temperature", self.profile.temperature),
            ("plans.temperature", self.plans.temperature),
            ("plans.lifestyle_temperature", self.plans.lifestyle_temperature),
            ("wellness.temperature", self.wellness.temperature),
        ] {
            if !(0.0..=2.0).contains(&temperature) {
                return Err(ConfigError::InvalidField {
                    path: path.to_string(),
                    message: "temperature must be between 0 and 2".to_string(),
                });
            }
        }

        for (path, timeout) in [
            ("strategist.timeout_secs", self.strategist.timeout_secs),
            ("council.expert_timeout_secs", self.council.expert_timeout_secs),
            ("profile.timeout_secs", self.profile.timeout_secs),
            ("plans.timeout_secs", self.plans.timeout_secs),
            ("wellness.timeout_secs", self.wellness.timeout_secs),
        ] {
            if timeout == 0 {
                return Err(ConfigError::InvalidField {
                    path: path.to_string(),
                    message: "timeout must be greater than zero".to_string(),
                });
            }
        }

        if !(0.0..=1.0).contains(&self.profile.confidence_threshold) {
            return Err(ConfigError::InvalidField {
                path: "profile.confidence_threshold".to_string(),
                message: "threshold must be between 0 and 1".to_string(),
            });
        }

        if self.orchestrator.apology_message.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "orchestrator.apology_message must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}

/// Internal representation of a loaded config layer.
#[derive(Debug, Clone)]
struct LoadedLayer {
    meta: ConfigLayer,
    value: Value,
}

fn config_from_value(value: Value, label: &str) -> Result<WellspringConfig, ConfigError> {
    schema::validate_layer_schema(&value, label)?;
    let config: WellspringConfig = serde_json::from_value(value)?;
    config.validate()?;
    Ok(config)
}

/// Merge overlay values into the base, recursively overriding objects.
fn merge_json_values(base: &mut Value, overlay: &Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(key) {
                    Some(existing) => merge_json_values(existing, value),
                    None => {
                        base_map.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (base_slot, overlay_value) => {
            *base_slot = overlay_value.clone();
        }
    }
}
