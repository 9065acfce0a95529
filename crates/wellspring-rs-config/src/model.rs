//! Configuration schema for Wellspring.

use directories::UserDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root config for the orchestration core and CLI.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WellspringConfig {
    #[serde(default, rename = "$schema")]
    pub schema: Option<String>,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub strategist: StrategistConfig,
    #[serde(default)]
    pub council: CouncilConfig,
    #[serde(default)]
    pub profile: ProfileConfig,
    #[serde(default)]
    pub plans: PlansConfig,
    #[serde(default)]
    pub wellness: WellnessConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
}

impl WellspringConfig {
    /// Start building a config programmatically with defaults applied.
    pub fn builder() -> WellspringConfigBuilder {
        WellspringConfigBuilder::new()
    }
}

/// Builder for assembling a `WellspringConfig` in code.
#[derive(Debug, Default, Clone)]
pub struct WellspringConfigBuilder {
    config: WellspringConfig,
}

impl WellspringConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: WellspringConfig::default(),
        }
    }

    pub fn model(mut self, model: ModelConfig) -> Self {
        self.config.model = model;
        self
    }

    pub fn strategist(mut self, strategist: StrategistConfig) -> Self {
        self.config.strategist = strategist;
        self
    }

    pub fn council(mut self, council: CouncilConfig) -> Self {
        self.config.council = council;
        self
    }

    pub fn profile(mut self, profile: ProfileConfig) -> Self {
        self.config.profile = profile;
        self
    }

    pub fn plans(mut self, plans: PlansConfig) -> Self {
        self.config.plans = plans;
        self
    }

    pub fn wellness(mut self, wellness: WellnessConfig) -> Self {
        self.config.wellness = wellness;
        self
    }

    pub fn orchestrator(mut self, orchestrator: OrchestratorConfig) -> Self {
        self.config.orchestrator = orchestrator;
        self
    }

    pub fn build(self) -> WellspringConfig {
        self.config
    }
}

/// Model provider selection for the CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_model_provider")]
    pub provider: String,
    #[serde(default = "default_model_name")]
    pub name: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: default_model_provider(),
            name: default_model_name(),
        }
    }
}

fn default_model_provider() -> String {
    "openai".to_string()
}

fn default_model_name() -> String {
    "gpt-4o-mini".to_string()
}

/// Intent routing call settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategistConfig {
    #[serde(default = "default_strategist_temperature")]
    pub temperature: f32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for StrategistConfig {
    fn default() -> Self {
        Self {
            temperature: default_strategist_temperature(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl StrategistConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_strategist_temperature() -> f32 {
    0.3
}

fn default_timeout_secs() -> u64 {
    60
}

/// Knowledge council and expert responder settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouncilConfig {
    #[serde(default = "default_selection_temperature")]
    pub selection_temperature: f32,
    #[serde(default = "default_expert_temperature")]
    pub expert_temperature: f32,
    /// Per-expert deadline; one slow expert never delays the others past it.
    #[serde(default = "default_timeout_secs")]
    pub expert_timeout_secs: u64,
}

impl Default for CouncilConfig {
    fn default() -> Self {
        Self {
            selection_temperature: default_selection_temperature(),
            expert_temperature: default_expert_temperature(),
            expert_timeout_secs: default_timeout_secs(),
        }
    }
}

impl CouncilConfig {
    pub fn expert_timeout(&self) -> Duration {
        Duration::from_secs(self.expert_timeout_secs)
    }
}

fn default_selection_temperature() -> f32 {
    0.3
}

fn default_expert_temperature() -> f32 {
    0.7
}

/// Profile extraction and storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileConfig {
    #[serde(default = "default_profile_temperature")]
    pub temperature: f32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Extracted fields scored below this are discarded.
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,
    #[serde(default)]
    pub store: ProfileStoreConfig,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            temperature: default_profile_temperature(),
            timeout_secs: default_timeout_secs(),
            confidence_threshold: default_confidence_threshold(),
            store: ProfileStoreConfig::default(),
        }
    }
}

impl ProfileConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_profile_temperature() -> f32 {
    0.1
}

fn default_confidence_threshold() -> f64 {
    0.6
}

/// Which profile store backend to construct.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProfileStoreProvider {
    #[default]
    Memory,
    File,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProfileStoreConfig {
    #[serde(default)]
    pub provider: ProfileStoreProvider,
    /// Root directory for the file provider; defaults to `~/.wellspring/profiles`.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl ProfileStoreConfig {
    /// Directory for the file provider, falling back to the home directory default.
    pub fn resolved_path(&self) -> Option<PathBuf> {
        self.path.clone().or_else(|| {
            UserDirs::new().map(|dirs| dirs.home_dir().join(".wellspring").join("profiles"))
        })
    }
}

/// Plan generator settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlansConfig {
    #[serde(default = "default_plan_temperature")]
    pub temperature: f32,
    #[serde(default = "default_lifestyle_temperature")]
    pub lifestyle_temperature: f32,
    #[serde(default = "default_plan_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for PlansConfig {
    fn default() -> Self {
        Self {
            temperature: default_plan_temperature(),
            lifestyle_temperature: default_lifestyle_temperature(),
            timeout_secs: default_plan_timeout_secs(),
        }
    }
}

impl PlansConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_plan_temperature() -> f32 {
    0.7
}

fn default_lifestyle_temperature() -> f32 {
    0.4
}

fn default_plan_timeout_secs() -> u64 {
    90
}

/// Mental wellness guide settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WellnessConfig {
    #[serde(default = "default_wellness_temperature")]
    pub temperature: f32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for WellnessConfig {
    fn default() -> Self {
        Self {
            temperature: default_wellness_temperature(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl WellnessConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_wellness_temperature() -> f32 {
    0.5
}

/// Request pipeline switches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Run the profile update before dispatch so subsystems see fresh data.
    #[serde(default)]
    pub sequential_profile_update: bool,
    #[serde(default = "default_follow_up_limit")]
    pub follow_up_limit: usize,
    #[serde(default = "default_apology_message")]
    pub apology_message: String,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            sequential_profile_update: false,
            follow_up_limit: default_follow_up_limit(),
            apology_message: default_apology_message(),
        }
    }
}

fn default_follow_up_limit() -> usize {
    3
}

fn default_apology_message() -> String {
    "I'm sorry, I can't reach my knowledge service right now. Please try again in a moment."
        .to_string()
}
