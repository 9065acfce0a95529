//! Configuration models and layered config loading.
//!
//! Owns the Wellspring config schema: per-agent temperatures and timeouts,
//! the profile store backend, and orchestrator behavior switches.

mod error;
mod loader;
mod model;

/// Public error type returned by config loading and validation APIs.
pub use error::ConfigError;
/// Layered config types and loader options.
pub use loader::{ConfigLayer, ConfigLayerSource, LayeredConfig, LayeredConfigOptions};
/// Configuration schema models.
pub use model::*;
