//! Public SDK surface for Wellspring.
//!
//! Re-exports the building blocks and the small amount of wiring every
//! consumer repeats: logging setup, one LLM provider per configured
//! temperature, and the configured profile store.

/// Re-export for convenience.
pub use wellspring_rs_config as config;
pub use wellspring_rs_core as core;
/// Re-export for convenience.
pub use wellspring_rs_profile as profile;
/// Re-export for convenience.
pub use wellspring_rs_protocol as protocol;

use autoagents_llm::LLMProvider;
use log::{debug, info};
use std::path::PathBuf;
use std::sync::Arc;
use wellspring_rs_config::{ProfileStoreConfig, ProfileStoreProvider, WellspringConfig};
use wellspring_rs_core::LlmGenerationClient;
use wellspring_rs_core::profile::sanitize;
use wellspring_rs_protocol::UserProfile;
use wellspring_rs_profile::{
    FileProfileStore, InMemoryProfileStore, ProfileStore, ProfileStoreError,
};

const FALLBACK_PROFILE_DIR: &str = ".wellspring/profiles";

#[inline]
/// Initialize logging using env_logger if the "logging" feature is enabled.
///
/// This is a no-op if the feature is not enabled.
pub fn init_logging() {
    #[cfg(feature = "logging")]
    {
        let _ = env_logger::builder()
            .format_timestamp_millis()
            .parse_default_env()
            .try_init();
    }
}

/// Distinct temperatures used by the configured agents, in first-use order.
pub fn configured_temperatures(config: &WellspringConfig) -> Vec<f32> {
    let all = [
        config.strategist.temperature,
        config.profile.temperature,
        config.council.selection_temperature,
        config.council.expert_temperature,
        config.plans.temperature,
        config.plans.lifestyle_temperature,
        config.wellness.temperature,
    ];
    let mut distinct: Vec<f32> = Vec::new();
    for temperature in all {
        if !distinct
            .iter()
            .any(|existing| (existing - temperature).abs() <= f32::EPSILON)
        {
            distinct.push(temperature);
        }
    }
    distinct
}

/// Build a generation client with one provider per configured temperature.
///
/// `build` is called once with `None` for the default provider and once per
/// distinct temperature.
pub fn generation_client<E>(
    config: &WellspringConfig,
    mut build: impl FnMut(Option<f32>) -> Result<Arc<dyn LLMProvider>, E>,
) -> Result<LlmGenerationClient, E> {
    let mut client = LlmGenerationClient::new(build(None)?);
    for temperature in configured_temperatures(config) {
        debug!("building tuned provider (temperature={})", temperature);
        client = client.with_tuned_provider(temperature, build(Some(temperature))?);
    }
    Ok(client)
}

/// Construct the profile store named by the config.
pub fn profile_store(config: &ProfileStoreConfig) -> Result<Arc<dyn ProfileStore>, ProfileStoreError> {
    match config.provider {
        ProfileStoreProvider::Memory => {
            info!("using in-memory profile store");
            Ok(Arc::new(InMemoryProfileStore::new()))
        }
        ProfileStoreProvider::File => {
            let root = config
                .resolved_path()
                .unwrap_or_else(|| PathBuf::from(FALLBACK_PROFILE_DIR));
            info!("using file profile store (root={})", root.display());
            Ok(Arc::new(FileProfileStore::new(root)?))
        }
    }
}

/// Sanitize and store a profile without going through a model, returning
/// what was persisted.
pub async fn replace_profile(
    store: &dyn ProfileStore,
    user_id: &str,
    profile: UserProfile,
) -> Result<UserProfile, ProfileStoreError> {
    store.replace(user_id, sanitize(profile)).await?;
    info!("profile set directly (user_id={})", user_id);
    store.get(user_id).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::convert::Infallible;
    use tempfile::tempdir;
    use wellspring_rs_config::{PlansConfig, ProfileStoreProvider};
    use wellspring_rs_test_utils::FixedLLM;

    /// Shared temperatures collapse into one provider each.
    #[test]
    fn temperatures_are_distinct() {
        let config = WellspringConfig::builder()
            .plans(PlansConfig {
                temperature: 0.3,
                lifestyle_temperature: 0.3,
                ..PlansConfig::default()
            })
            .build();
        let temperatures = configured_temperatures(&config);
        assert_eq!(temperatures, vec![0.3, 0.1, 0.7, 0.5]);
    }

    /// The builder is invoked for the default plus every distinct temperature.
    #[test]
    fn builds_one_provider_per_temperature() {
        let config = WellspringConfig::default();
        let mut requested = Vec::new();
        generation_client::<Infallible>(&config, |temperature| {
            requested.push(temperature);
            Ok(Arc::new(FixedLLM::new("ok")))
        })
        .expect("client");
        assert_eq!(requested.len(), configured_temperatures(&config).len() + 1);
        assert_eq!(requested[0], None);
    }

    /// The file provider writes under the configured root.
    #[tokio::test]
    async fn file_store_from_config() {
        let temp = tempdir().expect("tempdir");
        let config = ProfileStoreConfig {
            provider: ProfileStoreProvider::File,
            path: Some(temp.path().to_path_buf()),
        };
        let store = profile_store(&config).expect("store");
        let profile: wellspring_rs_protocol::UserProfile =
            serde_json::from_value(serde_json::json!({"age": 40})).expect("profile");
        store.replace("u1", profile.clone()).await.expect("replace");

        let reopened = profile_store(&config).expect("reopen");
        assert_eq!(reopened.get("u1").await.expect("get"), profile);
    }

    /// Direct profile writes need only a store and drop invalid fields.
    #[tokio::test]
    async fn replaces_profile_without_model() {
        let store = profile_store(&ProfileStoreConfig::default()).expect("store");
        let profile: UserProfile = serde_json::from_value(serde_json::json!({
            "age": 34,
            "weight_lbs": -5,
            "fitness_goals": ["run a 10k"]
        }))
        .expect("profile");

        let stored = replace_profile(store.as_ref(), "u1", profile)
            .await
            .expect("replace");
        assert_eq!(stored, store.get("u1").await.expect("get"));
        assert!(stored.get("age").is_some());
        assert!(stored.get("weight_lbs").is_none());
    }
}
