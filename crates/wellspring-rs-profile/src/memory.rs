use crate::{ProfileStore, ProfileStoreError, validate_user_id};
use async_trait::async_trait;
use log::debug;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use wellspring_rs_protocol::UserProfile;

/// Process-local profile store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryProfileStore {
    profiles: Arc<RwLock<HashMap<String, UserProfile>>>,
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a profile without going through the async API.
    pub fn with_profile(self, user_id: impl Into<String>, profile: UserProfile) -> Self {
        self.profiles.write().insert(user_id.into(), profile);
        self
    }

    pub fn user_count(&self) -> usize {
        self.profiles.read().len()
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn get(&self, user_id: &str) -> Result<UserProfile, ProfileStoreError> {
        validate_user_id(user_id)?;
        Ok(self
            .profiles
            .read()
            .get(user_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn replace(&self, user_id: &str, profile: UserProfile) -> Result<(), ProfileStoreError> {
        validate_user_id(user_id)?;
        debug!(
            "replacing profile (user_id={}, fields={})",
            user_id,
            profile.len()
        );
        self.profiles.write().insert(user_id.to_string(), profile);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use wellspring_rs_protocol::ProfileValue;

    fn profile(pairs: &[(&str, &str)]) -> UserProfile {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), ProfileValue::text(*value)))
            .collect()
    }

    /// Unknown users read as empty profiles.
    #[tokio::test]
    async fn unknown_user_is_empty() {
        let store = InMemoryProfileStore::new();
        let loaded = store.get("nobody").await.expect("get");
        assert!(loaded.is_empty());
    }

    /// Replace discards fields that are not in the new profile.
    #[tokio::test]
    async fn replace_overwrites_whole_profile() {
        let store = InMemoryProfileStore::new()
            .with_profile("ana", profile(&[("gender", "female"), ("activity_level", "light")]));
        store
            .replace("ana", profile(&[("activity_level", "active")]))
            .await
            .expect("replace");
        let loaded = store.get("ana").await.expect("get");
        assert_eq!(loaded, profile(&[("activity_level", "active")]));
    }

    /// Blank user ids are rejected.
    #[tokio::test]
    async fn rejects_blank_user_id() {
        let store = InMemoryProfileStore::new();
        let err = store.get("  ").await.expect_err("blank");
        assert!(matches!(err, ProfileStoreError::InvalidUserId(_)));
    }
}
