//! Per-user profile persistence for Wellspring.
//!
//! The store contract is deliberately small: read a whole profile, replace a
//! whole profile. Writes for one user id are serialized; readers never see a
//! partially written profile.

mod error;
mod file;
mod locks;
mod memory;

pub use error::ProfileStoreError;
pub use file::FileProfileStore;
pub use memory::InMemoryProfileStore;

use async_trait::async_trait;
use wellspring_rs_protocol::UserProfile;

#[async_trait]
/// Storage backend for user profiles.
pub trait ProfileStore: Send + Sync {
    /// Fetch the profile for `user_id`; unknown users yield an empty profile.
    async fn get(&self, user_id: &str) -> Result<UserProfile, ProfileStoreError>;

    /// Replace the stored profile for `user_id` with `profile`.
    async fn replace(&self, user_id: &str, profile: UserProfile) -> Result<(), ProfileStoreError>;
}

/// Reject user ids that cannot name a profile.
pub(crate) fn validate_user_id(user_id: &str) -> Result<(), ProfileStoreError> {
    if user_id.trim().is_empty() {
        return Err(ProfileStoreError::InvalidUserId(user_id.to_string()));
    }
    Ok(())
}
