use crate::locks::UserLocks;
use crate::{ProfileStore, ProfileStoreError, validate_user_id};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;
use wellspring_rs_protocol::UserProfile;

/// On-disk document for one user.
#[derive(Debug, Serialize, Deserialize)]
struct ProfileRecord {
    user_id: String,
    updated_at: DateTime<Utc>,
    profile: UserProfile,
}

/// File-backed profile store writing one JSON document per user.
#[derive(Debug, Clone)]
pub struct FileProfileStore {
    /// Root directory for profile documents.
    root: PathBuf,
    locks: Arc<UserLocks>,
}

impl FileProfileStore {
    /// Create a store rooted at `root`, creating the directory if needed.
    pub fn new(root: impl AsRef<Path>) -> Result<Self, ProfileStoreError> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)?;
        info!("initialized file profile store (root={})", root.display());
        Ok(Self {
            root,
            locks: Arc::new(UserLocks::default()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn profile_path(&self, user_id: &str) -> PathBuf {
        self.root.join(format!("{}.json", file_stem(user_id)))
    }

    fn temp_path(&self, user_id: &str) -> PathBuf {
        self.root
            .join(format!("{}.json.{}.tmp", file_stem(user_id), Uuid::new_v4()))
    }

    fn read_record(&self, user_id: &str) -> Result<Option<ProfileRecord>, ProfileStoreError> {
        let path = self.profile_path(user_id);
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&contents)?))
    }

    /// Write to a unique temp file and rename it over the live document.
    fn write_record(&self, record: &ProfileRecord) -> Result<(), ProfileStoreError> {
        let path = self.profile_path(&record.user_id);
        let temp_path = self.temp_path(&record.user_id);
        {
            let mut file = OpenOptions::new()
                .create(true)
                .truncate(true)
                .write(true)
                .open(&temp_path)?;
            let body = serde_json::to_string_pretty(record)?;
            file.write_all(body.as_bytes())?;
            file.sync_all()?;
        }
        if let Err(err) = std::fs::rename(&temp_path, &path) {
            let _ = std::fs::remove_file(&temp_path);
            return Err(err.into());
        }
        Ok(())
    }
}

#[async_trait]
impl ProfileStore for FileProfileStore {
    async fn get(&self, user_id: &str) -> Result<UserProfile, ProfileStoreError> {
        validate_user_id(user_id)?;
        let record = self.read_record(user_id)?;
        Ok(record.map(|record| record.profile).unwrap_or_default())
    }

    async fn replace(&self, user_id: &str, profile: UserProfile) -> Result<(), ProfileStoreError> {
        validate_user_id(user_id)?;
        let lock = self.locks.for_user(user_id);
        let _guard = lock.lock();
        let record = ProfileRecord {
            user_id: user_id.to_string(),
            updated_at: Utc::now(),
            profile,
        };
        self.write_record(&record)?;
        debug!(
            "profile written (user_id={}, fields={})",
            user_id,
            record.profile.len()
        );
        Ok(())
    }
}

/// Map a user id onto a portable file stem; reserved bytes are hex-escaped.
fn file_stem(user_id: &str) -> String {
    let mut stem = String::with_capacity(user_id.len());
    for byte in user_id.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
            stem.push(byte as char);
        } else {
            stem.push_str(&format!("~{byte:02x}"));
        }
    }
    stem
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;
    use wellspring_rs_protocol::ProfileValue;

    fn sample_profile() -> UserProfile {
        let mut profile = UserProfile::new();
        profile.insert("age", ProfileValue::Number(31.into()));
        profile.insert("dietary_preferences", ProfileValue::list(["vegetarian"]));
        profile
    }

    /// Profiles survive a fresh store instance over the same directory.
    #[tokio::test]
    async fn persists_across_instances() {
        let temp = tempdir().expect("tempdir");
        let store = FileProfileStore::new(temp.path()).expect("store");
        store
            .replace("user-1", sample_profile())
            .await
            .expect("replace");

        let reopened = FileProfileStore::new(temp.path()).expect("reopen");
        let loaded = reopened.get("user-1").await.expect("get");
        assert_eq!(loaded, sample_profile());
    }

    /// Replacing leaves no temp files and drops old fields.
    #[tokio::test]
    async fn replace_is_whole_and_clean() {
        let temp = tempdir().expect("tempdir");
        let store = FileProfileStore::new(temp.path()).expect("store");
        store
            .replace("user-1", sample_profile())
            .await
            .expect("first");
        let mut next = UserProfile::new();
        next.insert("activity_level", ProfileValue::text("moderate"));
        store.replace("user-1", next.clone()).await.expect("second");

        assert_eq!(store.get("user-1").await.expect("get"), next);
        let leftovers = std::fs::read_dir(temp.path())
            .expect("read dir")
            .filter_map(Result::ok)
            .filter(|entry| entry.file_name().to_string_lossy().ends_with(".tmp"))
            .count();
        assert_eq!(leftovers, 0);
    }

    /// Concurrent writers for one user never corrupt the document.
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_replace_keeps_document_valid() {
        let temp = tempdir().expect("tempdir");
        let store = FileProfileStore::new(temp.path()).expect("store");
        let mut handles = Vec::new();
        for idx in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let mut profile = UserProfile::new();
                profile.insert("age", ProfileValue::Number((20 + idx).into()));
                store.replace("shared", profile).await
            }));
        }
        for handle in handles {
            handle.await.expect("join").expect("replace");
        }
        let loaded = store.get("shared").await.expect("get");
        let age = loaded.get("age").and_then(ProfileValue::as_f64).expect("age");
        assert!((20.0..36.0).contains(&age));
    }

    /// Path separators in user ids cannot escape the root.
    #[test]
    fn file_stem_escapes_reserved_bytes() {
        assert_eq!(file_stem("ana_01"), "ana_01");
        assert_eq!(file_stem("../x"), "~2e~2e~2fx");
    }
}
