use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Lazily created mutex per user id.
///
/// Guards are synchronous; callers must not hold one across an `.await`.
#[derive(Debug, Default)]
pub(crate) struct UserLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl UserLocks {
    pub(crate) fn for_user(&self, user_id: &str) -> Arc<Mutex<()>> {
        self.locks
            .lock()
            .entry(user_id.to_string())
            .or_default()
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// The same user id always maps to the same lock.
    #[test]
    fn same_user_shares_lock() {
        let locks = UserLocks::default();
        let first = locks.for_user("ana");
        let second = locks.for_user("ana");
        let other = locks.for_user("ben");
        assert!(Arc::ptr_eq(&first, &second));
        assert!(!Arc::ptr_eq(&first, &other));
    }
}
