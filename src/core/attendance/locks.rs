use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type SessionKey = (String, String);

/// Per-(email, date) mutual exclusion for one process.
///
/// A guard must be held from the ledger read until the last write of a
/// transition. Entries nobody holds or waits on are pruned on the next
/// acquisition.
#[derive(Clone, Default)]
pub struct SessionLocks {
    inner: Arc<Mutex<HashMap<SessionKey, Arc<AsyncMutex<()>>>>>,
}

impl SessionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, email: &str, date: &str) -> OwnedMutexGuard<()> {
        let key = (email.trim().to_lowercase(), date.trim().to_string());
        let slot = {
            let mut map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            map.retain(|k, v| *k == key || Arc::strong_count(v) > 1);
            map.entry(key).or_default().clone()
        };
        slot.lock_owned().await
    }

    /// Number of tracked sessions.
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
