use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type LockMap = Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>;

/// Serializes work on the same intent inside this process.
///
/// Entries are dropped once the last holder or waiter releases them.
#[derive(Clone, Default)]
pub struct IntentLocks {
    locks: LockMap,
}

pub struct IntentGuard {
    key: String,
    locks: LockMap,
    guard: Option<OwnedMutexGuard<()>>,
}

impl IntentLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, provider_id: &str) -> IntentGuard {
        let lock = {
            let mut map = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(map.entry(provider_id.to_string()).or_default())
        };

        let guard = lock.lock_owned().await;

        IntentGuard {
            key: provider_id.to_string(),
            locks: Arc::clone(&self.locks),
            guard: Some(guard),
        }
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl Drop for IntentGuard {
    fn drop(&mut self) {
        let mut map = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        self.guard.take();

        // Only the map still references the mutex: nobody is waiting on it.
        if map
            .get(&self.key)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            map.remove(&self.key);
        }
    }
}
