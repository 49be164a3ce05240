//! Per-group admission locks

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// One async mutex per group. Holding the guard serializes the
/// stats-decide-grant sequence for that group within this process.
/// Entries are never evicted; the map is bounded by the number of groups.
#[derive(Debug, Clone, Default)]
pub struct AdmissionLocks {
    groups: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl AdmissionLocks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, group_id: &str) -> OwnedMutexGuard<()> {
        // Clone the Arc out so the map shard is not held across the await.
        let lock = Arc::clone(
            self.groups
                .entry(group_id.to_string())
                .or_default()
                .value(),
        );
        lock.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_group_serializes() {
        let locks = AdmissionLocks::new();
        let guard = locks.acquire("group").await;

        let contender = locks.clone();
        let waiter = tokio::spawn(async move {
            let _guard = contender.acquire("group").await;
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(guard);
        waiter.await.unwrap();
    }

    #[tokio::test]
    async fn test_groups_are_independent() {
        let locks = AdmissionLocks::new();
        let _a = locks.acquire("a").await;
        let _b = tokio::time::timeout(Duration::from_millis(100), locks.acquire("b"))
            .await
            .unwrap();
    }
}
