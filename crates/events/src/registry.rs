//! Per-task subscription membership.
//!
//! Tracks which live connections declared interest in which tasks. The
//! registry holds plain ids on both sides -- it knows nothing about sockets
//! or channels, so no lock is ever held across a network send.

use std::collections::{HashMap, HashSet};

use tokio::sync::RwLock;

use geosense_core::types::DbId;

#[derive(Default)]
struct Memberships {
    /// task id -> connection ids watching it.
    by_task: HashMap<DbId, HashSet<String>>,
    /// connection id -> task ids it watches (for O(1) disconnect cleanup).
    by_conn: HashMap<String, HashSet<DbId>>,
}

/// Concurrent registry of `(task, connection)` subscription pairs.
///
/// Thread-safe via interior `RwLock`; designed to be wrapped in `Arc` and
/// shared between the WebSocket handler (subscribes/unsubscribes) and the
/// notification bridge (resolves subscriber sets).
pub struct SubscriptionRegistry {
    inner: RwLock<Memberships>,
}

impl SubscriptionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Memberships::default()),
        }
    }

    /// Record that `conn_id` wants status events for `task_id`.
    ///
    /// Idempotent: adding an existing pair has no additional effect.
    pub async fn subscribe(&self, task_id: DbId, conn_id: &str) {
        let mut inner = self.inner.write().await;
        inner
            .by_task
            .entry(task_id)
            .or_default()
            .insert(conn_id.to_string());
        inner
            .by_conn
            .entry(conn_id.to_string())
            .or_default()
            .insert(task_id);
    }

    /// Remove a single membership. Safe to call for a pair that was never
    /// subscribed.
    pub async fn unsubscribe(&self, task_id: DbId, conn_id: &str) {
        let mut inner = self.inner.write().await;
        if let Some(conns) = inner.by_task.get_mut(&task_id) {
            conns.remove(conn_id);
            if conns.is_empty() {
                inner.by_task.remove(&task_id);
            }
        }
        if let Some(tasks) = inner.by_conn.get_mut(conn_id) {
            tasks.remove(&task_id);
            if tasks.is_empty() {
                inner.by_conn.remove(conn_id);
            }
        }
    }

    /// Remove `conn_id` from every task's subscriber set.
    ///
    /// Called when a connection closes so later publishes never attempt
    /// delivery to it.
    pub async fn unsubscribe_all(&self, conn_id: &str) {
        let mut inner = self.inner.write().await;
        let Some(tasks) = inner.by_conn.remove(conn_id) else {
            return;
        };
        for task_id in tasks {
            if let Some(conns) = inner.by_task.get_mut(&task_id) {
                conns.remove(conn_id);
                if conns.is_empty() {
                    inner.by_task.remove(&task_id);
                }
            }
        }
    }

    /// Snapshot of the connection ids currently watching `task_id`.
    pub async fn subscribers(&self, task_id: DbId) -> Vec<String> {
        self.inner
            .read()
            .await
            .by_task
            .get(&task_id)
            .map(|conns| conns.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of distinct `(task, connection)` pairs currently registered.
    pub async fn membership_count(&self) -> usize {
        self.inner
            .read()
            .await
            .by_task
            .values()
            .map(HashSet::len)
            .sum()
    }
}

impl Default for SubscriptionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribe_is_idempotent() {
        let registry = SubscriptionRegistry::new();

        registry.subscribe(1, "conn-a").await;
        registry.subscribe(1, "conn-a").await;

        assert_eq!(registry.subscribers(1).await, vec!["conn-a".to_string()]);
        assert_eq!(registry.membership_count().await, 1);
    }

    #[tokio::test]
    async fn multiple_subscribers_per_task() {
        let registry = SubscriptionRegistry::new();

        registry.subscribe(1, "conn-a").await;
        registry.subscribe(1, "conn-b").await;

        let mut subs = registry.subscribers(1).await;
        subs.sort();
        assert_eq!(subs, vec!["conn-a".to_string(), "conn-b".to_string()]);
    }

    #[tokio::test]
    async fn unsubscribe_unknown_pair_is_noop() {
        let registry = SubscriptionRegistry::new();

        registry.subscribe(1, "conn-a").await;
        registry.unsubscribe(1, "conn-b").await;
        registry.unsubscribe(99, "conn-a").await;

        assert_eq!(registry.subscribers(1).await, vec!["conn-a".to_string()]);
    }

    #[tokio::test]
    async fn unsubscribe_all_clears_every_task() {
        let registry = SubscriptionRegistry::new();

        registry.subscribe(1, "conn-a").await;
        registry.subscribe(2, "conn-a").await;
        registry.subscribe(2, "conn-b").await;

        registry.unsubscribe_all("conn-a").await;

        assert!(registry.subscribers(1).await.is_empty());
        assert_eq!(registry.subscribers(2).await, vec!["conn-b".to_string()]);
        assert_eq!(registry.membership_count().await, 1);
    }

    #[tokio::test]
    async fn unsubscribe_all_unknown_conn_is_noop() {
        let registry = SubscriptionRegistry::new();
        registry.unsubscribe_all("ghost").await;
        assert_eq!(registry.membership_count().await, 0);
    }

    #[tokio::test]
    async fn connection_may_watch_many_tasks() {
        let registry = SubscriptionRegistry::new();

        for task_id in 1..=5 {
            registry.subscribe(task_id, "conn-a").await;
        }

        assert_eq!(registry.membership_count().await, 5);
        registry.unsubscribe(3, "conn-a").await;
        assert!(registry.subscribers(3).await.is_empty());
        assert_eq!(registry.membership_count().await, 4);
    }
}
