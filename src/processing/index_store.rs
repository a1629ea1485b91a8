//! Process-lifetime holder for a pre-built document index.
//!
//! Readers clone the current `Arc<DocumentIndex>` and keep using it even if a rebuild lands
//! meanwhile. A rebuild constructs the new index completely before swapping the pointer, and
//! rebuilds are serialized so at most one is in flight.

use super::types::DocumentIndex;
use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::Mutex;

/// Shared slot holding the most recently built index.
#[derive(Default)]
pub struct IndexStore {
    current: RwLock<Option<Arc<DocumentIndex>>>,
    rebuild: Mutex<()>,
}

impl IndexStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the current index, if any.
    pub fn current(&self) -> Option<Arc<DocumentIndex>> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Run `build` under the rebuild lock and publish its result.
    ///
    /// On error the previously published index stays in place.
    pub async fn rebuild<F, Fut, E>(&self, build: F) -> Result<Arc<DocumentIndex>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<DocumentIndex, E>>,
    {
        let _guard = self.rebuild.lock().await;
        let index = Arc::new(build().await?);
        self.publish(Arc::clone(&index));
        Ok(index)
    }

    fn publish(&self, index: Arc<DocumentIndex>) {
        let mut slot = self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *slot = Some(index);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn index(source: &str) -> DocumentIndex {
        DocumentIndex::new(source, "fp", "now", Vec::new(), 0)
    }

    #[tokio::test]
    async fn rebuild_publishes_new_index() {
        let store = IndexStore::new();
        assert!(store.current().is_none());

        store
            .rebuild(|| async { Ok::<_, ()>(index("a")) })
            .await
            .unwrap();
        assert_eq!(store.current().unwrap().source, "a");
    }

    #[tokio::test]
    async fn failed_rebuild_keeps_previous_index() {
        let store = IndexStore::new();
        store
            .rebuild(|| async { Ok::<_, ()>(index("a")) })
            .await
            .unwrap();

        let result = store.rebuild(|| async { Err::<DocumentIndex, _>("boom") }).await;
        assert_eq!(result.unwrap_err(), "boom");
        assert_eq!(store.current().unwrap().source, "a");
    }

    #[tokio::test]
    async fn readers_keep_their_snapshot_across_rebuilds() {
        let store = IndexStore::new();
        store
            .rebuild(|| async { Ok::<_, ()>(index("old")) })
            .await
            .unwrap();
        let snapshot = store.current().unwrap();

        store
            .rebuild(|| async { Ok::<_, ()>(index("new")) })
            .await
            .unwrap();

        assert_eq!(snapshot.source, "old");
        assert_eq!(store.current().unwrap().source, "new");
    }

    #[tokio::test]
    async fn concurrent_rebuilds_are_serialized() {
        let store = Arc::new(IndexStore::new());
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..4)
            .map(|i| {
                let store = Arc::clone(&store);
                let active = Arc::clone(&active);
                let peak = Arc::clone(&peak);
                tokio::spawn(async move {
                    store
                        .rebuild(|| async move {
                            let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                            peak.fetch_max(now, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(5)).await;
                            active.fetch_sub(1, Ordering::SeqCst);
                            Ok::<_, ()>(index(&format!("doc-{i}")))
                        })
                        .await
                        .unwrap();
                })
            })
            .collect();

        for task in tasks {
            task.await.unwrap();
        }
        assert_eq!(peak.load(Ordering::SeqCst), 1);
        assert!(store.current().is_some());
    }
}
