use crate::builder::BuiltGraph;
use crate::error::GraphError;
use dashmap::DashMap;
use repurpose_core::model::normalize_name;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::debug;

type Slot = Arc<OnceCell<Arc<BuiltGraph>>>;

/// Built graphs keyed by normalized disease name, with at most one build in
/// flight per key. Concurrent callers for the same key await the same cell.
#[derive(Default)]
pub struct GraphCache {
    slots: DashMap<String, Slot>,
    builds: AtomicUsize,
}

impl GraphCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the graph and whether it came from the cache. A failed or
    /// cancelled build leaves the cell empty, so the next caller waiting on
    /// it (or arriving later) retries within the same cell.
    pub async fn get_or_build<F, Fut>(
        &self,
        disease_name: &str,
        build: F,
    ) -> Result<(Arc<BuiltGraph>, bool), GraphError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<BuiltGraph, GraphError>>,
    {
        let key = normalize_name(disease_name);
        let slot = self.slots.entry(key.clone()).or_default().clone();

        let built_here = AtomicBool::new(false);
        let result = slot
            .get_or_try_init(|| {
                built_here.store(true, Ordering::SeqCst);
                self.builds.fetch_add(1, Ordering::SeqCst);
                let pending = build();
                async move { pending.await.map(Arc::new) }
            })
            .await;

        match result {
            Ok(graph) => Ok((graph.clone(), !built_here.load(Ordering::SeqCst))),
            Err(err) => {
                debug!(disease = %key, error = %err, "graph build failed, nothing cached");
                // Only the map and this caller hold the cell: no waiter can
                // be retrying in it, and new callers need the shard lock.
                self.slots.remove_if(&key, |_, held| {
                    !held.initialized() && Arc::strong_count(held) <= 2
                });
                Err(err)
            }
        }
    }

    pub fn get(&self, disease_name: &str) -> Option<Arc<BuiltGraph>> {
        self.slots
            .get(&normalize_name(disease_name))
            .and_then(|slot| slot.get().cloned())
    }

    /// Drop a completed graph. A build still in flight is left alone.
    pub fn invalidate(&self, disease_name: &str) -> bool {
        self.slots
            .remove_if(&normalize_name(disease_name), |_, slot| slot.initialized())
            .is_some()
    }

    /// Drop every completed graph; in-flight builds keep their cells.
    pub fn clear(&self) {
        self.slots.retain(|_, slot| !slot.initialized());
    }

    /// Number of completed graphs held.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.initialized()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Builds started since creation, including failed ones.
    pub fn build_count(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }
}
