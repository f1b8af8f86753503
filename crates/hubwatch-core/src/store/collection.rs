// ── Reactive keyed collection ──
//
// Concurrent storage with push-based change notification via `watch`.

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::watch;

/// A concurrent, reactive collection keyed by entity id.
///
/// Every mutation bumps a version counter and rebuilds the snapshot that
/// subscribers receive. Entities are stored behind `Arc` so snapshots are
/// cheap; in-place updates go through `Arc::make_mut`.
pub(crate) struct EntityCollection<T: Clone + Send + Sync + 'static> {
    by_key: DashMap<String, Arc<T>>,
    version: watch::Sender<u64>,
    snapshot: watch::Sender<Arc<Vec<Arc<T>>>>,
}

impl<T: Clone + Send + Sync + 'static> EntityCollection<T> {
    pub(crate) fn new() -> Self {
        let (version, _) = watch::channel(0u64);
        let (snapshot, _) = watch::channel(Arc::new(Vec::new()));

        Self {
            by_key: DashMap::new(),
            version,
            snapshot,
        }
    }

    /// Insert or replace an entity built from the current one. Returns
    /// `true` if the key was new.
    ///
    /// `f` runs under the shard lock, so no `update` on the same key can
    /// interleave with it. It must not touch this collection.
    pub(crate) fn upsert_with(&self, key: String, f: impl FnOnce(Option<&T>) -> T) -> bool {
        let is_new = match self.by_key.entry(key) {
            Entry::Occupied(mut entry) => {
                let replacement = f(Some(entry.get().as_ref()));
                entry.insert(Arc::new(replacement));
                false
            }
            Entry::Vacant(entry) => {
                entry.insert(Arc::new(f(None)));
                true
            }
        };
        self.publish();
        is_new
    }

    /// Mutate one entity in place. `None` if the key is absent.
    ///
    /// `f` runs under the shard lock and must not touch this collection.
    pub(crate) fn update<R>(&self, key: &str, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        let result = {
            let mut entry = self.by_key.get_mut(key)?;
            f(Arc::make_mut(entry.value_mut()))
        };
        self.publish();
        Some(result)
    }

    pub(crate) fn remove(&self, key: &str) -> Option<Arc<T>> {
        let removed = self.by_key.remove(key).map(|(_, v)| v);
        if removed.is_some() {
            self.publish();
        }
        removed
    }

    pub(crate) fn get(&self, key: &str) -> Option<Arc<T>> {
        self.by_key.get(key).map(|r| Arc::clone(r.value()))
    }

    /// Current snapshot (cheap `Arc` clone).
    pub(crate) fn snapshot(&self) -> Arc<Vec<Arc<T>>> {
        self.snapshot.borrow().clone()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<Arc<Vec<Arc<T>>>> {
        self.snapshot.subscribe()
    }

    pub(crate) fn version(&self) -> u64 {
        *self.version.borrow()
    }

    pub(crate) fn len(&self) -> usize {
        self.by_key.len()
    }

    pub(crate) fn keys(&self) -> Vec<String> {
        self.by_key.iter().map(|r| r.key().clone()).collect()
    }

    // ── Private helpers ──────────────────────────────────────────────

    fn publish(&self) {
        let mut entries: Vec<(String, Arc<T>)> = self
            .by_key
            .iter()
            .map(|r| (r.key().clone(), Arc::clone(r.value())))
            .collect();
        // Snapshots are ordered by key.
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        let values: Vec<Arc<T>> = entries.into_iter().map(|(_, v)| v).collect();
        self.snapshot.send_modify(|snap| *snap = Arc::new(values));
        self.version.send_modify(|v| *v += 1);
    }
}
