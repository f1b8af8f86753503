// ── Auto-reset timers ──
//
// One-shot delayed callbacks keyed by what they reset, so a newer event
// replaces the pending reset and removed entities can cancel theirs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::AbortHandle;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    Doorbell,
    VideoDetection,
}

/// Identifies one pending reset: (kind, space, entity, attribute).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TimerKey {
    pub kind: TimerKind,
    pub space_id: String,
    pub entity_id: String,
    /// Attribute or detection type being reset.
    pub attribute: String,
}

impl TimerKey {
    pub fn doorbell(space_id: &str, device_id: &str) -> Self {
        Self {
            kind: TimerKind::Doorbell,
            space_id: space_id.to_owned(),
            entity_id: device_id.to_owned(),
            attribute: "doorbell_ring".to_owned(),
        }
    }

    /// `channel_id` is folded into the entity so each channel resets alone.
    pub fn video(space_id: &str, edge_id: &str, channel_id: Option<&str>, detection_type: &str) -> Self {
        let entity_id = match channel_id {
            Some(ch) => format!("{edge_id}/{ch}"),
            None => edge_id.to_owned(),
        };
        Self {
            kind: TimerKind::VideoDetection,
            space_id: space_id.to_owned(),
            entity_id,
            attribute: detection_type.to_owned(),
        }
    }

    /// Whether this timer belongs to `entity_id` (an edge matches its channels).
    pub fn targets(&self, space_id: &str, entity_id: &str) -> bool {
        self.space_id == space_id
            && (self.entity_id == entity_id
                || self
                    .entity_id
                    .strip_prefix(entity_id)
                    .is_some_and(|rest| rest.starts_with('/')))
    }
}

struct Pending {
    generation: u64,
    handle: AbortHandle,
}

/// Registry of pending reset callbacks.
#[derive(Clone, Default)]
pub struct TimerRegistry {
    pending: Arc<Mutex<HashMap<TimerKey, Pending>>>,
    generation: Arc<AtomicU64>,
}

impl TimerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `action` after `delay`, replacing any timer already pending
    /// under `key`. Must be called from within a Tokio runtime.
    pub fn schedule<F>(&self, key: TimerKey, delay: Duration, action: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        let registry = self.clone();
        let task_key = key.clone();

        // Hold the lock across spawn + insert so the task cannot look itself
        // up before it is registered.
        let mut pending = self.lock();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if registry.finish(&task_key, generation) {
                trace!(key = ?task_key, "reset timer fired");
                action();
            }
        });
        let entry = Pending {
            generation,
            handle: handle.abort_handle(),
        };
        if let Some(old) = pending.insert(key, entry) {
            old.handle.abort();
        }
    }

    pub fn cancel(&self, key: &TimerKey) -> bool {
        match self.lock().remove(key) {
            Some(p) => {
                p.handle.abort();
                true
            }
            None => false,
        }
    }

    /// Cancel every timer matching `pred`. Returns how many were cancelled.
    pub fn cancel_where(&self, pred: impl Fn(&TimerKey) -> bool) -> usize {
        let mut pending = self.lock();
        let doomed: Vec<TimerKey> = pending.keys().filter(|k| pred(k)).cloned().collect();
        for key in &doomed {
            if let Some(p) = pending.remove(key) {
                p.handle.abort();
            }
        }
        doomed.len()
    }

    pub fn cancel_all(&self) -> usize {
        self.cancel_where(|_| true)
    }

    pub fn is_pending(&self, key: &TimerKey) -> bool {
        self.lock().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Deregister a fired timer. `false` if it was replaced or cancelled.
    fn finish(&self, key: &TimerKey, generation: u64) -> bool {
        let mut pending = self.lock();
        match pending.get(key) {
            Some(p) if p.generation == generation => {
                pending.remove(key);
                true
            }
            _ => false,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<TimerKey, Pending>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
