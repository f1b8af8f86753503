// ── Reactive data store ──
//
// Holds every `Space` the controller knows about. Mutations are broadcast
// to subscribers via `watch` channels.

mod collection;
mod refresh;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::watch;
use tokio::time::Instant;

use self::collection::EntityCollection;
use crate::model::Space;
use crate::stream::EntityStream;

pub use refresh::{RefreshReport, SecurityChange};

/// Central store of spaces, indexed by space id and by hub id.
pub struct DataStore {
    pub(crate) spaces: EntityCollection<Space>,
    /// hub id -> space id
    pub(crate) hub_index: DashMap<String, String>,
    /// space id -> end of the window in which polls keep the pushed state
    pub(crate) protected_until: DashMap<String, Instant>,
    pub(crate) last_full_refresh: watch::Sender<Option<DateTime<Utc>>>,
    pub(crate) last_push_event: watch::Sender<Option<DateTime<Utc>>>,
}

impl Default for DataStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DataStore {
    pub fn new() -> Self {
        let (last_full_refresh, _) = watch::channel(None);
        let (last_push_event, _) = watch::channel(None);

        Self {
            spaces: EntityCollection::new(),
            hub_index: DashMap::new(),
            protected_until: DashMap::new(),
            last_full_refresh,
            last_push_event,
        }
    }

    // ── Lookups ──────────────────────────────────────────────────────

    pub fn spaces_snapshot(&self) -> Arc<Vec<Arc<Space>>> {
        self.spaces.snapshot()
    }

    pub fn space(&self, space_id: &str) -> Option<Arc<Space>> {
        self.spaces.get(space_id)
    }

    pub fn space_id_for_hub(&self, hub_id: &str) -> Option<String> {
        self.hub_index.get(hub_id).map(|r| r.value().clone())
    }

    pub fn space_by_hub(&self, hub_id: &str) -> Option<Arc<Space>> {
        self.space_id_for_hub(hub_id)
            .and_then(|id| self.spaces.get(&id))
    }

    /// Resolve a user-supplied identifier: space id, hub id, then
    /// case-insensitive name.
    pub fn find_space(&self, identifier: &str) -> Option<Arc<Space>> {
        if let Some(space) = self.space(identifier).or_else(|| self.space_by_hub(identifier)) {
            return Some(space);
        }
        self.spaces
            .snapshot()
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(identifier))
            .cloned()
    }

    pub fn space_count(&self) -> usize {
        self.spaces.len()
    }

    /// Bumped on every mutation of any space.
    pub fn version(&self) -> u64 {
        self.spaces.version()
    }

    // ── Mutation ─────────────────────────────────────────────────────

    /// Run `f` against the stored space. `None` if it does not exist.
    pub fn update_space<R>(&self, space_id: &str, f: impl FnOnce(&mut Space) -> R) -> Option<R> {
        self.spaces.update(space_id, f)
    }

    #[cfg(test)]
    pub(crate) fn insert_space(&self, space: Space) {
        self.hub_index.insert(space.hub_id.clone(), space.id.clone());
        self.spaces.upsert_with(space.id.clone(), |_| space);
    }

    /// Keep the current `security_state` of `space_id` across polls for
    /// `window`.
    pub fn protect_security_state(&self, space_id: &str, window: Duration) {
        self.protected_until
            .insert(space_id.to_owned(), Instant::now() + window);
    }

    pub fn is_security_protected(&self, space_id: &str) -> bool {
        self.protected_until
            .get(space_id)
            .is_some_and(|until| Instant::now() < *until)
    }

    pub(crate) fn mark_push_event(&self) {
        self.last_push_event.send_replace(Some(Utc::now()));
    }

    // ── Subscriptions ────────────────────────────────────────────────

    pub fn subscribe_spaces(&self) -> EntityStream<Space> {
        EntityStream::new(self.spaces.subscribe())
    }

    pub fn last_full_refresh(&self) -> Option<DateTime<Utc>> {
        *self.last_full_refresh.borrow()
    }

    pub fn last_push_event(&self) -> Option<DateTime<Utc>> {
        *self.last_push_event.borrow()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::SecurityState;

    #[test]
    fn lookups_by_id_hub_and_name() {
        let store = DataStore::new();
        store.insert_space(Space::new("S1", "Beach House", "H1"));

        assert_eq!(store.space("S1").unwrap().name, "Beach House");
        assert_eq!(store.space_by_hub("H1").unwrap().id, "S1");
        assert_eq!(store.find_space("beach house").unwrap().id, "S1");
        assert_eq!(store.find_space("H1").unwrap().id, "S1");
        assert!(store.find_space("nowhere").is_none());
    }

    #[test]
    fn update_space_is_visible_to_subscribers() {
        let store = DataStore::new();
        store.insert_space(Space::new("S1", "Home", "H1"));
        let stream = store.subscribe_spaces();

        let changed = store.update_space("S1", |s| {
            s.security_state = SecurityState::Armed;
            true
        });
        assert_eq!(changed, Some(true));
        assert_eq!(stream.latest()[0].security_state, SecurityState::Armed);
        assert_eq!(stream.current()[0].security_state, SecurityState::Disarmed);
        assert!(store.update_space("S2", |_| ()).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn protection_expires() {
        let store = DataStore::new();
        store.protect_security_state("S1", Duration::from_secs(5));
        assert!(store.is_security_protected("S1"));
        assert!(!store.is_security_protected("S2"));

        tokio::time::advance(Duration::from_secs(6)).await;
        assert!(!store.is_security_protected("S1"));
    }
}
