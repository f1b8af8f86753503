// ── Full refresh application logic ──
//
// Merges a polled snapshot of spaces into the store. Polled data is
// authoritative for structure (which devices exist, their polled fields);
// push-owned state survives where the poll has nothing to say about it.

use std::collections::{BTreeMap, HashSet};

use chrono::Utc;
use tracing::debug;

use super::DataStore;
use crate::model::{SecurityState, SmartLock, Space, VideoEdge};

/// A `security_state` change observed by a poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityChange {
    pub space_id: String,
    pub space_name: String,
    pub old: SecurityState,
    pub new: SecurityState,
}

/// What a refresh changed, so the controller can notify and cancel timers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshReport {
    pub added_spaces: Vec<String>,
    pub removed_spaces: Vec<String>,
    /// (space id, device id)
    pub removed_devices: Vec<(String, String)>,
    /// (space id, edge id)
    pub removed_video_edges: Vec<(String, String)>,
    pub security_changes: Vec<SecurityChange>,
    /// Spaces whose pushed security state was kept over the polled one.
    pub protected_spaces: Vec<String>,
}

impl DataStore {
    /// Upsert every polled space, merging with what is stored, then prune
    /// spaces the poll no longer returns.
    pub(crate) fn apply_refresh(&self, polled: Vec<Space>) -> RefreshReport {
        let mut report = RefreshReport::default();
        let incoming: HashSet<String> = polled.iter().map(|s| s.id.clone()).collect();

        for space in polled {
            let id = space.id.clone();
            self.hub_index.insert(space.hub_id.clone(), id.clone());
            let protected = self.is_security_protected(&id);
            // Read and replace under one entry lock.
            let added = self.spaces.upsert_with(id.clone(), |existing| match existing {
                Some(existing) => merge_space(existing, space, protected, &mut report),
                None => space,
            });
            if added {
                report.added_spaces.push(id);
            }
        }

        for key in self.spaces.keys() {
            if !incoming.contains(&key) {
                if let Some(old) = self.spaces.remove(&key) {
                    self.hub_index.remove(&old.hub_id);
                    self.protected_until.remove(&key);
                    report.removed_spaces.push(key);
                }
            }
        }

        self.last_full_refresh.send_replace(Some(Utc::now()));
        report
    }
}

fn merge_space(existing: &Space, mut polled: Space, protected: bool, report: &mut RefreshReport) -> Space {
    if protected && polled.security_state != existing.security_state {
        debug!(
            space = %existing.name,
            pushed = %existing.security_state,
            polled = %polled.security_state,
            "keeping recently pushed security state"
        );
        polled.security_state = existing.security_state;
        report.protected_spaces.push(existing.id.clone());
    }
    if polled.security_state != existing.security_state {
        report.security_changes.push(SecurityChange {
            space_id: existing.id.clone(),
            space_name: polled.name.clone(),
            old: existing.security_state,
            new: polled.security_state,
        });
    }

    for (id, device) in &mut polled.devices {
        if let Some(old) = existing.devices.get(id) {
            for (key, value) in &old.attributes {
                if !device.attributes.contains_key(key) {
                    device.attributes.insert(key.clone(), value.clone());
                }
            }
        }
    }
    report.removed_devices.extend(
        existing
            .devices
            .keys()
            .filter(|id| !polled.devices.contains_key(*id))
            .map(|id| (existing.id.clone(), id.clone())),
    );

    merge_locks(&existing.smart_locks, &mut polled.smart_locks);

    for (id, edge) in &mut polled.video_edges {
        if let Some(old) = existing.video_edges.get(id) {
            merge_edge(old, edge);
        }
    }
    report.removed_video_edges.extend(
        existing
            .video_edges
            .keys()
            .filter(|id| !polled.video_edges.contains_key(*id))
            .map(|id| (existing.id.clone(), id.clone())),
    );

    polled
}

/// Locks may only ever be known from events, so a poll never removes one.
fn merge_locks(existing: &BTreeMap<String, SmartLock>, polled: &mut BTreeMap<String, SmartLock>) {
    for (id, old) in existing {
        match polled.get_mut(id) {
            Some(lock) => {
                lock.is_locked = lock.is_locked.or(old.is_locked);
                lock.is_door_open = lock.is_door_open.or(old.is_door_open);
                if lock.last_changed_by.is_none() {
                    lock.last_changed_by.clone_from(&old.last_changed_by);
                }
                if lock.last_event_tag.is_none() {
                    lock.last_event_tag.clone_from(&old.last_event_tag);
                    lock.last_event_at = old.last_event_at;
                }
            }
            None => {
                polled.insert(id.clone(), old.clone());
            }
        }
    }
}

fn merge_edge(old: &VideoEdge, edge: &mut VideoEdge) {
    // Events may have created a default channel on an edge the API lists
    // without channels.
    if edge.channels.is_empty() {
        edge.channels.clone_from(&old.channels);
        return;
    }
    for channel in &mut edge.channels {
        if !channel.detections.is_empty() {
            continue;
        }
        if let Some(prev) = old.channels.iter().find(|c| c.id == channel.id) {
            channel.detections.clone_from(&prev.detections);
        }
    }
}
