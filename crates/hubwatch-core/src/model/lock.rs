// ── Smart lock ──
//
// Locks are read-only: state only ever changes through push events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmartLock {
    pub id: String,
    pub name: String,
    pub space_id: String,
    /// `None` until the first lock event arrives.
    pub is_locked: Option<bool>,
    pub is_door_open: Option<bool>,
    pub last_changed_by: Option<String>,
    pub last_event_tag: Option<String>,
    pub last_event_at: Option<DateTime<Utc>>,
}

impl SmartLock {
    pub fn new(id: impl Into<String>, name: impl Into<String>, space_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            space_id: space_id.into(),
            is_locked: None,
            is_door_open: None,
            last_changed_by: None,
            last_event_tag: None,
            last_event_at: None,
        }
    }

    /// Name used for locks first seen through an event without a source name.
    pub fn placeholder_name(id: &str) -> String {
        let prefix: String = id.chars().take(6).collect();
        format!("Smart Lock {prefix}")
    }
}
