// ── Consumer notifications ──
//
// Everything a consumer may want to react to besides the store
// snapshots: security changes, newly discovered locks, doorbell rings and
// scenario runs. Delivered over a broadcast channel.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::broadcast;

use crate::model::SecurityState;

const NOTIFICATION_CHANNEL_SIZE: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notification {
    /// The space's model changed; re-read it from the store.
    StateUpdated { space_id: String },
    /// Arm/disarm/night mode, pushed or polled. Emitted even when the
    /// state value itself did not change.
    SecurityChanged {
        space_id: String,
        space_name: String,
        action: SecurityState,
        source_name: Option<String>,
    },
    /// A lock seen for the first time through an event.
    NewSmartLock { space_id: String, lock_id: String },
    DoorbellRing {
        space_id: String,
        space_name: String,
        device_id: String,
        device_name: String,
    },
    ScenarioTriggered {
        space_id: String,
        space_name: String,
        scenario_name: String,
        initiator_type: Option<String>,
        target_name: String,
        event_tag: String,
    },
}

impl Notification {
    pub fn space_id(&self) -> &str {
        match self {
            Self::StateUpdated { space_id }
            | Self::SecurityChanged { space_id, .. }
            | Self::NewSmartLock { space_id, .. }
            | Self::DoorbellRing { space_id, .. }
            | Self::ScenarioTriggered { space_id, .. } => space_id,
        }
    }
}

/// Fan-out of notifications to any number of subscribers.
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: broadcast::Sender<Arc<Notification>>,
}

impl Default for Notifier {
    fn default() -> Self {
        let (tx, _) = broadcast::channel(NOTIFICATION_CHANNEL_SIZE);
        Self { tx }
    }
}

impl Notifier {
    pub fn send(&self, notification: Notification) {
        tracing::trace!(?notification, "notify");
        // No subscribers is fine.
        let _ = self.tx.send(Arc::new(notification));
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<Notification>> {
        self.tx.subscribe()
    }
}
