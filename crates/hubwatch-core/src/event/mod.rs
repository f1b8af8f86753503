// ── Push event pipeline ──
//
// Raw payload → `PushEvent` (ingest) → `EventClass` (classify). The
// reconciler applies the result to a `Space`.

mod classify;
mod codes;
mod ingest;

pub use classify::{EventClass, LockEventKind, SmokeKind, StatusKind, classify};
pub use codes::{
    door_state_for_code, is_group_security_tag, lock_state_for_code, refreshes_after_security,
};
pub use ingest::{IngestError, Initiator, PushEvent, Transition};

#[cfg(test)]
pub(crate) use codes::SECURITY_TAGS;
