// ── Duplicate event suppression ──
//
// The cloud and the event proxy both redeliver. Identical events inside
// a short window are dropped; nothing is persisted across restarts.

use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;

/// Dedup key: `source:tag:transition`, with the group id spliced in for
/// group arm/disarm so concurrent per-zone events from one actor survive.
pub fn dedup_key(source_id: &str, tag: &str, transition: &str, group_id: Option<&str>) -> String {
    match group_id {
        Some(group) => format!("{source_id}:{tag}:{group}:{transition}"),
        None => format!("{source_id}:{tag}:{transition}"),
    }
}

#[derive(Debug)]
pub struct Deduplicator {
    window: Duration,
    seen: HashMap<String, Instant>,
}

impl Deduplicator {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            seen: HashMap::new(),
        }
    }

    /// `false` if the same key was accepted within the window. A dropped
    /// duplicate does not extend the window.
    pub fn should_process(
        &mut self,
        source_id: &str,
        tag: &str,
        transition: &str,
        group_id: Option<&str>,
    ) -> bool {
        let key = dedup_key(source_id, tag, transition, group_id);
        let now = Instant::now();

        if let Some(last) = self.seen.get(&key) {
            if now.duration_since(*last) < self.window {
                tracing::debug!(key, "duplicate event suppressed");
                return false;
            }
        }
        self.seen.insert(key, now);
        true
    }

    /// Forget keys older than `max_age`. Returns how many were dropped.
    pub fn sweep(&mut self, max_age: Duration) -> usize {
        let now = Instant::now();
        let before = self.seen.len();
        self.seen
            .retain(|_, last| now.duration_since(*last) < max_age);
        before - self.seen.len()
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_includes_group_only_when_given() {
        assert_eq!(dedup_key("U1", "arm", "TRIGGERED", None), "U1:arm:TRIGGERED");
        assert_eq!(
            dedup_key("U1", "grouparm", "TRIGGERED", Some("G2")),
            "U1:grouparm:G2:TRIGGERED"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn duplicates_inside_window_are_dropped() {
        let mut dedup = Deduplicator::new(Duration::from_secs(5));
        assert!(dedup.should_process("D1", "tampered", "TRIGGERED", None));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(!dedup.should_process("D1", "tampered", "TRIGGERED", None));

        // A different transition is a different key.
        assert!(dedup.should_process("D1", "tampered", "RECOVERED", None));
    }

    #[tokio::test(start_paused = true)]
    async fn window_is_measured_from_first_accept() {
        let mut dedup = Deduplicator::new(Duration::from_secs(5));
        assert!(dedup.should_process("D1", "dooropened", "TRIGGERED", None));
        tokio::time::advance(Duration::from_secs(4)).await;
        assert!(!dedup.should_process("D1", "dooropened", "TRIGGERED", None));
        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(dedup.should_process("D1", "dooropened", "TRIGGERED", None));
    }

    #[tokio::test(start_paused = true)]
    async fn group_events_from_one_actor_are_independent() {
        let mut dedup = Deduplicator::new(Duration::from_secs(5));
        assert!(dedup.should_process("U1", "grouparm", "TRIGGERED", Some("G1")));
        assert!(dedup.should_process("U1", "grouparm", "TRIGGERED", Some("G2")));
        assert!(!dedup.should_process("U1", "grouparm", "TRIGGERED", Some("G1")));
    }

    #[tokio::test(start_paused = true)]
    async fn sweep_drops_stale_keys() {
        let mut dedup = Deduplicator::new(Duration::from_secs(5));
        dedup.should_process("D1", "motiondetected", "TRIGGERED", None);
        tokio::time::advance(Duration::from_secs(30)).await;
        dedup.should_process("D2", "motiondetected", "TRIGGERED", None);
        tokio::time::advance(Duration::from_secs(31)).await;

        assert_eq!(dedup.sweep(Duration::from_secs(60)), 1);
        assert_eq!(dedup.len(), 1);
    }
}
