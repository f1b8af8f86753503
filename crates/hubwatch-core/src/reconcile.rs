// ── State reconciliation ──
//
// Applies one classified push event to the space that owns it. Pure and
// synchronous: the controller runs it inside the store's update closure,
// then acts on the returned `Outcome` (notifications, timers, refreshes).

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::event::{
    EventClass, LockEventKind, PushEvent, SmokeKind, StatusKind, door_state_for_code,
    lock_state_for_code, refreshes_after_security,
};
use crate::model::{SecurityState, SmartLock, Space};
use crate::notify::Notification;

/// Name credited for security changes that this process initiated.
pub const LOCAL_ACTOR: &str = "local";

/// Inputs to `apply` that do not come from the event itself.
#[derive(Debug, Clone)]
pub struct ApplyContext {
    pub now: DateTime<Utc>,
    /// A security command was issued locally for this hub moments ago.
    pub local_action: bool,
}

/// Work the controller must schedule after an event was applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Followup {
    /// Delayed, cache-bypassing refresh that does not re-announce state.
    RefreshMetadata,
    ResetDoorbell {
        device_id: String,
    },
    ResetVideoDetection {
        edge_id: String,
        channel_id: Option<String>,
        detection_type: String,
    },
}

#[derive(Debug, Default)]
pub struct Outcome {
    /// The space changed and consumers should re-read it.
    pub mutated: bool,
    /// `security_state` was set from the event; polls must not undo it yet.
    pub security_set: bool,
    pub notifications: Vec<Notification>,
    pub followups: Vec<Followup>,
}

/// Apply `class` (derived from `event`) to `space`.
///
/// Unresolvable sources are logged and leave the space untouched.
pub fn apply(space: &mut Space, event: &PushEvent, class: EventClass, ctx: &ApplyContext) -> Outcome {
    let mut out = Outcome::default();
    let stamp = ctx.now.to_rfc3339();

    match class {
        EventClass::Security { target, group } => apply_security(space, event, target, group, ctx, &mut out),
        EventClass::Door { opened } => {
            if let Some(dev) = device_or_warn(space, event, "door") {
                dev.set_attr("door_opened", opened);
                dev.set_attr("door_opened_at", stamp);
                info!(device = %dev.name, opened, "door event");
                out.mutated = true;
            }
        }
        EventClass::Motion { detected } => {
            if let Some(dev) = device_or_warn(space, event, "motion") {
                dev.set_attr("motion_detected", detected);
                dev.set_attr("motion_detected_at", stamp);
                info!(device = %dev.name, detected, "motion event");
                out.mutated = true;
                escalate_if_armed(space, detected, "motion");
            }
        }
        EventClass::Smoke { kind, active } => {
            if let Some(dev) = device_or_warn(space, event, "smoke") {
                dev.set_attr(kind.attribute(), active);
                info!(device = %dev.name, attribute = kind.attribute(), active, "fire detector event");
                out.mutated = true;
                escalate_always(space, active, smoke_label(kind));
            }
        }
        EventClass::Flood { leak } => {
            if let Some(dev) = device_or_warn(space, event, "flood") {
                dev.set_attr("leak_detected", leak);
                info!(device = %dev.name, leak, "leak event");
                out.mutated = true;
                escalate_always(space, leak, "leak");
            }
        }
        EventClass::GlassBreak { detected } => {
            if let Some(dev) = device_or_warn(space, event, "glass break") {
                dev.set_attr("glass_break_detected", detected);
                info!(device = %dev.name, detected, "glass break event");
                out.mutated = true;
                escalate_if_armed(space, detected, "glass break");
            }
        }
        EventClass::Tamper { tampered } => {
            if let Some(dev) = device_or_warn(space, event, "tamper") {
                dev.set_attr("tampered", tampered);
                info!(device = %dev.name, tampered, transition = event.transition_label(), "tamper event");
                out.mutated = true;
            }
        }
        EventClass::DeviceStatus { kind, problem } => {
            if let Some(dev) = device_or_warn(space, event, "status") {
                match kind {
                    StatusKind::Connectivity => dev.online = !problem,
                    StatusKind::Battery => dev.set_attr("low_battery", problem),
                    StatusKind::ExternalPower => dev.set_attr("external_power_lost", problem),
                }
                info!(device = %dev.name, tag = %event.tag, "device status event");
                out.mutated = true;
            }
        }
        EventClass::Relay { on } => {
            if let Some(dev) = device_or_warn(space, event, "relay") {
                dev.set_attr("is_on", on);
                info!(device = %dev.name, on, "relay event");
                out.mutated = true;
            }
        }
        EventClass::Scenario => apply_scenario(space, event, &mut out),
        EventClass::Video { detection } => apply_video(space, event, detection, &mut out),
        EventClass::Doorbell => {
            let space_id = space.id.clone();
            let space_name = space.name.clone();
            if let Some(dev) = device_or_warn(space, event, "doorbell") {
                dev.set_attr("last_ring", stamp);
                dev.set_attr("doorbell_ring", true);
                info!(device = %dev.name, "doorbell ring");
                out.notifications.push(Notification::DoorbellRing {
                    space_id,
                    space_name,
                    device_id: dev.id.clone(),
                    device_name: dev.name.clone(),
                });
                out.followups.push(Followup::ResetDoorbell {
                    device_id: dev.id.clone(),
                });
                out.mutated = true;
            }
        }
        EventClass::Lock { kind } => apply_lock(space, event, kind, ctx, &mut out),
        EventClass::Unhandled => {}
    }

    out
}

fn apply_security(
    space: &mut Space,
    event: &PushEvent,
    target: SecurityState,
    group: bool,
    ctx: &ApplyContext,
    out: &mut Outcome,
) {
    let old = space.security_state;
    let changed = old != target;
    info!(
        tag = %event.tag,
        old = %old,
        new = %target,
        changed,
        group,
        "security event"
    );

    // Composite group state is only known after the cloud recomputes it.
    if refreshes_after_security(&event.tag) {
        out.followups.push(Followup::RefreshMetadata);
    }

    if changed && !group {
        space.security_state = target;
        out.security_set = true;
        out.mutated = true;
    }

    let source_name = if ctx.local_action {
        Some(LOCAL_ACTOR.to_owned())
    } else {
        Some(event.source_name.clone()).filter(|s| !s.is_empty())
    };
    out.notifications.push(Notification::SecurityChanged {
        space_id: space.id.clone(),
        space_name: space.name.clone(),
        action: target,
        source_name,
    });
}

fn apply_scenario(space: &Space, event: &PushEvent, out: &mut Outcome) {
    let Some(initiator) = event.initiator() else {
        debug!(tag = %event.tag, "scenario event without initiator info");
        return;
    };
    info!(
        tag = %event.tag,
        initiator = %initiator.name,
        initiator_type = initiator.object_type.as_deref().unwrap_or("unknown"),
        "scenario triggered"
    );
    out.notifications.push(Notification::ScenarioTriggered {
        space_id: space.id.clone(),
        space_name: space.name.clone(),
        scenario_name: initiator.name,
        initiator_type: initiator.object_type,
        target_name: event.source_name.clone(),
        event_tag: event.tag.clone(),
    });
}

fn apply_video(space: &mut Space, event: &PushEvent, detection: &str, out: &mut Outcome) {
    let Some((edge_id, channel_id)) = find_video_target(space, &event.source_id, &event.source_name)
    else {
        warn!(name = %event.source_name, id = %event.source_id, "video edge not found");
        return;
    };
    let Some(edge) = space.video_edges.get_mut(&edge_id) else {
        return;
    };
    let Some(channel) = edge.detection_channel_mut(channel_id.as_deref()) else {
        debug!(edge = %edge.name, channel = ?channel_id, "detection channel missing");
        return;
    };
    channel.set_detection(detection, true);
    info!(
        edge = %edge.name,
        detection,
        channel = channel_id.as_deref().unwrap_or("default"),
        "video detection"
    );

    out.followups.push(Followup::ResetVideoDetection {
        edge_id,
        channel_id,
        detection_type: detection.to_owned(),
    });
    out.mutated = true;
}

fn apply_lock(
    space: &mut Space,
    event: &PushEvent,
    kind: LockEventKind,
    ctx: &ApplyContext,
    out: &mut Outcome,
) {
    let existing = if event.source_id.is_empty() || !space.smart_locks.contains_key(&event.source_id) {
        space
            .smart_locks
            .values()
            .find(|l| !event.source_name.is_empty() && l.name == event.source_name)
            .map(|l| l.id.clone())
    } else {
        Some(event.source_id.clone())
    };

    let lock_id = match existing {
        Some(id) => id,
        None if !event.source_id.is_empty() => {
            let name = if event.source_name.is_empty() {
                SmartLock::placeholder_name(&event.source_id)
            } else {
                event.source_name.clone()
            };
            info!(lock = %name, id = %event.source_id, "discovered smart lock from event");
            space.smart_locks.insert(
                event.source_id.clone(),
                SmartLock::new(event.source_id.clone(), name, space.id.clone()),
            );
            out.notifications.push(Notification::NewSmartLock {
                space_id: space.id.clone(),
                lock_id: event.source_id.clone(),
            });
            event.source_id.clone()
        }
        None => {
            warn!(tag = %event.tag, name = %event.source_name, "smart lock event without source id");
            return;
        }
    };

    let Some(lock) = space.smart_locks.get_mut(&lock_id) else {
        return;
    };
    if let Some(user) = event.changed_by() {
        lock.last_changed_by = Some(user);
    }

    let code = event.code.as_deref().unwrap_or_default();
    match kind {
        LockEventKind::Door => {
            if let Some(open) = door_state_for_code(code) {
                lock.is_door_open = Some(open);
            }
            info!(lock = %lock.name, door_open = ?lock.is_door_open, "smart lock door event");
        }
        LockEventKind::Bolt => {
            if let Some(locked) = lock_state_for_code(code) {
                lock.is_locked = Some(locked);
            }
            info!(
                lock = %lock.name,
                locked = ?lock.is_locked,
                by = lock.last_changed_by.as_deref().unwrap_or("unknown"),
                "smart lock event"
            );
        }
    }
    lock.last_event_tag = Some(event.tag.clone());
    lock.last_event_at = Some(ctx.now);
    out.mutated = true;
}

// ── Auto-reset targets ───────────────────────────────────────────────

/// Clear a doorbell ring. `false` if the device is gone.
pub fn reset_doorbell(space: &mut Space, device_id: &str) -> bool {
    match space.devices.get_mut(device_id) {
        Some(dev) => {
            dev.set_attr("doorbell_ring", false);
            debug!(device = %dev.name, "doorbell ring reset");
            true
        }
        None => false,
    }
}

/// Mark a detection inactive. `false` if the edge or channel is gone.
pub fn reset_video_detection(
    space: &mut Space,
    edge_id: &str,
    channel_id: Option<&str>,
    detection_type: &str,
) -> bool {
    let Some(edge) = space.video_edges.get_mut(edge_id) else {
        return false;
    };
    let Some(channel) = edge.detection_channel_mut(channel_id) else {
        return false;
    };
    channel.set_detection(detection_type, false);
    debug!(edge = %edge.name, detection_type, "video detection reset");
    true
}

// ── Helpers ──────────────────────────────────────────────────────────

fn device_or_warn<'a>(
    space: &'a mut Space,
    event: &PushEvent,
    what: &str,
) -> Option<&'a mut crate::model::Device> {
    let found = space.find_device_mut(&event.source_id, &event.source_name);
    if found.is_none() {
        warn!(
            kind = what,
            name = %event.source_name,
            id = %event.source_id,
            "device not found for event"
        );
    }
    found
}

/// Life-safety conditions trigger the alarm whatever the arm state.
fn escalate_always(space: &mut Space, active: bool, cause: &str) {
    if active {
        space.security_state = SecurityState::Triggered;
        info!(space = %space.name, cause, "alarm triggered");
    }
}

/// Intrusion-class detections only trigger an armed space.
fn escalate_if_armed(space: &mut Space, active: bool, cause: &str) {
    if active && space.security_state.is_armed() {
        space.security_state = SecurityState::Triggered;
        info!(space = %space.name, cause, "alarm triggered");
    }
}

fn smoke_label(kind: SmokeKind) -> &'static str {
    match kind {
        SmokeKind::Smoke => "smoke",
        SmokeKind::Temperature => "temperature",
        SmokeKind::CarbonMonoxide => "carbon monoxide",
    }
}

/// Resolve the edge, and channel if any, a video event refers to:
/// edge id, channel id, edge name, channel name.
fn find_video_target(space: &Space, source_id: &str, source_name: &str) -> Option<(String, Option<String>)> {
    if !source_id.is_empty() {
        if space.video_edges.contains_key(source_id) {
            return Some((source_id.to_owned(), None));
        }
        for edge in space.video_edges.values() {
            if edge.channels.iter().any(|c| c.id == source_id) {
                return Some((edge.id.clone(), Some(source_id.to_owned())));
            }
        }
    }

    if !source_name.is_empty() {
        for edge in space.video_edges.values() {
            if edge.name == source_name {
                return Some((edge.id.clone(), None));
            }
            if let Some(channel) = edge
                .channels
                .iter()
                .find(|c| c.name.as_deref() == Some(source_name))
            {
                return Some((edge.id.clone(), Some(channel.id.clone())));
            }
        }
    }
    None
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::event::classify;
    use crate::model::{Device, VideoChannel, VideoEdge, VideoEdgeType};

    fn space() -> Space {
        let mut space = Space::new("S1", "Home", "H1");
        for (id, name, raw) in [
            ("D1", "Hallway", "MotionProtect"),
            ("D2", "Front door", "Doorbell"),
            ("D3", "Kitchen", "FireProtect2"),
            ("D4", "Bathroom", "LeaksProtect"),
            ("D5", "Window", "GlassProtect"),
        ] {
            space.devices.insert(id.into(), Device::new(id, name, raw));
        }
        space
    }

    fn run(space: &mut Space, payload: serde_json::Value) -> Outcome {
        run_with(space, payload, false)
    }

    fn run_with(space: &mut Space, payload: serde_json::Value, local_action: bool) -> Outcome {
        let event = PushEvent::from_payload(&payload).unwrap();
        let class = classify(&event.tag, event.transition, &event.event_type_v2);
        let ctx = ApplyContext {
            now: Utc::now(),
            local_action,
        };
        apply(space, &event, class, &ctx)
    }

    #[test]
    fn motion_while_armed_triggers_alarm() {
        let mut space = space();
        space.security_state = SecurityState::Armed;
        let out = run(
            &mut space,
            json!({ "eventTag": "motiondetected", "hubId": "H1", "sourceObjectId": "D1" }),
        );
        assert!(out.mutated);
        assert!(space.devices["D1"].flag("motion_detected"));
        assert_eq!(space.security_state, SecurityState::Triggered);
    }

    #[test]
    fn motion_while_disarmed_does_not_escalate() {
        let mut space = space();
        run(
            &mut space,
            json!({ "eventTag": "motiondetected", "hubId": "H1", "sourceObjectId": "D1" }),
        );
        assert!(space.devices["D1"].flag("motion_detected"));
        assert_eq!(space.security_state, SecurityState::Disarmed);
    }

    #[test]
    fn glass_break_respects_arm_state() {
        let mut space = space();
        space.security_state = SecurityState::NightMode;
        run(
            &mut space,
            json!({ "eventTag": "glassbreakdetected", "hubId": "H1", "sourceObjectId": "D5" }),
        );
        assert_eq!(space.security_state, SecurityState::Triggered);
    }

    #[test]
    fn smoke_and_flood_always_escalate() {
        for (tag, id, attr) in [
            ("smokedetected", "D3", "smoke_detected"),
            ("codetected", "D3", "co_detected"),
            ("leakdetected", "D4", "leak_detected"),
        ] {
            let mut space = space();
            run(&mut space, json!({ "eventTag": tag, "hubId": "H1", "sourceObjectId": id }));
            assert_eq!(space.security_state, SecurityState::Triggered, "{tag}");
            assert!(space.devices[id].flag(attr), "{tag}");

            // Idempotent when already triggered.
            run(&mut space, json!({ "eventTag": tag, "hubId": "H1", "sourceObjectId": id }));
            assert_eq!(space.security_state, SecurityState::Triggered, "{tag}");
        }
    }

    #[test]
    fn recovered_smoke_does_not_escalate() {
        let mut space = space();
        run(
            &mut space,
            json!({ "eventTag": "smokerecovered", "hubId": "H1", "sourceObjectId": "D3" }),
        );
        assert_eq!(space.security_state, SecurityState::Disarmed);
        assert_eq!(space.devices["D3"].attr("smoke_detected"), Some(&json!(false)));
    }

    #[test]
    fn arm_sets_state_and_notifies() {
        let mut space = space();
        let out = run(
            &mut space,
            json!({ "eventTag": "arm", "hubId": "H1", "sourceObjectName": "Alice" }),
        );
        assert_eq!(space.security_state, SecurityState::Armed);
        assert!(out.security_set);
        assert_eq!(out.followups, vec![Followup::RefreshMetadata]);
        assert_eq!(
            out.notifications,
            vec![Notification::SecurityChanged {
                space_id: "S1".into(),
                space_name: "Home".into(),
                action: SecurityState::Armed,
                source_name: Some("Alice".into()),
            }]
        );
    }

    #[test]
    fn unchanged_security_state_still_notifies() {
        let mut space = space();
        let out = run(&mut space, json!({ "eventTag": "disarm", "hubId": "H1" }));
        assert!(!out.mutated);
        assert!(!out.security_set);
        assert_eq!(out.notifications.len(), 1);
    }

    #[test]
    fn group_arm_defers_to_refresh() {
        let mut space = space();
        let out = run(
            &mut space,
            json!({
                "eventTag": "grouparm",
                "hubId": "H1",
                "additionalData": { "relatedGroupsInfo": [{ "id": "G1" }] }
            }),
        );
        assert_eq!(space.security_state, SecurityState::Disarmed);
        assert!(!out.security_set);
        assert_eq!(out.followups, vec![Followup::RefreshMetadata]);
    }

    #[test]
    fn every_hub_wide_security_tag_sets_its_state() {
        for &(tag, expected) in crate::event::SECURITY_TAGS {
            if crate::event::is_group_security_tag(tag) {
                continue;
            }
            let mut space = space();
            space.security_state = if expected == SecurityState::Disarmed {
                SecurityState::Armed
            } else {
                SecurityState::Disarmed
            };
            let out = run(&mut space, json!({ "eventTag": tag, "hubId": "H1" }));
            assert_eq!(space.security_state, expected, "tag {tag}");
            assert!(out.security_set, "tag {tag}");
        }
    }

    #[test]
    fn night_mode_sets_state_without_refresh() {
        let mut space = space();
        let out = run(&mut space, json!({ "eventTag": "nightmodeon", "hubId": "H1" }));
        assert_eq!(space.security_state, SecurityState::NightMode);
        assert!(out.followups.is_empty());
    }

    #[test]
    fn local_action_is_credited_locally() {
        let mut space = space();
        let out = run_with(
            &mut space,
            json!({ "eventTag": "arm", "hubId": "H1", "sourceObjectName": "Cloud user" }),
            true,
        );
        match &out.notifications[0] {
            Notification::SecurityChanged { source_name, .. } => {
                assert_eq!(source_name.as_deref(), Some(LOCAL_ACTOR));
            }
            other => panic!("unexpected notification {other:?}"),
        }
    }

    #[test]
    fn door_recovered_clears_flag() {
        let mut space = space();
        space
            .devices
            .insert("D9".into(), Device::new("D9", "Back door", "DoorProtect"));
        run(
            &mut space,
            json!({ "eventTag": "dooropened", "hubId": "H1", "sourceObjectId": "D9" }),
        );
        assert!(space.devices["D9"].flag("door_opened"));
        run(
            &mut space,
            json!({ "eventTag": "dooropened", "hubId": "H1", "sourceObjectId": "D9", "transition": "RECOVERED" }),
        );
        assert!(!space.devices["D9"].flag("door_opened"));
        assert!(space.devices["D9"].attr("door_opened_at").is_some());
    }

    #[test]
    fn status_events_touch_the_right_field() {
        let mut space = space();
        run(&mut space, json!({ "eventTag": "deviceoffline", "hubId": "H1", "sourceObjectId": "D1" }));
        assert!(!space.devices["D1"].online);
        run(&mut space, json!({ "eventTag": "lowbattery", "hubId": "H1", "sourceObjectId": "D1" }));
        assert!(space.devices["D1"].flag("low_battery"));
        assert!(!space.devices["D1"].online);
        run(&mut space, json!({ "eventTag": "deviceonline", "hubId": "H1", "sourceObjectId": "D1" }));
        assert!(space.devices["D1"].online);
    }

    #[test]
    fn unknown_device_is_ignored() {
        let mut space = space();
        let before = space.clone();
        let out = run(
            &mut space,
            json!({ "eventTag": "motiondetected", "hubId": "H1", "sourceObjectId": "nope" }),
        );
        assert!(!out.mutated);
        assert_eq!(space, before);
    }

    #[test]
    fn doorbell_ring_sets_flag_and_schedules_reset() {
        let mut space = space();
        let out = run(
            &mut space,
            json!({ "eventTag": "doorbellring", "hubId": "H1", "sourceObjectId": "D2" }),
        );
        assert!(space.devices["D2"].flag("doorbell_ring"));
        assert!(space.devices["D2"].attr("last_ring").is_some());
        assert_eq!(
            out.followups,
            vec![Followup::ResetDoorbell {
                device_id: "D2".into()
            }]
        );
        assert!(matches!(out.notifications[0], Notification::DoorbellRing { .. }));

        assert!(reset_doorbell(&mut space, "D2"));
        assert!(!space.devices["D2"].flag("doorbell_ring"));
        space.devices.remove("D2");
        assert!(!reset_doorbell(&mut space, "D2"));
    }

    #[test]
    fn lock_event_auto_creates_lock() {
        let mut space = space();
        let out = run(
            &mut space,
            json!({
                "eventTag": "smartlocklocked",
                "hubId": "H1",
                "eventCode": "M_6C_20",
                "sourceObjectId": "ABCDEF1234",
                "additionalData": { "sourceUserName": "Carol" }
            }),
        );
        let lock = &space.smart_locks["ABCDEF1234"];
        assert_eq!(lock.name, "Smart Lock ABCDEF");
        assert_eq!(lock.is_locked, Some(true));
        assert_eq!(lock.last_changed_by.as_deref(), Some("Carol"));
        assert_eq!(lock.last_event_tag.as_deref(), Some("smartlocklocked"));
        assert!(out.notifications.contains(&Notification::NewSmartLock {
            space_id: "S1".into(),
            lock_id: "ABCDEF1234".into(),
        }));

        // Second event for the same lock does not rediscover it.
        let out = run(
            &mut space,
            json!({ "eventTag": "smartlockdooropened", "hubId": "H1", "eventCode": "m_6c_30", "sourceObjectId": "ABCDEF1234" }),
        );
        assert!(out.notifications.is_empty());
        assert_eq!(space.smart_locks["ABCDEF1234"].is_door_open, Some(true));
        assert_eq!(space.smart_locks["ABCDEF1234"].is_locked, Some(true));
    }

    #[test]
    fn lock_event_without_id_is_dropped() {
        let mut space = space();
        let out = run(
            &mut space,
            json!({ "eventTag": "smartlockunlocked", "hubId": "H1", "sourceObjectName": "Gate" }),
        );
        assert!(!out.mutated);
        assert!(space.smart_locks.is_empty());
    }

    #[test]
    fn lock_found_by_name() {
        let mut space = space();
        space
            .smart_locks
            .insert("L1".into(), SmartLock::new("L1", "Gate", "S1"));
        run(
            &mut space,
            json!({ "eventTag": "smartlockunlocked", "hubId": "H1", "eventCode": "M_6C_21", "sourceObjectName": "Gate" }),
        );
        assert_eq!(space.smart_locks.len(), 1);
        assert_eq!(space.smart_locks["L1"].is_locked, Some(false));
    }

    #[test]
    fn video_detection_on_nvr_channel() {
        let mut space = space();
        let mut channel = VideoChannel::new("ch-2");
        channel.name = Some("Driveway".into());
        space.video_edges.insert(
            "NVR1".into(),
            VideoEdge {
                id: "NVR1".into(),
                name: "Recorder".into(),
                edge_type: VideoEdgeType::Nvr,
                ip: None,
                mac: None,
                channels: vec![VideoChannel::new("ch-1"), channel],
            },
        );

        let out = run(
            &mut space,
            json!({ "eventTag": "videohumandetected", "hubId": "H1", "sourceObjectName": "Driveway" }),
        );
        assert!(space.video_edges["NVR1"].channels[1].is_detecting("VIDEO_HUMAN"));
        assert!(!space.video_edges["NVR1"].channels[0].is_detecting("VIDEO_HUMAN"));
        assert_eq!(
            out.followups,
            vec![Followup::ResetVideoDetection {
                edge_id: "NVR1".into(),
                channel_id: Some("ch-2".into()),
                detection_type: "VIDEO_HUMAN".into(),
            }]
        );

        assert!(reset_video_detection(&mut space, "NVR1", Some("ch-2"), "VIDEO_HUMAN"));
        assert!(!space.video_edges["NVR1"].channels[1].is_detecting("VIDEO_HUMAN"));
        assert!(!reset_video_detection(&mut space, "gone", None, "VIDEO_HUMAN"));
    }

    #[test]
    fn scenario_emits_signal_without_mutation() {
        let mut space = space();
        let out = run(
            &mut space,
            json!({
                "eventTag": "relayonbyscenario",
                "hubId": "H1",
                "sourceObjectName": "Garden light",
                "additionalDataV2": [
                    { "additionalDataV2Type": "INITIATOR_INFO", "objectName": "Button 1", "objectType": "BUTTON" }
                ]
            }),
        );
        assert!(!out.mutated);
        assert_eq!(
            out.notifications,
            vec![Notification::ScenarioTriggered {
                space_id: "S1".into(),
                space_name: "Home".into(),
                scenario_name: "Button 1".into(),
                initiator_type: Some("BUTTON".into()),
                target_name: "Garden light".into(),
                event_tag: "relayonbyscenario".into(),
            }]
        );
    }
}
