// ── Event classification ──

use strum::AsRefStr;

use super::codes::{
    DOOR_TAGS, DOORBELL_TAGS, FLOOD_TAGS, GLASS_TAGS, LOCK_TAGS, MOTION_TAGS, RELAY_TAGS,
    SCENARIO_TAGS, SECURITY_TAGS, SMOKE_TAGS, STATUS_TAGS, TAMPER_TAGS, VIDEO_EVENT_TYPES,
    VIDEO_TAGS, is_group_security_tag, lookup,
};
use super::ingest::Transition;
use crate::model::SecurityState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmokeKind {
    Smoke,
    Temperature,
    CarbonMonoxide,
}

impl SmokeKind {
    /// Device attribute the condition is written to.
    pub fn attribute(self) -> &'static str {
        match self {
            Self::Smoke => "smoke_detected",
            Self::Temperature => "temperature_alert",
            Self::CarbonMonoxide => "co_detected",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Connectivity,
    Battery,
    ExternalPower,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockEventKind {
    /// Bolt locked/unlocked.
    Bolt,
    /// Door contact of the lock.
    Door,
}

/// Semantic category of a push event, with the value its handler applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum EventClass {
    Security { target: SecurityState, group: bool },
    Door { opened: bool },
    Motion { detected: bool },
    Smoke { kind: SmokeKind, active: bool },
    Flood { leak: bool },
    GlassBreak { detected: bool },
    Tamper { tampered: bool },
    DeviceStatus { kind: StatusKind, problem: bool },
    Relay { on: bool },
    Scenario,
    Video { detection: &'static str },
    Doorbell,
    Lock { kind: LockEventKind },
    Unhandled,
}

impl EventClass {
    pub fn category(&self) -> &str {
        self.as_ref()
    }
}

/// Classify a lower-cased tag.
///
/// Tables are consulted in dispatch order and the first hit wins. For
/// door and tamper events an explicit transition overrides the table's
/// default; `eventTypeV2` is only consulted for video detections.
pub fn classify(tag: &str, transition: Option<Transition>, event_type_v2: &str) -> EventClass {
    let refine = |default: bool| match transition {
        Some(Transition::Triggered) => true,
        Some(Transition::Recovered) => false,
        None => default,
    };

    if let Some(target) = lookup(SECURITY_TAGS, tag) {
        return EventClass::Security {
            target,
            group: is_group_security_tag(tag),
        };
    }
    if let Some(opened) = lookup(DOOR_TAGS, tag) {
        return EventClass::Door {
            opened: refine(opened),
        };
    }
    if let Some(detected) = lookup(MOTION_TAGS, tag) {
        return EventClass::Motion { detected };
    }
    if let Some((_, kind, active)) = SMOKE_TAGS.iter().find(|(t, _, _)| *t == tag) {
        return EventClass::Smoke {
            kind: *kind,
            active: *active,
        };
    }
    if let Some(leak) = lookup(FLOOD_TAGS, tag) {
        return EventClass::Flood { leak };
    }
    if let Some(detected) = lookup(GLASS_TAGS, tag) {
        return EventClass::GlassBreak { detected };
    }
    if let Some(tampered) = lookup(TAMPER_TAGS, tag) {
        return EventClass::Tamper {
            tampered: refine(tampered),
        };
    }
    if let Some((_, kind, problem)) = STATUS_TAGS.iter().find(|(t, _, _)| *t == tag) {
        return EventClass::DeviceStatus {
            kind: *kind,
            problem: *problem,
        };
    }
    if let Some(on) = lookup(RELAY_TAGS, tag) {
        return EventClass::Relay { on };
    }
    if SCENARIO_TAGS.contains(&tag) {
        return EventClass::Scenario;
    }
    if let Some(detection) =
        lookup(VIDEO_TAGS, tag).or_else(|| lookup(VIDEO_EVENT_TYPES, event_type_v2))
    {
        return EventClass::Video { detection };
    }
    if DOORBELL_TAGS.contains(&tag) {
        return EventClass::Doorbell;
    }
    if let Some(kind) = lookup(LOCK_TAGS, tag) {
        return EventClass::Lock { kind };
    }
    EventClass::Unhandled
}
