// ── Event tag and code tables ──
//
// Tags are matched lower-cased. Each table maps a tag onto the value its
// handler needs; the classifier walks them in dispatch order and the
// tables are disjoint.

use super::classify::{LockEventKind, SmokeKind, StatusKind};
use crate::model::SecurityState;

pub(crate) const SECURITY_TAGS: &[(&str, SecurityState)] = &[
    ("arm", SecurityState::Armed),
    ("armwithmalfunctions", SecurityState::Armed),
    ("disarm", SecurityState::Disarmed),
    ("nightmodeon", SecurityState::NightMode),
    ("nightmodeonwithmalfunctions", SecurityState::NightMode),
    ("nightmodeoff", SecurityState::Disarmed),
    ("grouparm", SecurityState::PartiallyArmed),
    ("groupdisarm", SecurityState::Disarmed),
];

const GROUP_SECURITY_TAGS: &[&str] = &["grouparm", "groupdisarm"];

/// Security tags whose composite effect is only known after a refresh.
const REFRESHING_SECURITY_TAGS: &[&str] = &["arm", "disarm", "grouparm", "groupdisarm"];

/// `(tag, opened)`
pub(super) const DOOR_TAGS: &[(&str, bool)] = &[
    ("dooropened", true),
    ("doorclosed", false),
    ("extcontactopened", true),
    ("extcontactclosed", false),
];

pub(super) const MOTION_TAGS: &[(&str, bool)] = &[
    ("motiondetected", true),
    ("motionrecovered", false),
];

pub(super) const SMOKE_TAGS: &[(&str, SmokeKind, bool)] = &[
    ("smokedetected", SmokeKind::Smoke, true),
    ("smokerecovered", SmokeKind::Smoke, false),
    ("hightemperature", SmokeKind::Temperature, true),
    ("temperaturerecovered", SmokeKind::Temperature, false),
    ("codetected", SmokeKind::CarbonMonoxide, true),
    ("corecovered", SmokeKind::CarbonMonoxide, false),
];

pub(super) const FLOOD_TAGS: &[(&str, bool)] = &[
    ("leakdetected", true),
    ("leakrecovered", false),
];

pub(super) const GLASS_TAGS: &[(&str, bool)] = &[
    ("glassbreakdetected", true),
    ("glassbreakrecovered", false),
];

pub(super) const TAMPER_TAGS: &[(&str, bool)] = &[
    ("tampered", true),
    ("tamperopened", true),
    ("tamperclosed", false),
    ("lidopened", true),
    ("lidclosed", false),
];

/// `(tag, kind, is_problem)`
pub(super) const STATUS_TAGS: &[(&str, StatusKind, bool)] = &[
    ("deviceonline", StatusKind::Connectivity, false),
    ("deviceoffline", StatusKind::Connectivity, true),
    ("lowbattery", StatusKind::Battery, true),
    ("batterycharged", StatusKind::Battery, false),
    ("externalpowerlost", StatusKind::ExternalPower, true),
    ("externalpowerrestored", StatusKind::ExternalPower, false),
];

/// `(tag, on)`
pub(super) const RELAY_TAGS: &[(&str, bool)] = &[
    ("relayon", true),
    ("relayoff", false),
    ("socketon", true),
    ("socketoff", false),
    ("wallswitchon", true),
    ("wallswitchoff", false),
    ("lightswitchon", true),
    ("lightswitchoff", false),
];

pub(super) const SCENARIO_TAGS: &[&str] = &[
    "relayonbyscenario",
    "relayoffbyscenario",
    "socketonbyscenario",
    "socketoffbyscenario",
    "wallswitchonbyscenario",
    "wallswitchoffbyscenario",
    "lightswitchonbyscenario",
    "lightswitchoffbyscenario",
    "scenarioexecuted",
];

/// `(tag, detection type)`
pub(super) const VIDEO_TAGS: &[(&str, &str)] = &[
    ("videomotiondetected", "VIDEO_MOTION"),
    ("videohumandetected", "VIDEO_HUMAN"),
    ("videovehicledetected", "VIDEO_CAR"),
    ("videopetdetected", "VIDEO_PET"),
];

/// `(eventTypeV2, detection type)`
pub(super) const VIDEO_EVENT_TYPES: &[(&str, &str)] = &[
    ("VIDEO_MOTION", "VIDEO_MOTION"),
    ("VIDEO_HUMAN", "VIDEO_HUMAN"),
    ("VIDEO_CAR", "VIDEO_CAR"),
    ("VIDEO_VEHICLE", "VIDEO_CAR"),
    ("VIDEO_PET", "VIDEO_PET"),
];

pub(super) const DOORBELL_TAGS: &[&str] = &["doorbellring", "doorbellpressed"];

pub(super) const LOCK_TAGS: &[(&str, LockEventKind)] = &[
    ("smartlocklocked", LockEventKind::Bolt),
    ("smartlockunlocked", LockEventKind::Bolt),
    ("smartlockautolocked", LockEventKind::Bolt),
    ("smartlockjammed", LockEventKind::Bolt),
    ("smartlockdooropened", LockEventKind::Door),
    ("smartlockdoorclosed", LockEventKind::Door),
];

/// Upper-cased lock event code → locked. Code parity is not reliable
/// for locks, so every known code is listed.
const LOCK_CODE_STATES: &[(&str, bool)] = &[
    ("M_6C_20", true),
    ("M_6C_21", false),
    ("M_6C_22", true),
    ("M_6C_23", false),
    ("M_6C_24", true),
    ("M_6C_27", false),
];

/// Upper-cased lock door code → door open.
const LOCK_DOOR_CODE_STATES: &[(&str, bool)] = &[
    ("M_6C_30", true),
    ("M_6C_31", false),
];

pub(super) fn lookup<T: Copy>(table: &[(&str, T)], key: &str) -> Option<T> {
    table.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
}

pub fn is_group_security_tag(tag: &str) -> bool {
    GROUP_SECURITY_TAGS.contains(&tag)
}

/// Whether a security tag is followed by a metadata refresh.
pub fn refreshes_after_security(tag: &str) -> bool {
    REFRESHING_SECURITY_TAGS.contains(&tag)
}

pub fn lock_state_for_code(code: &str) -> Option<bool> {
    lookup(LOCK_CODE_STATES, &code.to_ascii_uppercase())
}

pub fn door_state_for_code(code: &str) -> Option<bool> {
    lookup(LOCK_DOOR_CODE_STATES, &code.to_ascii_uppercase())
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn tag_tables_are_disjoint() {
        let mut seen = HashSet::new();
        let all = SECURITY_TAGS
            .iter()
            .map(|(t, _)| *t)
            .chain(DOOR_TAGS.iter().map(|(t, _)| *t))
            .chain(MOTION_TAGS.iter().map(|(t, _)| *t))
            .chain(SMOKE_TAGS.iter().map(|(t, _, _)| *t))
            .chain(FLOOD_TAGS.iter().map(|(t, _)| *t))
            .chain(GLASS_TAGS.iter().map(|(t, _)| *t))
            .chain(TAMPER_TAGS.iter().map(|(t, _)| *t))
            .chain(STATUS_TAGS.iter().map(|(t, _, _)| *t))
            .chain(RELAY_TAGS.iter().map(|(t, _)| *t))
            .chain(SCENARIO_TAGS.iter().copied())
            .chain(VIDEO_TAGS.iter().map(|(t, _)| *t))
            .chain(DOORBELL_TAGS.iter().copied())
            .chain(LOCK_TAGS.iter().map(|(t, _)| *t));
        for tag in all {
            assert!(seen.insert(tag), "tag {tag} appears in more than one table");
            assert_eq!(tag, tag.to_ascii_lowercase(), "tag {tag} must be lower-case");
        }
    }

    #[test]
    fn lock_codes_are_case_insensitive() {
        assert_eq!(lock_state_for_code("m_6c_20"), Some(true));
        assert_eq!(lock_state_for_code("M_6C_21"), Some(false));
        assert_eq!(door_state_for_code("M_6C_30"), Some(true));
        assert_eq!(lock_state_for_code("M_6C_30"), None);
    }

    #[test]
    fn refresh_follows_full_and_group_arming_only() {
        assert!(refreshes_after_security("arm"));
        assert!(refreshes_after_security("groupdisarm"));
        assert!(!refreshes_after_security("nightmodeon"));
    }
}
