// ── Space domain types ──

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use super::{Device, SmartLock, VideoEdge};

/// Security state of a space.
///
/// `Triggered` supersedes the armed/disarmed distinction until the next
/// arm/disarm event or refresh replaces it.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SecurityState {
    Disarmed,
    Armed,
    NightMode,
    PartiallyArmed,
    Triggered,
}

impl SecurityState {
    /// Whether intrusion-class detections escalate to `Triggered`.
    pub fn is_armed(self) -> bool {
        matches!(self, Self::Armed | Self::NightMode | Self::PartiallyArmed)
    }

    /// Parse the cloud's upper-case state names.
    pub fn from_wire(value: &str) -> Option<Self> {
        match value.to_ascii_uppercase().as_str() {
            "DISARMED" | "DISARMED_NIGHT_MODE_OFF" => Some(Self::Disarmed),
            "ARMED" | "ARMED_NIGHT_MODE_OFF" => Some(Self::Armed),
            "NIGHT_MODE" | "DISARMED_NIGHT_MODE_ON" | "ARMED_NIGHT_MODE_ON" => {
                Some(Self::NightMode)
            }
            "PARTIALLY_ARMED" | "PARTIALLY_ARMED_NIGHT_MODE_OFF"
            | "PARTIALLY_ARMED_NIGHT_MODE_ON" => Some(Self::PartiallyArmed),
            "TRIGGERED" | "ALARM" => Some(Self::Triggered),
            _ => None,
        }
    }
}

/// An independently armable zone of a space.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: String,
    pub name: String,
    pub security_state: SecurityState,
}

/// A site bound to one hub.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Space {
    pub id: String,
    pub name: String,
    pub hub_id: String,
    pub security_state: SecurityState,
    pub devices: BTreeMap<String, Device>,
    pub smart_locks: BTreeMap<String, SmartLock>,
    pub video_edges: BTreeMap<String, VideoEdge>,
    pub groups: BTreeMap<String, Group>,
}

impl Space {
    pub fn new(id: impl Into<String>, name: impl Into<String>, hub_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            hub_id: hub_id.into(),
            security_state: SecurityState::Disarmed,
            devices: BTreeMap::new(),
            smart_locks: BTreeMap::new(),
            video_edges: BTreeMap::new(),
            groups: BTreeMap::new(),
        }
    }

    /// Resolve the device an event refers to.
    ///
    /// Exact id first. An 8-character id that misses is tried as the suffix
    /// of a 16-character id (wired inputs report the short form). Then an
    /// exact name match.
    pub fn find_device_mut(&mut self, source_id: &str, source_name: &str) -> Option<&mut Device> {
        let key = self.resolve_device_key(source_id, source_name)?;
        self.devices.get_mut(&key)
    }

    fn resolve_device_key(&self, source_id: &str, source_name: &str) -> Option<String> {
        if !source_id.is_empty() {
            if self.devices.contains_key(source_id) {
                return Some(source_id.to_owned());
            }
            if source_id.len() == 8 {
                if let Some(device) = self
                    .devices
                    .values()
                    .find(|d| d.id.len() == 16 && d.id.ends_with(source_id))
                {
                    tracing::debug!(device = %device.name, suffix = source_id, "matched device by id suffix");
                    return Some(device.id.clone());
                }
            }
        }

        if source_name.is_empty() {
            return None;
        }
        self.devices
            .values()
            .find(|d| d.name == source_name)
            .map(|d| d.id.clone())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn space_with(ids: &[(&str, &str)]) -> Space {
        let mut space = Space::new("S1", "Home", "H1");
        for (id, name) in ids {
            space
                .devices
                .insert((*id).to_owned(), Device::new(*id, *name, "DoorProtect"));
        }
        space
    }

    #[test]
    fn security_state_round_trips_snake_case() {
        assert_eq!(SecurityState::NightMode.to_string(), "night_mode");
        assert_eq!(
            serde_json::to_value(SecurityState::PartiallyArmed).unwrap(),
            "partially_armed"
        );
        assert_eq!("armed".parse::<SecurityState>().unwrap(), SecurityState::Armed);
    }

    #[test]
    fn wire_states_parse() {
        assert_eq!(SecurityState::from_wire("ARMED"), Some(SecurityState::Armed));
        assert_eq!(
            SecurityState::from_wire("disarmed_night_mode_on"),
            Some(SecurityState::NightMode)
        );
        assert_eq!(SecurityState::from_wire("SOMETHING"), None);
    }

    #[test]
    fn only_armed_states_are_armed() {
        assert!(SecurityState::PartiallyArmed.is_armed());
        assert!(!SecurityState::Disarmed.is_armed());
        assert!(!SecurityState::Triggered.is_armed());
    }

    #[test]
    fn find_device_prefers_exact_id() {
        let mut space = space_with(&[("D1", "Hall"), ("D2", "D1")]);
        assert_eq!(space.find_device_mut("D1", "D1").unwrap().name, "Hall");
    }

    #[test]
    fn find_device_matches_wired_input_suffix() {
        let mut space = space_with(&[("00AA11BB22CC33DD", "Zone 3")]);
        let device = space.find_device_mut("22CC33DD", "").unwrap();
        assert_eq!(device.id, "00AA11BB22CC33DD");
    }

    #[test]
    fn suffix_match_requires_eight_characters() {
        let mut space = space_with(&[("00AA11BB22CC33DD", "Zone 3")]);
        assert!(space.find_device_mut("C33DD", "").is_none());
    }

    #[test]
    fn find_device_falls_back_to_name() {
        let mut space = space_with(&[("D1", "Hall")]);
        assert_eq!(space.find_device_mut("unknown", "Hall").unwrap().id, "D1");
        assert!(space.find_device_mut("", "").is_none());
    }
}
