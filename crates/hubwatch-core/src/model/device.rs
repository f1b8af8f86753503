// ── Device domain types ──

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::{AsRefStr, Display};

/// Semantic device family, normalized from the vendor model name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
#[non_exhaustive]
pub enum DeviceType {
    DoorContact,
    WireInput,
    MotionDetector,
    CombiProtect,
    SmokeDetector,
    FloodDetector,
    GlassBreak,
    Siren,
    Keypad,
    Button,
    Transmitter,
    Relay,
    Socket,
    WallSwitch,
    LightSwitch,
    WaterStop,
    Doorbell,
    Other,
}

impl DeviceType {
    /// Map a vendor model name (`DoorProtectPlus`, `LightSwitchTwoGang`, ...)
    /// onto a family. Order matters: `CombiProtect` contains `Protect`,
    /// `LightSwitch` would otherwise look like `WallSwitch`.
    pub fn from_raw(raw: &str) -> Self {
        let t = raw.to_ascii_lowercase().replace(['_', ' '], "");
        let has = |needle: &str| t.contains(needle);

        if has("combiprotect") {
            Self::CombiProtect
        } else if has("doorprotect") || has("doorcontact") {
            Self::DoorContact
        } else if has("multitransmitter") || has("wireinput") {
            Self::WireInput
        } else if has("transmitter") {
            Self::Transmitter
        } else if has("motionprotect") || has("motioncam") || has("curtain") || has("dualcurtain")
        {
            Self::MotionDetector
        } else if has("fireprotect") || has("smoke") {
            Self::SmokeDetector
        } else if has("leaksprotect") || has("flood") {
            Self::FloodDetector
        } else if has("glassprotect") {
            Self::GlassBreak
        } else if has("siren") || has("speakerphone") {
            Self::Siren
        } else if has("keypad") {
            Self::Keypad
        } else if has("button") || has("spacecontrol") {
            Self::Button
        } else if has("lightswitch") {
            Self::LightSwitch
        } else if has("wallswitch") {
            Self::WallSwitch
        } else if has("socket") {
            Self::Socket
        } else if has("relay") {
            Self::Relay
        } else if has("waterstop") {
            Self::WaterStop
        } else if has("doorbell") {
            Self::Doorbell
        } else {
            Self::Other
        }
    }

    /// Families switched through the `/command` endpoint.
    pub fn is_switchable(self) -> bool {
        matches!(
            self,
            Self::Relay | Self::Socket | Self::WallSwitch | Self::LightSwitch
        )
    }
}

/// A hub-bound device. Model-specific state lives in `attributes`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub id: String,
    pub name: String,
    pub device_type: DeviceType,
    /// Exact vendor model name, needed by the command endpoint.
    pub raw_type: String,
    pub online: bool,
    pub battery_level: Option<u8>,
    pub signal_strength: Option<String>,
    pub firmware_version: Option<String>,
    pub room_id: Option<String>,
    pub group_id: Option<String>,
    pub attributes: Map<String, Value>,
}

impl Device {
    pub fn new(id: impl Into<String>, name: impl Into<String>, raw_type: impl Into<String>) -> Self {
        let raw_type = raw_type.into();
        Self {
            id: id.into(),
            name: name.into(),
            device_type: DeviceType::from_raw(&raw_type),
            raw_type,
            online: true,
            battery_level: None,
            signal_strength: None,
            firmware_version: None,
            room_id: None,
            group_id: None,
            attributes: Map::new(),
        }
    }

    pub fn attr(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// Boolean attribute, `false` when absent or not a boolean.
    pub fn flag(&self, key: &str) -> bool {
        self.attributes.get(key).and_then(Value::as_bool).unwrap_or(false)
    }

    pub fn set_attr(&mut self, key: &str, value: impl Into<Value>) {
        self.attributes.insert(key.to_owned(), value.into());
    }

    /// `LightSwitchDimmer` and kin. The family alone does not tell dimmers
    /// apart from plain wall switches.
    pub fn is_dimmer(&self) -> bool {
        self.device_type.is_switchable() && self.raw_type.to_ascii_lowercase().contains("dimmer")
    }
}
