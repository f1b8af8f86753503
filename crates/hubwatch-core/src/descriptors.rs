// ── Entity descriptor tables ──
//
// Per-device-family tables describing which sensors, switches, numbers and
// selects a device exposes. Entries are plain data plus named accessor
// functions; nothing here captures device state.

use serde_json::Value;

use crate::model::{Device, DeviceType};

// ── Value types ──────────────────────────────────────────────────────

/// A literal value as the API expects it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiValue {
    Bool(bool),
    Int(i64),
    Str(&'static str),
}

impl ApiValue {
    pub fn to_json(self) -> Value {
        match self {
            Self::Bool(b) => Value::Bool(b),
            Self::Int(i) => Value::from(i),
            Self::Str(s) => Value::from(s),
        }
    }

    /// Whether `value` (as stored on the device) equals this literal.
    /// String comparison ignores case.
    pub fn matches(self, value: &Value) -> bool {
        match (self, value) {
            (Self::Bool(a), Value::Bool(b)) => a == *b,
            (Self::Int(a), Value::Number(n)) => n.as_i64() == Some(a),
            (Self::Str(a), Value::String(b)) => a.eq_ignore_ascii_case(b),
            _ => false,
        }
    }
}

const ON: ApiValue = ApiValue::Bool(true);
const OFF: ApiValue = ApiValue::Bool(false);

// ── Binary sensors ───────────────────────────────────────────────────

pub struct BinarySensorDescriptor {
    pub key: &'static str,
    pub device_class: &'static str,
    pub value: fn(&Device) -> Option<bool>,
}

fn attr_bool(device: &Device, key: &str) -> Option<bool> {
    device.attr(key).and_then(Value::as_bool)
}

#[allow(clippy::unnecessary_wraps)]
fn online(d: &Device) -> Option<bool> {
    Some(d.online)
}
fn low_battery(d: &Device) -> Option<bool> {
    attr_bool(d, "low_battery")
}
fn external_power_lost(d: &Device) -> Option<bool> {
    attr_bool(d, "external_power_lost")
}
fn tampered(d: &Device) -> Option<bool> {
    attr_bool(d, "tampered")
}
fn door_opened(d: &Device) -> Option<bool> {
    attr_bool(d, "door_opened")
}
fn motion_detected(d: &Device) -> Option<bool> {
    attr_bool(d, "motion_detected")
}
fn glass_break_detected(d: &Device) -> Option<bool> {
    attr_bool(d, "glass_break_detected")
}
fn smoke_detected(d: &Device) -> Option<bool> {
    attr_bool(d, "smoke_detected")
}
fn co_detected(d: &Device) -> Option<bool> {
    attr_bool(d, "co_detected")
}
fn temperature_alert(d: &Device) -> Option<bool> {
    attr_bool(d, "temperature_alert")
}
fn leak_detected(d: &Device) -> Option<bool> {
    attr_bool(d, "leak_detected")
}
fn doorbell_ring(d: &Device) -> Option<bool> {
    attr_bool(d, "doorbell_ring")
}
fn relay_on(d: &Device) -> Option<bool> {
    attr_bool(d, "is_on")
}
fn valve_open(d: &Device) -> Option<bool> {
    d.attr("valveState")
        .and_then(Value::as_str)
        .map(|s| s.eq_ignore_ascii_case("OPEN"))
}

const COMMON_SENSORS: &[BinarySensorDescriptor] = &[
    BinarySensorDescriptor { key: "connectivity", device_class: "connectivity", value: online },
    BinarySensorDescriptor { key: "battery_low", device_class: "battery", value: low_battery },
];

const TAMPER: BinarySensorDescriptor =
    BinarySensorDescriptor { key: "tamper", device_class: "tamper", value: tampered };

const DOOR_SENSORS: &[BinarySensorDescriptor] = &[
    BinarySensorDescriptor { key: "door", device_class: "door", value: door_opened },
    TAMPER,
];
const MOTION_SENSORS: &[BinarySensorDescriptor] = &[
    BinarySensorDescriptor { key: "motion", device_class: "motion", value: motion_detected },
    TAMPER,
];
const COMBI_SENSORS: &[BinarySensorDescriptor] = &[
    BinarySensorDescriptor { key: "motion", device_class: "motion", value: motion_detected },
    BinarySensorDescriptor { key: "glass_break", device_class: "safety", value: glass_break_detected },
    TAMPER,
];
const GLASS_SENSORS: &[BinarySensorDescriptor] = &[
    BinarySensorDescriptor { key: "glass_break", device_class: "safety", value: glass_break_detected },
    TAMPER,
];
const SMOKE_SENSORS: &[BinarySensorDescriptor] = &[
    BinarySensorDescriptor { key: "smoke", device_class: "smoke", value: smoke_detected },
    BinarySensorDescriptor { key: "co", device_class: "carbon_monoxide", value: co_detected },
    BinarySensorDescriptor { key: "high_temperature", device_class: "heat", value: temperature_alert },
    TAMPER,
];
const FLOOD_SENSORS: &[BinarySensorDescriptor] = &[
    BinarySensorDescriptor { key: "moisture", device_class: "moisture", value: leak_detected },
    TAMPER,
];
const DOORBELL_SENSORS: &[BinarySensorDescriptor] = &[
    BinarySensorDescriptor { key: "doorbell_ring", device_class: "occupancy", value: doorbell_ring },
    TAMPER,
];
const SIREN_SENSORS: &[BinarySensorDescriptor] = &[
    TAMPER,
    BinarySensorDescriptor { key: "external_power_lost", device_class: "problem", value: external_power_lost },
];
const RELAY_SENSORS: &[BinarySensorDescriptor] = &[
    BinarySensorDescriptor { key: "power", device_class: "power", value: relay_on },
    BinarySensorDescriptor { key: "external_power_lost", device_class: "problem", value: external_power_lost },
];
const VALVE_SENSORS: &[BinarySensorDescriptor] = &[
    BinarySensorDescriptor { key: "valve_open", device_class: "opening", value: valve_open },
];

/// Sensors shown for every device, then those of its family.
pub fn binary_sensors(device_type: DeviceType) -> impl Iterator<Item = &'static BinarySensorDescriptor> {
    let family: &'static [BinarySensorDescriptor] = match device_type {
        DeviceType::DoorContact | DeviceType::WireInput | DeviceType::Transmitter => DOOR_SENSORS,
        DeviceType::MotionDetector => MOTION_SENSORS,
        DeviceType::CombiProtect => COMBI_SENSORS,
        DeviceType::GlassBreak => GLASS_SENSORS,
        DeviceType::SmokeDetector => SMOKE_SENSORS,
        DeviceType::FloodDetector => FLOOD_SENSORS,
        DeviceType::Doorbell => DOORBELL_SENSORS,
        DeviceType::Siren => SIREN_SENSORS,
        DeviceType::Relay | DeviceType::Socket | DeviceType::WallSwitch | DeviceType::LightSwitch => {
            RELAY_SENSORS
        }
        DeviceType::WaterStop => VALVE_SENSORS,
        _ => &[],
    };
    COMMON_SENSORS.iter().chain(family)
}

// ── Switches ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchWrite {
    /// `{api_key: on|off}`, or `{nested: {api_key: on|off}}`.
    Field {
        api_key: &'static str,
        on: ApiValue,
        off: ApiValue,
        nested: Option<&'static str>,
    },
    /// Membership of `member` in the list attribute `list_key`.
    ListMember {
        list_key: &'static str,
        member: &'static str,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwitchDescriptor {
    pub key: &'static str,
    pub write: SwitchWrite,
    /// Pure device configuration: allowed while the system is armed.
    pub bypass_security: bool,
}

impl SwitchDescriptor {
    pub fn requires_disarm(&self) -> bool {
        !self.bypass_security
    }

    /// Current switch position as read from the device.
    pub fn is_on(&self, device: &Device) -> Option<bool> {
        match self.write {
            SwitchWrite::Field { api_key, on, nested, .. } => {
                read_field(device, nested, api_key).map(|v| on.matches(v))
            }
            SwitchWrite::ListMember { list_key, member } => device
                .attr(list_key)
                .and_then(Value::as_array)
                .map(|list| list.iter().any(|m| m.as_str() == Some(member))),
        }
    }
}

const fn field(key: &'static str, api_key: &'static str, bypass_security: bool) -> SwitchDescriptor {
    SwitchDescriptor {
        key,
        write: SwitchWrite::Field { api_key, on: ON, off: OFF, nested: None },
        bypass_security,
    }
}

const fn field_str(
    key: &'static str,
    api_key: &'static str,
    on: &'static str,
    off: &'static str,
    bypass_security: bool,
) -> SwitchDescriptor {
    SwitchDescriptor {
        key,
        write: SwitchWrite::Field {
            api_key,
            on: ApiValue::Str(on),
            off: ApiValue::Str(off),
            nested: None,
        },
        bypass_security,
    }
}

const fn member(key: &'static str, list_key: &'static str, member: &'static str, bypass_security: bool) -> SwitchDescriptor {
    SwitchDescriptor {
        key,
        write: SwitchWrite::ListMember { list_key, member },
        bypass_security,
    }
}

pub const SETTINGS_SWITCH: &str = "settingsSwitch";
pub const SIREN_TRIGGERS: &str = "sirenTriggers";

const DETECTOR_SWITCHES: &[SwitchDescriptor] = &[
    field("always_active", "alwaysActive", false),
    field_str("indicator_light", "indicatorLightMode", "STANDARD", "DONT_BLINK_ON_ALARM", false),
    field("night_mode", "nightModeArm", false),
];
const DOOR_SWITCHES: &[SwitchDescriptor] = &[
    field("always_active", "alwaysActive", false),
    field("night_mode", "nightModeArm", false),
    field("extra_contact", "extraContactAware", false),
];
const FLOOD_SWITCHES: &[SwitchDescriptor] = &[
    field("always_active", "alwaysActive", false),
    field_str("indicator_light", "indicatorLightMode", "STANDARD", "DONT_BLINK_ON_ALARM", false),
    member("siren_on_leak", SIREN_TRIGGERS, "LEAK", false),
];
const SMOKE_SWITCHES: &[SwitchDescriptor] = &[
    field_str("indicator_light", "indicatorLightMode", "STANDARD", "DONT_BLINK_ON_ALARM", false),
    field_str("co_alarm_enabled", "coAlarmEnable", "CO_ALARM_ENABLED", "CO_ALARM_DISABLED", true),
    field_str("temp_alarm_enabled", "tempAlarmEnable", "TEMP_ALARM_ENABLED", "TEMP_ALARM_DISABLED", true),
    field_str(
        "temp_diff_alarm_enabled",
        "tempDiffAlarmEnable",
        "TEMP_DIFF_ALARM_ENABLED",
        "TEMP_DIFF_ALARM_DISABLED",
        true,
    ),
    member("siren_trigger_smoke", SIREN_TRIGGERS, "SMOKE", true),
    member("siren_trigger_co", SIREN_TRIGGERS, "CO", true),
    member("siren_trigger_temperature", SIREN_TRIGGERS, "TEMPERATURE", true),
    member("siren_trigger_temp_diff", SIREN_TRIGGERS, "TEMPERATURE_DIFF", true),
];
const SIREN_SWITCHES: &[SwitchDescriptor] = &[
    field("night_mode", "nightModeArm", false),
    field("beep_on_arm_disarm", "beepOnArmDisarm", false),
    field("beep_on_delay", "beepOnDelay", false),
    field_str("blink_while_armed", "v2sirenIndicatorLightMode", "BLINK_WHILE_ARMED", "DISABLED", false),
    field("chimes", "chimesEnabled", false),
    field("alert_if_moved", "alertIfMoved", false),
];
const SOCKET_SWITCHES: &[SwitchDescriptor] = &[
    field("indication_enabled", "indicationEnabled", true),
    field("current_protection", "currentProtectionEnabled", true),
    field("voltage_protection", "voltageProtectionEnabled", true),
];
const LIGHT_SWITCHES: &[SwitchDescriptor] = &[
    member("led_indicator", SETTINGS_SWITCH, "LED_INDICATOR_ENABLED", true),
    member("child_lock", SETTINGS_SWITCH, "CHILD_LOCK_ENABLED", true),
    member("state_memory", SETTINGS_SWITCH, "STATE_MEMORY_ENABLED", true),
    member("current_threshold", SETTINGS_SWITCH, "CURRENT_THRESHOLD_ENABLED", true),
    field("night_mode", "nightModeArm", true),
    SwitchDescriptor {
        key: "dimmer_calibration",
        write: SwitchWrite::Field {
            api_key: "calibration",
            on: ApiValue::Str("ENABLED"),
            off: ApiValue::Str("DISABLED"),
            nested: Some("dimmerSettings"),
        },
        bypass_security: true,
    },
];

pub fn switches(device_type: DeviceType) -> &'static [SwitchDescriptor] {
    match device_type {
        DeviceType::MotionDetector | DeviceType::CombiProtect | DeviceType::GlassBreak => {
            DETECTOR_SWITCHES
        }
        DeviceType::DoorContact => DOOR_SWITCHES,
        DeviceType::FloodDetector => FLOOD_SWITCHES,
        DeviceType::SmokeDetector => SMOKE_SWITCHES,
        DeviceType::Siren => SIREN_SWITCHES,
        DeviceType::Socket => SOCKET_SWITCHES,
        DeviceType::WallSwitch | DeviceType::LightSwitch => LIGHT_SWITCHES,
        _ => &[],
    }
}

pub fn switch(device_type: DeviceType, key: &str) -> Option<&'static SwitchDescriptor> {
    switches(device_type).iter().find(|s| s.key == key)
}

/// Descriptor for a raw list toggle, if one is declared.
pub fn list_member(device_type: DeviceType, list_key: &str, value: &str) -> Option<&'static SwitchDescriptor> {
    switches(device_type).iter().find(|s| {
        matches!(s.write, SwitchWrite::ListMember { list_key: l, member: m } if l == list_key && m == value)
    })
}

// ── Numbers ──────────────────────────────────────────────────────────

pub struct NumberDescriptor {
    pub key: &'static str,
    /// Field written to the API.
    pub api_key: &'static str,
    /// Field the current value is read from.
    pub attr_key: &'static str,
    pub min: i64,
    pub max: i64,
    pub step: i64,
    pub requires_disarm: bool,
    pub applies: fn(&Device) -> bool,
}

impl NumberDescriptor {
    pub fn accepts(&self, value: i64) -> bool {
        (self.min..=self.max).contains(&value) && (value - self.min) % self.step == 0
    }

    pub fn current(&self, device: &Device) -> Option<i64> {
        device.attr(self.attr_key).and_then(Value::as_i64)
    }
}

fn always(_: &Device) -> bool {
    true
}
fn is_door_plus(d: &Device) -> bool {
    d.raw_type.starts_with("DoorProtectPlus")
}
fn numeric_brightness(d: &Device) -> bool {
    d.attr("indicationBrightness").is_some_and(Value::is_number)
}
fn named_brightness(d: &Device) -> bool {
    d.attr("indicationBrightness")
        .and_then(Value::as_str)
        .is_some_and(|s| s.eq_ignore_ascii_case("MIN") || s.eq_ignore_ascii_case("MAX"))
}
fn has_indication_mode(d: &Device) -> bool {
    d.attr("indicationMode").is_some()
}

const DOOR_NUMBERS: &[NumberDescriptor] = &[NumberDescriptor {
    key: "tilt_degrees",
    api_key: "accelerometerTiltDegrees",
    attr_key: "accelerometerTiltDegrees",
    min: 5,
    max: 25,
    step: 5,
    requires_disarm: true,
    applies: is_door_plus,
}];
const SOCKET_NUMBERS: &[NumberDescriptor] = &[
    NumberDescriptor {
        key: "current_threshold",
        api_key: "currentThresholdAmpere",
        attr_key: "currentThresholdAmpere",
        min: 1,
        max: 16,
        step: 1,
        requires_disarm: false,
        applies: always,
    },
    NumberDescriptor {
        key: "indication_brightness",
        api_key: "indicationBrightnessV2",
        attr_key: "indicationBrightness",
        min: 1,
        max: 8,
        step: 1,
        requires_disarm: false,
        applies: numeric_brightness,
    },
];

pub fn numbers(device_type: DeviceType) -> &'static [NumberDescriptor] {
    match device_type {
        DeviceType::DoorContact => DOOR_NUMBERS,
        DeviceType::Socket | DeviceType::Relay => SOCKET_NUMBERS,
        _ => &[],
    }
}

/// Number `key` if the device exposes it.
pub fn number(device: &Device, key: &str) -> Option<&'static NumberDescriptor> {
    numbers(device.device_type)
        .iter()
        .find(|n| n.key == key && (n.applies)(device))
}

// ── Selects ──────────────────────────────────────────────────────────

pub struct SelectDescriptor {
    pub key: &'static str,
    pub api_key: &'static str,
    /// (option label, API value)
    pub options: &'static [(&'static str, ApiValue)],
    pub requires_disarm: bool,
    pub applies: fn(&Device) -> bool,
}

impl SelectDescriptor {
    pub fn api_value(&self, option: &str) -> Option<ApiValue> {
        self.options
            .iter()
            .find(|(label, _)| label.eq_ignore_ascii_case(option))
            .map(|(_, v)| *v)
    }

    pub fn current(&self, device: &Device) -> Option<&'static str> {
        let value = device.attr(self.api_key)?;
        self.options
            .iter()
            .find(|(_, v)| v.matches(value))
            .map(|(label, _)| *label)
    }

    pub fn option_labels(&self) -> impl Iterator<Item = &'static str> {
        self.options.iter().map(|(label, _)| *label)
    }
}

const DOOR_SELECTS: &[SelectDescriptor] = &[SelectDescriptor {
    key: "shock_sensitivity",
    api_key: "shockSensorSensitivity",
    options: &[
        ("low", ApiValue::Int(0)),
        ("normal", ApiValue::Int(4)),
        ("high", ApiValue::Int(7)),
    ],
    requires_disarm: true,
    applies: is_door_plus,
}];
const SOCKET_SELECTS: &[SelectDescriptor] = &[
    SelectDescriptor {
        key: "led_brightness",
        api_key: "indicationBrightness",
        options: &[("min", ApiValue::Str("MIN")), ("max", ApiValue::Str("MAX"))],
        requires_disarm: false,
        applies: named_brightness,
    },
    SelectDescriptor {
        key: "indication_mode",
        api_key: "indicationMode",
        options: &[
            ("always", ApiValue::Str("ENABLED")),
            ("off", ApiValue::Str("DISABLED")),
            ("if_on", ApiValue::Str("IF_ON")),
        ],
        requires_disarm: false,
        applies: has_indication_mode,
    },
];
const SIREN_SELECTS: &[SelectDescriptor] = &[
    SelectDescriptor {
        key: "siren_volume",
        api_key: "v2sirenVolumeLevel",
        options: &[
            ("disabled", ApiValue::Str("DISABLED")),
            ("quiet", ApiValue::Str("QUIET")),
            ("loud", ApiValue::Str("LOUD")),
            ("very_loud", ApiValue::Str("VERY_LOUD")),
        ],
        requires_disarm: false,
        applies: always,
    },
    SelectDescriptor {
        key: "beep_volume",
        api_key: "beepVolumeLevel",
        options: &[
            ("quiet", ApiValue::Str("QUIET")),
            ("loud", ApiValue::Str("LOUD")),
            ("very_loud", ApiValue::Str("VERY_LOUD")),
        ],
        requires_disarm: false,
        applies: always,
    },
    SelectDescriptor {
        key: "alarm_duration",
        api_key: "alarmDuration",
        options: &[
            ("1", ApiValue::Int(1)),
            ("2", ApiValue::Int(2)),
            ("3", ApiValue::Int(3)),
            ("5", ApiValue::Int(5)),
            ("10", ApiValue::Int(10)),
            ("15", ApiValue::Int(15)),
        ],
        requires_disarm: false,
        applies: always,
    },
];

pub fn selects(device_type: DeviceType) -> &'static [SelectDescriptor] {
    match device_type {
        DeviceType::DoorContact => DOOR_SELECTS,
        DeviceType::Socket => SOCKET_SELECTS,
        DeviceType::Siren => SIREN_SELECTS,
        _ => &[],
    }
}

pub fn select(device: &Device, key: &str) -> Option<&'static SelectDescriptor> {
    selects(device.device_type)
        .iter()
        .find(|s| s.key == key && (s.applies)(device))
}

// ── Attribute helpers ────────────────────────────────────────────────

fn read_field<'a>(device: &'a Device, nested: Option<&str>, key: &str) -> Option<&'a Value> {
    match nested {
        Some(parent) => device.attr(parent)?.get(key),
        None => device.attr(key),
    }
}

/// Read a possibly nested field, cloned, for rollback.
pub(crate) fn snapshot_field(device: &Device, nested: Option<&str>, key: &str) -> Option<Value> {
    read_field(device, nested, key).cloned()
}

/// Write (or with `None`, remove) a possibly nested field.
pub(crate) fn write_field(device: &mut Device, nested: Option<&str>, key: &str, value: Option<Value>) {
    let target = match nested {
        Some(parent) => {
            let entry = device
                .attributes
                .entry(parent.to_owned())
                .or_insert_with(|| Value::Object(serde_json::Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(serde_json::Map::new());
            }
            match entry.as_object_mut() {
                Some(map) => map,
                None => return,
            }
        }
        None => &mut device.attributes,
    };
    match value {
        Some(v) => {
            target.insert(key.to_owned(), v);
        }
        None => {
            target.remove(key);
        }
    }
}
