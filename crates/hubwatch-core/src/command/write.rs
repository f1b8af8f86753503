// ── Write planning ──
//
// Turns a device command into the optimistic local change and the API
// request that makes it real. Planning is pure: it reads a space snapshot
// and never touches the store or the network.

use serde_json::{Map, Value, json};

use super::Command;
use crate::descriptors::{self, SETTINGS_SWITCH, SIREN_TRIGGERS, SwitchWrite};
use crate::error::CoreError;
use crate::model::{Device, DeviceType, SecurityState, Space};

const MAX_CHANNEL: u8 = 2;
const MAX_BRIGHTNESS: u8 = 100;

/// One optimistic attribute change. `value: None` removes the field.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct FieldChange {
    pub nested: Option<&'static str>,
    pub key: String,
    pub value: Option<Value>,
}

impl FieldChange {
    fn set(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            nested: None,
            key: key.into(),
            value: Some(value.into()),
        }
    }
}

/// The API call that carries a write.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum WriteRequest {
    /// Partial settings update.
    Update(Value),
    Switch { on: bool, raw_type: String },
    Channel { channel: u8, on: bool, raw_type: String },
    Valve { open: bool },
    Brightness { brightness: u8, raw_type: String },
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct WritePlan {
    pub space_id: String,
    pub hub_id: String,
    pub device_id: String,
    pub changes: Vec<FieldChange>,
    pub request: WriteRequest,
}

/// Plan a device write. `SetSecurityMode` is not a device write and is
/// rejected here.
pub(crate) fn plan(space: &Space, command: &Command) -> Result<WritePlan, CoreError> {
    let (device_id, planned) = match command {
        Command::SetSwitch { device_id, key, on, .. } => {
            let device = device(space, device_id)?;
            (device_id, plan_switch(space, device, key, *on)?)
        }
        Command::ToggleListMember {
            device_id,
            list_key,
            member,
            on,
            ..
        } => {
            let device = device(space, device_id)?;
            (device_id, plan_list_toggle(space, device, list_key, member, *on)?)
        }
        Command::SetNumber { device_id, key, value, .. } => {
            let device = device(space, device_id)?;
            (device_id, plan_number(space, device, key, *value)?)
        }
        Command::SelectOption {
            device_id,
            key,
            option,
            ..
        } => {
            let device = device(space, device_id)?;
            (device_id, plan_select(space, device, key, option)?)
        }
        Command::SetRelay { device_id, on, .. } => {
            let device = switchable(space, device_id)?;
            let planned = (
                vec![FieldChange::set("is_on", *on)],
                WriteRequest::Switch {
                    on: *on,
                    raw_type: device.raw_type.clone(),
                },
            );
            (device_id, planned)
        }
        Command::SetChannel {
            device_id,
            channel,
            on,
            ..
        } => {
            let device = switchable(space, device_id)?;
            (device_id, plan_channel(device, *channel, *on)?)
        }
        Command::SetValve { device_id, open, .. } => {
            let device = device(space, device_id)?;
            if device.device_type != DeviceType::WaterStop {
                return Err(unsupported("valve control", device));
            }
            let state = if *open { "OPEN" } else { "CLOSED" };
            let planned = (
                vec![FieldChange::set("valveState", state)],
                WriteRequest::Valve { open: *open },
            );
            (device_id, planned)
        }
        Command::SetBrightness {
            device_id,
            brightness,
            ..
        } => {
            let device = device(space, device_id)?;
            if !device.is_dimmer() {
                return Err(unsupported("brightness", device));
            }
            (device_id, plan_brightness(device, *brightness))
        }
        Command::SetSecurityMode { .. } => {
            return Err(CoreError::Internal(
                "security mode changes are not device writes".into(),
            ));
        }
    };

    let (changes, request) = planned;
    Ok(WritePlan {
        space_id: space.id.clone(),
        hub_id: space.hub_id.clone(),
        device_id: device_id.clone(),
        changes,
        request,
    })
}

/// Apply `changes` to `device`, returning the changes that undo them.
pub(crate) fn apply_changes(device: &mut Device, changes: &[FieldChange]) -> Vec<FieldChange> {
    let mut undo = Vec::with_capacity(changes.len());
    for change in changes {
        let previous = descriptors::snapshot_field(device, change.nested, &change.key);
        descriptors::write_field(device, change.nested, &change.key, change.value.clone());
        undo.push(FieldChange {
            nested: change.nested,
            key: change.key.clone(),
            value: previous,
        });
    }
    // Undo in reverse so overlapping keys restore correctly.
    undo.reverse();
    undo
}

// ── Per-command planners ─────────────────────────────────────────────

type Planned = (Vec<FieldChange>, WriteRequest);

fn plan_switch(space: &Space, device: &Device, key: &str, on: bool) -> Result<Planned, CoreError> {
    let desc = descriptors::switch(device.device_type, key)
        .ok_or_else(|| unsupported(&format!("switch '{key}'"), device))?;
    if desc.requires_disarm() {
        require_disarmed(space)?;
    }

    match desc.write {
        SwitchWrite::Field {
            api_key,
            on: on_value,
            off: off_value,
            nested,
        } => {
            let value = if on { on_value } else { off_value }.to_json();
            let payload = match nested {
                Some(parent) => json!({ parent: { api_key: value.clone() } }),
                None => json!({ api_key: value.clone() }),
            };
            let change = FieldChange {
                nested,
                key: api_key.to_owned(),
                value: Some(value),
            };
            Ok((vec![change], WriteRequest::Update(payload)))
        }
        SwitchWrite::ListMember { list_key, member } => Ok(toggle_member(device, list_key, member, on)),
    }
}

fn plan_list_toggle(
    space: &Space,
    device: &Device,
    list_key: &str,
    member: &str,
    on: bool,
) -> Result<Planned, CoreError> {
    if list_key != SETTINGS_SWITCH && list_key != SIREN_TRIGGERS {
        return Err(CoreError::ValidationFailed {
            message: format!("'{list_key}' is not a list setting"),
        });
    }
    // Undeclared members are device configuration and skip the arm check.
    if let Some(desc) = descriptors::list_member(device.device_type, list_key, member) {
        if desc.requires_disarm() {
            require_disarmed(space)?;
        }
    }
    Ok(toggle_member(device, list_key, member, on))
}

fn toggle_member(device: &Device, list_key: &str, member: &str, on: bool) -> Planned {
    let mut list: Vec<Value> = device
        .attr(list_key)
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    let present = list.iter().any(|m| m.as_str() == Some(member));
    if on && !present {
        list.push(Value::from(member));
    } else if !on {
        list.retain(|m| m.as_str() != Some(member));
    }

    let value = Value::Array(list);
    let mut payload = Map::new();
    payload.insert(list_key.to_owned(), value.clone());
    (
        vec![FieldChange::set(list_key, value)],
        WriteRequest::Update(Value::Object(payload)),
    )
}

fn plan_number(space: &Space, device: &Device, key: &str, value: i64) -> Result<Planned, CoreError> {
    let desc = descriptors::number(device, key)
        .ok_or_else(|| unsupported(&format!("number '{key}'"), device))?;
    if !desc.accepts(value) {
        return Err(CoreError::ValidationFailed {
            message: format!(
                "{key} must be between {} and {} in steps of {}, got {value}",
                desc.min, desc.max, desc.step
            ),
        });
    }
    if desc.requires_disarm {
        require_disarmed(space)?;
    }

    let mut payload = Map::new();
    payload.insert(desc.api_key.to_owned(), Value::from(value));
    Ok((
        vec![FieldChange::set(desc.attr_key, value)],
        WriteRequest::Update(Value::Object(payload)),
    ))
}

fn plan_select(space: &Space, device: &Device, key: &str, option: &str) -> Result<Planned, CoreError> {
    let desc = descriptors::select(device, key)
        .ok_or_else(|| unsupported(&format!("select '{key}'"), device))?;
    let Some(api_value) = desc.api_value(option) else {
        let options: Vec<&str> = desc.option_labels().collect();
        return Err(CoreError::ValidationFailed {
            message: format!("'{option}' is not one of: {}", options.join(", ")),
        });
    };
    if desc.requires_disarm {
        require_disarmed(space)?;
    }

    let value = api_value.to_json();
    let mut payload = Map::new();
    payload.insert(desc.api_key.to_owned(), value.clone());
    Ok((
        vec![FieldChange::set(desc.api_key, value)],
        WriteRequest::Update(Value::Object(payload)),
    ))
}

fn plan_channel(device: &Device, channel: u8, on: bool) -> Result<Planned, CoreError> {
    if !(1..=MAX_CHANNEL).contains(&channel) {
        return Err(CoreError::ValidationFailed {
            message: format!("channel must be between 1 and {MAX_CHANNEL}, got {channel}"),
        });
    }
    let wire = format!("CHANNEL_{channel}_ON");
    let mut statuses: Vec<Value> = device
        .attr("channelStatuses")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    let present = statuses.iter().any(|s| s.as_str() == Some(wire.as_str()));
    if on && !present {
        statuses.push(Value::from(wire));
    } else if !on {
        statuses.retain(|s| s.as_str() != Some(wire.as_str()));
    }

    Ok((
        vec![
            FieldChange::set(format!("channel_{channel}_on"), on),
            FieldChange::set("channelStatuses", statuses),
        ],
        WriteRequest::Channel {
            channel,
            on,
            raw_type: device.raw_type.clone(),
        },
    ))
}

fn plan_brightness(device: &Device, brightness: u8) -> Planned {
    let level = brightness.min(MAX_BRIGHTNESS);
    let statuses: Vec<Value> = if level > 0 {
        vec![Value::from("CHANNEL_1_ON")]
    } else {
        Vec::new()
    };
    (
        vec![
            FieldChange::set("actualBrightnessCh1", level),
            FieldChange::set("channelStatuses", statuses),
        ],
        WriteRequest::Brightness {
            brightness: level,
            raw_type: device.raw_type.clone(),
        },
    )
}

// ── Helpers ──────────────────────────────────────────────────────────

fn device<'a>(space: &'a Space, device_id: &str) -> Result<&'a Device, CoreError> {
    space
        .devices
        .get(device_id)
        .ok_or_else(|| CoreError::DeviceNotFound {
            identifier: device_id.to_owned(),
        })
}

fn switchable<'a>(space: &'a Space, device_id: &str) -> Result<&'a Device, CoreError> {
    let device = device(space, device_id)?;
    if device.device_type.is_switchable() {
        Ok(device)
    } else {
        Err(unsupported("switching", device))
    }
}

fn require_disarmed(space: &Space) -> Result<(), CoreError> {
    if space.security_state == SecurityState::Disarmed {
        Ok(())
    } else {
        Err(CoreError::SystemArmed {
            state: space.security_state.to_string(),
        })
    }
}

fn unsupported(operation: &str, device: &Device) -> CoreError {
    CoreError::Unsupported {
        operation: format!("{operation} on {} ({})", device.name, device.raw_type),
    }
}
