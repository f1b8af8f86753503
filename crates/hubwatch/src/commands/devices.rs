//! Device command handlers.

use tabled::Tabled;

use hubwatch_core::descriptors;
use hubwatch_core::{CloudApi, Command as CoreCommand, CommandResult, Controller, Device};

use crate::cli::{DevicesArgs, DevicesCommand, GlobalOpts, ValvePosition};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "Space")]
    space: String,
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Type")]
    device_type: String,
    #[tabled(rename = "Model")]
    model: String,
    #[tabled(rename = "Online")]
    online: String,
    #[tabled(rename = "Battery")]
    battery: String,
}

/// A device tagged with the space it lives in.
#[derive(serde::Serialize)]
struct Listed {
    space_id: String,
    space_name: String,
    #[serde(flatten)]
    device: Device,
}

fn on_off(value: Option<bool>) -> &'static str {
    match value {
        Some(true) => "on",
        Some(false) => "off",
        None => "-",
    }
}

/// Key/value view of a device with every sensor and setting it exposes.
fn detail(device: &Device, color: bool) -> String {
    let mut pairs = vec![
        ("ID", device.id.clone()),
        ("Name", device.name.clone()),
        ("Type", device.device_type.to_string()),
        ("Model", device.raw_type.clone()),
        ("Online", output::flag_label(Some(device.online), color)),
        (
            "Battery",
            device
                .battery_level
                .map_or_else(|| "-".into(), |b| format!("{b}%")),
        ),
        (
            "Firmware",
            device.firmware_version.clone().unwrap_or_else(|| "-".into()),
        ),
    ];

    for sensor in descriptors::binary_sensors(device.device_type) {
        pairs.push((
            "Sensor",
            format!(
                "{} = {}",
                sensor.key,
                output::flag_label((sensor.value)(device), color)
            ),
        ));
    }
    for switch in descriptors::switches(device.device_type) {
        let lock = if switch.requires_disarm() { " (disarm first)" } else { "" };
        pairs.push((
            "Switch",
            format!("{} = {}{lock}", switch.key, on_off(switch.is_on(device))),
        ));
    }
    for number in descriptors::numbers(device.device_type)
        .iter()
        .filter(|n| (n.applies)(device))
    {
        let current = number
            .current(device)
            .map_or_else(|| "-".into(), |v| v.to_string());
        pairs.push((
            "Number",
            format!("{} = {current} [{}..{}]", number.key, number.min, number.max),
        ));
    }
    for select in descriptors::selects(device.device_type)
        .iter()
        .filter(|s| (s.applies)(device))
    {
        let options = select.option_labels().collect::<Vec<_>>().join("|");
        pairs.push((
            "Select",
            format!(
                "{} = {} {{{options}}}",
                select.key,
                select.current(device).unwrap_or("-")
            ),
        ));
    }
    output::detail_lines(&pairs)
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    controller: &Controller<CloudApi>,
    args: DevicesArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let color = output::should_color(&global.color);

    let write = match args.command {
        DevicesCommand::List { space } => {
            let listed: Vec<Listed> = util::spaces_in_scope(controller, space.as_deref())?
                .iter()
                .flat_map(|s| {
                    s.devices.values().map(|d| Listed {
                        space_id: s.id.clone(),
                        space_name: s.name.clone(),
                        device: d.clone(),
                    })
                })
                .collect();
            let out = output::render_list(
                &global.output,
                &listed,
                |l| DeviceRow {
                    space: l.space_name.clone(),
                    id: l.device.id.clone(),
                    name: l.device.name.clone(),
                    device_type: l.device.device_type.to_string(),
                    model: l.device.raw_type.clone(),
                    online: output::flag_label(Some(l.device.online), color),
                    battery: l
                        .device
                        .battery_level
                        .map(|b| format!("{b}%"))
                        .unwrap_or_default(),
                },
                |l| l.device.id.clone(),
            )?;
            output::print_output(&out, global.quiet);
            return Ok(());
        }

        DevicesCommand::Get { space, device } => {
            let space = util::resolve_space(controller, &space)?;
            let device = util::resolve_device(&space, &device)?;
            let out = output::render_single(
                &global.output,
                device,
                |d| detail(d, color),
                |d| d.id.clone(),
            )?;
            output::print_output(&out, global.quiet);
            return Ok(());
        }

        write => write,
    };

    let (space_ref, device_ref) = write_target(&write)?;
    let space = util::resolve_space(controller, space_ref)?;
    let device = util::resolve_device(&space, device_ref)?;
    let cmd = to_core(write, space.id.clone(), device.id.clone())?;
    tracing::debug!(?cmd, "executing device command");

    match controller.execute(cmd).await? {
        CommandResult::Device(updated) => {
            let out = output::render_single(
                &global.output,
                &updated,
                |d| detail(d, color),
                |d| d.id.clone(),
            )?;
            output::print_output(&out, global.quiet);
        }
        CommandResult::Ok => {
            if !global.quiet {
                eprintln!("Device '{}' updated", device.name);
            }
        }
    }
    Ok(())
}

fn not_a_write() -> CliError {
    CliError::Internal("not a device write".into())
}

/// Space and device identifiers as typed by the user.
fn write_target(cmd: &DevicesCommand) -> Result<(&str, &str), CliError> {
    match cmd {
        DevicesCommand::Switch { space, device, .. }
        | DevicesCommand::Toggle { space, device, .. }
        | DevicesCommand::Number { space, device, .. }
        | DevicesCommand::Select { space, device, .. }
        | DevicesCommand::Relay { space, device, .. }
        | DevicesCommand::Channel { space, device, .. }
        | DevicesCommand::Valve { space, device, .. }
        | DevicesCommand::Brightness { space, device, .. } => Ok((space, device)),
        DevicesCommand::List { .. } | DevicesCommand::Get { .. } => Err(not_a_write()),
    }
}

/// The core command for a device write, addressed by resolved ids.
fn to_core(cmd: DevicesCommand, space_id: String, device_id: String) -> Result<CoreCommand, CliError> {
    Ok(match cmd {
        DevicesCommand::Switch { key, state, .. } => CoreCommand::SetSwitch {
            space_id,
            device_id,
            key,
            on: state.is_on(),
        },
        DevicesCommand::Toggle { list, member, state, .. } => CoreCommand::ToggleListMember {
            space_id,
            device_id,
            list_key: list,
            member,
            on: state.is_on(),
        },
        DevicesCommand::Number { key, value, .. } => CoreCommand::SetNumber {
            space_id,
            device_id,
            key,
            value,
        },
        DevicesCommand::Select { key, option, .. } => CoreCommand::SelectOption {
            space_id,
            device_id,
            key,
            option,
        },
        DevicesCommand::Relay { state, .. } => CoreCommand::SetRelay {
            space_id,
            device_id,
            on: state.is_on(),
        },
        DevicesCommand::Channel { channel, state, .. } => CoreCommand::SetChannel {
            space_id,
            device_id,
            channel,
            on: state.is_on(),
        },
        DevicesCommand::Valve { position, .. } => CoreCommand::SetValve {
            space_id,
            device_id,
            open: position == ValvePosition::Open,
        },
        DevicesCommand::Brightness { level, .. } => CoreCommand::SetBrightness {
            space_id,
            device_id,
            brightness: level,
        },
        DevicesCommand::List { .. } | DevicesCommand::Get { .. } => return Err(not_a_write()),
    })
}
