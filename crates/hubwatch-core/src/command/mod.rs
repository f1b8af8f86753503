// ── Command API ──
//
// All write operations flow through a unified `Command` enum. The
// controller's command processor plans each one against the current store
// state, applies it optimistically, then issues the API call.

mod write;

use hubwatch_api::ArmingCommand;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::CoreError;
use crate::model::{Device, SecurityState};

pub(crate) use write::{WritePlan, WriteRequest, apply_changes, plan};

/// A command envelope sent through the command channel.
/// Contains the command and a oneshot response channel.
pub(crate) struct CommandEnvelope {
    pub command: Command,
    pub response_tx: tokio::sync::oneshot::Sender<Result<CommandResult, CoreError>>,
}

/// Security mode requested from the cloud.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum SecurityMode {
    Arm,
    Disarm,
    #[strum(to_string = "night_mode", serialize = "night")]
    NightMode,
}

impl SecurityMode {
    pub fn target_state(self) -> SecurityState {
        match self {
            Self::Arm => SecurityState::Armed,
            Self::Disarm => SecurityState::Disarmed,
            Self::NightMode => SecurityState::NightMode,
        }
    }

    pub(crate) fn as_arming(self) -> ArmingCommand {
        match self {
            Self::Arm => ArmingCommand::Arm,
            Self::Disarm => ArmingCommand::Disarm,
            Self::NightMode => ArmingCommand::NightModeOn,
        }
    }
}

/// All write operations against a space.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    // ── Device settings ──────────────────────────────────────────────
    /// Descriptor-driven settings switch, by descriptor key.
    SetSwitch {
        space_id: String,
        device_id: String,
        key: String,
        on: bool,
    },
    /// Add or remove `member` in a list setting (`settingsSwitch`,
    /// `sirenTriggers`).
    ToggleListMember {
        space_id: String,
        device_id: String,
        list_key: String,
        member: String,
        on: bool,
    },
    SetNumber {
        space_id: String,
        device_id: String,
        key: String,
        value: i64,
    },
    SelectOption {
        space_id: String,
        device_id: String,
        key: String,
        option: String,
    },

    // ── Actuators ────────────────────────────────────────────────────
    /// Main output of a relay, socket or wall switch.
    SetRelay {
        space_id: String,
        device_id: String,
        on: bool,
    },
    /// One gang of a multi-gang switch (1-based).
    SetChannel {
        space_id: String,
        device_id: String,
        channel: u8,
        on: bool,
    },
    SetValve {
        space_id: String,
        device_id: String,
        open: bool,
    },
    /// Dimmer level in percent, clamped to 100. `0` switches it off.
    SetBrightness {
        space_id: String,
        device_id: String,
        brightness: u8,
    },

    // ── Security ─────────────────────────────────────────────────────
    SetSecurityMode {
        space_id: String,
        mode: SecurityMode,
        group_id: Option<String>,
    },
}

impl Command {
    pub fn space_id(&self) -> &str {
        match self {
            Self::SetSwitch { space_id, .. }
            | Self::ToggleListMember { space_id, .. }
            | Self::SetNumber { space_id, .. }
            | Self::SelectOption { space_id, .. }
            | Self::SetRelay { space_id, .. }
            | Self::SetChannel { space_id, .. }
            | Self::SetValve { space_id, .. }
            | Self::SetBrightness { space_id, .. }
            | Self::SetSecurityMode { space_id, .. } => space_id,
        }
    }
}

/// Result of a command execution.
#[derive(Debug)]
pub enum CommandResult {
    Ok,
    /// The device as it stands after the write.
    Device(Device),
}
