//! Clap derive structures for the `hubwatch` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// hubwatch -- live events and device control for Ajax security hubs
#[derive(Debug, Parser)]
#[command(
    name = "hubwatch",
    version,
    about = "Watch and control Ajax security hubs from the command line",
    long_about = "Mirrors every hub on an Ajax cloud account, follows the push event \
        stream, and drives arming, relays, valves and device settings.\n\n\
        Security-relevant settings are refused while a space is armed.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Account profile to use
    #[arg(long, short = 'p', env = "HUBWATCH_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "HUBWATCH_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Accept invalid TLS certificates on the API and push endpoints
    #[arg(long, short = 'k', env = "HUBWATCH_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "HUBWATCH_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OnOff {
    On,
    Off,
}

impl OnOff {
    pub fn is_on(self) -> bool {
        self == Self::On
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ValvePosition {
    Open,
    Closed,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show spaces and their security state
    #[command(alias = "st")]
    Status(StatusArgs),

    /// Follow the push stream and print events as they are reconciled
    #[command(alias = "w")]
    Watch(WatchArgs),

    /// List devices and change their settings or outputs
    #[command(alias = "dev", alias = "d")]
    Devices(DevicesArgs),

    /// List cameras and NVRs, build RTSP URLs
    #[command(alias = "cam")]
    Cameras(CamerasArgs),

    /// Arm a space (or one group)
    Arm(SecurityArgs),

    /// Disarm a space (or one group)
    Disarm(SecurityArgs),

    /// Switch a space (or one group) to night mode
    Night(SecurityArgs),

    /// Inspect and edit the configuration file
    #[command(alias = "cfg")]
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Status ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct StatusArgs {
    /// Space id, hub id or name (all spaces when omitted)
    pub space: Option<String>,
}

// ── Watch ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Only print notifications for this space
    #[arg(long)]
    pub space: Option<String>,

    /// Also print a line for every plain state update
    #[arg(long)]
    pub all: bool,
}

// ── Devices ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct DevicesArgs {
    #[command(subcommand)]
    pub command: DevicesCommand,
}

#[derive(Debug, Subcommand)]
pub enum DevicesCommand {
    /// List devices
    #[command(alias = "ls")]
    List {
        /// Space id, hub id or name (all spaces when omitted)
        space: Option<String>,
    },

    /// Show one device with its sensors and settings
    Get { space: String, device: String },

    /// Flip a settings switch by key (see `devices get`)
    Switch {
        space: String,
        device: String,
        key: String,
        state: OnOff,
    },

    /// Add or remove a member of a list setting
    Toggle {
        space: String,
        device: String,
        /// `settingsSwitch` or `sirenTriggers`
        list: String,
        member: String,
        state: OnOff,
    },

    /// Set a numeric setting
    Number {
        space: String,
        device: String,
        key: String,
        #[arg(allow_negative_numbers = true)]
        value: i64,
    },

    /// Choose an option of a select setting
    Select {
        space: String,
        device: String,
        key: String,
        option: String,
    },

    /// Drive the main output of a relay, socket or wall switch
    Relay {
        space: String,
        device: String,
        state: OnOff,
    },

    /// Drive one gang of a multi-gang light switch
    Channel {
        space: String,
        device: String,
        #[arg(value_parser = clap::value_parser!(u8).range(1..=2))]
        channel: u8,
        state: OnOff,
    },

    /// Open or close a WaterStop valve
    Valve {
        space: String,
        device: String,
        position: ValvePosition,
    },

    /// Set a dimmer's brightness in percent (0 turns it off)
    #[command(alias = "dim")]
    Brightness {
        space: String,
        device: String,
        #[arg(value_parser = clap::value_parser!(u8).range(0..=100))]
        level: u8,
    },
}

// ── Cameras ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CamerasArgs {
    #[command(subcommand)]
    pub command: CamerasCommand,
}

#[derive(Debug, Subcommand)]
pub enum CamerasCommand {
    /// List video edges
    #[command(alias = "ls")]
    List {
        /// Space id, hub id or name (all spaces when omitted)
        space: Option<String>,
    },

    /// Print the RTSP URL of a camera or NVR channel
    Url {
        space: String,
        /// Video edge id or name
        camera: String,

        /// Channel index
        #[arg(long, default_value = "0")]
        channel: usize,

        /// Use the low-resolution sub stream
        #[arg(long)]
        sub: bool,

        /// Omit configured RTSP credentials from the URL
        #[arg(long)]
        no_auth: bool,
    },
}

// ── Security ─────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct SecurityArgs {
    /// Space id, hub id or name
    pub space: String,

    /// Restrict the command to one group
    #[arg(long, short = 'g')]
    pub group: Option<String>,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the effective configuration with secrets masked
    Show,

    /// Print the configuration file path
    Path,

    /// Make a profile the default
    Use { name: String },

    /// Store a secret in the system keyring
    SetSecret {
        kind: SecretKind,

        /// Secret value; read from stdin when omitted
        value: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SecretKind {
    ApiKey,
    PasswordHash,
    RtspPassword,
}

impl SecretKind {
    pub fn keyring_key(self) -> &'static str {
        match self {
            Self::ApiKey => "api-key",
            Self::PasswordHash => "password-hash",
            Self::RtspPassword => "rtsp-password",
        }
    }
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
