//! Command dispatch: bridges CLI args -> core Commands -> output formatting.

pub mod cameras;
pub mod config_cmd;
pub mod devices;
pub mod security;
pub mod status;
pub mod util;
pub mod watch;

use hubwatch_core::{CloudApi, Controller, SecurityMode};

use crate::cli::{Command, GlobalOpts};
use crate::config::Session;
use crate::error::CliError;

/// Dispatch a one-shot command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    controller: &Controller<CloudApi>,
    session: &Session,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Status(args) => status::handle(controller, args, global),
        Command::Devices(args) => devices::handle(controller, args, global).await,
        Command::Cameras(args) => cameras::handle(controller, args, session, global),
        Command::Arm(args) => security::handle(controller, SecurityMode::Arm, args, global).await,
        Command::Disarm(args) => {
            security::handle(controller, SecurityMode::Disarm, args, global).await
        }
        Command::Night(args) => {
            security::handle(controller, SecurityMode::NightMode, args, global).await
        }
        // Handled before a session is opened
        Command::Watch(_) | Command::Config(_) | Command::Completions(_) => Err(
            CliError::Internal("command must be handled before dispatch".into()),
        ),
    }
}
