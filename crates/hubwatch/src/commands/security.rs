//! Arm, disarm and night mode.

use hubwatch_core::{CloudApi, Command as CoreCommand, Controller, SecurityMode};

use crate::cli::{GlobalOpts, SecurityArgs};
use crate::error::CliError;
use crate::output;

use super::util;

pub async fn handle(
    controller: &Controller<CloudApi>,
    mode: SecurityMode,
    args: SecurityArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let space = util::resolve_space(controller, &args.space)?;
    let group = args
        .group
        .as_deref()
        .map(|g| util::resolve_group(&space, g))
        .transpose()?;

    controller
        .execute(CoreCommand::SetSecurityMode {
            space_id: space.id.clone(),
            mode,
            group_id: group.map(|g| g.id.clone()),
        })
        .await?;

    if !global.quiet {
        let color = output::should_color(&global.color);
        let target = group.map_or_else(|| space.name.clone(), |g| format!("{} / {}", space.name, g.name));
        eprintln!(
            "{target}: {} requested",
            output::security_label(mode.target_state(), color)
        );
    }
    Ok(())
}
