//! Space status handlers.

use std::sync::Arc;

use tabled::Tabled;

use hubwatch_core::{CloudApi, Controller, Space};

use crate::cli::{GlobalOpts, StatusArgs};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct SpaceRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Hub")]
    hub: String,
    #[tabled(rename = "Security")]
    security: String,
    #[tabled(rename = "Devices")]
    devices: usize,
    #[tabled(rename = "Locks")]
    locks: usize,
    #[tabled(rename = "Cameras")]
    cameras: usize,
}

impl SpaceRow {
    fn new(space: &Space, color: bool) -> Self {
        Self {
            id: space.id.clone(),
            name: space.name.clone(),
            hub: space.hub_id.clone(),
            security: output::security_label(space.security_state, color),
            devices: space.devices.len(),
            locks: space.smart_locks.len(),
            cameras: space.video_edges.len(),
        }
    }
}

fn detail(space: &Space, color: bool) -> String {
    let mut pairs = vec![
        ("ID", space.id.clone()),
        ("Name", space.name.clone()),
        ("Hub", space.hub_id.clone()),
        ("Security", output::security_label(space.security_state, color)),
        ("Devices", space.devices.len().to_string()),
        ("Cameras", space.video_edges.len().to_string()),
    ];
    for group in space.groups.values() {
        pairs.push((
            "Group",
            format!(
                "{} ({}): {}",
                group.name,
                group.id,
                output::security_label(group.security_state, color)
            ),
        ));
    }
    for lock in space.smart_locks.values() {
        let state = match lock.is_locked {
            Some(true) => "locked",
            Some(false) => "unlocked",
            None => "unknown",
        };
        let by = lock
            .last_changed_by
            .as_deref()
            .map(|who| format!(" by {who}"))
            .unwrap_or_default();
        pairs.push(("Lock", format!("{}: {state}{by}", lock.name)));
    }
    output::detail_lines(&pairs)
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(
    controller: &Controller<CloudApi>,
    args: StatusArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let color = output::should_color(&global.color);

    let out = match args.space.as_deref() {
        Some(identifier) => {
            let space = util::resolve_space(controller, identifier)?;
            output::render_single(
                &global.output,
                space.as_ref(),
                |s| detail(s, color),
                |s| s.security_state.to_string(),
            )?
        }
        None => {
            let spaces: Vec<Arc<Space>> = controller.spaces_snapshot().iter().cloned().collect();
            output::render_list(
                &global.output,
                &spaces,
                |s| SpaceRow::new(s, color),
                |s| s.id.clone(),
            )?
        }
    };
    output::print_output(&out, global.quiet);
    Ok(())
}
