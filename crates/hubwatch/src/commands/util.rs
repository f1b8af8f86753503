//! Shared helpers for command handlers.

use std::sync::Arc;

use hubwatch_core::{CloudApi, Controller, Device, Group, Space, VideoEdge};

use crate::error::CliError;

/// Resolve a space by id, hub id or name.
pub fn resolve_space(
    controller: &Controller<CloudApi>,
    identifier: &str,
) -> Result<Arc<Space>, CliError> {
    controller
        .store()
        .find_space(identifier)
        .ok_or_else(|| CliError::NotFound {
            resource_type: "space".into(),
            identifier: identifier.into(),
            list_command: "status".into(),
        })
}

/// One space, or every space when no identifier is given.
pub fn spaces_in_scope(
    controller: &Controller<CloudApi>,
    identifier: Option<&str>,
) -> Result<Vec<Arc<Space>>, CliError> {
    match identifier {
        Some(id) => Ok(vec![resolve_space(controller, id)?]),
        None => Ok(controller.spaces_snapshot().iter().cloned().collect()),
    }
}

/// Resolve a device by exact id, then case-insensitive name.
pub fn resolve_device<'a>(space: &'a Space, identifier: &str) -> Result<&'a Device, CliError> {
    space
        .devices
        .get(identifier)
        .or_else(|| {
            space
                .devices
                .values()
                .find(|d| d.name.eq_ignore_ascii_case(identifier))
        })
        .ok_or_else(|| CliError::NotFound {
            resource_type: "device".into(),
            identifier: identifier.into(),
            list_command: format!("devices list {}", space.id),
        })
}

/// Resolve a video edge by exact id, then case-insensitive name.
pub fn resolve_edge<'a>(space: &'a Space, identifier: &str) -> Result<&'a VideoEdge, CliError> {
    space
        .video_edges
        .get(identifier)
        .or_else(|| {
            space
                .video_edges
                .values()
                .find(|e| e.name.eq_ignore_ascii_case(identifier))
        })
        .ok_or_else(|| CliError::NotFound {
            resource_type: "camera".into(),
            identifier: identifier.into(),
            list_command: format!("cameras list {}", space.id),
        })
}

/// Resolve a group by exact id, then case-insensitive name.
pub fn resolve_group<'a>(space: &'a Space, identifier: &str) -> Result<&'a Group, CliError> {
    space
        .groups
        .get(identifier)
        .or_else(|| {
            space
                .groups
                .values()
                .find(|g| g.name.eq_ignore_ascii_case(identifier))
        })
        .ok_or_else(|| CliError::NotFound {
            resource_type: "group".into(),
            identifier: identifier.into(),
            list_command: format!("status {}", space.id),
        })
}
