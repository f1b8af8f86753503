//! Camera and NVR handlers.

use tabled::Tabled;

use hubwatch_core::camera;
use hubwatch_core::{CloudApi, Controller, VideoEdge};

use crate::cli::{CamerasArgs, CamerasCommand, GlobalOpts};
use crate::config::Session;
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct EdgeRow {
    #[tabled(rename = "Space")]
    space: String,
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Type")]
    edge_type: String,
    #[tabled(rename = "IP")]
    ip: String,
    #[tabled(rename = "Channels")]
    channels: usize,
    #[tabled(rename = "Detecting")]
    detecting: String,
}

#[derive(serde::Serialize)]
struct Listed {
    space_id: String,
    space_name: String,
    #[serde(flatten)]
    edge: VideoEdge,
}

/// Active detection types across all channels, e.g. `VIDEO_HUMAN`.
fn active_detections(edge: &VideoEdge) -> String {
    let mut active: Vec<&str> = edge
        .channels
        .iter()
        .flat_map(|c| c.detections.iter())
        .filter(|d| d.active)
        .map(|d| d.detection_type.as_str())
        .collect();
    active.sort_unstable();
    active.dedup();
    active.join(", ")
}

#[derive(serde::Serialize)]
struct StreamUrl {
    edge_id: String,
    channel: usize,
    url: String,
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(
    controller: &Controller<CloudApi>,
    args: CamerasArgs,
    session: &Session,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let out = match args.command {
        CamerasCommand::List { space } => {
            let listed: Vec<Listed> = util::spaces_in_scope(controller, space.as_deref())?
                .iter()
                .flat_map(|s| {
                    s.video_edges.values().map(|e| Listed {
                        space_id: s.id.clone(),
                        space_name: s.name.clone(),
                        edge: e.clone(),
                    })
                })
                .collect();
            output::render_list(
                &global.output,
                &listed,
                |l| EdgeRow {
                    space: l.space_name.clone(),
                    id: l.edge.id.clone(),
                    name: l.edge.name.clone(),
                    edge_type: l.edge.edge_type.to_string(),
                    ip: l.edge.ip.clone().unwrap_or_default(),
                    channels: l.edge.channels.len(),
                    detecting: active_detections(&l.edge),
                },
                |l| l.edge.id.clone(),
            )?
        }

        CamerasCommand::Url {
            space,
            camera,
            channel,
            sub,
            no_auth,
        } => {
            let space = util::resolve_space(controller, &space)?;
            let edge = util::resolve_edge(&space, &camera)?;
            let credentials = if no_auth { None } else { session.rtsp.as_ref() };

            let url = camera::rtsp_url(edge, channel, !sub, credentials).ok_or_else(|| {
                CliError::Validation {
                    field: "camera".into(),
                    reason: format!(
                        "no stream for channel {channel} of '{}' (missing IP, MAC or channel)",
                        edge.name
                    ),
                }
            })?;

            if !global.quiet {
                if let Some(nvr) = camera::recording_nvr_for(&space, &edge.id) {
                    eprintln!("'{}' is recorded by NVR '{}'", edge.name, nvr.name);
                }
            }

            output::render_single(
                &global.output,
                &StreamUrl {
                    edge_id: edge.id.clone(),
                    channel,
                    url,
                },
                |u| u.url.clone(),
                |u| u.url.clone(),
            )?
        }
    };
    output::print_output(&out, global.quiet);
    Ok(())
}

#[cfg(test)]
mod tests {
    use hubwatch_core::{VideoChannel, VideoEdgeType};

    use super::*;

    #[test]
    fn detections_are_deduplicated_across_channels() {
        let mut first = VideoChannel::new("0");
        first.set_detection("VIDEO_HUMAN", true);
        first.set_detection("VIDEO_CAR", false);
        let mut second = VideoChannel::new("1");
        second.set_detection("VIDEO_HUMAN", true);
        second.set_detection("VIDEO_MOTION", true);

        let edge = VideoEdge {
            id: "E1".into(),
            name: "Driveway".into(),
            edge_type: VideoEdgeType::Nvr,
            ip: None,
            mac: None,
            channels: vec![first, second],
        };
        assert_eq!(active_detections(&edge), "VIDEO_HUMAN, VIDEO_MOTION");
    }
}
