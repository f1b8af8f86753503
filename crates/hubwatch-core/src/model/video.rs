// ── Video edge types ──
//
// Cameras, doorbells and NVRs. Detections are kept per channel as
// `{type, active}` entries that the auto-reset timers clear.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum VideoEdgeType {
    Nvr,
    Camera,
    Doorbell,
    Other,
}

impl VideoEdgeType {
    pub fn from_wire(value: Option<&str>) -> Self {
        match value.map(str::to_ascii_uppercase).as_deref() {
            Some("NVR") => Self::Nvr,
            Some(v) if v.contains("DOORBELL") => Self::Doorbell,
            Some(v) if v.contains("CAMERA") || v.starts_with("TURRET") || v.starts_with("BULLET") => {
                Self::Camera
            }
            _ => Self::Other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Detection {
    /// `VIDEO_MOTION`, `VIDEO_HUMAN`, `VIDEO_CAR`, `VIDEO_PET`
    pub detection_type: String,
    pub active: bool,
}

/// A camera feeding an NVR channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelSource {
    pub source_type: String,
    pub video_edge_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoChannel {
    pub id: String,
    pub name: Option<String>,
    pub detections: Vec<Detection>,
    pub sources: Vec<ChannelSource>,
}

impl VideoChannel {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            detections: Vec::new(),
            sources: Vec::new(),
        }
    }

    /// Upsert the detection entry for `detection_type`.
    pub fn set_detection(&mut self, detection_type: &str, active: bool) {
        match self
            .detections
            .iter_mut()
            .find(|d| d.detection_type == detection_type)
        {
            Some(entry) => entry.active = active,
            None => self.detections.push(Detection {
                detection_type: detection_type.to_owned(),
                active,
            }),
        }
    }

    pub fn is_detecting(&self, detection_type: &str) -> bool {
        self.detections
            .iter()
            .any(|d| d.detection_type == detection_type && d.active)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoEdge {
    pub id: String,
    pub name: String,
    pub edge_type: VideoEdgeType,
    pub ip: Option<String>,
    pub mac: Option<String>,
    pub channels: Vec<VideoChannel>,
}

impl VideoEdge {
    /// Channel to record a detection on: the named channel, or the first one.
    ///
    /// With no channel id and no channels at all, a default channel `"0"` is
    /// created. A named channel that does not exist yields `None`.
    pub fn detection_channel_mut(&mut self, channel_id: Option<&str>) -> Option<&mut VideoChannel> {
        match channel_id {
            Some(id) => self.channels.iter_mut().find(|c| c.id == id),
            None => {
                if self.channels.is_empty() {
                    self.channels.push(VideoChannel::new("0"));
                }
                self.channels.first_mut()
            }
        }
    }
}
