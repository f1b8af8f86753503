// ── API-to-domain type conversions ──
//
// Bridges raw `hubwatch_api` records into `hubwatch_core::model` types.
// Unknown record fields become device attributes under their wire names.

use hubwatch_api::models::{
    DeviceRecord, GroupRecord, HubRecord, VideoChannelRecord, VideoEdgeRecord,
};
use serde_json::Value;
use tracing::debug;

use crate::model::{
    ChannelSource, Device, Group, SecurityState, SmartLock, Space, VideoChannel, VideoEdge,
    VideoEdgeType,
};

/// Gangs tracked through `channelStatuses` on multi-channel switches.
const MAX_CHANNELS: u8 = 2;

// ── Helpers ──────────────────────────────────────────────────────────

fn security_state(raw: Option<&str>) -> SecurityState {
    raw.and_then(SecurityState::from_wire).unwrap_or_else(|| {
        if let Some(raw) = raw {
            debug!(state = raw, "unknown security state, assuming disarmed");
        }
        SecurityState::Disarmed
    })
}

/// Whether a device record describes a smart lock rather than a sensor.
fn is_smart_lock(raw_type: &str) -> bool {
    raw_type.to_ascii_lowercase().contains("smartlock")
}

/// `channel_<n>_on` for each gang listed as `CHANNEL_<n>_ON`.
pub(crate) fn channel_flags(device: &mut Device) {
    let Some(statuses) = device.attr("channelStatuses").and_then(Value::as_array).cloned() else {
        return;
    };
    for n in 1..=MAX_CHANNELS {
        let wire = format!("CHANNEL_{n}_ON");
        let on = statuses.iter().any(|s| s.as_str() == Some(wire.as_str()));
        device.set_attr(&format!("channel_{n}_on"), on);
    }
}

// ── Record conversions ───────────────────────────────────────────────

impl From<DeviceRecord> for Device {
    fn from(r: DeviceRecord) -> Self {
        let mut device = Device::new(r.id, r.device_name, r.device_type);
        device.online = r.online.unwrap_or(true);
        device.battery_level = r.battery_charge_level_percentage;
        device.signal_strength = r.signal_level;
        device.firmware_version = r.firmware_version;
        device.room_id = r.room_id;
        device.group_id = r.group_id;
        device.attributes = r.extra;
        channel_flags(&mut device);
        device
    }
}

impl From<GroupRecord> for Group {
    fn from(r: GroupRecord) -> Self {
        Self {
            id: r.id,
            name: r.group_name,
            security_state: security_state(r.state.as_deref()),
        }
    }
}

impl From<VideoChannelRecord> for VideoChannel {
    fn from(r: VideoChannelRecord) -> Self {
        let mut channel = VideoChannel::new(r.id);
        channel.name = r.name;
        channel.sources = r
            .source_aliases
            .map(|a| a.sources)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|s| {
                Some(ChannelSource {
                    source_type: s.source_type.unwrap_or_default(),
                    video_edge_id: s.video_edge_id?,
                })
            })
            .collect();
        channel
    }
}

impl From<VideoEdgeRecord> for VideoEdge {
    fn from(r: VideoEdgeRecord) -> Self {
        Self {
            id: r.id,
            name: r.name,
            edge_type: VideoEdgeType::from_wire(r.video_edge_type.as_deref()),
            ip: r.ip.filter(|ip| !ip.is_empty()),
            mac: r.mac.filter(|mac| !mac.is_empty()),
            channels: r.channels.into_iter().map(VideoChannel::from).collect(),
        }
    }
}

/// Assemble one hub's records into a `Space`. The hub id doubles as the
/// space id unless the hub reports a `spaceId`.
pub fn space_from_records(
    hub: HubRecord,
    devices: Vec<DeviceRecord>,
    groups: Vec<GroupRecord>,
    video_edges: Vec<VideoEdgeRecord>,
) -> Space {
    let space_id = hub
        .extra
        .get("spaceId")
        .and_then(Value::as_str)
        .map_or_else(|| hub.id.clone(), str::to_owned);
    let name = hub
        .name
        .clone()
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| format!("Hub {}", hub.id));

    let mut space = Space::new(space_id, name, hub.id.clone());
    space.security_state = security_state(hub.state.as_deref());

    for record in devices {
        if is_smart_lock(&record.device_type) {
            let lock_name = if record.device_name.is_empty() {
                SmartLock::placeholder_name(&record.id)
            } else {
                record.device_name.clone()
            };
            let lock = SmartLock::new(record.id.clone(), lock_name, space.id.clone());
            space.smart_locks.insert(record.id, lock);
            continue;
        }
        let device = Device::from(record);
        space.devices.insert(device.id.clone(), device);
    }
    if hub.groups_enabled {
        for record in groups {
            let group = Group::from(record);
            space.groups.insert(group.id.clone(), group);
        }
    }
    for record in video_edges {
        let edge = VideoEdge::from(record);
        space.video_edges.insert(edge.id.clone(), edge);
    }
    space
}
