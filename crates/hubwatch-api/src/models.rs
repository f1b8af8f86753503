// Wire models for the Ajax cloud REST API.
//
// Every record keeps unknown fields in `extra` so the core can surface
// model-specific attributes without the api crate knowing about them.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Response body of `POST /login`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub session_token: String,
    pub user_id: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// One entry of `GET /user/{id}/hubs`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HubSummary {
    pub hub_id: String,
    #[serde(default)]
    pub hub_binding_role: Option<String>,
}

/// Hub detail. The hub doubles as the space in the cloud model.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HubRecord {
    #[serde(alias = "hubId")]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    /// `ARMED`, `DISARMED`, `NIGHT_MODE`, `PARTIALLY_ARMED`, ...
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub groups_enabled: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceRecord {
    pub id: String,
    #[serde(default)]
    pub device_name: String,
    /// Exact vendor model name, e.g. `LightSwitchTwoGang` or `MotionProtect`.
    #[serde(default)]
    pub device_type: String,
    #[serde(default)]
    pub online: Option<bool>,
    #[serde(default)]
    pub room_id: Option<String>,
    #[serde(default)]
    pub group_id: Option<String>,
    #[serde(default)]
    pub battery_charge_level_percentage: Option<u8>,
    #[serde(default)]
    pub signal_level: Option<String>,
    #[serde(default)]
    pub firmware_version: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupRecord {
    pub id: String,
    #[serde(default)]
    pub group_name: String,
    #[serde(default)]
    pub state: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoEdgeRecord {
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// `NVR`, `CAMERA`, `DOORBELL`, ...
    #[serde(default)]
    pub video_edge_type: Option<String>,
    #[serde(default)]
    pub ip: Option<String>,
    #[serde(default)]
    pub mac: Option<String>,
    #[serde(default)]
    pub channels: Vec<VideoChannelRecord>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoChannelRecord {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub source_aliases: Option<SourceAliases>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SourceAliases {
    #[serde(default)]
    pub sources: Vec<SourceAlias>,
}

/// A recording source of an NVR channel.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceAlias {
    #[serde(default)]
    pub source_type: Option<String>,
    #[serde(default)]
    pub video_edge_id: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn device_record_keeps_unknown_fields() {
        let json = serde_json::json!({
            "id": "30A1B2C3",
            "deviceName": "Hallway",
            "deviceType": "MotionProtect",
            "online": true,
            "sensitivity": 2,
            "nightModeArm": false
        });
        let device: DeviceRecord = serde_json::from_value(json).unwrap();
        assert_eq!(device.device_name, "Hallway");
        assert_eq!(device.extra["sensitivity"], 2);
        assert_eq!(device.extra["nightModeArm"], false);
    }

    #[test]
    fn hub_record_accepts_hub_id_alias() {
        let hub: HubRecord =
            serde_json::from_value(serde_json::json!({ "hubId": "0003A1F0", "state": "DISARMED" }))
                .unwrap();
        assert_eq!(hub.id, "0003A1F0");
        assert_eq!(hub.state.as_deref(), Some("DISARMED"));
        assert!(!hub.groups_enabled);
    }

    #[test]
    fn nvr_channel_sources_parse() {
        let channel: VideoChannelRecord = serde_json::from_value(serde_json::json!({
            "id": "ch-1",
            "name": "Garage",
            "sourceAliases": {
                "sources": [{ "sourceType": "PRIMARY", "videoEdgeId": "cam-9" }]
            }
        }))
        .unwrap();
        let sources = channel.source_aliases.unwrap().sources;
        assert_eq!(sources[0].video_edge_id.as_deref(), Some("cam-9"));
    }
}
