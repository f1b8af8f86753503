// ── Payload normalization ──
//
// The cloud and the event proxy send the same event in different shapes:
// nested under `event` or flat, with the source described by `device`,
// `source` or a family of flat aliases. This module folds all of them
// into one `PushEvent`.

use serde_json::{Map, Value};
use strum::{AsRefStr, Display};
use thiserror::Error;

/// Direction of a state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Transition {
    Triggered,
    Recovered,
}

impl Transition {
    pub fn from_wire(value: &str) -> Option<Self> {
        match value.to_ascii_uppercase().as_str() {
            "TRIGGERED" => Some(Self::Triggered),
            "RECOVERED" => Some(Self::Recovered),
            _ => None,
        }
    }

    /// Derive a transition from an event code such as `M_01_20`.
    ///
    /// Even trailing numbers are triggers, odd ones recoveries.
    pub fn from_event_code(code: &str) -> Option<Self> {
        let number: u32 = code.rsplit('_').next()?.parse().ok()?;
        Some(if number % 2 == 0 {
            Self::Triggered
        } else {
            Self::Recovered
        })
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IngestError {
    #[error("payload is not a JSON object")]
    NotAnObject,
    #[error("event has no eventTag")]
    MissingTag,
    #[error("event has no hubId")]
    MissingHubId,
}

/// Who or what started a scenario.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Initiator {
    pub name: String,
    pub object_type: Option<String>,
}

/// A normalized push event. Lives for one dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct PushEvent {
    /// Lower-cased event tag.
    pub tag: String,
    pub hub_id: String,
    pub code: Option<String>,
    /// Explicit `transition` field, else derived from the event code.
    pub transition: Option<Transition>,
    pub source_id: String,
    pub source_name: String,
    pub source_type: String,
    pub event_type_v2: String,
    /// Only set for group arm/disarm.
    pub group_id: Option<String>,
    /// The event object (the inner one for nested payloads).
    pub raw: Map<String, Value>,
}

impl PushEvent {
    pub fn from_payload(payload: &Value) -> Result<Self, IngestError> {
        let outer = payload.as_object().ok_or(IngestError::NotAnObject)?;
        let event = match outer.get("event") {
            Some(Value::Object(inner)) => inner,
            _ => outer,
        };

        let tag = text(event.get("eventTag"))
            .map(|t| t.to_ascii_lowercase())
            .ok_or(IngestError::MissingTag)?;
        let hub_id = text(event.get("hubId")).ok_or(IngestError::MissingHubId)?;

        let device = event.get("device").and_then(Value::as_object);
        let source = event.get("source").and_then(Value::as_object);
        let nested = |obj: Option<&Map<String, Value>>, key: &str| obj.and_then(|o| text(o.get(key)));

        let source_name = nested(device, "name")
            .or_else(|| nested(source, "name"))
            .or_else(|| text(event.get("sourceObjectName")))
            .or_else(|| text(event.get("sourceName")))
            .unwrap_or_default();
        let source_id = nested(device, "id")
            .or_else(|| text(event.get("sourceObjectId")))
            .or_else(|| text(event.get("deviceId")))
            .unwrap_or_default();
        let source_type = nested(device, "type")
            .or_else(|| nested(source, "type"))
            .or_else(|| text(event.get("sourceObjectType")))
            .or_else(|| text(event.get("sourceType")))
            .unwrap_or_default();

        let code = text(event.get("eventCode"));
        let transition = text(event.get("transition"))
            .and_then(|t| Transition::from_wire(&t))
            .or_else(|| code.as_deref().and_then(Transition::from_event_code));

        let group_id = if super::is_group_security_tag(&tag) {
            event
                .get("additionalData")
                .and_then(|d| d.get("relatedGroupsInfo"))
                .and_then(Value::as_array)
                .and_then(|groups| groups.first())
                .and_then(|g| text(g.get("id")))
        } else {
            None
        };

        Ok(Self {
            tag,
            hub_id,
            code,
            transition,
            source_id,
            source_name,
            source_type,
            event_type_v2: text(event.get("eventTypeV2")).unwrap_or_default(),
            group_id,
            raw: event.clone(),
        })
    }

    /// Transition label used for deduplication. Absent reads as `TRIGGERED`.
    pub fn transition_label(&self) -> &'static str {
        match self.transition {
            Some(Transition::Recovered) => "RECOVERED",
            Some(Transition::Triggered) | None => "TRIGGERED",
        }
    }

    /// The user the cloud credits with the change, if any.
    pub fn changed_by(&self) -> Option<String> {
        self.raw
            .get("additionalData")
            .and_then(|d| text(d.get("sourceUserName")))
    }

    /// The `INITIATOR_INFO` entry of `additionalDataV2`.
    pub fn initiator(&self) -> Option<Initiator> {
        let entries = self.raw.get("additionalDataV2")?.as_array()?;
        let info = entries.iter().find(|entry| {
            entry.get("additionalDataV2Type").and_then(Value::as_str) == Some("INITIATOR_INFO")
        })?;
        Some(Initiator {
            name: text(info.get("objectName"))?,
            object_type: text(info.get("objectType")),
        })
    }
}

/// Non-empty string, with numbers stringified.
fn text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
