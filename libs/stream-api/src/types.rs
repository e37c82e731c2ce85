use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ════════════════════════════════════════════════════════════════
//  Replay
// ════════════════════════════════════════════════════════════════

/// Where a subscription starts reading a topic's retained history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplayPreset {
    /// Oldest event still retained by the service.
    #[serde(alias = "EARLIEST")]
    Earliest,
    /// Only events published after the subscription is established.
    #[default]
    #[serde(alias = "LATEST")]
    Latest,
    /// Resume right after a specific [`ReplayId`].
    #[serde(alias = "CUSTOM")]
    Custom,
}

impl std::fmt::Display for ReplayPreset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReplayPreset::Earliest => f.write_str("EARLIEST"),
            ReplayPreset::Latest => f.write_str("LATEST"),
            ReplayPreset::Custom => f.write_str("CUSTOM"),
        }
    }
}

/// Opaque, service-assigned position in a topic's event history.
///
/// The bytes are never interpreted locally; they are only handed back to
/// the service on the next subscribe call.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ReplayId(Vec<u8>);

impl ReplayId {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Parse the base64 form used in configuration files.
    pub fn from_base64(encoded: &str) -> Result<Self, base64::DecodeError> {
        STANDARD.decode(encoded.trim()).map(Self)
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.0)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Debug for ReplayId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ReplayId({})", self.to_base64())
    }
}

impl std::fmt::Display for ReplayId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_base64())
    }
}

// ════════════════════════════════════════════════════════════════
//  Topic metadata / subscribe request
// ════════════════════════════════════════════════════════════════

/// Topic metadata returned by a lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicInfo {
    pub name: String,
    /// Whether the authenticated user may subscribe to this topic.
    pub can_subscribe: bool,
}

/// Parameters of a single subscribe call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscribeRequest {
    pub topic: String,
    pub preset: ReplayPreset,
    /// Set iff `preset == Custom`.
    pub replay_id: Option<ReplayId>,
    /// Number of events requested from the service per flow-control round.
    pub num_requested: u32,
}

// ════════════════════════════════════════════════════════════════
//  RawEvent
// ════════════════════════════════════════════════════════════════

/// Decoded event payload as produced by a protocol client: untyped
/// field name → value mapping.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawEvent(Map<String, Value>);

impl RawEvent {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Build from a JSON value; `None` unless the value is an object.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(fields) => Some(Self(fields)),
            _ => None,
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Remove a field, returning its value.
    pub fn take(&mut self, field: &str) -> Option<Value> {
        self.0.remove(field)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_fields(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for RawEvent {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

// ════════════════════════════════════════════════════════════════
//  Event
// ════════════════════════════════════════════════════════════════

/// Normalized event handed to the downstream pipeline.
///
/// Routing metadata lives in `event_type` and `timestamp`; `payload`
/// carries the remaining fields with metadata removed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    #[serde(rename = "eventType")]
    event_type: String,
    timestamp: DateTime<Utc>,
    payload: Map<String, Value>,
}

impl Event {
    pub fn new(event_type: String, payload: Map<String, Value>, timestamp: DateTime<Utc>) -> Self {
        Self {
            event_type,
            timestamp,
            payload,
        }
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn payload(&self) -> &Map<String, Value> {
        &self.payload
    }
}
