use chrono::{DateTime, Utc};
use serde_json::Value;

use stream_api::{DecodeError, Event, RawEvent};

/// Field carrying the event category; always set by the protocol client.
pub const EVENT_TYPE_FIELD: &str = "eventType";
/// Optional field carrying the event time as epoch milliseconds.
pub const EVENT_DATE_FIELD: &str = "EventDate";

/// Routing metadata pulled out of a raw payload.
#[derive(Debug, Clone, PartialEq)]
pub struct EventMetadata {
    pub event_type: String,
    /// `None` when the payload carries no `EventDate`.
    pub timestamp: Option<DateTime<Utc>>,
}

impl EventMetadata {
    /// Remove and decode the metadata fields from `raw`.
    pub fn extract(raw: &mut RawEvent) -> Result<Self, DecodeError> {
        let event_type = match raw.take(EVENT_TYPE_FIELD) {
            Some(Value::String(s)) if !s.is_empty() => s,
            Some(Value::String(_)) | None | Some(Value::Null) => {
                return Err(DecodeError::MissingField(EVENT_TYPE_FIELD));
            }
            Some(_) => {
                return Err(DecodeError::MistypedField {
                    field: EVENT_TYPE_FIELD,
                    expected: "a string",
                });
            }
        };

        let timestamp = match raw.take(EVENT_DATE_FIELD) {
            None | Some(Value::Null) => None,
            Some(Value::Number(n)) => {
                let ms = n.as_i64().ok_or(DecodeError::MistypedField {
                    field: EVENT_DATE_FIELD,
                    expected: "integer epoch milliseconds",
                })?;
                let ts = DateTime::from_timestamp_millis(ms).ok_or(
                    DecodeError::TimestampOutOfRange {
                        field: EVENT_DATE_FIELD,
                        value: ms,
                    },
                )?;
                Some(ts)
            }
            Some(_) => {
                return Err(DecodeError::MistypedField {
                    field: EVENT_DATE_FIELD,
                    expected: "integer epoch milliseconds",
                });
            }
        };

        Ok(Self {
            event_type,
            timestamp,
        })
    }
}

/// Turn a raw payload into a normalized [`Event`].
///
/// Events without `EventDate` are stamped with the current time.
pub fn normalize(mut raw: RawEvent) -> Result<Event, DecodeError> {
    let meta = EventMetadata::extract(&mut raw)?;
    let timestamp = meta.timestamp.unwrap_or_else(Utc::now);
    Ok(Event::new(meta.event_type, raw.into_fields(), timestamp))
}
