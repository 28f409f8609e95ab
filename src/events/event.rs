//! Event payload and position state

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Milliseconds since the unix epoch.
pub fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Position of a harvested source.
///
/// Attached to events as private metadata so an acknowledgment can be mapped
/// back to the offset the producer reached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct State {
    /// Source identifier (the harvested file path)
    pub source: String,
    /// Byte offset just past the last line covered by this state
    pub offset: u64,
    /// Unix millis when the state was taken
    pub timestamp: u64,
    /// Source was fully read and closed
    #[serde(default)]
    pub finished: bool,
}

impl State {
    pub fn new(source: impl Into<String>, offset: u64) -> Self {
        Self {
            source: source.into(),
            offset,
            timestamp: now_millis(),
            finished: false,
        }
    }
}

/// Event handed to a sink.
///
/// `private` travels with the event through the sink but is never part of
/// the wire format.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    pub event_id: String,
    pub timestamp: u64,
    pub fields: serde_json::Value,
    #[serde(skip)]
    pub private: Option<State>,
}

impl Event {
    /// Create an event with a fresh id and the current timestamp
    pub fn new(fields: serde_json::Value) -> Self {
        Self {
            event_id: Uuid::new_v4().to_string(),
            timestamp: now_millis(),
            fields,
            private: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn private_state_is_not_serialized() {
        let mut event = Event::new(serde_json::json!({ "message": "hello" }));
        event.private = Some(State::new("/var/log/app.log", 6));

        let json = serde_json::to_value(&event).unwrap();
        let obj = json.as_object().unwrap();
        assert!(obj.contains_key("event_id"));
        assert!(obj.contains_key("timestamp"));
        assert_eq!(obj["fields"]["message"], "hello");
        assert!(!obj.contains_key("private"));
    }

    #[test]
    fn event_ids_are_uuids() {
        let event = Event::new(serde_json::Value::Null);
        assert!(Uuid::parse_str(&event.event_id).is_ok());
    }

    #[test]
    fn state_finished_defaults_to_false() {
        let state: State =
            serde_json::from_str(r#"{"source":"a.log","offset":10,"timestamp":0}"#).unwrap();
        assert_eq!(state.offset, 10);
        assert!(!state.finished);
    }
}
