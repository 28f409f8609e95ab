//! Envelope carrying an event and its optional position state

use super::{Event, State};

/// Harvester output: one event plus the state reached after producing it.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    event: Event,
    state: Option<State>,
}

impl Envelope {
    pub fn new(event: Event) -> Self {
        Self { event, state: None }
    }

    pub fn with_state(event: Event, state: State) -> Self {
        Self {
            event,
            state: Some(state),
        }
    }

    /// Returns a copy of the carried event; the envelope itself is never modified
    pub fn event(&self) -> Event {
        self.event.clone()
    }

    pub fn has_state(&self) -> bool {
        self.state.is_some()
    }

    pub fn state(&self) -> Option<&State> {
        self.state.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_without_state() {
        let envelope = Envelope::new(Event::new(serde_json::json!({ "message": "a" })));
        assert!(!envelope.has_state());
        assert!(envelope.state().is_none());
    }

    #[test]
    fn event_copy_is_detached_from_envelope() {
        let state = State::new("a.log", 2);
        let envelope = Envelope::with_state(Event::new(serde_json::Value::Null), state.clone());

        let mut copy = envelope.event();
        copy.private = Some(state.clone());

        assert!(envelope.has_state());
        assert_eq!(envelope.state(), Some(&state));
        assert!(envelope.event().private.is_none());
    }
}
