//! Sink acknowledgment handling
//!
//! Sinks report the fate of every event they were handed through an
//! [`Acker`]: acknowledged events advance the registry, dropped ones only
//! release their pending slot.

use crate::counter::PendingCounter;
use crate::events::Event;
use crate::metrics::OutletMetrics;
use crate::registry::Registry;
use std::sync::Arc;
use tracing::trace;

pub struct Acker {
    registry: Arc<Registry>,
    pending: Arc<PendingCounter>,
    metrics: OutletMetrics,
}

impl Acker {
    pub fn new(registry: Arc<Registry>, pending: Arc<PendingCounter>, metrics: OutletMetrics) -> Self {
        Self {
            registry,
            pending,
            metrics,
        }
    }

    /// The sink confirmed the event
    pub fn acked(&self, event: &Event) {
        if let Some(state) = &event.private {
            self.registry.update(state);
        }
        self.pending.done();
        self.metrics.record_acked();
        trace!(event_id = %event.event_id, "Event acked");
    }

    /// The sink gave up on the event
    pub fn dropped(&self, event: &Event, reason: &'static str) {
        self.pending.done();
        self.metrics.record_dropped(reason);
        trace!(event_id = %event.event_id, reason, "Event dropped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::State;
    use crate::sink::InFlightCounter;

    fn acker() -> (Acker, Arc<Registry>, Arc<PendingCounter>) {
        let registry = Arc::new(Registry::new());
        let pending = Arc::new(PendingCounter::new());
        let acker = Acker::new(
            Arc::clone(&registry),
            Arc::clone(&pending),
            OutletMetrics::detached(),
        );
        (acker, registry, pending)
    }

    #[test]
    fn ack_advances_registry_and_releases_pending() {
        let (acker, registry, pending) = acker();
        pending.add(1);

        let mut event = Event::new(serde_json::Value::Null);
        event.private = Some(State::new("a.log", 17));
        acker.acked(&event);

        assert_eq!(registry.get("a.log").unwrap().offset, 17);
        assert_eq!(pending.pending(), 0);
    }

    #[test]
    fn ack_without_state_leaves_registry_alone() {
        let (acker, registry, pending) = acker();
        pending.add(1);

        acker.acked(&Event::new(serde_json::Value::Null));

        assert!(registry.is_empty());
        assert_eq!(pending.pending(), 0);
    }

    #[test]
    fn drop_releases_pending_only() {
        let (acker, registry, pending) = acker();
        pending.add(1);

        let mut event = Event::new(serde_json::Value::Null);
        event.private = Some(State::new("a.log", 17));
        acker.dropped(&event, "sink_closed");

        assert!(registry.get("a.log").is_none());
        assert_eq!(pending.pending(), 0);
    }
}
