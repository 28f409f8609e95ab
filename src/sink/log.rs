//! Local-mode sink
//!
//! Used when no NATS server is configured: every event is written to the log
//! and acknowledged on the spot.

use super::Sink;
use crate::ack::Acker;
use crate::error::OutletError;
use crate::events::Event;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

pub struct LogSink {
    acker: Arc<Acker>,
    closed: AtomicBool,
}

impl LogSink {
    pub fn new(acker: Arc<Acker>) -> Self {
        Self {
            acker,
            closed: AtomicBool::new(false),
        }
    }
}

impl Sink for LogSink {
    fn publish(&self, event: Event) {
        if self.closed.load(Ordering::SeqCst) {
            debug!(event_id = %event.event_id, "Sink closed, dropping event");
            self.acker.dropped(&event, "sink_closed");
            return;
        }

        info!(
            event_id = %event.event_id,
            timestamp = event.timestamp,
            fields = %event.fields,
            "Event"
        );
        self.acker.acked(&event);
    }

    fn close(&self) -> Result<(), OutletError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Err(OutletError::SinkClosed);
        }
        info!("Log sink closed");
        Ok(())
    }
}
