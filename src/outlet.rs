//! Publish gate between a harvester and an asynchronous sink
//!
//! ```text
//!            publish(envelope)                     close()
//!                  │                                  │
//!     open? ──no──► false                   swap(open, false)
//!       │yes                                          │
//!   attach state, counter.add(1)          was open? ──no──► Ok(())
//!   sink.publish(event)                               │yes
//!       │                                       sink.close()
//!   return open                                (result verbatim)
//! ```
//!
//! The outlet never serializes `publish` against `close`. The sink is
//! asynchronous, and holding a lock across `sink.publish` would make a
//! concurrent `close` wait on it (and vice versa).

use crate::error::OutletError;
use crate::events::Envelope;
use crate::sink::{InFlightCounter, Sink};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, trace};

/// Gate forwarding harvested events to a sink that may be closed at any time.
///
/// The sink and counter are shared handles owned by the caller; the outlet
/// only closes the sink, and does so at most once.
pub struct Outlet {
    sink: Arc<dyn Sink>,
    counter: Option<Arc<dyn InFlightCounter>>,
    open: AtomicBool,
}

impl Outlet {
    pub fn new(sink: Arc<dyn Sink>, counter: Option<Arc<dyn InFlightCounter>>) -> Self {
        Self {
            sink,
            counter,
            open: AtomicBool::new(true),
        }
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    /// Close the outlet and its sink.
    ///
    /// Only the call that flips the outlet from open to closed closes the
    /// sink and receives its result. Every other call returns `Ok(())`.
    pub fn close(&self) -> Result<(), OutletError> {
        if self.open.swap(false, Ordering::SeqCst) {
            debug!("Outlet closed, closing sink");
            return self.sink.close();
        }
        Ok(())
    }

    /// Forward one envelope's event to the sink.
    ///
    /// Returns `false` without touching the sink once the outlet is closed.
    /// Otherwise the event is handed to the sink and the return value is
    /// whether the outlet was still open afterwards.
    ///
    /// # Shutdown race
    ///
    /// A `close` may land between the open check and the sink call. The
    /// sink is asynchronous, so there is no way to tell whether the event
    /// made it through before the sink shut down. Such a publish returns
    /// `false`: the event may still be delivered, but the caller must not
    /// advance its position to it. On shutdown this can leave the
    /// persisted position behind the last delivered event, so some events
    /// are sent again on restart; it never records progress the sink did
    /// not make.
    pub fn publish(&self, envelope: &Envelope) -> bool {
        if !self.is_open() {
            trace!("Outlet closed, rejecting event");
            return false;
        }

        let mut event = envelope.event();
        if let Some(state) = envelope.state() {
            event.private = Some(state.clone());
        }

        if let Some(counter) = &self.counter {
            counter.add(1);
        }

        self.sink.publish(event);

        self.is_open()
    }
}

impl fmt::Debug for Outlet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Outlet")
            .field("open", &self.is_open())
            .field("counter", &self.counter.is_some())
            .finish_non_exhaustive()
    }
}
