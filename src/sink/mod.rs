//! Sink capabilities
//!
//! The outlet talks to its downstream client and its pending counter only
//! through these traits, so any publishing client (NATS, local logging, a
//! test double) can sit behind it.

mod log;

pub use log::LogSink;

use crate::error::OutletError;
use crate::events::Event;

/// Asynchronous publishing client.
pub trait Sink: Send + Sync {
    /// Hand an event to the client.
    ///
    /// Must not wait for acknowledgment. Must tolerate being called after
    /// [`Sink::close`] without panicking; such events are dropped.
    fn publish(&self, event: Event);

    /// Close the client. May block while the client shuts down.
    fn close(&self) -> Result<(), OutletError>;
}

/// Counter of events handed to a sink but not yet acknowledged.
pub trait InFlightCounter: Send + Sync {
    fn add(&self, delta: i64);
}
