//! Event model
//!
//! Events produced by the harvester, the position state attached to them,
//! and the envelope that carries both into the outlet.

mod envelope;
mod event;

pub use envelope::Envelope;
pub use event::{now_millis, Event, State};
