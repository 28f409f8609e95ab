//! Harvest outlet
//!
//! A publish gate between a log harvester and an asynchronous publishing
//! client. The [`Outlet`] forwards events while open, closes its sink at most
//! once, and reports a publish that raced with `close` as `false` so the
//! harvester never records progress the sink may not have made.
//!
//! Around the gate this crate ships the pieces of a complete pipeline:
//! - [`Harvester`] reads lines and publishes them through the outlet
//! - [`NatsSink`] and [`LogSink`] are the publishing clients
//! - [`Acker`] turns sink acknowledgments into [`Registry`] updates
//! - [`PendingCounter`] lets shutdown wait for in-flight events

pub mod ack;
pub mod config;
pub mod counter;
pub mod error;
pub mod events;
pub mod harvester;
pub mod health;
pub mod metrics;
pub mod nats;
pub mod outlet;
pub mod registry;
pub mod sink;

#[cfg(test)]
mod testing;

pub use ack::Acker;
pub use config::OutletConfig;
pub use counter::PendingCounter;
pub use error::OutletError;
pub use events::{Envelope, Event, State};
pub use harvester::{HarvestSummary, Harvester};
pub use nats::NatsSink;
pub use outlet::Outlet;
pub use registry::Registry;
pub use sink::{InFlightCounter, LogSink, Sink};
