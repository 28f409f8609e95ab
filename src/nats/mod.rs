//! NATS JetStream integration
//!
//! Publishes harvested events to a JetStream stream.

mod publisher;

pub use publisher::{ensure_stream, subject_for, NatsSink};
