//! Domain error types for the harvest outlet
//!
//! main.rs is the ONLY module allowed to use anyhow::Result (process boundary).
//! All library code returns Result<T, OutletError>.
//!
//! Note that the outlet itself never produces an error of its own: the only
//! error it surfaces is whatever its sink returned from `close`, passed through
//! unchanged.

use std::path::PathBuf;
use thiserror::Error;

/// Outlet domain errors
///
/// Every variant carries structured context fields for diagnostics.
///
/// Example log output:
/// ```text
/// OutletError::NatsPublishFailed { subject: "events.harvest", .. }
/// → "NATS publish failed for subject 'events.harvest'"
/// ```
#[derive(Error, Debug)]
pub enum OutletError {
    /// Sink was already closed (second close, or use after close)
    #[error("sink already closed")]
    SinkClosed,

    /// NATS connection failed
    #[error("NATS connection failed")]
    NatsConnectionFailed(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// JetStream stream could not be created or looked up
    #[error("NATS stream setup failed for stream '{stream}'")]
    NatsStreamSetup {
        stream: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// NATS publish failed for a specific subject
    #[error("NATS publish failed for subject '{subject}'")]
    NatsPublishFailed {
        subject: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Event or registry serialization failed
    #[error("serialization failed")]
    SerializationFailed(#[source] serde_json::Error),

    /// Registry file could not be read or written
    #[error("registry I/O failed for {}", .path.display())]
    Registry {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Harvester input could not be opened or read
    #[error("input I/O failed for {}", .path.display())]
    Input {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration error (environment variable missing or invalid)
    #[error("configuration error: {0}")]
    Config(String),

    /// Metrics recorder could not be installed
    #[error("metrics error: {0}")]
    Metrics(String),
}

impl OutletError {
    /// Returns a static label string suitable for Prometheus metrics.
    pub fn error_type_label(&self) -> &'static str {
        match self {
            Self::SinkClosed => "sink_closed",
            Self::NatsConnectionFailed(_) => "nats_connection",
            Self::NatsStreamSetup { .. } => "nats_stream",
            Self::NatsPublishFailed { .. } => "nats_publish",
            Self::SerializationFailed(_) => "serialization",
            Self::Registry { .. } => "registry",
            Self::Input { .. } => "input",
            Self::Config(_) => "config",
            Self::Metrics(_) => "metrics",
        }
    }
}
