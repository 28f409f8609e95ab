//! Outlet configuration module
//!
//! Handles loading configuration from environment variables.

use crate::error::OutletError;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Outlet configuration
#[derive(Debug, Clone)]
pub struct OutletConfig {
    /// File to harvest
    pub input_path: PathBuf,

    /// Where acknowledged positions are persisted
    pub registry_path: PathBuf,

    /// NATS server URL(s) - comma-separated for multiple servers.
    /// Unset means local mode (events are logged).
    pub nats_url: Option<String>,

    /// Subject events are published to
    pub nats_subject: String,

    /// JetStream stream holding the subjects
    pub nats_stream: String,

    /// Health/metrics HTTP port
    pub http_port: u16,

    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// How long shutdown waits for pending events
    pub drain_timeout: Duration,
}

impl OutletConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, OutletError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, OutletError> {
        let input_path = lookup("INPUT_PATH")
            .map(PathBuf::from)
            .ok_or_else(|| OutletError::Config("INPUT_PATH must be set".to_string()))?;

        let registry_path = lookup("REGISTRY_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("data/registry.json"));

        let nats_url = lookup("NATS_URL").filter(|url| !url.trim().is_empty());

        let nats_subject = lookup("NATS_SUBJECT").unwrap_or_else(|| "events.harvest".to_string());
        let nats_stream = lookup("NATS_STREAM").unwrap_or_else(|| "HARVEST".to_string());

        let http_port = parse_var(
            lookup("HTTP_PORT").or_else(|| lookup("METRICS_PORT")), // Backwards compat
            9090,
            "HTTP_PORT must be a valid port number",
        )?;

        let log_level = lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string());

        let drain_timeout = Duration::from_secs(parse_var(
            lookup("DRAIN_TIMEOUT_SECS"),
            5,
            "DRAIN_TIMEOUT_SECS must be a valid number",
        )?);

        Ok(Self {
            input_path,
            registry_path,
            nats_url,
            nats_subject,
            nats_stream,
            http_port,
            log_level,
            drain_timeout,
        })
    }
}

fn parse_var<T>(value: Option<String>, default: T, message: &str) -> Result<T, OutletError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| OutletError::Config(format!("{message}: {e}"))),
    }
}
