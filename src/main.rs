//! Harvest Outlet - forwards harvested log lines to NATS JetStream
//!
//! This binary:
//! - Harvests a file from its last acknowledged offset
//! - Publishes every line through the outlet to NATS (or the log in local mode)
//! - Persists acknowledged offsets to the registry on shutdown
//! - Exposes health/ready endpoints and Prometheus metrics

use anyhow::Result;
use harvest_outlet::health::{self, AppState};
use harvest_outlet::metrics::OutletMetrics;
use harvest_outlet::{
    Acker, Harvester, InFlightCounter, LogSink, NatsSink, Outlet, OutletConfig, PendingCounter,
    Registry, Sink,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first to get log level
    let config = OutletConfig::from_env()?;

    // Initialize tracing with configured log level
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(format!("harvest_outlet={}", config.log_level).parse()?)
                .add_directive("async_nats=warn".parse()?),
        )
        .json()
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        input = %config.input_path.display(),
        registry = %config.registry_path.display(),
        "Starting Harvest Outlet"
    );

    let metrics = OutletMetrics::install()?;
    info!("Prometheus metrics initialized");

    let registry = Arc::new(Registry::load(&config.registry_path).await?);
    let pending = Arc::new(PendingCounter::new());
    let acker = Arc::new(Acker::new(
        Arc::clone(&registry),
        Arc::clone(&pending),
        metrics.clone(),
    ));

    // Connect to NATS if configured
    let nats = match config.nats_url {
        Some(ref url) => {
            let sink = NatsSink::connect(url, &config.nats_subject, &config.nats_stream, Arc::clone(&acker))
                .await
                .inspect_err(|e| metrics.record_error(e))?;
            info!(url = %url, subject = sink.subject(), "Connected to NATS");
            Some(sink)
        }
        None => {
            info!("No NATS_URL configured - running in local mode");
            None
        }
    };

    let sink: Arc<dyn Sink> = match nats {
        Some(ref nats) => Arc::clone(nats) as Arc<dyn Sink>,
        None => Arc::new(LogSink::new(Arc::clone(&acker))),
    };

    let counter: Arc<dyn InFlightCounter> = Arc::clone(&pending) as Arc<dyn InFlightCounter>;
    let outlet = Arc::new(Outlet::new(sink, Some(counter)));

    // Start health server
    let app_state = AppState {
        outlet: Arc::clone(&outlet),
        nats: nats.clone(),
        pending: Arc::clone(&pending),
        registry: Arc::clone(&registry),
        metrics: metrics.clone(),
    };

    let addr: SocketAddr = ([0, 0, 0, 0], config.http_port).into();
    info!(port = config.http_port, "Starting HTTP server");

    let http_server = axum::serve(
        tokio::net::TcpListener::bind(addr).await?,
        health::router(app_state),
    );
    let http_task = tokio::spawn(async move {
        if let Err(e) = http_server.await {
            error!(error = %e, "HTTP server error");
        }
    });

    // Resume from the last acknowledged offset
    let source = config.input_path.display().to_string();
    let offset = registry.get(&source).map_or(0, |state| state.offset);
    let mut harvester = Harvester::new(
        config.input_path.clone(),
        offset,
        Arc::clone(&outlet),
        metrics.clone(),
    );

    tokio::select! {
        result = harvester.run_file() => {
            match result {
                Ok(summary) => info!(
                    lines = summary.lines_read,
                    published = summary.published,
                    offset = summary.last_state.offset,
                    "Harvester finished"
                ),
                Err(e) => {
                    metrics.record_error(&e);
                    error!(error = %e, "Harvester failed");
                }
            }
        }
        _ = shutdown_signal() => {
            info!("Shutdown signal received");
        }
    }

    // Graceful shutdown
    info!("Shutting down outlet...");

    if let Err(e) = outlet.close() {
        metrics.record_error(&e);
        error!(error = %e, "Failed to close sink");
    }

    let drained = tokio::time::timeout(config.drain_timeout, async {
        pending.wait().await;
        if let Some(ref nats) = nats {
            nats.wait_closed().await;
        }
    })
    .await
    .is_ok();

    if !drained {
        warn!(
            pending = pending.pending(),
            timeout_secs = config.drain_timeout.as_secs(),
            "Shutdown drain timed out; unacknowledged events will be resent"
        );
    }

    registry.flush(&config.registry_path).await?;
    info!(sources = registry.len(), "Registry persisted");

    http_task.abort();
    info!("Outlet shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (SIGTERM or SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
