//! NATS event sink
//!
//! `publish` only enqueues; a background worker serializes each event,
//! publishes it to JetStream, waits for the stream ack and reports the
//! outcome to the [`Acker`].

use crate::ack::Acker;
use crate::error::OutletError;
use crate::events::Event;
use crate::sink::Sink;
use async_nats::jetstream::{self, Context as JsContext};
use async_nats::Client;
use async_nats::connection::State as ConnectionState;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Retention for the harvest stream
const STREAM_MAX_AGE: Duration = Duration::from_secs(300);

/// Subject prefix covered by the harvest stream
pub const SUBJECT_PREFIX: &str = "events";

/// Build a subject under the stream prefix, e.g. `harvest` → `events.harvest`
pub fn subject_for(name: &str) -> String {
    if name.starts_with(&format!("{SUBJECT_PREFIX}.")) {
        return name.to_string();
    }
    format!("{}.{}", SUBJECT_PREFIX, name.replace(['.', ' '], "_"))
}

/// JetStream-backed sink
pub struct NatsSink {
    subject: String,
    acker: Arc<Acker>,
    client: Option<Client>,
    tx: Mutex<Option<mpsc::UnboundedSender<Event>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    worker_running: Arc<AtomicBool>,
}

impl NatsSink {
    /// Connect to NATS, ensure the stream exists and start the publish worker
    pub async fn connect(
        servers: &str,
        subject: &str,
        stream: &str,
        acker: Arc<Acker>,
    ) -> Result<Arc<Self>, OutletError> {
        info!(servers, "Connecting to NATS");

        let client = async_nats::connect(servers)
            .await
            .map_err(|e| OutletError::NatsConnectionFailed(Box::new(e)))?;

        let jetstream = jetstream::new(client.clone());
        ensure_stream(&jetstream, stream).await?;

        let subject = subject_for(subject);
        info!(stream, subject = %subject, "Connected to NATS JetStream");

        let (tx, rx) = mpsc::unbounded_channel();
        let mut sink = Self::with_sender(subject.clone(), Arc::clone(&acker), tx);

        let worker = tokio::spawn(run_worker(
            rx,
            client.clone(),
            jetstream,
            subject,
            acker,
            Arc::clone(&sink.worker_running),
        ));

        sink.client = Some(client);
        sink.worker = Mutex::new(Some(worker));
        Ok(Arc::new(sink))
    }

    /// Sink feeding `tx`; whoever owns the receiving end publishes the events
    pub fn with_sender(subject: String, acker: Arc<Acker>, tx: mpsc::UnboundedSender<Event>) -> Self {
        Self {
            subject,
            acker,
            client: None,
            tx: Mutex::new(Some(tx)),
            worker: Mutex::new(None),
            worker_running: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Worker is running and the client currently holds a server connection
    pub fn is_connected(&self) -> bool {
        let connected = self
            .client
            .as_ref()
            .map_or(true, |c| c.connection_state() == ConnectionState::Connected);
        connected && self.worker_running.load(Ordering::SeqCst)
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Wait for the worker to finish draining after [`Sink::close`]
    pub async fn wait_closed(&self) {
        let worker = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some(worker) = worker {
            if let Err(e) = worker.await {
                error!(error = %e, "NATS publish worker panicked");
            }
        }
    }

    fn sender(&self) -> Option<mpsc::UnboundedSender<Event>> {
        self.tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Sink for NatsSink {
    fn publish(&self, event: Event) {
        let Some(tx) = self.sender() else {
            debug!(event_id = %event.event_id, "NATS sink closed, dropping event");
            self.acker.dropped(&event, "sink_closed");
            return;
        };

        if let Err(mpsc::error::SendError(event)) = tx.send(event) {
            warn!(event_id = %event.event_id, "NATS worker gone, dropping event");
            self.acker.dropped(&event, "worker_stopped");
        }
    }

    /// Stop accepting events. Queued events are still published by the worker.
    fn close(&self) -> Result<(), OutletError> {
        let tx = self.tx.lock().unwrap_or_else(PoisonError::into_inner).take();

        match tx {
            Some(_) => {
                info!(subject = %self.subject, "Closing NATS sink");
                Ok(())
            }
            None => Err(OutletError::SinkClosed),
        }
    }
}

async fn run_worker(
    mut rx: mpsc::UnboundedReceiver<Event>,
    client: Client,
    jetstream: JsContext,
    subject: String,
    acker: Arc<Acker>,
    worker_running: Arc<AtomicBool>,
) {
    while let Some(event) = rx.recv().await {
        match publish_one(&jetstream, &subject, &event).await {
            Ok(seq) => {
                debug!(subject = %subject, event_id = %event.event_id, seq, "Event published");
                acker.acked(&event);
            }
            Err(e) => {
                warn!(subject = %subject, event_id = %event.event_id, error = %e, "Failed to publish event");
                acker.dropped(&event, e.error_type_label());
            }
        }
    }

    worker_running.store(false, Ordering::SeqCst);

    if let Err(e) = client.flush().await {
        warn!(error = %e, "Failed to flush NATS connection");
    }
    info!(subject = %subject, "NATS publish worker stopped");
}

/// Publish one event and wait for the JetStream ack. Returns the stream sequence.
async fn publish_one(jetstream: &JsContext, subject: &str, event: &Event) -> Result<u64, OutletError> {
    let payload = serde_json::to_vec(event).map_err(OutletError::SerializationFailed)?;

    let publish_err = |e: jetstream::context::PublishError| OutletError::NatsPublishFailed {
        subject: subject.to_string(),
        source: Box::new(e),
    };

    let ack = jetstream
        .publish(subject.to_string(), payload.into())
        .await
        .map_err(publish_err)?
        .await
        .map_err(publish_err)?;

    Ok(ack.sequence)
}

/// Ensure the harvest stream exists, covering every subject under the prefix
pub async fn ensure_stream(js: &JsContext, name: &str) -> Result<(), OutletError> {
    use async_nats::jetstream::stream::{Config, RetentionPolicy, StorageType};

    let config = Config {
        name: name.to_string(),
        subjects: vec![format!("{SUBJECT_PREFIX}.>")],
        retention: RetentionPolicy::Limits,
        max_age: STREAM_MAX_AGE,
        storage: StorageType::File,
        ..Default::default()
    };

    match js.get_or_create_stream(config).await {
        Ok(_) => {
            info!(stream = name, "Stream ready");
            Ok(())
        }
        Err(e) => {
            error!(stream = name, error = %e, "Failed to set up stream");
            Err(OutletError::NatsStreamSetup {
                stream: name.to_string(),
                source: Box::new(e),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::counter::PendingCounter;
    use crate::events::State;
    use crate::metrics::OutletMetrics;
    use crate::registry::Registry;
    use crate::sink::InFlightCounter;

    fn sink() -> (NatsSink, mpsc::UnboundedReceiver<Event>, Arc<Registry>, Arc<PendingCounter>) {
        let registry = Arc::new(Registry::new());
        let pending = Arc::new(PendingCounter::new());
        let acker = Arc::new(Acker::new(
            Arc::clone(&registry),
            Arc::clone(&pending),
            OutletMetrics::detached(),
        ));
        let (tx, rx) = mpsc::unbounded_channel();
        let sink = NatsSink::with_sender(subject_for("harvest"), acker, tx);
        (sink, rx, registry, pending)
    }

    fn event_at(offset: u64) -> Event {
        let mut event = Event::new(serde_json::json!({ "message": "line" }));
        event.private = Some(State::new("a.log", offset));
        event
    }

    #[test]
    fn publish_enqueues_for_worker() {
        let (sink, mut rx, registry, pending) = sink();
        pending.add(1);

        let event = event_at(5);
        sink.publish(event.clone());

        assert_eq!(rx.try_recv().unwrap(), event);
        // Nothing is acked until the worker hears back from JetStream
        assert_eq!(pending.pending(), 1);
        assert!(registry.is_empty());
    }

    #[test]
    fn publish_after_close_drops() {
        let (sink, mut rx, registry, pending) = sink();
        sink.close().unwrap();

        pending.add(1);
        sink.publish(event_at(5));

        assert_eq!(pending.pending(), 0);
        assert!(registry.is_empty());
        assert!(matches!(
            rx.try_recv(),
            Err(mpsc::error::TryRecvError::Disconnected)
        ));
    }

    #[test]
    fn publish_after_worker_exit_drops() {
        let (sink, rx, _, pending) = sink();
        drop(rx);

        pending.add(1);
        sink.publish(event_at(5));

        assert_eq!(pending.pending(), 0);
    }

    #[test]
    fn second_close_fails() {
        let (sink, _rx, _, _) = sink();
        assert!(sink.close().is_ok());
        assert!(matches!(sink.close(), Err(OutletError::SinkClosed)));
    }

    #[test]
    fn not_connected_once_worker_stopped() {
        let (sink, _rx, _, _) = sink();
        assert!(sink.is_connected());

        sink.worker_running.store(false, Ordering::SeqCst);
        assert!(!sink.is_connected());
    }

    #[tokio::test]
    async fn wait_closed_without_worker_returns() {
        let (sink, _rx, _, _) = sink();
        sink.close().unwrap();
        sink.wait_closed().await;
    }

    #[test]
    fn subject_for_plain_name() {
        assert_eq!(subject_for("harvest"), "events.harvest");
    }

    #[test]
    fn subject_for_keeps_prefixed_subject() {
        assert_eq!(subject_for("events.harvest"), "events.harvest");
    }

    #[test]
    fn subject_for_flattens_separators() {
        assert_eq!(subject_for("app.access log"), "events.app_access_log");
    }
}
