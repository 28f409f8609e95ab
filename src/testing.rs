//! Test doubles for the sink capabilities

use crate::error::OutletError;
use crate::events::Event;
use crate::sink::{InFlightCounter, Sink};
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::Mutex;

type Hook = Box<dyn Fn() + Send + Sync>;

/// Sink that records every call
#[derive(Default)]
pub struct RecordingSink {
    published: Mutex<Vec<Event>>,
    closes: AtomicUsize,
    close_error: Mutex<Option<OutletError>>,
    on_publish: Mutex<Option<Hook>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// The first close returns this error
    pub fn failing_close(error: OutletError) -> Self {
        let sink = Self::default();
        *sink.close_error.lock().unwrap() = Some(error);
        sink
    }

    /// Run `hook` inside every publish call, after the event was recorded
    pub fn set_on_publish(&self, hook: impl Fn() + Send + Sync + 'static) {
        *self.on_publish.lock().unwrap() = Some(Box::new(hook));
    }

    pub fn published(&self) -> Vec<Event> {
        self.published.lock().unwrap().clone()
    }

    pub fn publish_count(&self) -> usize {
        self.published.lock().unwrap().len()
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

impl Sink for RecordingSink {
    fn publish(&self, event: Event) {
        self.published.lock().unwrap().push(event);
        if let Some(hook) = self.on_publish.lock().unwrap().as_ref() {
            hook();
        }
    }

    fn close(&self) -> Result<(), OutletError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        match self.close_error.lock().unwrap().take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// Counter that sums every delta it receives
#[derive(Debug, Default)]
pub struct CountingCounter {
    total: AtomicI64,
    calls: AtomicUsize,
}

impl CountingCounter {
    pub fn total(&self) -> i64 {
        self.total.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl InFlightCounter for CountingCounter {
    fn add(&self, delta: i64) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.total.fetch_add(delta, Ordering::SeqCst);
    }
}
