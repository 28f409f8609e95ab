//! Line harvester
//!
//! Reads newline-delimited input and pushes one envelope per line through the
//! outlet. The harvester only moves its own state forward when the outlet
//! confirms a publish; on the first refused publish it stops.

use crate::error::OutletError;
use crate::events::{Envelope, Event, State};
use crate::metrics::OutletMetrics;
use crate::outlet::Outlet;
use std::io::SeekFrom;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncSeekExt, BufReader};
use tracing::{debug, info, warn};

/// Result of one harvester run
#[derive(Debug, Clone, PartialEq)]
pub struct HarvestSummary {
    pub lines_read: u64,
    pub published: u64,
    pub stopped_by_close: bool,
    /// Last state confirmed by the outlet
    pub last_state: State,
}

pub struct Harvester {
    source: PathBuf,
    state: State,
    outlet: Arc<Outlet>,
    metrics: OutletMetrics,
}

impl Harvester {
    /// Create a harvester for `source`, resuming at `offset`
    pub fn new(source: PathBuf, offset: u64, outlet: Arc<Outlet>, metrics: OutletMetrics) -> Self {
        let state = State::new(source.display().to_string(), offset);
        Self {
            source,
            state,
            outlet,
            metrics,
        }
    }

    /// Last state confirmed by the outlet
    pub fn state(&self) -> &State {
        &self.state
    }

    /// Open the source file at the resume offset and harvest it to EOF
    pub async fn run_file(&mut self) -> Result<HarvestSummary, OutletError> {
        let input_err = |source: std::io::Error| OutletError::Input {
            path: self.source.clone(),
            source,
        };

        let mut file = tokio::fs::File::open(&self.source).await.map_err(input_err)?;
        file.seek(SeekFrom::Start(self.state.offset))
            .await
            .map_err(input_err)?;

        info!(
            source = %self.source.display(),
            offset = self.state.offset,
            "Harvester starting"
        );

        self.run(BufReader::new(file)).await
    }

    /// Harvest lines from `reader`, which must be positioned at the current offset
    pub async fn run<R>(&mut self, mut reader: R) -> Result<HarvestSummary, OutletError>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut summary = HarvestSummary {
            lines_read: 0,
            published: 0,
            stopped_by_close: false,
            last_state: self.state.clone(),
        };
        let mut offset = self.state.offset;
        let mut line = Vec::new();

        loop {
            line.clear();
            let read = reader.read_until(b'\n', &mut line).await.map_err(|source| OutletError::Input {
                path: self.source.clone(),
                source,
            })?;
            if read == 0 {
                break;
            }

            summary.lines_read += 1;
            let start = offset;
            offset += read as u64;

            let envelope = self.envelope(&line, start, offset);

            if !self.outlet.publish(&envelope) {
                // Uncertain or rejected: keep the previous state so the
                // line is sent again on restart rather than skipped.
                self.metrics.record_refused(&self.state.source);
                warn!(
                    source = %self.source.display(),
                    offset = self.state.offset,
                    "Outlet closed, stopping harvester"
                );
                summary.stopped_by_close = true;
                break;
            }

            self.metrics.record_published(&self.state.source);
            if let Some(state) = envelope.state() {
                self.state = state.clone();
            }
            summary.published += 1;
        }

        summary.last_state = self.state.clone();
        debug!(
            source = %self.source.display(),
            lines = summary.lines_read,
            published = summary.published,
            "Harvester finished"
        );
        Ok(summary)
    }

    /// Offsets count raw bytes; invalid UTF-8 only affects the message text
    fn envelope(&self, line: &[u8], start: u64, end: u64) -> Envelope {
        let text = String::from_utf8_lossy(line);
        let message = text.trim_end_matches(['\n', '\r']);
        let event = Event::new(serde_json::json!({
            "message": message,
            "log": {
                "file": self.state.source,
                "offset": start,
            },
        }));
        Envelope::with_state(event, State::new(self.state.source.clone(), end))
    }
}
