//! Aggregation store — bounded history plus trailing-edge coalescing.
//!
//! One task owns the pending accumulator and the flush timer, fed by a
//! multi-producer queue from the per-source pumps. Appending a batch and
//! trimming the buffer is the single serialization point shared across
//! sources. The first record of a burst arms the window; later arrivals
//! never re-arm it, so a busy source is reconsidered at expiry rather
//! than immediately.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::{broadcast, mpsc};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::events::Event;
use crate::filter::CompiledFilter;
use crate::parser::model::LogRecord;

type History = Arc<RwLock<VecDeque<LogRecord>>>;

pub struct LogStore {
    history: History,
    cancel: CancellationToken,
}

impl LogStore {
    /// Spawn the coalescing task and return the store plus the sink the
    /// pumps feed.
    pub fn new(
        capacity: usize,
        window: Duration,
        events: broadcast::Sender<Event>,
    ) -> (Self, mpsc::UnboundedSender<Vec<LogRecord>>) {
        let (sink, rx) = mpsc::unbounded_channel();
        let history: History = Arc::new(RwLock::new(VecDeque::new()));
        let cancel = CancellationToken::new();

        tokio::spawn(coalesce(
            rx,
            Arc::clone(&history),
            capacity,
            window,
            events,
            cancel.clone(),
        ));

        (Self { history, cancel }, sink)
    }

    /// Defensive copy of the history, optionally narrowed by a filter.
    /// The returned list is the caller's to keep or mutate.
    pub fn get_entries(&self, filter: Option<&CompiledFilter>) -> Vec<LogRecord> {
        let history = self.history.read();
        match filter {
            Some(f) => history.iter().filter(|r| f.matches(r)).cloned().collect(),
            None => history.iter().cloned().collect(),
        }
    }

    /// Drop one source's records from history, or everything when no
    /// source is given. The pending accumulator and an armed window are
    /// not affected.
    pub fn clear(&self, source: Option<&str>) {
        let mut history = self.history.write();
        match source {
            Some(id) => history.retain(|r| r.source_id != id),
            None => history.clear(),
        }
    }

    pub fn len(&self) -> usize {
        self.history.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.read().is_empty()
    }

    /// Cancel the coalescing task. Records pending flush are discarded —
    /// the deliberate at-most-once boundary at shutdown.
    pub fn dispose(&self) {
        self.cancel.cancel();
    }
}

async fn coalesce(
    mut rx: mpsc::UnboundedReceiver<Vec<LogRecord>>,
    history: History,
    capacity: usize,
    window: Duration,
    events: broadcast::Sender<Event>,
    cancel: CancellationToken,
) {
    let mut pending: Vec<LogRecord> = Vec::new();
    let mut deadline: Option<Instant> = None;
    let mut closed = false;

    loop {
        if closed && deadline.is_none() {
            return;
        }

        tokio::select! {
            _ = cancel.cancelled() => return,
            batch = rx.recv(), if !closed => match batch {
                Some(mut records) => {
                    if records.is_empty() {
                        continue;
                    }
                    if deadline.is_none() {
                        deadline = Some(Instant::now() + window);
                    }
                    pending.append(&mut records);
                }
                None => closed = true,
            },
            _ = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)),
                if deadline.is_some() =>
            {
                flush(&mut pending, &history, capacity, &events);
                deadline = None;
            }
        }
    }
}

/// Move the accumulator into history as one batch, trim from the front
/// to capacity, and emit exactly the moved records.
fn flush(
    pending: &mut Vec<LogRecord>,
    history: &RwLock<VecDeque<LogRecord>>,
    capacity: usize,
    events: &broadcast::Sender<Event>,
) {
    if pending.is_empty() {
        return;
    }
    let batch = std::mem::take(pending);
    {
        let mut history = history.write();
        history.extend(batch.iter().cloned());
        while history.len() > capacity {
            history.pop_front();
        }
    }
    tracing::debug!(records = batch.len(), "flushed batch");
    let _ = events.send(Event::NewRecords(batch));
}
