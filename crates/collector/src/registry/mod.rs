//! Stream registry — lifecycle of every tracked source.
//!
//! One pump task per source reads the host's chunk stream, demultiplexes
//! and parses it, and feeds the store's coalescing queue. The registry
//! owns the lifecycle state exclusively: add/remove/pause/resume, the
//! capacity bound, and color assignment.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, watch};
use tokio_util::sync::CancellationToken;

use crate::events::Event;
use crate::host::{ContainerHost, TransportError};
use crate::parser::model::{LogRecord, RecordIds};

mod pump;

/// Display colors handed out round-robin. Wraps without collision
/// avoidance once more sources have been registered than entries here;
/// removal does not recycle slots.
pub const PALETTE: [&str; 10] = [
    "#e06c75", "#61afef", "#98c379", "#c678dd", "#56b6c2", "#d19a66", "#e5c07b", "#abb2bf",
    "#f47067", "#6cb6ff",
];

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Source already tracked: {0}")]
    AlreadyTracked(String),
    #[error("Source capacity exceeded: {limit} streams already tracked")]
    CapacityExceeded { limit: usize },
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Point-in-time copy of one tracked source, safe for callers to retain.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceView {
    pub id: String,
    pub name: String,
    pub color: &'static str,
    pub active: bool,
    pub paused: bool,
}

struct SourceEntry {
    name: String,
    color: &'static str,
    /// Registration order; also the palette index this source drew.
    slot: usize,
    paused: bool,
    active: Arc<AtomicBool>,
    pause_tx: watch::Sender<bool>,
    cancel: CancellationToken,
}

pub struct SourceRegistry<H: ContainerHost> {
    host: Arc<H>,
    sources: Mutex<HashMap<String, SourceEntry>>,
    palette_cursor: AtomicUsize,
    limit: usize,
    ids: Arc<RecordIds>,
    sink: mpsc::UnboundedSender<Vec<LogRecord>>,
    events: broadcast::Sender<Event>,
}

impl<H: ContainerHost> SourceRegistry<H> {
    pub fn new(
        host: Arc<H>,
        limit: usize,
        ids: Arc<RecordIds>,
        sink: mpsc::UnboundedSender<Vec<LogRecord>>,
        events: broadcast::Sender<Event>,
    ) -> Self {
        Self {
            host,
            sources: Mutex::new(HashMap::new()),
            palette_cursor: AtomicUsize::new(0),
            limit,
            ids,
            sink,
            events,
        }
    }

    /// Register a source and start pumping its stream.
    ///
    /// Rejected operations leave the registry unchanged: a duplicate id,
    /// a full registry, or a host that cannot open the stream.
    pub fn add(&self, id: &str, name: &str) -> Result<(), RegistryError> {
        let mut sources = self.sources.lock();
        if sources.contains_key(id) {
            return Err(RegistryError::AlreadyTracked(id.to_string()));
        }
        if sources.len() >= self.limit {
            return Err(RegistryError::CapacityExceeded { limit: self.limit });
        }

        let stream = self.host.open_log_stream(id, true)?;

        let slot = self.palette_cursor.fetch_add(1, Ordering::Relaxed);
        let color = PALETTE[slot % PALETTE.len()];
        let (pause_tx, pause_rx) = watch::channel(false);
        let cancel = CancellationToken::new();
        let active = Arc::new(AtomicBool::new(true));

        tokio::spawn(pump::run(pump::Pump {
            source_id: id.to_string(),
            source_name: name.to_string(),
            stream,
            pause: pause_rx,
            cancel: cancel.clone(),
            active: Arc::clone(&active),
            ids: Arc::clone(&self.ids),
            sink: self.sink.clone(),
            events: self.events.clone(),
        }));

        sources.insert(
            id.to_string(),
            SourceEntry {
                name: name.to_string(),
                color,
                slot,
                paused: false,
                active,
                pause_tx,
                cancel,
            },
        );
        drop(sources);

        tracing::info!(source = id, name, color, "source added");
        let _ = self.events.send(Event::SourceAdded {
            id: id.to_string(),
            name: name.to_string(),
            color,
        });
        Ok(())
    }

    /// Stop and forget a source. Untracked ids are a silent no-op.
    /// Already-buffered history is not touched.
    pub fn remove(&self, id: &str) {
        let removed = self.sources.lock().remove(id);
        if let Some(entry) = removed {
            entry.cancel.cancel();
            tracing::info!(source = id, "source removed");
            let _ = self.events.send(Event::SourceRemoved { id: id.to_string() });
        }
    }

    /// Suspend consumption of a source's stream without closing it. The
    /// pump stops polling the transport, so nothing buffers on our side.
    pub fn pause(&self, id: &str) {
        if let Some(entry) = self.sources.lock().get_mut(id) {
            entry.paused = true;
            entry.pause_tx.send_replace(true);
            tracing::debug!(source = id, "source paused");
        }
    }

    pub fn resume(&self, id: &str) {
        if let Some(entry) = self.sources.lock().get_mut(id) {
            entry.paused = false;
            entry.pause_tx.send_replace(false);
            tracing::debug!(source = id, "source resumed");
        }
    }

    /// Copies of all tracked sources, in registration order.
    pub fn snapshot(&self) -> Vec<SourceView> {
        let sources = self.sources.lock();
        let mut views: Vec<(usize, SourceView)> = sources
            .iter()
            .map(|(id, entry)| {
                (
                    entry.slot,
                    SourceView {
                        id: id.clone(),
                        name: entry.name.clone(),
                        color: entry.color,
                        active: entry.active.load(Ordering::Acquire),
                        paused: entry.paused,
                    },
                )
            })
            .collect();
        views.sort_by_key(|(slot, _)| *slot);
        views.into_iter().map(|(_, view)| view).collect()
    }

    pub fn len(&self) -> usize {
        self.sources.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.lock().is_empty()
    }

    /// Remove every tracked source. Used on disposal.
    pub fn remove_all(&self) {
        let drained: Vec<(String, SourceEntry)> = self.sources.lock().drain().collect();
        for (id, entry) in drained {
            entry.cancel.cancel();
            let _ = self.events.send(Event::SourceRemoved { id });
        }
    }
}
