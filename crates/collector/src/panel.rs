//! Composition root — one panel per logical dashboard.
//!
//! Wires the registry, store, presets, and event channel together and
//! exposes the full command surface. Presentation layers either call the
//! methods directly or go through [`LogPanel::dispatch`] with a
//! [`Command`] value.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::broadcast;

use crate::conf::CollectorConfig;
use crate::events::{Command, Event, Reply};
use crate::filter::{FilterError, FilterSpec, PresetStore};
use crate::host::ContainerHost;
use crate::parser::model::{LogRecord, RecordIds};
use crate::registry::{RegistryError, SourceRegistry, SourceView};
use crate::store::LogStore;

#[derive(Error, Debug)]
pub enum PanelError {
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Filter(#[from] FilterError),
}

pub struct LogPanel<H: ContainerHost> {
    registry: SourceRegistry<H>,
    store: LogStore,
    presets: PresetStore,
    events: broadcast::Sender<Event>,
}

impl<H: ContainerHost> LogPanel<H> {
    /// Build a panel over a container host. Must be called from within a
    /// tokio runtime (the store's coalescing task is spawned here).
    pub fn new(host: H, config: &CollectorConfig) -> Self {
        let (events, _) = broadcast::channel(config.event_buffer);
        let (store, sink) = LogStore::new(
            config.history_capacity,
            Duration::from_millis(config.flush_interval_ms),
            events.clone(),
        );
        let registry = SourceRegistry::new(
            Arc::new(host),
            config.max_sources,
            Arc::new(RecordIds::new()),
            sink,
            events.clone(),
        );

        Self {
            registry,
            store,
            presets: PresetStore::new(),
            events,
        }
    }

    /// Subscribe to the event feed. Every subscriber sees every event
    /// from the point of subscription; slow subscribers lag, they never
    /// block the pipeline.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    pub fn add_source(&self, id: &str, name: &str) -> Result<(), RegistryError> {
        self.registry.add(id, name)
    }

    pub fn remove_source(&self, id: &str) {
        self.registry.remove(id)
    }

    pub fn pause_source(&self, id: &str) {
        self.registry.pause(id)
    }

    pub fn resume_source(&self, id: &str) {
        self.registry.resume(id)
    }

    pub fn sources(&self) -> Vec<SourceView> {
        self.registry.snapshot()
    }

    /// Full or filtered history, always a defensive copy.
    pub fn entries(&self, filter: Option<&FilterSpec>) -> Result<Vec<LogRecord>, FilterError> {
        match filter {
            Some(spec) => {
                let compiled = spec.compile()?;
                Ok(self.store.get_entries(Some(&compiled)))
            }
            None => Ok(self.store.get_entries(None)),
        }
    }

    pub fn clear(&self, source: Option<&str>) {
        self.store.clear(source)
    }

    pub fn presets(&self) -> &PresetStore {
        &self.presets
    }

    /// Execute one command from a presentation consumer.
    pub fn dispatch(&self, command: Command) -> Result<Reply, PanelError> {
        match command {
            Command::AddSource { id, name } => {
                self.add_source(&id, &name)?;
                Ok(Reply::Ack)
            }
            Command::RemoveSource { id } => {
                self.remove_source(&id);
                Ok(Reply::Ack)
            }
            Command::PauseSource { id } => {
                self.pause_source(&id);
                Ok(Reply::Ack)
            }
            Command::ResumeSource { id } => {
                self.resume_source(&id);
                Ok(Reply::Ack)
            }
            Command::ListSources => Ok(Reply::Sources(self.sources())),
            Command::GetHistory { filter } => {
                Ok(Reply::History(self.entries(filter.as_ref())?))
            }
            Command::ClearHistory { source } => {
                self.clear(source.as_deref());
                Ok(Reply::Ack)
            }
        }
    }

    /// Tear everything down: remove every source, cancel the coalescing
    /// task, and drop whatever was pending flush.
    pub fn dispose(&self) {
        self.registry.remove_all();
        self.store.dispose();
    }
}

impl<H: ContainerHost> Drop for LogPanel<H> {
    fn drop(&mut self) {
        self.dispose();
    }
}
