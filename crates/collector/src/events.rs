//! Events out, commands in.
//!
//! Presentation consumers subscribe to a broadcast of [`Event`] values
//! and drive the collector through [`Command`]s. Both are closed enums:
//! an unhandled variant is a compile error at the consumer, not a silent
//! no-op.

use crate::filter::FilterSpec;
use crate::parser::model::LogRecord;
use crate::registry::SourceView;

/// Everything the pipeline tells its observers.
#[derive(Debug, Clone)]
pub enum Event {
    SourceAdded {
        id: String,
        name: String,
        color: &'static str,
    },
    SourceRemoved {
        id: String,
    },
    /// The source's stream ended; it stays listed as inactive until
    /// explicitly removed.
    SourceDisconnected {
        id: String,
    },
    SourceError {
        id: String,
        error: String,
    },
    /// One coalesced flush. Contains exactly the records moved into
    /// history by that flush, in arrival order.
    NewRecords(Vec<LogRecord>),
}

/// Everything observers may ask of the pipeline.
#[derive(Debug, Clone)]
pub enum Command {
    AddSource { id: String, name: String },
    RemoveSource { id: String },
    PauseSource { id: String },
    ResumeSource { id: String },
    ListSources,
    GetHistory { filter: Option<FilterSpec> },
    ClearHistory { source: Option<String> },
}

/// Successful command outcome.
#[derive(Debug, Clone)]
pub enum Reply {
    Ack,
    Sources(Vec<SourceView>),
    History(Vec<LogRecord>),
}
