use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::wire::StreamKind;

/// Severity of a log record, classified from the line text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    Error,
    Warn,
    Info,
    Debug,
    Unknown,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Error => "error",
            Level::Warn => "warn",
            Level::Info => "info",
            Level::Debug => "debug",
            Level::Unknown => "unknown",
        }
    }
}

/// One structured unit of log output, derived from one input line.
/// Created once by the parser and never mutated afterwards.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRecord {
    /// Process-lifetime unique, strictly increasing across all sources.
    pub id: u64,
    pub source_id: String,
    pub source_name: String,
    pub timestamp: DateTime<Utc>,
    /// Line text after ANSI stripping and timestamp removal.
    pub message: String,
    pub stream: StreamKind,
    pub level: Level,
    /// The line as it arrived (post line-splitting, pre-stripping),
    /// kept for diagnostics and export fidelity.
    pub raw: String,
}

/// Shared record-id generator. One instance feeds every source's parser
/// so ids stay monotonic across the whole pipeline lifetime.
#[derive(Debug, Default)]
pub struct RecordIds(AtomicU64);

impl RecordIds {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn next(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_strictly_increasing() {
        let ids = RecordIds::new();
        let a = ids.next();
        let b = ids.next();
        let c = ids.next();
        assert!(a < b && b < c);
    }

    #[test]
    fn test_level_as_str() {
        assert_eq!(Level::Error.as_str(), "error");
        assert_eq!(Level::Unknown.as_str(), "unknown");
    }

    #[test]
    fn test_record_serializes_camel_case() {
        let record = LogRecord {
            id: 7,
            source_id: "abc".into(),
            source_name: "web".into(),
            timestamp: Utc::now(),
            message: "hello".into(),
            stream: StreamKind::Stderr,
            level: Level::Warn,
            raw: "hello".into(),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["sourceId"], "abc");
        assert_eq!(json["sourceName"], "web");
        assert_eq!(json["stream"], "stderr");
        assert_eq!(json["level"], "warn");
    }
}
