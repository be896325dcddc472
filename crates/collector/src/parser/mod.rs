/// Line parsing and normalization module
///
/// Turns demultiplexed payload bytes into structured log records:
/// lossy text decode, line splitting, ANSI stripping, timestamp
/// extraction, and severity classification.
///
/// # Architecture
///
/// - `ansi.rs`: escape-sequence stripping
/// - `model.rs`: record model and id generation
/// - `line.rs`: the line parser itself
///
/// All of it is synchronous, allocation-bounded, and infallible on
/// arbitrary byte input — malformed input degrades to unstructured
/// text instead of erroring.
pub mod ansi;
pub mod line;
pub mod model;

pub use ansi::strip_ansi;
pub use line::LineParser;
pub use model::{Level, LogRecord, RecordIds};
