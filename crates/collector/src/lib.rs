// Domain-driven module structure for the log collector.

// Core infrastructure
pub mod host;
pub mod wire;
pub mod parser;
pub mod filter;

// Domain modules
pub mod conf;
pub mod docker;
pub mod events;
pub mod export;
pub mod panel;
pub mod registry;
pub mod store;
pub mod telemetry;

pub use events::{Command, Event, Reply};
pub use panel::LogPanel;
