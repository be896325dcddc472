//! Model — CollectorConfig and defaults.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    /// Docker socket path; empty means the system default.
    pub docker_socket: String,
    /// Maximum concurrently tracked sources.
    pub max_sources: usize,
    /// History buffer capacity in records.
    pub history_capacity: usize,
    /// Coalescing window for record batches.
    pub flush_interval_ms: u64,
    /// Broadcast buffer per event subscriber.
    pub event_buffer: usize,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            docker_socket: "".to_string(),
            max_sources: 10,
            history_capacity: 10_000,
            flush_interval_ms: 100,
            event_buffer: 256,
        }
    }
}

impl CollectorConfig {
    /// Validate configuration values before wiring a panel.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_sources == 0 {
            return Err("max_sources must be > 0".to_string());
        }
        if self.history_capacity == 0 {
            return Err("history_capacity must be > 0".to_string());
        }
        if self.flush_interval_ms == 0 {
            return Err("flush_interval_ms must be > 0".to_string());
        }
        if self.event_buffer == 0 {
            return Err("event_buffer must be > 0".to_string());
        }
        Ok(())
    }
}
