//! Load — config loading from file and environment variables.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use super::model::CollectorConfig;

impl CollectorConfig {
    /// Load configuration from file or environment variables.
    /// Priority: Environment Variables > Config File > Defaults
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        let config_path = std::env::var("COLLECTOR_CONFIG_FILE")
            .unwrap_or_else(|_| "/etc/collector/collector.toml".to_string());

        let mut config = if Path::new(&config_path).exists() {
            tracing::info!("Loading configuration from: {}", config_path);
            Self::from_file(&config_path)?
        } else {
            tracing::info!(
                "Config file not found at {}, using environment variables",
                config_path
            );
            Self::from_env()
        };

        // Environment variables override file config.
        if let Ok(socket) = std::env::var("DOCKER_SOCKET") {
            config.docker_socket = socket;
        }
        if let Some(max) = env_parse("COLLECTOR_MAX_SOURCES") {
            config.max_sources = max;
        }
        if let Some(capacity) = env_parse("COLLECTOR_HISTORY_CAPACITY") {
            config.history_capacity = capacity;
        }
        if let Some(interval) = env_parse("COLLECTOR_FLUSH_INTERVAL_MS") {
            config.flush_interval_ms = interval;
        }

        Ok(config)
    }

    /// Load configuration from a TOML file.
    pub fn from_file(path: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let mut file = File::open(path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;

        let config: CollectorConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from environment variables with defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            docker_socket: std::env::var("DOCKER_SOCKET").unwrap_or(defaults.docker_socket),
            max_sources: env_parse("COLLECTOR_MAX_SOURCES").unwrap_or(defaults.max_sources),
            history_capacity: env_parse("COLLECTOR_HISTORY_CAPACITY")
                .unwrap_or(defaults.history_capacity),
            flush_interval_ms: env_parse("COLLECTOR_FLUSH_INTERVAL_MS")
                .unwrap_or(defaults.flush_interval_ms),
            event_buffer: env_parse("COLLECTOR_EVENT_BUFFER").unwrap_or(defaults.event_buffer),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.parse().ok())
}
