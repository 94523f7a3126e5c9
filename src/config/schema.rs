//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the ingest server.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default bind host.
pub const DEFAULT_HOST: &str = "127.0.0.1";
/// Default listening port.
pub const DEFAULT_PORT: u16 = 9000;
/// Default read chunk size in bytes.
pub const DEFAULT_CHUNK_SIZE: usize = 4096;
/// Default per-read timeout in milliseconds.
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 60_000;
/// Default TCP keep-alive interval in milliseconds.
pub const DEFAULT_KEEP_ALIVE_MS: u64 = 15_000;
/// Largest chunk size a handler will allocate.
pub const MAX_CHUNK_SIZE: usize = 16 * 1024 * 1024;

/// Root configuration file layout.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct IngestConfig {
    /// Listener and per-connection settings.
    pub server: ServerConfig,

    /// Logging and metrics settings.
    pub observability: ObservabilityConfig,
}

/// Listener and per-connection settings.
///
/// Immutable once the server starts; shared with every connection handler.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind (IPv4 address or resolvable name).
    pub host: String,

    /// Port to bind.
    pub port: u16,

    /// Size of the buffer used for each read.
    pub chunk_size: usize,

    /// Maximum time to wait for the next chunk, in milliseconds.
    pub read_timeout_ms: u64,

    /// TCP keep-alive interval, in milliseconds.
    pub keep_alive_ms: u64,

    /// Maximum bytes accepted per connection (0 = unlimited).
    pub max_buffer: u64,

    /// Base delay after a failed accept, in milliseconds.
    pub accept_backoff_base_ms: u64,

    /// Upper bound for the accept backoff, in milliseconds.
    pub accept_backoff_max_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            chunk_size: DEFAULT_CHUNK_SIZE,
            read_timeout_ms: DEFAULT_READ_TIMEOUT_MS,
            keep_alive_ms: DEFAULT_KEEP_ALIVE_MS,
            max_buffer: 0,
            accept_backoff_base_ms: 5,
            accept_backoff_max_ms: 1000,
        }
    }
}

impl ServerConfig {
    /// Replace zero or empty fields with their defaults.
    ///
    /// Each field is defaulted on its own. `max_buffer` is left alone since
    /// zero means unlimited.
    pub fn fill_defaults(&mut self) {
        if self.host.trim().is_empty() {
            self.host = DEFAULT_HOST.to_string();
        }
        if self.port == 0 {
            self.port = DEFAULT_PORT;
        }
        if self.chunk_size == 0 {
            self.chunk_size = DEFAULT_CHUNK_SIZE;
        }
        if self.read_timeout_ms == 0 {
            self.read_timeout_ms = DEFAULT_READ_TIMEOUT_MS;
        }
        if self.keep_alive_ms == 0 {
            self.keep_alive_ms = DEFAULT_KEEP_ALIVE_MS;
        }
    }

    /// `host:port` string used for binding.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn keep_alive(&self) -> Duration {
        Duration::from_millis(self.keep_alive_ms)
    }

    /// Returns true if accepting `incoming` more bytes on top of `received`
    /// would go past `max_buffer`.
    pub fn exceeds_max_buffer(&self, received: u64, incoming: usize) -> bool {
        self.max_buffer > 0 && received.saturating_add(incoming as u64) > self.max_buffer
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human readable, for development.
    #[default]
    Pretty,
    /// One JSON object per line, for log aggregation.
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_fields_are_defaulted_independently() {
        let mut config = ServerConfig {
            host: String::new(),
            port: 0,
            chunk_size: 0,
            read_timeout_ms: 2_000,
            keep_alive_ms: 0,
            max_buffer: 0,
            ..ServerConfig::default()
        };
        config.fill_defaults();

        assert_eq!(config.host, DEFAULT_HOST);
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.chunk_size, DEFAULT_CHUNK_SIZE);
        // keep-alive defaulting must not touch the read timeout
        assert_eq!(config.read_timeout_ms, 2_000);
        assert_eq!(config.keep_alive_ms, DEFAULT_KEEP_ALIVE_MS);
        assert_eq!(config.max_buffer, 0);
    }

    #[test]
    fn max_buffer_check() {
        let mut config = ServerConfig {
            max_buffer: 10,
            ..ServerConfig::default()
        };
        assert!(!config.exceeds_max_buffer(0, 10));
        assert!(!config.exceeds_max_buffer(8, 2));
        assert!(config.exceeds_max_buffer(8, 4));

        config.max_buffer = 0;
        assert!(!config.exceeds_max_buffer(u64::MAX - 1, 4096));
    }

    #[test]
    fn durations_and_bind_address() {
        let config = ServerConfig {
            read_timeout_ms: 1_500,
            keep_alive_ms: 30_000,
            ..ServerConfig::default()
        };
        assert_eq!(config.read_timeout(), Duration::from_millis(1_500));
        assert_eq!(config.keep_alive(), Duration::from_secs(30));
        assert_eq!(config.bind_address(), "127.0.0.1:9000");
    }
}
