//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (chunk size, timeouts, backoff bounds)
//! - Reject addresses the IPv4 listener cannot bind
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: IngestConfig → Result<(), Vec<ValidationError>>
//! - Runs after defaults are filled in, before config is handed to the server

use std::net::{IpAddr, SocketAddr};

use thiserror::Error;

use crate::config::schema::{IngestConfig, MAX_CHUNK_SIZE};

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("server.host must not be empty")]
    EmptyHost,

    #[error("server.host {0} is not an IPv4 address")]
    NotIpv4(String),

    #[error("server.chunk_size must be between 1 and {max}, got {got}")]
    ChunkSize { got: usize, max: usize },

    #[error("server.read_timeout_ms must be greater than 0")]
    ZeroReadTimeout,

    #[error("server.accept_backoff_base_ms ({base}) exceeds accept_backoff_max_ms ({max})")]
    AcceptBackoff { base: u64, max: u64 },

    #[error("observability.log_level {0:?} is not one of trace, debug, info, warn, error")]
    LogLevel(String),

    #[error("observability.metrics_address {0:?} is not a socket address")]
    MetricsAddress(String),
}

/// Check a configuration, collecting every problem found.
pub fn validate_config(config: &IngestConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let server = &config.server;

    let host = server.host.trim();
    if host.is_empty() {
        errors.push(ValidationError::EmptyHost);
    } else if let Ok(IpAddr::V6(_)) = host.trim_matches(&['[', ']'][..]).parse::<IpAddr>() {
        errors.push(ValidationError::NotIpv4(server.host.clone()));
    }

    if server.chunk_size == 0 || server.chunk_size > MAX_CHUNK_SIZE {
        errors.push(ValidationError::ChunkSize {
            got: server.chunk_size,
            max: MAX_CHUNK_SIZE,
        });
    }

    if server.read_timeout_ms == 0 {
        errors.push(ValidationError::ZeroReadTimeout);
    }

    if server.accept_backoff_base_ms > server.accept_backoff_max_ms {
        errors.push(ValidationError::AcceptBackoff {
            base: server.accept_backoff_base_ms,
            max: server.accept_backoff_max_ms,
        });
    }

    let observability = &config.observability;
    if !LOG_LEVELS.contains(&observability.log_level.to_ascii_lowercase().as_str()) {
        errors.push(ValidationError::LogLevel(observability.log_level.clone()));
    }

    if observability.metrics_enabled
        && observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert_eq!(validate_config(&IngestConfig::default()), Ok(()));
    }

    #[test]
    fn hostname_is_accepted() {
        let mut config = IngestConfig::default();
        config.server.host = "localhost".into();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn collects_all_errors() {
        let mut config = IngestConfig::default();
        config.server.host = "::1".into();
        config.server.chunk_size = MAX_CHUNK_SIZE + 1;
        config.server.read_timeout_ms = 0;
        config.server.accept_backoff_base_ms = 50;
        config.server.accept_backoff_max_ms = 10;
        config.observability.log_level = "loud".into();
        config.observability.metrics_enabled = true;
        config.observability.metrics_address = "nowhere".into();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::NotIpv4("::1".into()),
                ValidationError::ChunkSize {
                    got: MAX_CHUNK_SIZE + 1,
                    max: MAX_CHUNK_SIZE
                },
                ValidationError::ZeroReadTimeout,
                ValidationError::AcceptBackoff { base: 50, max: 10 },
                ValidationError::LogLevel("loud".into()),
                ValidationError::MetricsAddress("nowhere".into()),
            ]
        );
    }

    #[test]
    fn metrics_address_ignored_when_disabled() {
        let mut config = IngestConfig::default();
        config.observability.metrics_address = "nowhere".into();
        assert!(validate_config(&config).is_ok());
    }
}
