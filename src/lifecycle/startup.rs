//! Startup orchestration.
//!
//! # Responsibilities
//! - Bind the listener
//! - Run the accept loop until shutdown
//! - Wait for in-flight connections before returning
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Shutdown waits for handlers; its latency is bounded by the read timeout

use thiserror::Error;

use crate::config::ServerConfig;
use crate::ingest::IngestServer;
use crate::lifecycle::Shutdown;
use crate::net::{Listener, ListenerError};

/// Errors that stop the process before it serves traffic.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),

    #[error(transparent)]
    Listener(#[from] ListenerError),

    #[error("Failed to initialize logging: {0}")]
    Logging(#[from] tracing_subscriber::util::TryInitError),

    #[error("Failed to start metrics exporter: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    #[error("Failed to install signal handler: {0}")]
    Signals(#[source] std::io::Error),
}

/// Bind, serve until `shutdown` is triggered, then wait for every connection to finish.
pub async fn serve(config: ServerConfig, shutdown: Shutdown) -> Result<(), StartupError> {
    let listener = Listener::bind(&config).await?;
    serve_on(listener, config, shutdown).await;
    Ok(())
}

/// Same as [`serve`] with an already bound listener.
pub async fn serve_on(listener: Listener, config: ServerConfig, shutdown: Shutdown) {
    IngestServer::new(config, shutdown.clone()).run(listener).await;

    shutdown.join().await;
    tracing::info!("Server stopped gracefully");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn bind_failure_is_fatal() {
        let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let config = ServerConfig {
            port: taken.local_addr().unwrap().port(),
            ..ServerConfig::default()
        };

        let err = serve(config, Shutdown::new()).await.unwrap_err();
        assert!(matches!(err, StartupError::Listener(ListenerError::Bind(_))));
    }

    #[tokio::test]
    async fn serve_returns_after_shutdown() {
        let config = ServerConfig {
            port: 0,
            ..ServerConfig::default()
        };
        let shutdown = Shutdown::new();
        let task = tokio::spawn(serve(config, shutdown.clone()));

        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown.trigger();
        shutdown.trigger();

        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("serve should return")
            .unwrap()
            .unwrap();
    }
}
