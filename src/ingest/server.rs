//! Accept loop.
//!
//! # Responsibilities
//! - Accept connections until shutdown is requested
//! - Track each connection before its handler task starts
//! - Keep going after transient accept failures
//! - Close the listening socket on shutdown

use std::sync::Arc;
use std::time::Duration;

use tracing::instrument::WithSubscriber;

use crate::config::ServerConfig;
use crate::ingest::handler::ConnectionHandler;
use crate::lifecycle::Shutdown;
use crate::net::backoff::AcceptBackoff;
use crate::net::{Client, Listener};
use crate::observability::metrics;

/// Receive-only TCP ingest server.
#[derive(Debug, Clone)]
pub struct IngestServer {
    config: Arc<ServerConfig>,
    shutdown: Shutdown,
}

impl IngestServer {
    /// Create a new server sharing `shutdown` with its caller.
    pub fn new(config: ServerConfig, shutdown: Shutdown) -> Self {
        Self {
            config: Arc::new(config),
            shutdown,
        }
    }

    /// Accept connections until shutdown is requested.
    ///
    /// Returns once the listener has been closed. Handlers spawned before that keep
    /// running; use [`Shutdown::join`] to wait for them.
    pub async fn run(self, listener: Listener) {
        let mut signal = self.shutdown.subscribe();
        let mut backoff = AcceptBackoff::new(
            Duration::from_millis(self.config.accept_backoff_base_ms),
            Duration::from_millis(self.config.accept_backoff_max_ms),
        );

        if let Ok(addr) = listener.local_addr() {
            tracing::info!(address = %addr, "Accepting connections");
        }

        loop {
            if signal.is_triggered() {
                break;
            }

            let accepted = tokio::select! {
                biased;
                _ = signal.triggered() => break,
                accepted = listener.accept() => accepted,
            };

            match accepted {
                Ok((stream, addr)) => {
                    backoff.reset();
                    self.dispatch(Client::new(stream, addr));
                }
                Err(e) => {
                    metrics::record_accept_error();
                    let delay = backoff.next_delay();
                    tracing::error!(
                        error = %e,
                        consecutive_failures = backoff.failures(),
                        retry_in_ms = delay.as_millis() as u64,
                        "Error accepting connection"
                    );
                    tokio::select! {
                        biased;
                        _ = signal.triggered() => break,
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }

        drop(listener);
        tracing::info!(
            active_connections = self.shutdown.connections().active_count(),
            "Listener closed, stopped accepting new connections"
        );
    }

    /// Spawn a handler for `client`. The connection is counted before the task exists.
    fn dispatch(&self, client: Client) {
        let guard = self.shutdown.connections().track();
        metrics::record_connection_accepted(self.shutdown.connections().active_count());

        let handler = ConnectionHandler::new(
            client,
            guard,
            Arc::clone(&self.config),
            self.shutdown.subscribe(),
        );
        let connections = self.shutdown.connections().clone();

        tokio::spawn(
            async move {
                let outcome = handler.run().await;
                metrics::record_connection_closed(outcome.label(), connections.active_count());
            }
            .with_current_subscriber(),
        );
    }
}
