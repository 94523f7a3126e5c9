//! Per-connection chunked read loop.
//!
//! A handler owns one [`Client`] and reads from it in `chunk_size` pieces until the
//! peer closes, a read times out, the byte limit is hit, a read fails, or shutdown
//! is observed. Shutdown is only checked between reads: a read already waiting
//! finishes through its deadline or through the peer, never by interruption.

use std::fmt;
use std::sync::Arc;

use tokio::time::{self, Instant};

use crate::config::ServerConfig;
use crate::lifecycle::ShutdownSignal;
use crate::net::{Client, ConnectionGuard, ConnectionState};
use crate::observability::metrics;

/// How a connection ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionOutcome {
    /// Peer closed its write side.
    EndOfStream { total_bytes: u64 },
    /// No data arrived within the read timeout.
    TimedOut { total_bytes: u64 },
    /// The next chunk would have pushed the total past `max_buffer`.
    LimitExceeded { received_bytes: u64, max_buffer: u64 },
    /// Shutdown was observed between reads.
    Cancelled { total_bytes: u64 },
    /// `chunk_size` was zero; nothing was read.
    InvalidChunkSize,
    /// The read deadline could not be computed.
    DeadlineUnavailable { total_bytes: u64 },
    /// Any other read error.
    ReadFailed { total_bytes: u64, error: String },
}

impl ConnectionOutcome {
    /// Short label used for metrics.
    pub fn label(&self) -> &'static str {
        match self {
            ConnectionOutcome::EndOfStream { .. } => "end_of_stream",
            ConnectionOutcome::TimedOut { .. } => "timed_out",
            ConnectionOutcome::LimitExceeded { .. } => "limit_exceeded",
            ConnectionOutcome::Cancelled { .. } => "cancelled",
            ConnectionOutcome::InvalidChunkSize => "invalid_chunk_size",
            ConnectionOutcome::DeadlineUnavailable { .. } => "deadline_unavailable",
            ConnectionOutcome::ReadFailed { .. } => "read_failed",
        }
    }

    /// Bytes accepted before the connection ended.
    pub fn total_bytes(&self) -> u64 {
        match self {
            ConnectionOutcome::EndOfStream { total_bytes }
            | ConnectionOutcome::TimedOut { total_bytes }
            | ConnectionOutcome::Cancelled { total_bytes }
            | ConnectionOutcome::DeadlineUnavailable { total_bytes }
            | ConnectionOutcome::ReadFailed { total_bytes, .. } => *total_bytes,
            ConnectionOutcome::LimitExceeded { received_bytes, .. } => *received_bytes,
            ConnectionOutcome::InvalidChunkSize => 0,
        }
    }
}

impl fmt::Display for ConnectionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Handler for one accepted connection.
#[derive(Debug)]
pub struct ConnectionHandler {
    // Dropped in declaration order: the socket closes before the guard releases its slot.
    client: Client,
    guard: ConnectionGuard,
    config: Arc<ServerConfig>,
    shutdown: ShutdownSignal,
    state: ConnectionState,
}

impl ConnectionHandler {
    pub fn new(
        client: Client,
        guard: ConnectionGuard,
        config: Arc<ServerConfig>,
        shutdown: ShutdownSignal,
    ) -> Self {
        Self {
            client,
            guard,
            config,
            shutdown,
            state: ConnectionState::Validating,
        }
    }

    /// Run the connection to completion. The socket is closed when this returns.
    pub async fn run(mut self) -> ConnectionOutcome {
        let client_addr = self.client.addr();
        let connection_id = self.guard.id();

        tracing::info!(%client_addr, %connection_id, "New client connection");

        let outcome = self.read_loop().await;
        self.transition(ConnectionState::Closed);

        tracing::debug!(
            %client_addr,
            %connection_id,
            outcome = %outcome,
            total_bytes = outcome.total_bytes(),
            "Connection handler finished"
        );
        outcome
    }

    async fn read_loop(&mut self) -> ConnectionOutcome {
        let client_addr = self.client.addr();
        let connection_id = self.guard.id();
        let chunk_size = self.config.chunk_size;

        if chunk_size == 0 {
            tracing::error!(
                %client_addr,
                %connection_id,
                chunk_size,
                "Invalid chunk size, must be greater than 0"
            );
            return ConnectionOutcome::InvalidChunkSize;
        }

        if let Err(e) = self.client.enable_keepalive(self.config.keep_alive()) {
            tracing::warn!(
                %client_addr,
                %connection_id,
                error = %e,
                "Failed to enable TCP keep-alive"
            );
        }

        self.transition(ConnectionState::Reading);

        let read_timeout = self.config.read_timeout();
        let mut buffer = vec![0u8; chunk_size];
        let mut total_bytes: u64 = 0;

        loop {
            if self.shutdown.is_triggered() {
                tracing::info!(
                    %client_addr,
                    %connection_id,
                    total_bytes,
                    "Stopping client handler due to server shutdown"
                );
                return ConnectionOutcome::Cancelled { total_bytes };
            }

            let Some(deadline) = Instant::now().checked_add(read_timeout) else {
                tracing::error!(
                    %client_addr,
                    %connection_id,
                    read_timeout_ms = self.config.read_timeout_ms,
                    "Failed to set read deadline"
                );
                return ConnectionOutcome::DeadlineUnavailable { total_bytes };
            };

            match time::timeout_at(deadline, self.client.read_chunk(&mut buffer)).await {
                Ok(Ok(0)) => {
                    tracing::info!(
                        %client_addr,
                        %connection_id,
                        total_bytes,
                        "Received all data from client"
                    );
                    return ConnectionOutcome::EndOfStream { total_bytes };
                }
                Ok(Ok(n)) => {
                    if self.config.exceeds_max_buffer(total_bytes, n) {
                        tracing::warn!(
                            %client_addr,
                            %connection_id,
                            received_bytes = total_bytes,
                            chunk_bytes = n,
                            max_buffer = self.config.max_buffer,
                            "Client exceeded max buffer size"
                        );
                        return ConnectionOutcome::LimitExceeded {
                            received_bytes: total_bytes,
                            max_buffer: self.config.max_buffer,
                        };
                    }
                    total_bytes += n as u64;
                    metrics::record_bytes_received(n);
                    tracing::trace!(%client_addr, chunk_bytes = n, total_bytes, "Chunk received");
                }
                Ok(Err(e)) => {
                    tracing::error!(
                        %client_addr,
                        %connection_id,
                        total_bytes,
                        error = %e,
                        "Connection error"
                    );
                    return ConnectionOutcome::ReadFailed {
                        total_bytes,
                        error: e.to_string(),
                    };
                }
                Err(_) => {
                    tracing::warn!(
                        %client_addr,
                        %connection_id,
                        total_bytes,
                        read_timeout_ms = self.config.read_timeout_ms,
                        "Client read timeout (slow client or disconnect)"
                    );
                    return ConnectionOutcome::TimedOut { total_bytes };
                }
            }
        }
    }

    fn transition(&mut self, next: ConnectionState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal connection transition {:?} -> {:?}",
            self.state,
            next
        );
        self.state = next;
    }
}
