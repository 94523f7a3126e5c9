//! Connection state machine and lifecycle tracking.
//!
//! # Responsibilities
//! - Track connection state (Validating → Reading → Closed)
//! - Generate unique connection IDs for tracing
//! - Count in-flight connections so shutdown can wait for them
//! - Own the accepted socket and close it exactly once

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use socket2::{SockRef, TcpKeepalive};
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tokio::sync::watch;

/// Global atomic counter for connection IDs.
/// Using relaxed ordering is sufficient since we only need uniqueness, not synchronization.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Generate a new unique connection ID.
    pub fn new() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Connection state for lifecycle tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Checking the configuration before any read.
    Validating,
    /// Reading chunks from the peer.
    Reading,
    /// Connection is closed. Terminal.
    Closed,
}

impl ConnectionState {
    /// Whether moving from `self` to `next` is a legal transition.
    pub fn can_transition_to(self, next: ConnectionState) -> bool {
        matches!(
            (self, next),
            (ConnectionState::Validating, ConnectionState::Reading)
                | (ConnectionState::Validating, ConnectionState::Closed)
                | (ConnectionState::Reading, ConnectionState::Reading)
                | (ConnectionState::Reading, ConnectionState::Closed)
        )
    }
}

/// Tracks active connections for graceful shutdown.
///
/// The count lives in a watch channel so waiters wake as soon as it reaches zero.
#[derive(Debug, Clone)]
pub struct ConnectionTracker {
    active: Arc<watch::Sender<u64>>,
}

impl ConnectionTracker {
    /// Create a new connection tracker.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(0);
        Self {
            active: Arc::new(tx),
        }
    }

    /// Record a new active connection. Returns a guard that decrements on drop.
    pub fn track(&self) -> ConnectionGuard {
        self.active.send_modify(|count| *count += 1);
        ConnectionGuard {
            active: Arc::clone(&self.active),
            id: ConnectionId::new(),
        }
    }

    /// Get current active connection count.
    pub fn active_count(&self) -> u64 {
        *self.active.borrow()
    }

    /// Wait until no connection is being tracked.
    pub async fn wait_idle(&self) {
        let mut rx = self.active.subscribe();
        // The sender is owned by `self`, so this cannot observe a closed channel.
        let _ = rx.wait_for(|count| *count == 0).await;
    }
}

impl Default for ConnectionTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Guard that tracks a connection's lifetime.
/// Decrements active count when dropped, including when the handler task panics.
#[derive(Debug)]
pub struct ConnectionGuard {
    active: Arc<watch::Sender<u64>>,
    id: ConnectionId,
}

impl ConnectionGuard {
    /// Get this connection's ID.
    pub fn id(&self) -> ConnectionId {
        self.id
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.active.send_modify(|count| *count = count.saturating_sub(1));
        tracing::trace!(connection_id = %self.id, "Connection released");
    }
}

/// One accepted TCP connection.
///
/// The socket is closed when the client is dropped, so it is closed exactly once
/// no matter how the owning handler exits.
#[derive(Debug)]
pub struct Client {
    stream: TcpStream,
    addr: SocketAddr,
}

impl Client {
    pub fn new(stream: TcpStream, addr: SocketAddr) -> Self {
        Self { stream, addr }
    }

    /// Remote address, used for log correlation.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Enable TCP keep-alive probes with the given interval.
    pub fn enable_keepalive(&self, interval: Duration) -> std::io::Result<()> {
        #[allow(unused_mut)]
        let mut keepalive = TcpKeepalive::new().with_time(interval);

        #[cfg(any(target_os = "linux", target_os = "android"))]
        {
            keepalive = keepalive.with_interval(interval);
        }

        SockRef::from(&self.stream).set_tcp_keepalive(&keepalive)
    }

    /// Read the next chunk into `buf`. Returns 0 at end of stream.
    pub async fn read_chunk(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.stream.read(buf).await
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        tracing::trace!(client_addr = %self.addr, "Client socket closed");
    }
}
