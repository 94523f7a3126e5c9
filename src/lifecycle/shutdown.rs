//! Shutdown coordination for the ingest server.

use std::sync::Arc;

use tokio::sync::watch;

use crate::net::ConnectionTracker;

/// Coordinator for graceful shutdown.
///
/// Holds the process-wide cancellation flag and the set of in-flight connections.
/// The flag is monotonic: once triggered it stays triggered.
#[derive(Debug, Clone)]
pub struct Shutdown {
    notify: Arc<watch::Sender<bool>>,
    connections: ConnectionTracker,
}

impl Shutdown {
    /// Create a new shutdown coordinator.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self {
            notify: Arc::new(tx),
            connections: ConnectionTracker::new(),
        }
    }

    /// Subscribe to the shutdown signal.
    pub fn subscribe(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.notify.subscribe(),
        }
    }

    /// Trigger the shutdown signal.
    ///
    /// Safe to call any number of times from any task; only the first call has an
    /// effect. Returns `true` for that first call.
    pub fn trigger(&self) -> bool {
        let first = self.notify.send_if_modified(|triggered| {
            if *triggered {
                false
            } else {
                *triggered = true;
                true
            }
        });

        if first {
            tracing::info!(
                active_connections = self.connections.active_count(),
                "Shutdown requested"
            );
        } else {
            tracing::debug!("Shutdown already requested");
        }
        first
    }

    /// Whether shutdown has been requested.
    pub fn is_triggered(&self) -> bool {
        *self.notify.borrow()
    }

    /// The set of in-flight connections.
    pub fn connections(&self) -> &ConnectionTracker {
        &self.connections
    }

    /// Wait for shutdown to be requested and every tracked connection to finish.
    ///
    /// Call this once the listener loop has returned; a connection accepted after
    /// the wait observed zero would otherwise be missed.
    pub async fn join(&self) {
        self.subscribe().triggered().await;
        self.connections.wait_idle().await;
        tracing::debug!("All connection handlers finished");
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Read side of the shutdown flag, handed to the listener and every handler.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    /// Non-blocking check, used at the top of each read iteration.
    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Completes once shutdown has been requested.
    pub async fn triggered(&mut self) {
        // A dropped coordinator can never trigger again; treat it as shut down.
        let _ = self.rx.wait_for(|triggered| *triggered).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn trigger_is_idempotent() {
        let shutdown = Shutdown::new();
        let signal = shutdown.subscribe();
        assert!(!shutdown.is_triggered());
        assert!(!signal.is_triggered());

        assert!(shutdown.trigger());
        assert!(!shutdown.trigger());

        assert!(shutdown.is_triggered());
        assert!(signal.is_triggered());
    }

    #[test]
    fn late_subscribers_see_trigger() {
        let shutdown = Shutdown::new();
        shutdown.trigger();
        assert!(shutdown.subscribe().is_triggered());
        assert!(shutdown.clone().subscribe().is_triggered());
    }

    #[tokio::test]
    async fn triggered_wakes_waiters() {
        let shutdown = Shutdown::new();
        let mut signal = shutdown.subscribe();
        let waiter = tokio::spawn(async move { signal.triggered().await });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should wake")
            .unwrap();
    }

    #[tokio::test]
    async fn join_waits_for_trigger_and_connections() {
        let shutdown = Shutdown::new();
        let guard = shutdown.connections().track();

        let join = {
            let shutdown = shutdown.clone();
            tokio::spawn(async move { shutdown.join().await })
        };

        shutdown.trigger();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!join.is_finished(), "join must not return while a connection is active");

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), join)
            .await
            .expect("join should complete")
            .unwrap();
    }

    #[tokio::test]
    async fn join_does_not_return_before_trigger() {
        let shutdown = Shutdown::new();
        let result = tokio::time::timeout(Duration::from_millis(50), shutdown.join()).await;
        assert!(result.is_err());
    }
}
