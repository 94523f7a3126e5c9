//! OS signal handling.
//!
//! # Responsibilities
//! - Register signal handlers (SIGTERM, SIGINT) before serving
//! - Translate the first signal into a shutdown request
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - Registration failure is returned to the caller; startup treats it as fatal
//! - Repeated signals are no-ops; the shutdown flag is already set

use tokio::task::JoinHandle;

use crate::lifecycle::Shutdown;

/// Registered termination signals.
#[cfg(unix)]
pub struct Signals {
    interrupt: tokio::signal::unix::Signal,
    terminate: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl Signals {
    /// Register SIGINT and SIGTERM.
    pub fn install() -> std::io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};

        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }

    /// Wait for the next signal and return its name.
    pub async fn recv(&mut self) -> &'static str {
        tokio::select! {
            _ = self.interrupt.recv() => "SIGINT",
            _ = self.terminate.recv() => "SIGTERM",
        }
    }
}

/// Registered Ctrl-C handler.
#[cfg(not(unix))]
pub struct Signals {
    ctrl_c: tokio::signal::windows::CtrlC,
}

#[cfg(not(unix))]
impl Signals {
    /// Register the Ctrl-C handler.
    pub fn install() -> std::io::Result<Self> {
        Ok(Self {
            ctrl_c: tokio::signal::windows::ctrl_c()?,
        })
    }

    /// Wait for the next signal and return its name.
    pub async fn recv(&mut self) -> &'static str {
        self.ctrl_c.recv().await;
        "CTRL_C"
    }
}

/// Register the termination signals, then spawn a task that triggers `shutdown` on
/// the first one.
pub fn spawn_signal_handler(shutdown: Shutdown) -> std::io::Result<JoinHandle<()>> {
    let mut signals = Signals::install()?;

    Ok(tokio::spawn(async move {
        let signal = signals.recv().await;
        tracing::info!(signal, "Shutdown signal received");
        shutdown.trigger();
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn handler_installs_and_waits() {
        let shutdown = Shutdown::new();
        let task = spawn_signal_handler(shutdown.clone()).unwrap();

        tokio::task::yield_now().await;
        assert!(!task.is_finished());
        assert!(!shutdown.is_triggered());
        task.abort();
    }
}
