//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Bind listener → Run accept loop
//!
//! Shutdown (shutdown.rs):
//!     Trigger → Stop accepting (listener closed) → Handlers stop between reads → Join
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Cancellation is cooperative: handlers check the flag between reads
//! - Join completes only when every tracked connection is released

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::{Shutdown, ShutdownSignal};
pub use startup::{serve, serve_on, StartupError};
