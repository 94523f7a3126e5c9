//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (bind, accept)
//!     → connection.rs (Client ownership, lifecycle tracking, state machine)
//!     → Hand off to the ingest connection handler
//!
//! Connection States:
//!     Validating → Reading → Closed
//! ```
//!
//! # Design Decisions
//! - Each connection tracked for graceful shutdown
//! - Failed accepts back off briefly instead of spinning (backoff.rs)

pub mod backoff;
pub mod connection;
pub mod listener;

pub use connection::{Client, ConnectionGuard, ConnectionId, ConnectionState, ConnectionTracker};
pub use listener::{Listener, ListenerError};
