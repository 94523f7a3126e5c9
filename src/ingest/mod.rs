//! Ingest subsystem: the accept loop and the per-connection read loop.
//!
//! # Data Flow
//! ```text
//! server.rs (accept loop)
//!     → track connection, wrap socket as Client
//!     → spawn handler.rs (chunked reads until EOF / timeout / limit / shutdown)
//!     → socket closed, tracker slot released
//! ```

pub mod handler;
pub mod server;

pub use handler::{ConnectionHandler, ConnectionOutcome};
pub use server::IngestServer;
