//! Receive-only TCP ingest server library.

pub mod config;
pub mod ingest;
pub mod lifecycle;
pub mod net;
pub mod observability;

pub use config::schema::{IngestConfig, ServerConfig};
pub use ingest::{ConnectionOutcome, IngestServer};
pub use lifecycle::Shutdown;
