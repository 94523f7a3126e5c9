//! Receive-only TCP ingest server.
//!
//! # Architecture Overview
//!
//! ```text
//!                 ┌──────────────────────────────────────────────────┐
//!                 │                  INGEST SERVER                    │
//!                 │                                                   │
//!   Client  ──────┼─▶ net::listener ──▶ ingest::server (accept loop)  │
//!   stream        │                          │                        │
//!                 │                          ▼ one task per client    │
//!                 │                   ingest::handler                 │
//!                 │           chunked reads until EOF / timeout /     │
//!                 │           max_buffer / shutdown                   │
//!                 │                                                   │
//!                 │  config · observability · lifecycle (signals,     │
//!                 │  shutdown coordination, join)                     │
//!                 └──────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use tcp_ingest::config::{load_config, validation::validate_config, ConfigError, IngestConfig};
use tcp_ingest::lifecycle::{self, signals, Shutdown, StartupError};
use tcp_ingest::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "tcp-ingest")]
#[command(about = "Receive-only TCP ingest server", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file. Built-in defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `server.host`.
    #[arg(long)]
    host: Option<String>,

    /// Override `server.port`.
    #[arg(short, long)]
    port: Option<u16>,
}

fn load(cli: &Cli) -> Result<IngestConfig, ConfigError> {
    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => IngestConfig::default(),
    };

    if let Some(host) = &cli.host {
        config.server.host = host.clone();
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    config.server.fill_defaults();
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), StartupError> {
    let cli = Cli::parse();
    let config = load(&cli)?;

    logging::init_logging(&config.observability)?;

    tracing::info!(
        bind_address = %config.server.bind_address(),
        chunk_size = config.server.chunk_size,
        read_timeout_ms = config.server.read_timeout_ms,
        keep_alive_ms = config.server.keep_alive_ms,
        max_buffer = config.server.max_buffer,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        // Validation guarantees the address parses.
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr)?;
        }
    }

    let shutdown = Shutdown::new();
    let _signals =
        signals::spawn_signal_handler(shutdown.clone()).map_err(StartupError::Signals)?;

    if let Err(e) = lifecycle::serve(config.server, shutdown).await {
        tracing::error!(error = %e, "Error starting server");
        return Err(e);
    }

    Ok(())
}
