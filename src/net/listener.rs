//! TCP listener implementation.
//!
//! # Responsibilities
//! - Resolve and bind the configured IPv4 address
//! - Accept incoming TCP connections
//! - Report accept failures without tearing down the listener

use std::net::SocketAddr;

use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};

use crate::config::ServerConfig;

/// Error type for listener operations.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// Failed to resolve the configured host.
    #[error("Failed to resolve {address}: {source}")]
    Resolve {
        address: String,
        source: std::io::Error,
    },
    /// The host resolved, but not to any IPv4 address.
    #[error("No IPv4 address found for {0}")]
    NoIpv4Address(String),
    /// Failed to bind to address.
    #[error("Failed to bind: {0}")]
    Bind(std::io::Error),
    /// Failed to accept connection.
    #[error("Failed to accept: {0}")]
    Accept(std::io::Error),
}

/// An IPv4 TCP listener.
#[derive(Debug)]
pub struct Listener {
    inner: TcpListener,
}

impl Listener {
    /// Bind to the configured `host:port`.
    pub async fn bind(config: &ServerConfig) -> Result<Self, ListenerError> {
        let address = config.bind_address();
        let addr = tokio::net::lookup_host(&address)
            .await
            .map_err(|source| ListenerError::Resolve {
                address: address.clone(),
                source,
            })?
            .find(SocketAddr::is_ipv4)
            .ok_or_else(|| ListenerError::NoIpv4Address(address.clone()))?;

        let listener = TcpListener::bind(addr).await.map_err(ListenerError::Bind)?;
        let local_addr = listener.local_addr().map_err(ListenerError::Bind)?;

        tracing::info!(
            address = %local_addr,
            chunk_size = config.chunk_size,
            max_buffer = config.max_buffer,
            "Listener bound"
        );

        Ok(Self { inner: listener })
    }

    /// Accept a new connection.
    pub async fn accept(&self) -> Result<(TcpStream, SocketAddr), ListenerError> {
        let (stream, addr) = self.inner.accept().await.map_err(ListenerError::Accept)?;
        tracing::debug!(peer_addr = %addr, "Connection accepted");
        Ok((stream, addr))
    }

    /// Get the local address this listener is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, std::io::Error> {
        self.inner.local_addr()
    }
}
