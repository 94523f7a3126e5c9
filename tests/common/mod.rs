//! Shared utilities for integration testing.

use std::io::Write;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tracing::subscriber::DefaultGuard;

use tcp_ingest::lifecycle::{serve_on, Shutdown};
use tcp_ingest::net::Listener;
use tcp_ingest::ServerConfig;

/// A server running on an ephemeral loopback port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    /// Completes once the listener is closed and every handler has finished.
    pub task: JoinHandle<()>,
}

/// Bind to `127.0.0.1:0` and serve `config` in the background.
pub async fn start_server(config: ServerConfig) -> TestServer {
    let config = ServerConfig {
        host: "127.0.0.1".into(),
        port: 0,
        ..config
    };
    let listener = Listener::bind(&config).await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();

    let task = tokio::spawn(serve_on(listener, config, shutdown.clone()));

    TestServer {
        addr,
        shutdown,
        task,
    }
}

/// Wait until the server side closes `stream`. Returns false on timeout.
///
/// Any bytes the server never read may turn the close into a reset, which counts as closed.
pub async fn wait_for_close(stream: &mut TcpStream, within: Duration) -> bool {
    let mut buf = [0u8; 64];
    tokio::time::timeout(within, async {
        loop {
            match stream.read(&mut buf).await {
                Ok(0) | Err(_) => return,
                Ok(_) => continue,
            }
        }
    })
    .await
    .is_ok()
}

/// In-memory log sink for asserting on emitted events.
#[derive(Clone, Default)]
pub struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl LogCapture {
    /// Route this thread's events into the capture until the guard drops.
    #[allow(dead_code)]
    pub fn install(&self) -> DefaultGuard {
        let writer = self.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    #[allow(dead_code)]
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }

    #[allow(dead_code)]
    pub fn contains(&self, needle: &str) -> bool {
        self.contents().contains(needle)
    }
}

impl Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
