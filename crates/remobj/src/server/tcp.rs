//! TCP object server
//!
//! # Scalability Features
//!
//! - Each connection handled in a separate Tokio task
//! - Object calls run on the blocking pool, so implementations may make
//!   their own synchronous remote calls
//! - Semaphore-based connection limiting
//! - Graceful shutdown that stops idle connections at a frame boundary

use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{watch, Semaphore};
use tracing::{debug, info, warn};

use super::ObjectServer;
use crate::connection::{FrameTransport, DEFAULT_MAX_FRAME_SIZE, TCP_SCHEME};
use crate::types::{Result, RmiError};
use crate::Orb;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to listen on
    pub bind_addr: SocketAddr,
    /// Host placed in published URLs; defaults to the bound IP
    pub advertise_host: Option<String>,
    pub max_frame_size: usize,
    pub max_connections: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            advertise_host: None,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            max_connections: 1024,
        }
    }
}

impl ServerConfig {
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            ..Self::default()
        }
    }

    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::default()
    }
}

/// Builder for [`ServerConfig`]
#[derive(Default)]
pub struct ServerConfigBuilder {
    config: ServerConfig,
}

impl ServerConfigBuilder {
    pub fn bind_addr(mut self, addr: SocketAddr) -> Self {
        self.config.bind_addr = addr;
        self
    }

    pub fn advertise_host(mut self, host: impl Into<String>) -> Self {
        self.config.advertise_host = Some(host.into());
        self
    }

    pub fn max_frame_size(mut self, size: usize) -> Self {
        self.config.max_frame_size = size;
        self
    }

    pub fn max_connections(mut self, max: usize) -> Self {
        self.config.max_connections = max;
        self
    }

    pub fn build(self) -> ServerConfig {
        self.config
    }
}

/// Server statistics
#[derive(Debug, Default)]
pub struct ServerStats {
    pub connections_accepted: AtomicU64,
    pub connections_active: AtomicU64,
    pub connections_rejected: AtomicU64,
    pub requests_processed: AtomicU64,
}

impl ServerStats {
    pub fn snapshot(&self) -> ServerStatsSnapshot {
        ServerStatsSnapshot {
            connections_accepted: self.connections_accepted.load(Ordering::Relaxed),
            connections_active: self.connections_active.load(Ordering::Relaxed),
            connections_rejected: self.connections_rejected.load(Ordering::Relaxed),
            requests_processed: self.requests_processed.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of server statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerStatsSnapshot {
    pub connections_accepted: u64,
    pub connections_active: u64,
    pub connections_rejected: u64,
    pub requests_processed: u64,
}

/// Serves an orb's objects on a TCP listener.
///
/// Binding registers `tcp://host:port` as a local endpoint of the orb, so
/// URLs for that endpoint resolve locally and local objects are published
/// under it.
pub struct RmiServer {
    server: Arc<ObjectServer>,
    config: ServerConfig,
    listener: TcpListener,
    stats: Arc<ServerStats>,
}

impl RmiServer {
    pub async fn bind(orb: Orb, config: ServerConfig) -> Result<Self> {
        let listener = TcpListener::bind(config.bind_addr).await?;
        let local_addr = listener.local_addr()?;
        let host = config
            .advertise_host
            .clone()
            .unwrap_or_else(|| local_addr.ip().to_string());
        let endpoint = format!("{}://{}:{}", TCP_SCHEME, host, local_addr.port());
        orb.add_local_endpoint(&endpoint);

        Ok(Self {
            server: Arc::new(ObjectServer::new(orb, endpoint)),
            config,
            listener,
            stats: Arc::new(ServerStats::default()),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// `tcp://host:port` published for this server
    pub fn endpoint(&self) -> &str {
        self.server.endpoint()
    }

    pub fn stats(&self) -> &Arc<ServerStats> {
        &self.stats
    }

    /// Run until the process exits
    pub async fn run(self) -> Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Run the server with graceful shutdown
    pub async fn run_until<F: Future<Output = ()>>(self, shutdown: F) -> Result<()> {
        info!(
            "Object server listening on {} (max_connections: {})",
            self.endpoint(),
            self.config.max_connections
        );

        let semaphore = Arc::new(Semaphore::new(self.config.max_connections));
        let (stop_tx, stop_rx) = watch::channel(false);

        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                biased;

                _ = &mut shutdown => {
                    info!("Object server at {} shutting down", self.endpoint());
                    stop_tx.send_replace(true);
                    let _ = semaphore.acquire_many(self.config.max_connections as u32).await;
                    self.detach_endpoint();
                    info!("All connections closed");
                    return Ok(());
                }

                result = self.listener.accept() => {
                    let (stream, peer_addr) = result?;

                    let permit = match semaphore.clone().try_acquire_owned() {
                        Ok(permit) => permit,
                        Err(_) => {
                            self.stats.connections_rejected.fetch_add(1, Ordering::Relaxed);
                            warn!("Connection limit reached, rejecting connection from {}", peer_addr);
                            drop(stream);
                            continue;
                        }
                    };

                    self.stats.connections_accepted.fetch_add(1, Ordering::Relaxed);
                    self.stats.connections_active.fetch_add(1, Ordering::Relaxed);
                    debug!("Accepted connection from {}", peer_addr);

                    let server = Arc::clone(&self.server);
                    let stats = Arc::clone(&self.stats);
                    let max_frame_size = self.config.max_frame_size;
                    let stop = stop_rx.clone();

                    tokio::spawn(async move {
                        // Permit is held until this task completes
                        let _permit = permit;

                        let result = handle_connection(stream, server, max_frame_size, &stats, stop).await;
                        stats.connections_active.fetch_sub(1, Ordering::Relaxed);

                        match result {
                            Ok(()) => debug!("Connection closed from {}", peer_addr),
                            Err(e) => warn!("Connection error from {}: {}", peer_addr, e),
                        }
                    });
                }
            }
        }
    }

    fn detach_endpoint(&self) {
        self.server.orb.remove_local_endpoint(self.server.endpoint());
    }
}

async fn handle_connection(
    stream: TcpStream,
    server: Arc<ObjectServer>,
    max_frame_size: usize,
    stats: &ServerStats,
    mut stop: watch::Receiver<bool>,
) -> Result<()> {
    stream.set_nodelay(true)?;
    let mut transport = FrameTransport::new(stream).with_max_frame_size(max_frame_size);

    loop {
        if *stop.borrow_and_update() {
            return Ok(());
        }
        let frame = tokio::select! {
            _ = stop.changed() => return Ok(()),
            frame = transport.read_frame() => match frame {
                Ok(frame) => frame,
                Err(RmiError::ConnectionClosed) => return Ok(()),
                Err(e) => return Err(e),
            },
        };

        let server = Arc::clone(&server);
        let reply = tokio::task::spawn_blocking(move || server.handle_frame(frame))
            .await
            .map_err(|e| RmiError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?;
        transport.write_frame(&reply).await?;
        stats.requests_processed.fetch_add(1, Ordering::Relaxed);
    }
}
