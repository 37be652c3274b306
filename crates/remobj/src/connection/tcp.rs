//! Blocking TCP transport (`tcp://host:port/object-id`)
//!
//! The client side of the invocation layer is synchronous, so each transport
//! drives its socket on a private single-worker runtime and blocks the
//! calling thread for the duration of one round trip.

use std::sync::Arc;

use bytes::Bytes;
use tokio::net::TcpStream;
use tokio::runtime::Runtime;
use tokio::sync::{watch, Mutex};
use tracing::{info, warn};

use super::frame::{FrameTransport, DEFAULT_MAX_FRAME_SIZE};
use super::{Protocol, Transport};
use crate::types::{Result, RmiError};

pub const TCP_SCHEME: &str = "tcp";

/// Opens [`TcpTransport`]s
#[derive(Debug, Clone)]
pub struct TcpProtocol {
    max_frame_size: usize,
}

impl TcpProtocol {
    pub fn new() -> Self {
        Self {
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }

    pub fn with_max_frame_size(mut self, max_size: usize) -> Self {
        self.max_frame_size = max_size;
        self
    }
}

impl Default for TcpProtocol {
    fn default() -> Self {
        Self::new()
    }
}

impl Protocol for TcpProtocol {
    fn scheme(&self) -> &str {
        TCP_SCHEME
    }

    fn connect(&self, authority: &str) -> Result<Box<dyn Transport>> {
        Ok(Box::new(TcpTransport::connect(authority, self.max_frame_size)?))
    }
}

/// One TCP stream to a peer's object server
pub struct TcpTransport {
    peer: String,
    runtime: Option<Runtime>,
    stream: Arc<Mutex<FrameTransport<TcpStream>>>,
    max_frame_size: usize,
    closed: watch::Sender<bool>,
}

impl TcpTransport {
    pub fn connect(authority: &str, max_frame_size: usize) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("remobj-tcp")
            .enable_all()
            .build()?;

        let stream = runtime
            .block_on(TcpStream::connect(authority))
            .map_err(|e| RmiError::Unreachable {
                endpoint: format!("{}://{}", TCP_SCHEME, authority),
                reason: e.to_string(),
            })?;
        stream.set_nodelay(true)?;
        info!("Connected to {}", authority);

        let (closed, _) = watch::channel(false);
        Ok(Self {
            peer: authority.to_string(),
            runtime: Some(runtime),
            stream: Arc::new(Mutex::new(
                FrameTransport::new(stream).with_max_frame_size(max_frame_size),
            )),
            max_frame_size,
            closed,
        })
    }

    pub fn peer(&self) -> &str {
        &self.peer
    }
}

impl Transport for TcpTransport {
    fn call(&self, request: Bytes) -> Result<Bytes> {
        let runtime = self.runtime.as_ref().ok_or(RmiError::ConnectionClosed)?;
        let mut closed = self.closed.subscribe();
        if *closed.borrow_and_update() {
            return Err(RmiError::ConnectionClosed);
        }
        // Refused before anything reaches the socket, so the stream stays usable.
        if request.len() > self.max_frame_size {
            return Err(RmiError::FrameTooLarge {
                size: request.len(),
                max: self.max_frame_size,
            });
        }
        let stream = self.stream.clone();

        let result = runtime.block_on(async move {
            let exchange = async {
                // Held for the whole round trip so replies pair with requests.
                let mut stream = stream.lock().await;
                stream.write_frame(&request).await?;
                stream.read_frame().await
            };
            tokio::select! {
                biased;

                _ = closed.changed() => Err(RmiError::ConnectionClosed),
                result = exchange => result,
            }
        });

        // A failed exchange may leave part of a frame in the stream.
        if let Err(e) = &result {
            if !self.closed.send_replace(true) {
                warn!("Stream to {} out of sync after failed call: {}", self.peer, e);
            }
        }
        result
    }

    fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    fn close(&self) {
        self.closed.send_replace(true);
    }
}

impl Drop for TcpTransport {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
        info!("Disconnected from {}", self.peer);
    }
}
