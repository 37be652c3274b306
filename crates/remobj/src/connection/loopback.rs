//! In-process transport between two [`Orb`]s (`loop://name/object-id`)
//!
//! Requests are encoded and decoded exactly as over TCP, then dispatched on
//! the calling thread by the target orb's object server. The network counts
//! round trips and records every call the peers saw.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::{Mutex, RwLock};
use remobj_wire::{Request, WireDecode};
use tracing::debug;

use super::{Protocol, Transport};
use crate::orb::WeakOrb;
use crate::server::ObjectServer;
use crate::types::{Result, RmiError};
use crate::Orb;

pub const LOOPBACK_SCHEME: &str = "loop";

/// One request observed by a loopback host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRecord {
    pub host: String,
    pub object_id: String,
    pub method: String,
}

#[derive(Default)]
struct NetworkInner {
    hosts: RwLock<HashMap<String, WeakOrb>>,
    round_trips: AtomicU64,
    calls: Mutex<Vec<CallRecord>>,
}

/// A set of named in-process hosts
#[derive(Clone, Default)]
pub struct LoopbackNetwork {
    inner: Arc<NetworkInner>,
}

impl LoopbackNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish `orb` as host `name` and let it reach the other hosts.
    ///
    /// Returns the endpoint, `loop://name`.
    pub fn bind(&self, name: &str, orb: &Orb) -> String {
        let endpoint = format!("{}://{}", LOOPBACK_SCHEME, name);
        self.inner
            .hosts
            .write()
            .insert(name.to_string(), orb.downgrade());
        self.attach(orb);
        orb.add_local_endpoint(&endpoint);
        endpoint
    }

    /// Let `orb` reach hosts on this network without publishing it.
    pub fn attach(&self, orb: &Orb) {
        orb.register_protocol(Arc::new(LoopbackProtocol {
            network: self.clone(),
        }));
    }

    pub fn unbind(&self, name: &str) -> bool {
        self.inner.hosts.write().remove(name).is_some()
    }

    /// Round trips made since creation or the last [`reset`](Self::reset)
    pub fn round_trips(&self) -> u64 {
        self.inner.round_trips.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<CallRecord> {
        self.inner.calls.lock().clone()
    }

    /// Method names of every recorded call, in order
    pub fn methods(&self) -> Vec<String> {
        self.inner
            .calls
            .lock()
            .iter()
            .map(|c| c.method.clone())
            .collect()
    }

    pub fn reset(&self) {
        self.inner.round_trips.store(0, Ordering::SeqCst);
        self.inner.calls.lock().clear();
    }

    fn host(&self, name: &str) -> Option<Orb> {
        self.inner.hosts.read().get(name).and_then(WeakOrb::upgrade)
    }
}

struct LoopbackProtocol {
    network: LoopbackNetwork,
}

impl Protocol for LoopbackProtocol {
    fn scheme(&self) -> &str {
        LOOPBACK_SCHEME
    }

    fn connect(&self, authority: &str) -> Result<Box<dyn Transport>> {
        if self.network.host(authority).is_none() {
            return Err(RmiError::Unreachable {
                endpoint: format!("{}://{}", LOOPBACK_SCHEME, authority),
                reason: "no such loopback host".to_string(),
            });
        }
        debug!("Opened loopback connection to {}", authority);
        Ok(Box::new(LoopbackTransport {
            network: self.network.clone(),
            host: authority.to_string(),
            closed: AtomicBool::new(false),
        }))
    }
}

struct LoopbackTransport {
    network: LoopbackNetwork,
    host: String,
    closed: AtomicBool,
}

impl Transport for LoopbackTransport {
    fn call(&self, request: Bytes) -> Result<Bytes> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(RmiError::ConnectionClosed);
        }
        let orb = self
            .network
            .host(&self.host)
            .ok_or_else(|| RmiError::Unreachable {
                endpoint: format!("{}://{}", LOOPBACK_SCHEME, self.host),
                reason: "loopback host is gone".to_string(),
            })?;

        self.network.inner.round_trips.fetch_add(1, Ordering::SeqCst);
        if let Ok(decoded) = Request::from_bytes(request.clone()) {
            self.network.inner.calls.lock().push(CallRecord {
                host: self.host.clone(),
                object_id: decoded.object_id,
                method: decoded.method,
            });
        }

        let endpoint = format!("{}://{}", LOOPBACK_SCHEME, self.host);
        Ok(ObjectServer::new(orb, endpoint).handle_frame(request))
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}
