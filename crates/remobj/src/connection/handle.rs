//! Connections and instance handles

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use remobj_wire::{ArgList, Reply, Request, WireDecode, WireEncode};
use tracing::{debug, info, warn};

use super::Transport;
use crate::types::{method, ErrorKind, Result, RmiError};

/// Shared channel to one remote endpoint.
///
/// Closed when the last instance handle (or other holder) drops it.
pub struct Connection {
    endpoint: String,
    transport: Box<dyn Transport>,
    instances: Mutex<HashMap<String, Weak<InstanceInner>>>,
    closed: AtomicBool,
}

impl Connection {
    pub(crate) fn new(endpoint: String, transport: Box<dyn Transport>) -> Self {
        Self {
            endpoint,
            transport,
            instances: Mutex::new(HashMap::new()),
            closed: AtomicBool::new(false),
        }
    }

    /// `scheme://authority` of the peer
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Fail calls in flight and every later call with `ConnectionClosed`.
    ///
    /// Releases sent by handles still attached here fail and are only
    /// logged. New connects to the endpoint open a fresh connection.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            info!("Closing connection to {}", self.endpoint);
            self.transport.close();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst) || self.transport.is_closed()
    }

    /// One encoded request out, one decoded reply back.
    ///
    /// A channel failure closes the connection, so later connects to the
    /// endpoint open a fresh one.
    pub fn round_trip(&self, request: &Request) -> Result<Reply> {
        if self.is_closed() {
            return Err(RmiError::ConnectionClosed);
        }
        let response = match self.transport.call(request.to_bytes()) {
            Ok(response) => response,
            Err(e) => {
                if e.kind() == ErrorKind::Connection || self.transport.is_closed() {
                    self.mark_failed(&e);
                }
                return Err(e);
            }
        };
        Ok(Reply::from_bytes(response)?)
    }

    fn mark_failed(&self, error: &RmiError) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            warn!("Connection to {} failed: {}", self.endpoint, error);
            self.transport.close();
        }
    }

    fn expect_success(&self, request: &Request) -> Result<ArgList> {
        match self.round_trip(request)? {
            Reply::Success(args) => Ok(args),
            Reply::Fault(fault) => Err(fault.into()),
            Reply::Exception(ex) => Err(RmiError::UnexpectedReply(format!(
                "{} raised {} on {}",
                request.method, ex, request.object_id
            ))),
        }
    }

    fn cached(&self, object_id: &str) -> Option<InstanceHandle> {
        self.instances
            .lock()
            .get(object_id)
            .and_then(Weak::upgrade)
            .map(InstanceHandle)
    }

    /// Handle for `object_id` on this connection.
    ///
    /// With `add_ref`, a newly created handle takes one peer reference
    /// before it is cached. Without it, the caller already owns a peer
    /// reference and the handle adopts it; a surplus adopted reference is
    /// released at once.
    pub fn attach(self: &Arc<Self>, object_id: &str, add_ref: bool) -> Result<InstanceHandle> {
        if let Some(existing) = self.cached(object_id) {
            if !add_ref {
                self.release_surplus(object_id);
            }
            return Ok(existing);
        }

        if add_ref {
            self.expect_success(&Request::new(object_id, method::ADD_REF, ArgList::new()))?;
        }

        let inner = Arc::new(InstanceInner {
            connection: self.clone(),
            object_id: object_id.to_string(),
        });

        let mut instances = self.instances.lock();
        if let Some(existing) = instances.get(object_id).and_then(Weak::upgrade) {
            drop(instances);
            // Another thread attached first; dropping ours releases the
            // reference it took.
            drop(inner);
            return Ok(InstanceHandle(existing));
        }
        instances.insert(object_id.to_string(), Arc::downgrade(&inner));
        debug!("Attached instance {} on {}", object_id, self.endpoint);
        Ok(InstanceHandle(inner))
    }

    fn release_surplus(&self, object_id: &str) {
        let request = Request::new(object_id, method::DELETE_REF, ArgList::new());
        if let Err(e) = self.expect_success(&request) {
            warn!(
                "Failed to release surplus reference on {}/{}: {}",
                self.endpoint, object_id, e
            );
        }
    }

    fn forget(&self, object_id: &str) {
        let mut instances = self.instances.lock();
        if instances
            .get(object_id)
            .is_some_and(|weak| weak.strong_count() == 0)
        {
            instances.remove(object_id);
        }
    }

    /// Number of live instance handles on this connection
    pub fn live_instances(&self) -> usize {
        self.instances
            .lock()
            .values()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.transport.close();
        debug!("Dropped connection to {}", self.endpoint);
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

pub(crate) struct InstanceInner {
    connection: Arc<Connection>,
    object_id: String,
}

impl Drop for InstanceInner {
    fn drop(&mut self) {
        let request = Request::new(self.object_id.as_str(), method::DELETE_REF, ArgList::new());
        match self.connection.expect_success(&request) {
            Ok(_) => debug!(
                "Released instance {} on {}",
                self.object_id,
                self.connection.endpoint()
            ),
            Err(e) => warn!(
                "Failed to release instance {} on {}: {}",
                self.object_id,
                self.connection.endpoint(),
                e
            ),
        }
        self.connection.forget(&self.object_id);
    }
}

/// A connection's identifier for one remote object.
///
/// Clones share one peer reference; the release goes out when the last
/// clone drops.
#[derive(Clone)]
pub struct InstanceHandle(Arc<InstanceInner>);

impl InstanceHandle {
    pub fn object_id(&self) -> &str {
        &self.0.object_id
    }

    pub fn connection(&self) -> &Arc<Connection> {
        &self.0.connection
    }

    /// `scheme://authority/object-id`
    pub fn url(&self) -> String {
        format!("{}/{}", self.0.connection.endpoint(), self.0.object_id)
    }

    /// Number of local holders of this handle
    pub fn holders(&self) -> usize {
        Arc::strong_count(&self.0)
    }

    /// Whether both handles refer to the same attachment
    pub fn ptr_eq(&self, other: &InstanceHandle) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for InstanceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("InstanceHandle").field(&self.url()).finish()
    }
}
