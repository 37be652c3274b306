//! URL resolution and connection sharing

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use remobj_wire::{ArgList, Reply, Request, RETVAL};
use tracing::{debug, info, warn};

use super::{Connection, InstanceHandle, Protocol};
use crate::object::Object;
use crate::registry::InstanceRegistry;
use crate::types::{arg, method, ErrorKind, ObjectUrl, Result, RmiError};

/// Outcome of resolving an object URL
pub enum Resolved {
    /// The URL names an object hosted by this process
    Local(Arc<dyn Object>),
    Remote(InstanceHandle),
}

/// Resolves URLs to local objects or to instance handles on shared
/// connections.
pub struct ProtocolFactory {
    instances: Arc<InstanceRegistry>,
    protocols: RwLock<HashMap<String, Arc<dyn Protocol>>>,
    connections: Mutex<HashMap<String, Weak<Connection>>>,
    local_endpoints: RwLock<Vec<String>>,
    cache_connections: bool,
}

impl ProtocolFactory {
    pub fn new(instances: Arc<InstanceRegistry>, cache_connections: bool) -> Self {
        Self {
            instances,
            protocols: RwLock::new(HashMap::new()),
            connections: Mutex::new(HashMap::new()),
            local_endpoints: RwLock::new(Vec::new()),
            cache_connections,
        }
    }

    /// Install the transport for a scheme, replacing any earlier one.
    pub fn register_protocol(&self, protocol: Arc<dyn Protocol>) {
        let scheme = protocol.scheme().to_string();
        debug!("Registering protocol {}", scheme);
        self.protocols.write().insert(scheme, protocol);
    }

    pub fn has_protocol(&self, scheme: &str) -> bool {
        self.protocols.read().contains_key(scheme)
    }

    /// Mark `endpoint` (`scheme://authority`) as served by this process.
    pub fn add_local_endpoint(&self, endpoint: &str) {
        let mut endpoints = self.local_endpoints.write();
        if !endpoints.iter().any(|e| e == endpoint) {
            info!("Serving objects at {}", endpoint);
            endpoints.push(endpoint.to_string());
        }
    }

    pub fn remove_local_endpoint(&self, endpoint: &str) {
        self.local_endpoints.write().retain(|e| e != endpoint);
    }

    /// Endpoint used when publishing local objects by URL
    pub fn primary_endpoint(&self) -> Option<String> {
        self.local_endpoints.read().first().cloned()
    }

    pub fn is_local_endpoint(&self, endpoint: &str) -> bool {
        self.local_endpoints.read().iter().any(|e| e == endpoint)
    }

    /// Local implementation named by `url`, without network traffic
    pub fn resolve_local(&self, url: &ObjectUrl) -> Option<Arc<dyn Object>> {
        if !self.is_local_endpoint(&url.endpoint()) {
            return None;
        }
        self.instances.lookup(url.object_id())
    }

    /// Whether `url` names an object hosted by this process
    pub fn is_local_url(&self, url: &str) -> bool {
        ObjectUrl::parse(url)
            .map(|u| self.resolve_local(&u).is_some())
            .unwrap_or(false)
    }

    /// Shared connection for `scheme://authority`.
    pub fn connection(&self, scheme: &str, authority: &str) -> Result<Arc<Connection>> {
        let endpoint = format!("{}://{}", scheme, authority);
        if self.cache_connections {
            if let Some(existing) = self.cached_connection(&endpoint) {
                return Ok(existing);
            }
        }

        let protocol = self
            .protocols
            .read()
            .get(scheme)
            .cloned()
            .ok_or_else(|| RmiError::UnknownProtocol(scheme.to_string()))?;
        let transport = protocol.connect(authority)?;
        let connection = Arc::new(Connection::new(endpoint.clone(), transport));
        info!("Opened connection to {}", endpoint);

        if self.cache_connections {
            let mut connections = self.connections.lock();
            if let Some(existing) = connections
                .get(&endpoint)
                .and_then(Weak::upgrade)
                .filter(|c| !c.is_closed())
            {
                // Lost a race with another opener; ours closes on drop.
                return Ok(existing);
            }
            connections.retain(|_, weak| weak.strong_count() > 0);
            connections.insert(endpoint, Arc::downgrade(&connection));
        }
        Ok(connection)
    }

    fn cached_connection(&self, endpoint: &str) -> Option<Arc<Connection>> {
        self.connections
            .lock()
            .get(endpoint)
            .and_then(Weak::upgrade)
            .filter(|c| !c.is_closed())
    }

    /// Resolve an object URL.
    ///
    /// URLs served by this process resolve locally with no traffic. Others
    /// attach an instance handle on the endpoint's shared connection; see
    /// [`Connection::attach`] for the meaning of `add_ref`. An adopted
    /// reference to a local object is released against the registry.
    pub fn connect_instance(&self, url: &str, add_ref: bool) -> Result<Resolved> {
        let url = ObjectUrl::parse(url)?;
        if self.is_local_endpoint(&url.endpoint()) {
            let object = self
                .instances
                .lookup(url.object_id())
                .ok_or_else(|| RmiError::UnknownObject(url.object_id().to_string()))?;
            if !add_ref {
                // The adopted reference was counted by our own registry.
                if let Err(e) = self.instances.release_remote_ref(url.object_id()) {
                    warn!("Failed to release adopted reference on {}: {}", url, e);
                }
            }
            return Ok(Resolved::Local(object));
        }
        let connection = self.connection(url.scheme(), url.authority())?;
        match connection.attach(url.object_id(), add_ref) {
            // A cached connection whose peer went away fails on first use.
            Err(e) if e.kind() == ErrorKind::Connection && connection.is_closed() => {
                debug!("Reconnecting to {} after: {}", connection.endpoint(), e);
                let fresh = self.connection(url.scheme(), url.authority())?;
                Ok(Resolved::Remote(fresh.attach(url.object_id(), add_ref)?))
            }
            result => Ok(Resolved::Remote(result?)),
        }
    }

    /// Ask the server at `endpoint` to instantiate `type_name`.
    ///
    /// The server counts the returned reference, so no `addRef` follows.
    pub fn create_instance(&self, endpoint: &str, type_name: &str) -> Result<InstanceHandle> {
        let (scheme, authority) = ObjectUrl::parse_endpoint(endpoint)?;
        let connection = self.connection(&scheme, &authority)?;

        let mut args = ArgList::new();
        args.pack_string(arg::TYPE_NAME, type_name.to_string())?;
        let request = Request::new("", method::CREATE, args);

        match connection.round_trip(&request)? {
            Reply::Success(results) => {
                let url = results.unpack_object(RETVAL)?.ok_or_else(|| {
                    RmiError::UnexpectedReply(format!("create of {} returned null", type_name))
                })?;
                let url = ObjectUrl::parse(&url)?;
                connection.attach(url.object_id(), false)
            }
            Reply::Fault(fault) => Err(fault.into()),
            Reply::Exception(ex) => Err(RmiError::Exception(ex)),
        }
    }

    /// Number of live cached connections
    pub fn open_connections(&self) -> usize {
        self.connections
            .lock()
            .values()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }
}
