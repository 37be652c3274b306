//! The invocation context
//!
//! An [`Orb`] owns the registries and the protocol factory for one process
//! (or one simulated host in tests). Handles carry the orb they were built
//! by, so there is no hidden global state; [`Orb::global`] exists for
//! programs that want a single shared context.

use std::fmt;
use std::sync::{Arc, OnceLock, Weak};

use remobj_wire::ArgList;
use tracing::debug;

use crate::class_info::CLASS_INFO_TYPE;
use crate::connection::{
    InstanceHandle, Protocol, ProtocolFactory, Resolved, TcpProtocol, DEFAULT_MAX_FRAME_SIZE,
};
use crate::interface::Interface;
use crate::object::{Object, ObjectRef};
use crate::registry::{ClassRegistry, ConnectRegistry, InstanceRegistry};
use crate::types::{Result, RmiError, BASE_TYPE};

/// Orb configuration
#[derive(Clone, Debug)]
pub struct OrbConfig {
    /// Share one connection per endpoint
    pub cache_connections: bool,
    /// Register the `tcp` protocol at construction
    pub enable_tcp: bool,
    /// Largest frame accepted from a TCP peer
    pub max_frame_size: usize,
}

impl Default for OrbConfig {
    fn default() -> Self {
        Self {
            cache_connections: true,
            enable_tcp: true,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }
}

/// Builder for [`Orb`]
#[derive(Default)]
pub struct OrbBuilder {
    config: OrbConfig,
}

impl OrbBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable connection sharing
    pub fn cache_connections(mut self, enable: bool) -> Self {
        self.config.cache_connections = enable;
        self
    }

    /// Enable or disable the built-in TCP protocol
    pub fn tcp(mut self, enable: bool) -> Self {
        self.config.enable_tcp = enable;
        self
    }

    /// Set the TCP client's maximum frame size
    pub fn max_frame_size(mut self, size: usize) -> Self {
        self.config.max_frame_size = size;
        self
    }

    pub fn build(self) -> Orb {
        Orb::with_config(self.config)
    }
}

struct OrbInner {
    config: OrbConfig,
    instances: Arc<InstanceRegistry>,
    connectors: ConnectRegistry,
    classes: ClassRegistry,
    protocols: ProtocolFactory,
}

/// Registries, protocols and local endpoints of one process
#[derive(Clone)]
pub struct Orb {
    inner: Arc<OrbInner>,
}

/// Non-owning reference to an [`Orb`]
#[derive(Clone)]
pub struct WeakOrb(Weak<OrbInner>);

impl WeakOrb {
    pub fn upgrade(&self) -> Option<Orb> {
        self.0.upgrade().map(|inner| Orb { inner })
    }
}

impl Orb {
    pub fn new() -> Self {
        Self::with_config(OrbConfig::default())
    }

    pub fn with_config(config: OrbConfig) -> Self {
        let instances = Arc::new(InstanceRegistry::new());
        let protocols = ProtocolFactory::new(instances.clone(), config.cache_connections);
        if config.enable_tcp {
            protocols.register_protocol(Arc::new(
                TcpProtocol::new().with_max_frame_size(config.max_frame_size),
            ));
        }
        let connectors = ConnectRegistry::new();
        connectors.register_type(&CLASS_INFO_TYPE);

        Self {
            inner: Arc::new(OrbInner {
                config,
                instances,
                connectors,
                classes: ClassRegistry::new(),
                protocols,
            }),
        }
    }

    pub fn builder() -> OrbBuilder {
        OrbBuilder::new()
    }

    /// Process-wide orb, built on first use.
    pub fn global() -> &'static Orb {
        static GLOBAL: OnceLock<Orb> = OnceLock::new();
        GLOBAL.get_or_init(Orb::new)
    }

    pub fn config(&self) -> &OrbConfig {
        &self.inner.config
    }

    pub fn instances(&self) -> &InstanceRegistry {
        &self.inner.instances
    }

    pub fn connectors(&self) -> &ConnectRegistry {
        &self.inner.connectors
    }

    pub fn classes(&self) -> &ClassRegistry {
        &self.inner.classes
    }

    pub fn protocols(&self) -> &ProtocolFactory {
        &self.inner.protocols
    }

    pub fn downgrade(&self) -> WeakOrb {
        WeakOrb(Arc::downgrade(&self.inner))
    }

    pub fn ptr_eq(&self, other: &Orb) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn register_protocol(&self, protocol: Arc<dyn Protocol>) {
        self.inner.protocols.register_protocol(protocol);
    }

    pub fn add_local_endpoint(&self, endpoint: &str) {
        self.inner.protocols.add_local_endpoint(endpoint);
    }

    pub fn remove_local_endpoint(&self, endpoint: &str) {
        self.inner.protocols.remove_local_endpoint(endpoint);
    }

    /// Endpoint local objects are published under, if any server runs
    pub fn local_endpoint(&self) -> Option<String> {
        self.inner.protocols.primary_endpoint()
    }

    /// Handle on a local implementation.
    pub fn wrap(&self, object: Arc<dyn Object>) -> ObjectRef {
        ObjectRef::local(self, object)
    }

    /// Pin `object` in the instance registry and return its URL.
    pub fn publish(&self, object: Arc<dyn Object>) -> Result<String> {
        let endpoint = self.local_endpoint().ok_or(RmiError::NoServer)?;
        let id = self.instances().register(object);
        Ok(format!("{}/{}", endpoint, id))
    }

    /// Pin `object` under a well-known id and return its URL.
    pub fn publish_as(&self, id: &str, object: Arc<dyn Object>) -> Result<String> {
        let endpoint = self.local_endpoint().ok_or(RmiError::NoServer)?;
        if !self.instances().register_with_id(id, object) {
            return Err(RmiError::BadRequest(format!("instance id '{}' already in use", id)));
        }
        Ok(format!("{}/{}", endpoint, id))
    }

    /// Handle on a registered local object
    pub fn lookup(&self, id: &str) -> Option<ObjectRef> {
        self.instances().lookup(id).map(|object| self.wrap(object))
    }

    pub fn is_local_url(&self, url: &str) -> bool {
        self.inner.protocols.is_local_url(url)
    }

    /// Connect to an object by URL, taking one peer reference.
    pub fn connect(&self, url: &str) -> Result<ObjectRef> {
        self.connect_with(url, true)
    }

    /// Connect to an object by URL.
    ///
    /// With `add_ref` clear, the caller hands over a peer reference it
    /// already owns.
    pub fn connect_with(&self, url: &str, add_ref: bool) -> Result<ObjectRef> {
        Ok(match self.inner.protocols.connect_instance(url, add_ref)? {
            Resolved::Local(object) => self.wrap(object),
            Resolved::Remote(handle) => ObjectRef::remote(self.clone(), handle, &BASE_TYPE),
        })
    }

    /// Connect and cast to `I`.
    pub fn connect_as<I: Interface>(&self, url: &str) -> Result<Option<I>> {
        self.connect(url)?.cast_to::<I>()
    }

    /// Connect to an object already known to implement `name`, building the
    /// view through the connect registry instead of a cast.
    pub(crate) fn connect_typed(&self, url: &str, name: &str) -> Result<ObjectRef> {
        match self.inner.protocols.connect_instance(url, true)? {
            Resolved::Local(object) => Ok(self.wrap(object)),
            Resolved::Remote(handle) => Ok(self.remote_view(handle, name)),
        }
    }

    fn remote_view(&self, handle: InstanceHandle, name: &str) -> ObjectRef {
        match self.connectors().lookup(name) {
            Some(connector) => connector(self, handle),
            None => {
                debug!("No connector for {}, using base view", name);
                ObjectRef::remote(self.clone(), handle, &BASE_TYPE)
            }
        }
    }

    /// Instantiate `type_name` on the server at `endpoint`.
    ///
    /// An endpoint served by this orb creates the object locally.
    pub fn create(&self, endpoint: &str, type_name: &str) -> Result<ObjectRef> {
        if self.inner.protocols.is_local_endpoint(endpoint.trim_end_matches('/')) {
            let object = self
                .classes()
                .create(type_name)
                .ok_or_else(|| RmiError::NoSuchClass(type_name.to_string()))?;
            return Ok(self.wrap(object));
        }
        let handle = self.inner.protocols.create_instance(endpoint, type_name)?;
        Ok(self.remote_view(handle, type_name))
    }

    /// Instantiate `I` on the server at `endpoint`.
    pub fn create_as<I: Interface>(&self, endpoint: &str) -> Result<I> {
        I::register(self);
        Ok(I::from_object(self.create(endpoint, I::TYPE_INFO.name())?))
    }

    /// Pack an object argument by URL; `None` is the null reference.
    ///
    /// The URL carries one peer reference, which [`unpack_object`] adopts.
    /// Local objects need a server endpoint to be packed.
    ///
    /// [`unpack_object`]: Orb::unpack_object
    pub fn pack_object(&self, args: &mut ArgList, name: &str, object: Option<&ObjectRef>) -> Result<()> {
        let url = object.map(ObjectRef::marshal).transpose()?;
        args.pack_object(name, url)?;
        Ok(())
    }

    /// Unpack an object argument packed by [`pack_object`](Orb::pack_object).
    pub fn unpack_object(&self, args: &ArgList, name: &str) -> Result<Option<ObjectRef>> {
        match args.unpack_object(name)? {
            Some(url) => Ok(Some(self.connect_with(&url, false)?)),
            None => Ok(None),
        }
    }
}

impl Default for Orb {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Orb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orb")
            .field("endpoint", &self.local_endpoint())
            .field("instances", &self.instances().len())
            .field("connectors", &self.connectors().len())
            .finish()
    }
}
