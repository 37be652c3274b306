//! Proxy constructors by interface name
//!
//! Consulted when a cast on a remote handle misses the handle's static type
//! table. The connector binds a new view to the same instance handle, so the
//! result shares the remote identity of the handle it was cast from.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::connection::InstanceHandle;
use crate::object::ObjectRef;
use crate::types::{InterfaceName, TypeInfo};
use crate::Orb;

/// Builds a remote view of an instance handle
pub type Connector = Arc<dyn Fn(&Orb, InstanceHandle) -> ObjectRef + Send + Sync>;

/// Thread-safe `InterfaceName -> Connector` table
#[derive(Default)]
pub struct ConnectRegistry {
    connectors: RwLock<HashMap<InterfaceName, Connector>>,
}

impl ConnectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connector; returns false if `name` already has one.
    pub fn register(&self, name: impl Into<InterfaceName>, connector: Connector) -> bool {
        let name = name.into();
        let mut connectors = self.connectors.write();
        if connectors.contains_key(&name) {
            return false;
        }
        debug!("Registering connector for {}", name);
        connectors.insert(name, connector);
        true
    }

    /// Register the plain remote view for a static type table.
    pub fn register_type(&self, type_info: &'static TypeInfo) -> bool {
        if self.contains(type_info.name()) {
            return false;
        }
        self.register(
            InterfaceName::from_static(type_info.name()),
            Arc::new(move |orb: &Orb, handle: InstanceHandle| {
                ObjectRef::remote(orb.clone(), handle, type_info)
            }),
        )
    }

    pub fn lookup(&self, name: &str) -> Option<Connector> {
        self.connectors.read().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.connectors.read().contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.connectors.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
