//! Class factories for remote instantiation

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::object::Object;
use crate::types::InterfaceName;

/// Creates a fresh implementation of one class
pub type ClassFactory = Arc<dyn Fn() -> Arc<dyn Object> + Send + Sync>;

/// Registered class factories by class name
#[derive(Default)]
pub struct ClassRegistry {
    factories: RwLock<HashMap<InterfaceName, ClassFactory>>,
}

impl ClassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory; returns false if `name` already has one.
    pub fn register(&self, name: impl Into<InterfaceName>, factory: ClassFactory) -> bool {
        let name = name.into();
        let mut factories = self.factories.write();
        if factories.contains_key(&name) {
            return false;
        }
        debug!("Registering class factory for {}", name);
        factories.insert(name, factory);
        true
    }

    pub fn unregister(&self, name: &str) -> bool {
        self.factories.write().remove(name).is_some()
    }

    /// Run the factory for `name`, if one is registered.
    pub fn create(&self, name: &str) -> Option<Arc<dyn Object>> {
        // Factories run outside the lock.
        let factory = self.factories.read().get(name).cloned()?;
        Some(factory())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.read().contains_key(name)
    }
}
