//! Hosted object table
//!
//! Each entry owns one reference to a local implementation and counts the
//! references remote instance handles hold on it. Pinned entries stay until
//! `unregister`; unpinned entries (created by `export`) disappear when their
//! remote count returns to zero.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::object::Object;
use crate::types::{Result, RmiError};

/// Snapshot of one registry entry
#[derive(Clone)]
pub struct InstanceEntry {
    pub object: Arc<dyn Object>,
    /// References held by remote instance handles
    pub remote_refs: u32,
    /// Survives a zero remote count
    pub pinned: bool,
}

#[derive(Default)]
struct Tables {
    by_id: HashMap<String, InstanceEntry>,
    ids_by_ptr: HashMap<usize, String>,
}

/// Thread-safe table of hosted objects
#[derive(Default)]
pub struct InstanceRegistry {
    tables: RwLock<Tables>,
}

fn identity(object: &Arc<dyn Object>) -> usize {
    Arc::as_ptr(object) as *const () as usize
}

impl InstanceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register and pin `object` under a fresh id.
    ///
    /// An object that is already present keeps its id and becomes pinned.
    pub fn register(&self, object: Arc<dyn Object>) -> String {
        self.insert(object, true)
    }

    /// Register `object` for marshalling by URL without pinning it.
    pub fn export(&self, object: Arc<dyn Object>) -> String {
        self.insert(object, false)
    }

    fn insert(&self, object: Arc<dyn Object>, pin: bool) -> String {
        let mut tables = self.tables.write();
        if let Some(id) = tables.ids_by_ptr.get(&identity(&object)).cloned() {
            if pin {
                if let Some(entry) = tables.by_id.get_mut(&id) {
                    entry.pinned = true;
                }
            }
            return id;
        }

        let id = uuid::Uuid::new_v4().to_string();
        debug!(
            "Registering {} instance {} (pinned: {})",
            object.type_info().name(),
            id,
            pin
        );
        tables.ids_by_ptr.insert(identity(&object), id.clone());
        tables.by_id.insert(
            id.clone(),
            InstanceEntry {
                object,
                remote_refs: 0,
                pinned: pin,
            },
        );
        id
    }

    /// Register and pin `object` under a caller-chosen id.
    ///
    /// Returns false, leaving the registry unchanged, when the id is taken or
    /// the object is already registered under another id.
    pub fn register_with_id(&self, id: &str, object: Arc<dyn Object>) -> bool {
        let mut tables = self.tables.write();
        if tables.by_id.contains_key(id) || tables.ids_by_ptr.contains_key(&identity(&object)) {
            return false;
        }
        tables.ids_by_ptr.insert(identity(&object), id.to_string());
        tables.by_id.insert(
            id.to_string(),
            InstanceEntry {
                object,
                remote_refs: 0,
                pinned: true,
            },
        );
        true
    }

    pub fn lookup(&self, id: &str) -> Option<Arc<dyn Object>> {
        self.tables.read().by_id.get(id).map(|e| e.object.clone())
    }

    pub fn entry(&self, id: &str) -> Option<InstanceEntry> {
        self.tables.read().by_id.get(id).cloned()
    }

    /// Id under which `object` is registered, if any
    pub fn id_of(&self, object: &Arc<dyn Object>) -> Option<String> {
        self.tables.read().ids_by_ptr.get(&identity(object)).cloned()
    }

    /// Drop the registry's reference regardless of remote holders.
    pub fn unregister(&self, id: &str) -> Option<Arc<dyn Object>> {
        let removed = {
            let mut tables = self.tables.write();
            let entry = tables.by_id.remove(id)?;
            tables.ids_by_ptr.remove(&identity(&entry.object));
            entry
        };
        debug!("Unregistered instance {}", id);
        Some(removed.object)
    }

    /// Count one more remote instance handle on `id`.
    pub fn add_remote_ref(&self, id: &str) -> Result<u32> {
        let mut tables = self.tables.write();
        let entry = tables
            .by_id
            .get_mut(id)
            .ok_or_else(|| RmiError::UnknownObject(id.to_string()))?;
        entry.remote_refs = entry.remote_refs.saturating_add(1);
        Ok(entry.remote_refs)
    }

    /// Drop one remote reference on `id`, returning the remaining count.
    pub fn release_remote_ref(&self, id: &str) -> Result<u32> {
        // The evicted object is dropped after the lock is released; its
        // destructor may call back into the registry.
        let evicted;
        let remaining = {
            let mut tables = self.tables.write();
            let entry = tables
                .by_id
                .get_mut(id)
                .ok_or_else(|| RmiError::UnknownObject(id.to_string()))?;
            if entry.remote_refs == 0 {
                warn!("Release of instance {} with no remote references", id);
                return Err(RmiError::RefCountUnderflow(id.to_string()));
            }
            entry.remote_refs -= 1;
            let remaining = entry.remote_refs;
            evicted = if remaining == 0 && !entry.pinned {
                let entry = tables.by_id.remove(id);
                if let Some(entry) = &entry {
                    tables.ids_by_ptr.remove(&identity(&entry.object));
                }
                entry
            } else {
                None
            };
            remaining
        };
        if evicted.is_some() {
            debug!("Instance {} released by its last remote holder", id);
        }
        drop(evicted);
        Ok(remaining)
    }

    pub fn remote_refs(&self, id: &str) -> Option<u32> {
        self.tables.read().by_id.get(id).map(|e| e.remote_refs)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.tables.read().by_id.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.tables.read().by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
