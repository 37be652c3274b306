//! Typed interface wrappers

use std::sync::Arc;

use crate::connection::InstanceHandle;
use crate::object::ObjectRef;
use crate::registry::Connector;
use crate::types::TypeInfo;
use crate::Orb;

/// A typed view over an [`ObjectRef`].
///
/// Implementors provide the type table and the wrapping; the connector that
/// builds remote views is registered with an orb the first time the
/// interface is cast to, connected, or created.
pub trait Interface: Sized + 'static {
    const TYPE_INFO: &'static TypeInfo;

    fn from_object(object: ObjectRef) -> Self;

    fn object(&self) -> &ObjectRef;

    /// Builds this interface's remote view of an instance handle
    fn connector() -> Connector {
        Arc::new(|orb: &Orb, handle: InstanceHandle| {
            ObjectRef::remote(orb.clone(), handle, Self::TYPE_INFO)
        })
    }

    /// Register the connector with `orb` unless one is already present.
    fn register(orb: &Orb) -> bool {
        let name = Self::TYPE_INFO.name();
        !orb.connectors().contains(name) && orb.connectors().register(name, Self::connector())
    }
}
