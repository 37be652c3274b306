//! Object implementations and the handles that reach them
//!
//! An [`ObjectRef`] is either a direct reference to a local [`Object`] or a
//! remote reference over an [`InstanceHandle`]. The variant is fixed when the
//! handle is built; every operation below behaves the same from the caller's
//! point of view.
//!
//! | Operation     | Local                 | Remote                        |
//! |---------------|-----------------------|-------------------------------|
//! | `add_ref`     | count only            | count only                    |
//! | `delete_ref`  | destructor at zero    | one `deleteRef` at zero       |
//! | `url`         | export, no traffic    | no traffic                    |
//! | `cast`        | type table            | table, else `isType` + lookup |
//! | `is_type`     | type table            | one round trip                |
//! | `is_same`     | allocation identity   | one round trip                |
//! | `exec`        | direct call           | one round trip                |
//! | `class_info`  | local description     | one round trip + connect      |

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use remobj_wire::{ArgList, Exception, RETVAL};

use crate::class_info::{ClassInfo, ClassInfoObject};
use crate::connection::InstanceHandle;
use crate::interface::Interface;
use crate::invocation::Invocation;
use crate::types::{arg, method, InterfaceName, ObjectUrl, Result, RmiError, TypeInfo, CLASS_INFO};
use crate::Orb;

/// An implementation hosted in this process
pub trait Object: Send + Sync + 'static {
    /// Static table of implemented interfaces
    fn type_info(&self) -> &'static TypeInfo;

    /// Whether a cast to `name` succeeds
    fn is_type(&self, name: &str) -> bool {
        self.type_info().implements(name)
    }

    /// Run `method` with named arguments.
    ///
    /// Return values go in the result list, the main one under `_retval`.
    fn exec(&self, orb: &Orb, method: &str, args: &ArgList) -> std::result::Result<ArgList, Exception>;

    /// Cast to Any for downcasting
    fn as_any(&self) -> &dyn Any;
}

/// Identity of the implementation allocation
pub(crate) fn same_object(a: &Arc<dyn Object>, b: &Arc<dyn Object>) -> bool {
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}

#[derive(Clone)]
enum Target {
    Local(Arc<dyn Object>),
    Remote {
        handle: InstanceHandle,
        table: &'static TypeInfo,
    },
}

/// Reference-counted, location-transparent object handle.
///
/// Cloning is `add_ref`; dropping is `delete_ref`. A cast yields a new
/// handle on the same object viewed through another interface.
#[derive(Clone)]
pub struct ObjectRef {
    orb: Orb,
    target: Target,
    view: InterfaceName,
}

impl ObjectRef {
    /// Wrap a local implementation.
    pub fn local(orb: &Orb, object: Arc<dyn Object>) -> Self {
        let view = InterfaceName::from_static(object.type_info().name());
        Self {
            orb: orb.clone(),
            target: Target::Local(object),
            view,
        }
    }

    /// Remote view of `handle` whose static casts come from `table`.
    pub fn remote(orb: Orb, handle: InstanceHandle, table: &'static TypeInfo) -> Self {
        Self {
            orb,
            target: Target::Remote { handle, table },
            view: InterfaceName::from_static(table.name()),
        }
    }

    pub fn orb(&self) -> &Orb {
        &self.orb
    }

    /// Interface this handle is currently viewed as
    pub fn view(&self) -> &str {
        self.view.as_str()
    }

    pub fn is_remote(&self) -> bool {
        matches!(self.target, Target::Remote { .. })
    }

    pub fn is_local(&self) -> bool {
        !self.is_remote()
    }

    pub fn instance_handle(&self) -> Option<&InstanceHandle> {
        match &self.target {
            Target::Remote { handle, .. } => Some(handle),
            Target::Local(_) => None,
        }
    }

    pub fn local_object(&self) -> Option<&Arc<dyn Object>> {
        match &self.target {
            Target::Local(object) => Some(object),
            Target::Remote { .. } => None,
        }
    }

    /// Borrow the local implementation as its concrete type.
    pub fn downcast<T: Object>(&self) -> Option<&T> {
        self.local_object()
            .and_then(|object| object.as_any().downcast_ref::<T>())
    }

    /// Take another reference. Never sends a request.
    pub fn add_ref(&self) -> ObjectRef {
        self.clone()
    }

    /// Give up this reference; the last one destroys (local) or releases
    /// (remote) the object.
    pub fn delete_ref(self) {
        drop(self)
    }

    /// Holders of the underlying allocation or instance handle
    pub fn ref_count(&self) -> usize {
        match &self.target {
            Target::Local(object) => Arc::strong_count(object),
            Target::Remote { handle, .. } => handle.holders(),
        }
    }

    /// Object URL. Local objects are exported under this process's server
    /// endpoint; no request is sent either way.
    pub fn url(&self) -> Result<String> {
        match &self.target {
            Target::Remote { handle, .. } => Ok(handle.url()),
            Target::Local(object) => {
                let endpoint = self.orb.local_endpoint().ok_or(RmiError::NoServer)?;
                let id = self.orb.instances().export(object.clone());
                Ok(format!("{}/{}", endpoint, id))
            }
        }
    }

    /// URL carrying one peer reference for the receiver to adopt.
    ///
    /// A local object is exported and counted here; a remote one gets an
    /// `addRef` at its host.
    pub(crate) fn marshal(&self) -> Result<String> {
        match &self.target {
            Target::Remote { handle, .. } => {
                self.invoke(handle, method::ADD_REF, ArgList::new())?;
                Ok(handle.url())
            }
            Target::Local(object) => {
                let endpoint = self.orb.local_endpoint().ok_or(RmiError::NoServer)?;
                let instances = self.orb.instances();
                let id = instances.export(object.clone());
                instances.add_remote_ref(&id)?;
                Ok(format!("{}/{}", endpoint, id))
            }
        }
    }

    fn invoke(&self, handle: &InstanceHandle, method: &str, args: ArgList) -> Result<ArgList> {
        Invocation::new(handle, method)
            .with_args(args)
            .invoke()?
            .into_result(self.view.as_str())
    }

    /// Whether a cast to `name` would succeed. Never changes the count.
    pub fn is_type(&self, name: &str) -> Result<bool> {
        match &self.target {
            Target::Local(object) => Ok(object.is_type(name)),
            Target::Remote { handle, .. } => {
                let mut args = ArgList::new();
                args.pack_string(arg::NAME, name.to_string())?;
                let results = self.invoke(handle, method::IS_TYPE, args)?;
                Ok(results.unpack_bool(RETVAL)?)
            }
        }
    }

    /// View the same object as `name`.
    ///
    /// `Ok(None)` when the object does not implement `name` or, for a remote
    /// object, when no connector is registered for it.
    pub fn cast(&self, name: &str) -> Result<Option<ObjectRef>> {
        let Target::Remote { handle, table } = &self.target else {
            return Ok(self.is_type(name)?.then(|| self.viewed_as(name)));
        };
        if table.implements(name) {
            return Ok(Some(self.viewed_as(name)));
        }
        if !self.is_type(name)? {
            return Ok(None);
        }
        Ok(self
            .orb
            .connectors()
            .lookup(name)
            .map(|connector| connector(&self.orb, handle.clone())))
    }

    fn viewed_as(&self, name: &str) -> ObjectRef {
        let mut view = self.clone();
        if view.view.as_str() != name {
            view.view = InterfaceName::new(name);
        }
        view
    }

    /// Typed cast; registers the interface's connector on first use.
    pub fn cast_to<I: Interface>(&self) -> Result<Option<I>> {
        I::register(&self.orb);
        Ok(self.cast(I::TYPE_INFO.name())?.map(I::from_object))
    }

    /// Identity comparison.
    ///
    /// Two local handles compare allocations. A remote handle is never one of
    /// this orb's local objects, since connects resolve those locally. Two
    /// remote handles are compared by the first one's host.
    pub fn is_same(&self, other: &ObjectRef) -> Result<bool> {
        match (&self.target, &other.target) {
            (Target::Local(a), Target::Local(b)) => Ok(same_object(a, b)),
            (Target::Local(a), Target::Remote { handle, .. }) => {
                let url = ObjectUrl::parse(&handle.url())?;
                Ok(self
                    .orb
                    .protocols()
                    .resolve_local(&url)
                    .is_some_and(|b| same_object(a, &b)))
            }
            (Target::Remote { .. }, Target::Local(_)) => Ok(false),
            (Target::Remote { handle, .. }, Target::Remote { handle: other, .. }) => {
                let mut args = ArgList::new();
                args.pack_object(arg::OTHER, Some(other.url()))?;
                let results = self.invoke(handle, method::IS_SAME, args)?;
                Ok(results.unpack_bool(RETVAL)?)
            }
        }
    }

    /// Class description of the object.
    pub fn class_info(&self) -> Result<ClassInfo> {
        match &self.target {
            Target::Local(object) => Ok(ClassInfo::from_object(ObjectRef::local(
                &self.orb,
                Arc::new(ClassInfoObject::describe(object.type_info())),
            ))),
            Target::Remote { handle, .. } => {
                let results = self.invoke(handle, method::GET_CLASS_INFO, ArgList::new())?;
                let url = results.unpack_object(RETVAL)?.ok_or_else(|| {
                    RmiError::UnexpectedReply("getClassInfo returned null".to_string())
                })?;
                Ok(ClassInfo::from_object(self.orb.connect_typed(&url, CLASS_INFO)?))
            }
        }
    }

    /// Invoke a method by name.
    pub fn exec(&self, method: &str, args: ArgList) -> Result<ArgList> {
        match &self.target {
            Target::Local(object) => object
                .exec(&self.orb, method, &args)
                .map_err(RmiError::Exception),
            Target::Remote { handle, .. } => self.invoke(handle, method, args),
        }
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.target {
            Target::Local(object) => f
                .debug_struct("ObjectRef")
                .field("view", &self.view)
                .field("local", &object.type_info().name())
                .finish(),
            Target::Remote { handle, .. } => f
                .debug_struct("ObjectRef")
                .field("view", &self.view)
                .field("remote", handle)
                .finish(),
        }
    }
}
