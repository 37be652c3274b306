//! Serving hosted objects to remote callers
//!
//! [`ObjectServer`] turns one decoded request into one reply. The reserved
//! methods (`addRef`, `deleteRef`, `isType`, `isSame`, `getClassInfo`,
//! `_create`) are answered here; everything else is passed to the target
//! object's `exec`. [`RmiServer`] carries requests to it over TCP.

mod tcp;

use std::sync::Arc;

use bytes::Bytes;
use remobj_wire::{fault, ArgList, Fault, Reply, Request, Value, WireDecode, WireEncode, RETVAL};
use tracing::{debug, warn};

use crate::class_info::ClassInfoObject;
use crate::object::{same_object, Object};
use crate::types::{arg, method, ObjectUrl, Result, RmiError};
use crate::Orb;

pub use tcp::{RmiServer, ServerConfig, ServerConfigBuilder, ServerStats, ServerStatsSnapshot};

/// Dispatches requests arriving at one endpoint of an orb
#[derive(Clone)]
pub struct ObjectServer {
    orb: Orb,
    endpoint: String,
}

impl ObjectServer {
    /// `endpoint` is the `scheme://authority` callers reached this server by;
    /// URLs handed back to them are built under it.
    pub fn new(orb: Orb, endpoint: impl Into<String>) -> Self {
        Self {
            orb,
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Decode, dispatch and encode one frame.
    pub fn handle_frame(&self, frame: Bytes) -> Bytes {
        let reply = match Request::from_bytes(frame) {
            Ok(request) => self.dispatch(request),
            Err(e) => {
                warn!("Malformed request at {}: {}", self.endpoint, e);
                Reply::Fault(Fault::new(fault::BAD_REQUEST, e.to_string()))
            }
        };
        reply.to_bytes()
    }

    pub fn dispatch(&self, request: Request) -> Reply {
        debug!("Dispatching {} on '{}'", request.method, request.object_id);
        match self.try_dispatch(&request) {
            Ok(reply) => reply,
            Err(e) => {
                warn!(
                    "Failed to dispatch {} on '{}': {}",
                    request.method, request.object_id, e
                );
                Reply::Fault(e.to_fault())
            }
        }
    }

    fn try_dispatch(&self, request: &Request) -> Result<Reply> {
        if request.method == method::CREATE {
            return self.create(&request.args);
        }

        let id = request.object_id.as_str();
        let instances = self.orb.instances();
        let object = instances
            .lookup(id)
            .ok_or_else(|| RmiError::UnknownObject(id.to_string()))?;

        let mut results = ArgList::new();
        match request.method.as_str() {
            method::ADD_REF => {
                instances.add_remote_ref(id)?;
            }
            method::DELETE_REF => {
                // Drop our handle first so an evicted object is destroyed
                // by the registry.
                drop(object);
                instances.release_remote_ref(id)?;
            }
            method::IS_TYPE => {
                let name = request.args.unpack_string(arg::NAME)?;
                results.pack_bool(RETVAL, object.is_type(&name))?;
            }
            method::IS_SAME => {
                let same = match request.args.unpack_object(arg::OTHER)? {
                    Some(url) => self.is_same(&object, &url),
                    None => false,
                };
                results.pack_bool(RETVAL, same)?;
            }
            method::GET_CLASS_INFO => {
                let info = Arc::new(ClassInfoObject::describe(object.type_info()));
                let info_id = instances.export(info);
                results.pack(
                    RETVAL,
                    Value::Object(Some(format!("{}/{}", self.endpoint, info_id))),
                )?;
            }
            other => {
                return Ok(match object.exec(&self.orb, other, &request.args) {
                    Ok(results) => Reply::Success(results),
                    Err(ex) => {
                        debug!("{}.{} raised {}", object.type_info().name(), other, ex);
                        Reply::Exception(ex)
                    }
                });
            }
        }
        Ok(Reply::Success(results))
    }

    fn is_same(&self, object: &Arc<dyn Object>, url: &str) -> bool {
        ObjectUrl::parse(url)
            .ok()
            .and_then(|url| self.orb.protocols().resolve_local(&url))
            .is_some_and(|other| same_object(object, &other))
    }

    fn create(&self, args: &ArgList) -> Result<Reply> {
        let type_name = args.unpack_string(arg::TYPE_NAME)?;
        let object = self
            .orb
            .classes()
            .create(&type_name)
            .ok_or_else(|| RmiError::NoSuchClass(type_name.clone()))?;

        let instances = self.orb.instances();
        let id = instances.export(object);
        // The caller adopts this reference instead of sending addRef.
        instances.add_remote_ref(&id)?;
        debug!("Created {} instance {}", type_name, id);

        let mut results = ArgList::new();
        results.pack(
            RETVAL,
            Value::Object(Some(format!("{}/{}", self.endpoint, id))),
        )?;
        Ok(Reply::Success(results))
    }
}
