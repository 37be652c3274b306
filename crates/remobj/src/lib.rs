//! Location-transparent remote object invocation
//!
//! A caller holds an [`ObjectRef`] to an object implementing one or more
//! named interfaces. Calls on the handle go to an in-process implementation
//! or to a remote instance over a connection; the caller cannot tell which.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  ObjectRef / Interface wrappers          (object, interface) │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Orb: InstanceRegistry │ ConnectRegistry │ ClassRegistry     │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Invocation / Response          (remobj-wire codec)         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ProtocolFactory → Connection → InstanceHandle              │
//! │  Protocols: tcp (blocking client, async server), loopback   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Key Concepts
//!
//! - **Orb**: owns the registries of one process; handles keep it alive
//! - **Instance handle**: a connection's name for one remote object; the
//!   peer sees one `addRef` when it is created and one `deleteRef` when the
//!   last local holder drops it
//! - **Cast**: a remote handle answers casts from its static type table,
//!   otherwise asks the peer (`isType`) and builds the view through the
//!   connect registry
//! - **Exceptions**: raised remotely, re-raised locally with one trace line
//!   per hop
//!
//! # Modules
//!
//! - [`types`]: errors, interface names, URLs
//! - [`registry`]: instance, connect and class registries
//! - [`connection`]: protocols, connections, instance handles
//! - [`server`]: request dispatch and the TCP server

pub mod connection;
pub mod registry;
pub mod server;
pub mod types;

mod class_info;
mod interface;
mod invocation;
mod object;
mod orb;

pub use class_info::{ClassInfo, ClassInfoObject, CLASS_INFO_TYPE};
pub use connection::{InstanceHandle, LoopbackNetwork};
pub use interface::Interface;
pub use invocation::{Invocation, Response};
pub use object::{Object, ObjectRef};
pub use orb::{Orb, OrbBuilder, OrbConfig, WeakOrb};
pub use server::{ObjectServer, RmiServer, ServerConfig};
pub use types::{ErrorKind, InterfaceName, ObjectUrl, Result, RmiError, TypeInfo};

/// Codec crate, re-exported for implementors
pub use remobj_wire as wire;
pub use remobj_wire::{ArgList, Exception, Value, RETVAL};
