//! Common definitions shared between communicator client and server

#![allow(dead_code)]

use std::any::Any;
use std::sync::atomic::{AtomicU32, Ordering};

use remobj::{ArgList, Exception, Interface, Object, ObjectRef, Orb, Result, RmiError, TypeInfo, RETVAL};
use tracing::info;

// =============================================================================
// Interface
// =============================================================================

/// Interface name of the communicator
pub const COMMUNICATOR: &str = "demo.Communicator";

pub const COMMUNICATOR_TYPE: TypeInfo = TypeInfo::new(COMMUNICATOR, "1.0", &[]);

/// Id the server publishes its top-level communicator under
pub const WORLD_ID: &str = "world";

/// Method names of `demo.Communicator`
pub mod method {
    pub const GET_RANK: &str = "getRank";
    pub const GET_SIZE: &str = "getSize";
    pub const GET_NAME: &str = "getName";
    pub const DUP: &str = "dup";
    pub const SPLIT: &str = "split";
}

// =============================================================================
// Shared Constants
// =============================================================================

/// Default server address
pub const DEFAULT_HOST: &str = "127.0.0.1";
/// Default object server port
pub const DEFAULT_PORT: u16 = 12360;

// =============================================================================
// Implementation
// =============================================================================

/// A process group handle hosted by the server
pub struct LocalCommunicator {
    name: String,
    rank: i32,
    size: i32,
    derived: AtomicU32,
}

impl LocalCommunicator {
    pub fn new(name: impl Into<String>, rank: i32, size: i32) -> Self {
        Self {
            name: name.into(),
            rank,
            size,
            derived: AtomicU32::new(0),
        }
    }

    fn derive(&self, orb: &Orb, kind: &str, size: i32) -> ObjectRef {
        let n = self.derived.fetch_add(1, Ordering::Relaxed);
        let name = format!("{}.{}{}", self.name, kind, n);
        info!("Derived communicator {} (size {})", name, size);
        orb.wrap(std::sync::Arc::new(LocalCommunicator::new(name, 0, size)))
    }
}

impl Object for LocalCommunicator {
    fn type_info(&self) -> &'static TypeInfo {
        &COMMUNICATOR_TYPE
    }

    fn exec(&self, orb: &Orb, name: &str, args: &ArgList) -> std::result::Result<ArgList, Exception> {
        let mut results = ArgList::new();
        match name {
            method::GET_RANK => results.pack_int(RETVAL, self.rank)?,
            method::GET_SIZE => results.pack_int(RETVAL, self.size)?,
            method::GET_NAME => results.pack_string(RETVAL, self.name.clone())?,
            method::DUP => {
                let dup = self.derive(orb, "dup", self.size);
                orb.pack_object(&mut results, RETVAL, Some(&dup))?;
            }
            method::SPLIT => {
                let color = args.unpack_int("color")?;
                if color < 0 {
                    return Err(Exception::new("demo.BadInput", "bad input"));
                }
                let part = self.derive(orb, "split", (self.size / (color + 1)).max(1));
                orb.pack_object(&mut results, RETVAL, Some(&part))?;
            }
            other => {
                return Err(Exception::new(
                    "remobj.NoSuchMethod",
                    format!("{}.{}", COMMUNICATOR, other),
                ))
            }
        }
        Ok(results)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// =============================================================================
// Typed view
// =============================================================================

/// Client view of `demo.Communicator`
#[derive(Debug, Clone)]
pub struct Communicator(ObjectRef);

impl Interface for Communicator {
    const TYPE_INFO: &'static TypeInfo = &COMMUNICATOR_TYPE;

    fn from_object(object: ObjectRef) -> Self {
        Self(object)
    }

    fn object(&self) -> &ObjectRef {
        &self.0
    }
}

impl Communicator {
    pub fn rank(&self) -> Result<i32> {
        let results = self.0.exec(method::GET_RANK, ArgList::new())?;
        Ok(results.unpack_int(RETVAL)?)
    }

    pub fn size(&self) -> Result<i32> {
        let results = self.0.exec(method::GET_SIZE, ArgList::new())?;
        Ok(results.unpack_int(RETVAL)?)
    }

    pub fn name(&self) -> Result<String> {
        let results = self.0.exec(method::GET_NAME, ArgList::new())?;
        Ok(results.unpack_string(RETVAL)?)
    }

    pub fn dup(&self) -> Result<Communicator> {
        let results = self.0.exec(method::DUP, ArgList::new())?;
        self.returned(&results)
    }

    pub fn split(&self, color: i32) -> Result<Communicator> {
        let mut args = ArgList::new();
        args.pack_int("color", color)?;
        let results = self.0.exec(method::SPLIT, args)?;
        self.returned(&results)
    }

    fn returned(&self, results: &ArgList) -> Result<Communicator> {
        let object = self
            .0
            .orb()
            .unpack_object(results, RETVAL)?
            .ok_or_else(|| RmiError::UnexpectedReply("null communicator".to_string()))?;
        object
            .cast_to::<Communicator>()?
            .ok_or_else(|| RmiError::UnexpectedReply(format!("{} is not a communicator", object.view())))
    }
}
