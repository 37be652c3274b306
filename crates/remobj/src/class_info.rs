//! Class descriptions returned by `get_class_info`

use std::any::Any;

use remobj_wire::{ArgList, Exception, RETVAL};

use crate::interface::Interface;
use crate::object::{Object, ObjectRef};
use crate::types::{Result, TypeInfo, CLASS_INFO};
use crate::Orb;

pub const CLASS_INFO_TYPE: TypeInfo = TypeInfo::new(CLASS_INFO, "1.0", &[]);

const GET_NAME: &str = "getName";
const GET_VERSION: &str = "getVersion";

/// Local implementation of `remobj.ClassInfo`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassInfoObject {
    name: String,
    version: String,
}

impl ClassInfoObject {
    pub fn describe(type_info: &TypeInfo) -> Self {
        Self {
            name: type_info.name().to_string(),
            version: type_info.version().to_string(),
        }
    }
}

impl Object for ClassInfoObject {
    fn type_info(&self) -> &'static TypeInfo {
        &CLASS_INFO_TYPE
    }

    fn exec(&self, _orb: &Orb, method: &str, _args: &ArgList) -> std::result::Result<ArgList, Exception> {
        let mut results = ArgList::new();
        match method {
            GET_NAME => results.pack_string(RETVAL, self.name.clone())?,
            GET_VERSION => results.pack_string(RETVAL, self.version.clone())?,
            other => {
                return Err(Exception::new(
                    "remobj.NoSuchMethod",
                    format!("{}.{}", CLASS_INFO, other),
                ))
            }
        }
        Ok(results)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Name and version of an object's class
#[derive(Debug, Clone)]
pub struct ClassInfo(ObjectRef);

impl Interface for ClassInfo {
    const TYPE_INFO: &'static TypeInfo = &CLASS_INFO_TYPE;

    fn from_object(object: ObjectRef) -> Self {
        Self(object)
    }

    fn object(&self) -> &ObjectRef {
        &self.0
    }
}

impl ClassInfo {
    pub fn name(&self) -> Result<String> {
        Ok(self.0.exec(GET_NAME, ArgList::new())?.unpack_string(RETVAL)?)
    }

    pub fn version(&self) -> Result<String> {
        Ok(self.0.exec(GET_VERSION, ArgList::new())?.unpack_string(RETVAL)?)
    }
}
