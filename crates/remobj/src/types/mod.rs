//! Core types: errors, interface names and object URLs

mod error;
mod name;
mod url;

pub use error::*;
pub use name::*;
pub use url::*;

/// Reserved method names handled by the invocation layer itself
pub mod method {
    /// Take one peer-held reference
    pub const ADD_REF: &str = "addRef";
    /// Drop one peer-held reference
    pub const DELETE_REF: &str = "deleteRef";
    /// Ask whether the object implements a named interface
    pub const IS_TYPE: &str = "isType";
    /// Compare identity with another object URL
    pub const IS_SAME: &str = "isSame";
    /// Fetch the object's class description
    pub const GET_CLASS_INFO: &str = "getClassInfo";
    /// Instantiate a registered class (sent with an empty object id)
    pub const CREATE: &str = "_create";
}

/// Argument names used by the reserved methods
pub mod arg {
    pub const NAME: &str = "name";
    pub const OTHER: &str = "other";
    pub const TYPE_NAME: &str = "typeName";
}
