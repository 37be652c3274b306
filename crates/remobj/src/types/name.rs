//! Interface names and static type tables

use std::borrow::{Borrow, Cow};
use std::fmt;

/// Every object implements this interface
pub const BASE_INTERFACE: &str = "remobj.BaseInterface";
/// Interface of the objects returned by `get_class_info`
pub const CLASS_INFO: &str = "remobj.ClassInfo";

/// Dotted interface identifier such as `pkg.TypeName`.
///
/// Equality is byte-for-byte.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InterfaceName(Cow<'static, str>);

impl InterfaceName {
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    pub fn new(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InterfaceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for InterfaceName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&'static str> for InterfaceName {
    fn from(name: &'static str) -> Self {
        Self::from_static(name)
    }
}

impl From<String> for InterfaceName {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

/// Closed, compile-time table of the interfaces a type implements
#[derive(Debug, PartialEq, Eq)]
pub struct TypeInfo {
    name: &'static str,
    version: &'static str,
    supertypes: &'static [&'static str],
}

/// Type table of a handle whose concrete interface is not known yet
pub static BASE_TYPE: TypeInfo = TypeInfo::new(BASE_INTERFACE, "1.0", &[]);

impl TypeInfo {
    pub const fn new(
        name: &'static str,
        version: &'static str,
        supertypes: &'static [&'static str],
    ) -> Self {
        Self {
            name,
            version,
            supertypes,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn version(&self) -> &'static str {
        self.version
    }

    pub fn supertypes(&self) -> &'static [&'static str] {
        self.supertypes
    }

    /// Whether a cast to `name` is satisfied by this table alone
    pub fn implements(&self, name: &str) -> bool {
        name == self.name || name == BASE_INTERFACE || self.supertypes.contains(&name)
    }
}
