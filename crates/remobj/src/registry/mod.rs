//! Process-side registries
//!
//! - [`InstanceRegistry`]: objects this process hosts, by object id
//! - [`ConnectRegistry`]: proxy constructors, by interface name
//! - [`ClassRegistry`]: factories for remote `create`, by class name

mod class;
mod connect;
mod instance;

pub use class::{ClassFactory, ClassRegistry};
pub use connect::{Connector, ConnectRegistry};
pub use instance::{InstanceEntry, InstanceRegistry};
