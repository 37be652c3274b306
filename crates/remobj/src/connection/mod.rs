//! Connections to remote peers
//!
//! A [`Protocol`] opens a [`Transport`] for one endpoint. The
//! [`ProtocolFactory`] shares one [`Connection`] per endpoint, and each
//! connection hands out one [`InstanceHandle`] per remote object.
//!
//! Before any network work the factory checks whether a URL names an object
//! hosted by this process; such URLs resolve to the local implementation.

mod factory;
mod frame;
mod handle;
mod loopback;
mod tcp;

use bytes::Bytes;

use crate::types::Result;

pub use factory::{ProtocolFactory, Resolved};
pub use frame::{FrameTransport, DEFAULT_MAX_FRAME_SIZE};
pub use handle::{Connection, InstanceHandle};
pub use loopback::{CallRecord, LoopbackNetwork, LOOPBACK_SCHEME};
pub use tcp::{TcpProtocol, TcpTransport, TCP_SCHEME};

/// Blocking request/response channel to one peer.
///
/// `call` sends one encoded request and waits for its reply; concurrent
/// callers are serialized per round trip.
pub trait Transport: Send + Sync {
    fn call(&self, request: Bytes) -> Result<Bytes>;

    /// Fail calls in flight and every later call with `ConnectionClosed`.
    fn close(&self);

    /// Whether the transport has been closed, explicitly or after a failure
    /// that left it unusable.
    fn is_closed(&self) -> bool;
}

/// Opens transports for one URL scheme
pub trait Protocol: Send + Sync {
    fn scheme(&self) -> &str;

    fn connect(&self, authority: &str) -> Result<Box<dyn Transport>>;
}
