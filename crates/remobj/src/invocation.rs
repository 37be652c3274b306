//! One remote call: build, send once, decode

use remobj_wire::{ArgList, Exception, Reply, Request, Result as WireResult, Value, RETVAL};

use crate::connection::InstanceHandle;
use crate::types::{Result, RmiError};

/// An outgoing call on one instance handle.
///
/// Consumed by [`invoke`](Invocation::invoke), so it is sent exactly once.
pub struct Invocation {
    handle: InstanceHandle,
    request: Request,
}

impl Invocation {
    pub fn new(handle: &InstanceHandle, method: &str) -> Self {
        Self {
            handle: handle.clone(),
            request: Request::new(handle.object_id(), method, ArgList::new()),
        }
    }

    pub fn with_args(mut self, args: ArgList) -> Self {
        self.request.args = args;
        self
    }

    pub fn pack(&mut self, name: &str, value: Value) -> WireResult<()> {
        self.request.args.pack(name, value)
    }

    pub fn method(&self) -> &str {
        &self.request.method
    }

    /// Send the request and block until the reply arrives.
    ///
    /// Faults raised by the peer's invocation layer become errors here;
    /// exceptions raised by the implementation are kept in the response.
    pub fn invoke(self) -> Result<Response> {
        let reply = self.handle.connection().round_trip(&self.request)?;
        match reply {
            Reply::Success(args) => Ok(Response {
                outcome: Ok(args),
                method: self.request.method,
            }),
            Reply::Exception(ex) => Ok(Response {
                outcome: Err(ex),
                method: self.request.method,
            }),
            Reply::Fault(fault) => Err(fault.into()),
        }
    }
}

/// Decoded outcome of one [`Invocation`]
#[derive(Debug)]
pub struct Response {
    outcome: std::result::Result<ArgList, Exception>,
    method: String,
}

impl Response {
    pub fn is_exception(&self) -> bool {
        self.outcome.is_err()
    }

    pub fn exception(&self) -> Option<&Exception> {
        self.outcome.as_ref().err()
    }

    /// Results, or the propagated exception annotated with this hop.
    pub fn into_result(self, interface: &str) -> Result<ArgList> {
        self.outcome.map_err(|mut ex| {
            ex.add_line(format!(
                "Exception unserialized from {}.{}.",
                interface, self.method
            ));
            RmiError::Exception(ex)
        })
    }

    /// The `_retval` entry of a successful response
    pub fn retval(&self) -> Option<&Value> {
        self.outcome.as_ref().ok().and_then(|args| args.get(RETVAL))
    }
}
