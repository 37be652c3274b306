//! Invocation layer error types

use remobj_wire::{fault, Exception, Fault, WireError};
use thiserror::Error;

/// Result type for invocation layer operations
pub type Result<T> = std::result::Result<T, RmiError>;

/// Broad classification of an [`RmiError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The peer could not be reached or the channel failed
    Connection,
    /// The peer answered, but not with something usable
    Protocol,
    /// The remote implementation raised an exception
    Application,
}

/// Errors raised by handles, connections and servers
#[derive(Error, Debug)]
pub enum RmiError {
    /// URL is not of the form `scheme://authority/object-id`
    #[error("unresolvable URL: {0}")]
    UnresolvableUrl(String),

    /// No protocol registered for the URL scheme
    #[error("unknown protocol: {0}")]
    UnknownProtocol(String),

    /// Peer could not be reached
    #[error("peer unreachable at {endpoint}: {reason}")]
    Unreachable { endpoint: String, reason: String },

    /// Connection was closed while or before the call ran
    #[error("connection closed")]
    ConnectionClosed,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A local object needs a URL but no server endpoint is registered
    #[error("no local server endpoint registered")]
    NoServer,

    /// Frame length over the configured maximum
    #[error("frame too large: {size} bytes (max {max})")]
    FrameTooLarge { size: usize, max: usize },

    /// Codec failure
    #[error("wire error: {0}")]
    Wire(#[from] WireError),

    /// Reply did not have the expected shape
    #[error("unexpected reply: {0}")]
    UnexpectedReply(String),

    /// Object id not known to the peer
    #[error("unknown object: {0}")]
    UnknownObject(String),

    /// Class has no factory at the peer
    #[error("no such class: {0}")]
    NoSuchClass(String),

    /// Release without a matching reference
    #[error("reference count underflow: {0}")]
    RefCountUnderflow(String),

    /// Peer rejected a malformed request
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Any other fault raised by the peer's invocation layer
    #[error("remote fault 0x{code:08x}: {detail}")]
    Fault { code: u32, detail: String },

    /// Exception propagated from the implementation
    #[error("remote exception: {0}")]
    Exception(Exception),
}

impl RmiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RmiError::UnresolvableUrl(_)
            | RmiError::UnknownProtocol(_)
            | RmiError::Unreachable { .. }
            | RmiError::ConnectionClosed
            | RmiError::Io(_)
            | RmiError::NoServer => ErrorKind::Connection,
            RmiError::FrameTooLarge { .. }
            | RmiError::Wire(_)
            | RmiError::UnexpectedReply(_)
            | RmiError::UnknownObject(_)
            | RmiError::NoSuchClass(_)
            | RmiError::RefCountUnderflow(_)
            | RmiError::BadRequest(_)
            | RmiError::Fault { .. } => ErrorKind::Protocol,
            RmiError::Exception(_) => ErrorKind::Application,
        }
    }

    /// Fault to send back to a peer for this error
    pub fn to_fault(&self) -> Fault {
        let code = match self {
            RmiError::UnknownObject(_) => fault::UNKNOWN_OBJECT,
            RmiError::NoSuchClass(_) => fault::NO_SUCH_CLASS,
            RmiError::RefCountUnderflow(_) => fault::REFCOUNT_UNDERFLOW,
            RmiError::BadRequest(_) | RmiError::Wire(_) => fault::BAD_REQUEST,
            RmiError::Fault { code, .. } => *code,
            _ => fault::SERVER_ERROR,
        };
        let detail = match self {
            RmiError::UnknownObject(d)
            | RmiError::NoSuchClass(d)
            | RmiError::RefCountUnderflow(d)
            | RmiError::BadRequest(d) => d.clone(),
            RmiError::Fault { detail, .. } => detail.clone(),
            other => other.to_string(),
        };
        Fault::new(code, detail)
    }
}

impl From<Fault> for RmiError {
    fn from(f: Fault) -> Self {
        match f.code {
            fault::UNKNOWN_OBJECT => RmiError::UnknownObject(f.detail),
            fault::NO_SUCH_CLASS => RmiError::NoSuchClass(f.detail),
            fault::REFCOUNT_UNDERFLOW => RmiError::RefCountUnderflow(f.detail),
            fault::BAD_REQUEST => RmiError::BadRequest(f.detail),
            code => RmiError::Fault {
                code,
                detail: f.detail,
            },
        }
    }
}

/// Errors surfacing inside an implementation that makes its own remote calls
/// are re-raised to that implementation's caller as exceptions.
impl From<RmiError> for Exception {
    fn from(err: RmiError) -> Self {
        match err {
            RmiError::Exception(ex) => ex,
            other => Exception::new("remobj.RemoteError", other.to_string()),
        }
    }
}
