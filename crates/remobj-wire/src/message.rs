//! Request and reply messages

use std::fmt;

use bytes::{Buf, BufMut};

use crate::decode::{ensure, get_count, get_str};
use crate::encode::{put_str, str_size};
use crate::{ArgList, Result, WireDecode, WireEncode, WireError};

/// Name of the return value inside a successful reply
pub const RETVAL: &str = "_retval";

/// Fault codes raised by the invocation layer rather than by an object
pub mod fault {
    /// Target object id not known to the peer
    pub const UNKNOWN_OBJECT: u32 = 0x0000_0001;
    /// Requested class has no factory at the peer
    pub const NO_SUCH_CLASS: u32 = 0x0000_0002;
    /// Release sent for an object the caller holds no references on
    pub const REFCOUNT_UNDERFLOW: u32 = 0x0000_0003;
    /// Request could not be decoded or lacked a required argument
    pub const BAD_REQUEST: u32 = 0x0000_0004;
    /// Unspecified server failure
    pub const SERVER_ERROR: u32 = 0x0000_00ff;
}

/// One invocation on a remote object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub object_id: String,
    pub method: String,
    pub args: ArgList,
}

impl Request {
    pub fn new(object_id: impl Into<String>, method: impl Into<String>, args: ArgList) -> Self {
        Self {
            object_id: object_id.into(),
            method: method.into(),
            args,
        }
    }
}

impl WireEncode for Request {
    fn wire_encode<B: BufMut>(&self, buf: &mut B) {
        put_str(buf, &self.object_id);
        put_str(buf, &self.method);
        self.args.wire_encode(buf);
    }

    fn wire_size(&self) -> usize {
        str_size(&self.object_id) + str_size(&self.method) + self.args.wire_size()
    }
}

impl WireDecode for Request {
    fn wire_decode<B: Buf>(buf: &mut B) -> Result<Self> {
        let object_id = get_str(buf)?;
        let method = get_str(buf)?;
        let args = ArgList::wire_decode(buf)?;
        Ok(Self {
            object_id,
            method,
            args,
        })
    }
}

/// An exception raised by an object implementation.
///
/// `trace` accumulates one line per hop that re-raised it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exception {
    pub type_name: String,
    pub message: String,
    pub trace: Vec<String>,
}

impl Exception {
    pub fn new(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            message: message.into(),
            trace: Vec::new(),
        }
    }

    pub fn add_line(&mut self, line: impl Into<String>) {
        self.trace.push(line.into());
    }
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.type_name, self.message)
    }
}

impl std::error::Error for Exception {}

/// Argument errors raised while an implementation unpacks its inputs
impl From<WireError> for Exception {
    fn from(err: WireError) -> Self {
        Exception::new("remobj.ArgumentError", err.to_string())
    }
}

/// Failure of the invocation layer itself
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    pub code: u32,
    pub detail: String,
}

impl Fault {
    pub fn new(code: u32, detail: impl Into<String>) -> Self {
        Self {
            code,
            detail: detail.into(),
        }
    }
}

/// Outcome of one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Success(ArgList),
    Exception(Exception),
    Fault(Fault),
}

const KIND_SUCCESS: u8 = 0;
const KIND_EXCEPTION: u8 = 1;
const KIND_FAULT: u8 = 2;

impl WireEncode for Reply {
    fn wire_encode<B: BufMut>(&self, buf: &mut B) {
        match self {
            Reply::Success(args) => {
                buf.put_u8(KIND_SUCCESS);
                args.wire_encode(buf);
            }
            Reply::Exception(ex) => {
                buf.put_u8(KIND_EXCEPTION);
                put_str(buf, &ex.type_name);
                put_str(buf, &ex.message);
                buf.put_u32_le(ex.trace.len() as u32);
                for line in &ex.trace {
                    put_str(buf, line);
                }
            }
            Reply::Fault(fault) => {
                buf.put_u8(KIND_FAULT);
                buf.put_u32_le(fault.code);
                put_str(buf, &fault.detail);
            }
        }
    }

    fn wire_size(&self) -> usize {
        1 + match self {
            Reply::Success(args) => args.wire_size(),
            Reply::Exception(ex) => {
                str_size(&ex.type_name)
                    + str_size(&ex.message)
                    + 4
                    + ex.trace.iter().map(|l| str_size(l)).sum::<usize>()
            }
            Reply::Fault(fault) => 4 + str_size(&fault.detail),
        }
    }
}

impl WireDecode for Reply {
    fn wire_decode<B: Buf>(buf: &mut B) -> Result<Self> {
        ensure(buf, 1)?;
        match buf.get_u8() {
            KIND_SUCCESS => Ok(Reply::Success(ArgList::wire_decode(buf)?)),
            KIND_EXCEPTION => {
                let type_name = get_str(buf)?;
                let message = get_str(buf)?;
                let count = get_count(buf)?;
                let mut trace = Vec::new();
                for _ in 0..count {
                    trace.push(get_str(buf)?);
                }
                Ok(Reply::Exception(Exception {
                    type_name,
                    message,
                    trace,
                }))
            }
            KIND_FAULT => {
                ensure(buf, 4)?;
                let code = buf.get_u32_le();
                let detail = get_str(buf)?;
                Ok(Reply::Fault(Fault { code, detail }))
            }
            other => Err(WireError::InvalidMessageKind(other)),
        }
    }
}
