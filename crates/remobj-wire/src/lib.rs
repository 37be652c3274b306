//! Invocation/response codec for remote object calls
//!
//! This crate provides the marshalling contract between a caller and a
//! remote object: an outgoing [`Request`] carries a method name and an
//! ordered list of named, typed arguments; the matching [`Reply`] carries
//! either the typed results, a propagated [`Exception`], or a [`Fault`]
//! raised by the invocation layer itself.
//!
//! # Wire Format
//!
//! Every value is written as a one-byte [`TypeTag`] followed by its payload.
//! Multi-byte integers are little-endian. Floating point values travel as
//! their raw IEEE-754 bits, so decoding reproduces the sent value exactly
//! (including `-0.0` and NaN payloads).
//!
//! | Type    | Tag  | Payload                                  |
//! |---------|------|------------------------------------------|
//! | bool    | 0x01 | u8 (0 or 1)                              |
//! | char    | 0x02 | u32 Unicode scalar                       |
//! | int     | 0x03 | i32                                      |
//! | long    | 0x04 | i64                                      |
//! | float   | 0x05 | u32 bits                                 |
//! | double  | 0x06 | u64 bits                                 |
//! | string  | 0x07 | u32 length + UTF-8 bytes                 |
//! | opaque  | 0x08 | u64                                      |
//! | object  | 0x09 | u8 presence flag (+ string URL if set)   |
//!
//! Arguments are unpacked by name and type, never by position, so two
//! independent implementations only have to agree on names and types.

mod args;
mod decode;
mod encode;
mod error;
mod message;
mod primitives;

pub use args::ArgList;
pub use decode::WireDecode;
pub use encode::WireEncode;
pub use error::{Result, WireError};
pub use message::{fault, Exception, Fault, Reply, Request, RETVAL};
pub use primitives::{TypeTag, Value};

/// Re-export bytes for convenience
pub use bytes::{Buf, BufMut, Bytes, BytesMut};
