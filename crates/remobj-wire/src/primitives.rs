//! Tagged primitive values
//!
//! | Wire type | Rust type        | Tag  | Payload size |
//! |-----------|------------------|------|--------------|
//! | bool      | bool             | 0x01 | 1            |
//! | char      | char             | 0x02 | 4            |
//! | int       | i32              | 0x03 | 4            |
//! | long      | i64              | 0x04 | 8            |
//! | float     | f32              | 0x05 | 4            |
//! | double    | f64              | 0x06 | 8            |
//! | string    | String           | 0x07 | 4 + len      |
//! | opaque    | u64              | 0x08 | 8            |
//! | object    | Option<String>   | 0x09 | 1 (+ string) |

use std::fmt;

use bytes::{Buf, BufMut};

use crate::decode::{ensure, get_str};
use crate::encode::{put_str, str_size};
use crate::{Result, WireDecode, WireEncode, WireError};

/// One-byte discriminant written ahead of every value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TypeTag {
    Bool = 0x01,
    Char = 0x02,
    Int = 0x03,
    Long = 0x04,
    Float = 0x05,
    Double = 0x06,
    String = 0x07,
    Opaque = 0x08,
    Object = 0x09,
}

impl TypeTag {
    pub fn from_u8(value: u8) -> Result<Self> {
        Ok(match value {
            0x01 => Self::Bool,
            0x02 => Self::Char,
            0x03 => Self::Int,
            0x04 => Self::Long,
            0x05 => Self::Float,
            0x06 => Self::Double,
            0x07 => Self::String,
            0x08 => Self::Opaque,
            0x09 => Self::Object,
            other => return Err(WireError::InvalidTag(other)),
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Char => "char",
            Self::Int => "int",
            Self::Long => "long",
            Self::Float => "float",
            Self::Double => "double",
            Self::String => "string",
            Self::Opaque => "opaque",
            Self::Object => "object",
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single typed argument value.
///
/// Object references travel by URL; `Object(None)` is the null reference.
#[derive(Debug, Clone)]
pub enum Value {
    Bool(bool),
    Char(char),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
    Opaque(u64),
    Object(Option<String>),
}

impl Value {
    pub fn tag(&self) -> TypeTag {
        match self {
            Value::Bool(_) => TypeTag::Bool,
            Value::Char(_) => TypeTag::Char,
            Value::Int(_) => TypeTag::Int,
            Value::Long(_) => TypeTag::Long,
            Value::Float(_) => TypeTag::Float,
            Value::Double(_) => TypeTag::Double,
            Value::String(_) => TypeTag::String,
            Value::Opaque(_) => TypeTag::Opaque,
            Value::Object(_) => TypeTag::Object,
        }
    }
}

// Floats compare by bit pattern: -0.0 differs from 0.0 and NaN equals itself.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Char(a), Value::Char(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Long(a), Value::Long(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Double(a), Value::Double(b)) => a.to_bits() == b.to_bits(),
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Opaque(a), Value::Opaque(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl WireEncode for Value {
    fn wire_encode<B: BufMut>(&self, buf: &mut B) {
        buf.put_u8(self.tag() as u8);
        match self {
            Value::Bool(v) => buf.put_u8(u8::from(*v)),
            Value::Char(v) => buf.put_u32_le(u32::from(*v)),
            Value::Int(v) => buf.put_i32_le(*v),
            Value::Long(v) => buf.put_i64_le(*v),
            Value::Float(v) => buf.put_u32_le(v.to_bits()),
            Value::Double(v) => buf.put_u64_le(v.to_bits()),
            Value::String(v) => put_str(buf, v),
            Value::Opaque(v) => buf.put_u64_le(*v),
            Value::Object(None) => buf.put_u8(0),
            Value::Object(Some(url)) => {
                buf.put_u8(1);
                put_str(buf, url);
            }
        }
    }

    fn wire_size(&self) -> usize {
        1 + match self {
            Value::Bool(_) => 1,
            Value::Char(_) | Value::Int(_) | Value::Float(_) => 4,
            Value::Long(_) | Value::Double(_) | Value::Opaque(_) => 8,
            Value::String(v) => str_size(v),
            Value::Object(None) => 1,
            Value::Object(Some(url)) => 1 + str_size(url),
        }
    }
}

impl WireDecode for Value {
    fn wire_decode<B: Buf>(buf: &mut B) -> Result<Self> {
        ensure(buf, 1)?;
        let tag = TypeTag::from_u8(buf.get_u8())?;
        Ok(match tag {
            TypeTag::Bool => {
                ensure(buf, 1)?;
                match buf.get_u8() {
                    0 => Value::Bool(false),
                    1 => Value::Bool(true),
                    other => return Err(WireError::InvalidFlag(other)),
                }
            }
            TypeTag::Char => {
                ensure(buf, 4)?;
                let raw = buf.get_u32_le();
                Value::Char(char::from_u32(raw).ok_or(WireError::InvalidChar(raw))?)
            }
            TypeTag::Int => {
                ensure(buf, 4)?;
                Value::Int(buf.get_i32_le())
            }
            TypeTag::Long => {
                ensure(buf, 8)?;
                Value::Long(buf.get_i64_le())
            }
            TypeTag::Float => {
                ensure(buf, 4)?;
                Value::Float(f32::from_bits(buf.get_u32_le()))
            }
            TypeTag::Double => {
                ensure(buf, 8)?;
                Value::Double(f64::from_bits(buf.get_u64_le()))
            }
            TypeTag::String => Value::String(get_str(buf)?),
            TypeTag::Opaque => {
                ensure(buf, 8)?;
                Value::Opaque(buf.get_u64_le())
            }
            TypeTag::Object => {
                ensure(buf, 1)?;
                match buf.get_u8() {
                    0 => Value::Object(None),
                    1 => Value::Object(Some(get_str(buf)?)),
                    other => return Err(WireError::InvalidFlag(other)),
                }
            }
        })
    }
}
