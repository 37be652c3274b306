//! Codec error types

use thiserror::Error;

use crate::TypeTag;

/// Encoding/decoding and argument lookup errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WireError {
    /// Buffer underflow - not enough data
    #[error("buffer underflow: needed {needed} bytes, have {have}")]
    BufferUnderflow { needed: usize, have: usize },

    /// Unknown value type tag
    #[error("invalid type tag: 0x{0:02x}")]
    InvalidTag(u8),

    /// Unknown message discriminant
    #[error("invalid message kind: 0x{0:02x}")]
    InvalidMessageKind(u8),

    /// String payload is not valid UTF-8
    #[error("invalid string: {0}")]
    InvalidString(String),

    /// Char payload is not a Unicode scalar value
    #[error("invalid char: 0x{0:08x}")]
    InvalidChar(u32),

    /// Presence flag other than 0 or 1
    #[error("invalid presence flag: {0}")]
    InvalidFlag(u8),

    /// Data left over after a complete message
    #[error("{0} trailing bytes after message")]
    TrailingBytes(usize),

    /// No argument with the requested name
    #[error("missing argument '{0}'")]
    MissingArgument(String),

    /// Argument present but packed with a different type
    #[error("type mismatch for '{name}': expected {expected}, found {found}")]
    TypeMismatch {
        name: String,
        expected: TypeTag,
        found: TypeTag,
    },

    /// The same argument name was packed twice
    #[error("duplicate argument '{0}'")]
    DuplicateArgument(String),
}

/// Result type for codec operations
pub type Result<T> = std::result::Result<T, WireError>;
