//! Decoding trait

use bytes::{Buf, Bytes};

use crate::{Result, WireError};

/// Trait for types that can be read from the wire
pub trait WireDecode: Sized {
    /// Decode a value from the front of the buffer.
    fn wire_decode<B: Buf>(buf: &mut B) -> Result<Self>;

    /// Decode a complete message; leftover bytes are an error.
    fn from_bytes(bytes: Bytes) -> Result<Self> {
        let mut buf = bytes;
        let value = Self::wire_decode(&mut buf)?;
        if buf.has_remaining() {
            return Err(WireError::TrailingBytes(buf.remaining()));
        }
        Ok(value)
    }
}

/// Fail with `BufferUnderflow` unless `needed` bytes remain
pub(crate) fn ensure<B: Buf>(buf: &B, needed: usize) -> Result<()> {
    if buf.remaining() < needed {
        return Err(WireError::BufferUnderflow {
            needed,
            have: buf.remaining(),
        });
    }
    Ok(())
}

/// Read a length-prefixed UTF-8 string
pub(crate) fn get_str<B: Buf>(buf: &mut B) -> Result<String> {
    ensure(buf, 4)?;
    let len = buf.get_u32_le() as usize;
    ensure(buf, len)?;
    let mut raw = vec![0u8; len];
    buf.copy_to_slice(&mut raw);
    String::from_utf8(raw).map_err(|e| WireError::InvalidString(e.to_string()))
}

/// Read a u32 element count
pub(crate) fn get_count<B: Buf>(buf: &mut B) -> Result<usize> {
    ensure(buf, 4)?;
    Ok(buf.get_u32_le() as usize)
}
