//! Encoding trait

use bytes::{BufMut, Bytes, BytesMut};

/// Trait for types that can be written to the wire
pub trait WireEncode {
    /// Encode this value at the end of the buffer.
    fn wire_encode<B: BufMut>(&self, buf: &mut B);

    /// Encoded size in bytes
    fn wire_size(&self) -> usize;

    /// Encode into a fresh, frozen buffer
    fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.wire_size());
        self.wire_encode(&mut buf);
        buf.freeze()
    }
}

/// Write a length-prefixed UTF-8 string
pub(crate) fn put_str<B: BufMut>(buf: &mut B, value: &str) {
    buf.put_u32_le(value.len() as u32);
    buf.put_slice(value.as_bytes());
}

/// Encoded size of a length-prefixed string
pub(crate) fn str_size(value: &str) -> usize {
    4 + value.len()
}
