//! Length-prefixed framing over a byte stream
//!
//! Each frame is a little-endian `u32` length followed by that many bytes of
//! an encoded request or reply.

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::types::{Result, RmiError};

/// Maximum frame size (1 MiB default)
pub const DEFAULT_MAX_FRAME_SIZE: usize = 1 << 20;

/// Frame reader/writer over an async stream
pub struct FrameTransport<T> {
    inner: T,
    max_frame_size: usize,
}

impl<T> FrameTransport<T> {
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }

    pub fn with_max_frame_size(mut self, max_size: usize) -> Self {
        self.max_frame_size = max_size;
        self
    }

    pub fn into_inner(self) -> T {
        self.inner
    }

    pub fn get_ref(&self) -> &T {
        &self.inner
    }
}

impl<T: AsyncRead + Unpin> FrameTransport<T> {
    /// Read one complete frame.
    ///
    /// A clean end of stream before the length prefix is `ConnectionClosed`.
    pub async fn read_frame(&mut self) -> Result<Bytes> {
        let mut prefix = [0u8; 4];
        let mut filled = 0;
        while filled < prefix.len() {
            let n = self.inner.read(&mut prefix[filled..]).await?;
            if n == 0 {
                if filled == 0 {
                    return Err(RmiError::ConnectionClosed);
                }
                return Err(RmiError::Io(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "incomplete frame header",
                )));
            }
            filled += n;
        }

        let length = u32::from_le_bytes(prefix) as usize;
        if length > self.max_frame_size {
            return Err(RmiError::FrameTooLarge {
                size: length,
                max: self.max_frame_size,
            });
        }

        let mut frame = BytesMut::zeroed(length);
        self.inner.read_exact(&mut frame).await?;
        Ok(frame.freeze())
    }
}

impl<T: AsyncWrite + Unpin> FrameTransport<T> {
    /// Write one frame and flush it.
    pub async fn write_frame(&mut self, frame: &[u8]) -> Result<()> {
        if frame.len() > self.max_frame_size {
            return Err(RmiError::FrameTooLarge {
                size: frame.len(),
                max: self.max_frame_size,
            });
        }
        self.inner.write_u32_le(frame.len() as u32).await?;
        self.inner.write_all(frame).await?;
        self.inner.flush().await?;
        Ok(())
    }
}
