//! Length-prefixed framing.
//!
//! Each frame is a `u32` big-endian payload length followed by the payload.
//! A zero-length frame is legal and means "nothing new" in a response.

use std::io::{self, Read, Write};

pub const MAX_FRAME_LEN: usize = 64 * 1024 * 1024;
const PREFIX_LEN: usize = 4;

fn oversized(len: usize) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidData,
        format!("frame of {len} bytes exceeds the {MAX_FRAME_LEN} byte limit"),
    )
}

/// Write one frame and flush.
///
/// # Errors
///
/// Propagates I/O errors and rejects payloads over [`MAX_FRAME_LEN`].
pub fn write_frame<W: Write>(writer: &mut W, payload: &[u8]) -> io::Result<()> {
    if payload.len() > MAX_FRAME_LEN {
        return Err(oversized(payload.len()));
    }
    let len = u32::try_from(payload.len()).map_err(|_| oversized(payload.len()))?;
    writer.write_all(&len.to_be_bytes())?;
    writer.write_all(payload)?;
    writer.flush()
}

/// Block until one complete frame has been read.
///
/// # Errors
///
/// `UnexpectedEof` if the stream ends before or inside a frame, `InvalidData`
/// for an oversized length prefix.
pub fn read_frame<R: Read>(reader: &mut R) -> io::Result<Vec<u8>> {
    let mut prefix = [0u8; PREFIX_LEN];
    reader.read_exact(&mut prefix)?;
    let len = u32::from_be_bytes(prefix) as usize;
    if len > MAX_FRAME_LEN {
        return Err(oversized(len));
    }
    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload)?;
    Ok(payload)
}

/// Accumulates bytes from a non-blocking or timed-out reader and hands out
/// complete frames. Bytes of an unfinished frame stay buffered across calls.
#[derive(Debug, Default)]
pub struct FrameBuffer {
    pending: Vec<u8>,
}

impl FrameBuffer {
    pub fn extend(&mut self, bytes: &[u8]) {
        self.pending.extend_from_slice(bytes);
    }

    /// Take the next complete frame, if one has fully arrived.
    ///
    /// # Errors
    ///
    /// `InvalidData` when the buffered length prefix exceeds [`MAX_FRAME_LEN`].
    pub fn next_frame(&mut self) -> io::Result<Option<Vec<u8>>> {
        if self.pending.len() < PREFIX_LEN {
            return Ok(None);
        }
        let mut prefix = [0u8; PREFIX_LEN];
        prefix.copy_from_slice(&self.pending[..PREFIX_LEN]);
        let len = u32::from_be_bytes(prefix) as usize;
        if len > MAX_FRAME_LEN {
            return Err(oversized(len));
        }
        if self.pending.len() < PREFIX_LEN + len {
            return Ok(None);
        }
        let frame = self.pending[PREFIX_LEN..PREFIX_LEN + len].to_vec();
        self.pending.drain(..PREFIX_LEN + len);
        Ok(Some(frame))
    }

    #[must_use]
    pub fn buffered(&self) -> usize {
        self.pending.len()
    }
}
