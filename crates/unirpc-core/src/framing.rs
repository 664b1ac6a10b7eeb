//! Message framing for stream transports.
//!
//! Frame format: [length varint][payload bytes]
//!
//! One frame carries exactly one envelope. Request/reply sockets keep
//! message boundaries themselves; a TCP stream does not, so every payload
//! is prefixed with its length.

use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Maximum frame payload size (64MB)
pub const MAX_FRAME_SIZE: usize = 64 * 1024 * 1024;

/// Encode a payload into a length-prefixed frame
pub fn encode_frame(payload: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(payload.len() + 10);
    encode_varint(payload.len() as u64, &mut buf);
    buf.put_slice(payload);
    buf.freeze()
}

/// Frame parser for decoding frames from a byte stream
pub struct FrameParser {
    buffer: BytesMut,
}

impl FrameParser {
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::new(),
        }
    }

    /// Add data to the parser buffer
    pub fn feed(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Direct access to the receive buffer, for `read_buf`-style readers
    pub fn buffer_mut(&mut self) -> &mut BytesMut {
        &mut self.buffer
    }

    /// Number of buffered bytes not yet returned as frames
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Drop any partially received frame
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Try to parse a complete frame payload from the buffer
    pub fn parse_frame(&mut self) -> Result<Option<Bytes>, FrameError> {
        if self.buffer.is_empty() {
            return Ok(None);
        }

        let mut cursor = std::io::Cursor::new(&self.buffer[..]);

        let payload_len = match decode_varint(&mut cursor)? {
            Some(len) => len as usize,
            None => return Ok(None), // Need more data
        };

        if payload_len > MAX_FRAME_SIZE {
            return Err(FrameError::FrameTooLarge(payload_len));
        }

        let header_len = cursor.position() as usize;
        if self.buffer.len() < header_len + payload_len {
            return Ok(None);
        }

        self.buffer.advance(header_len);
        Ok(Some(self.buffer.split_to(payload_len).freeze()))
    }
}

impl Default for FrameParser {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    #[error("Frame too large: {0} bytes (max {MAX_FRAME_SIZE})")]
    FrameTooLarge(usize),

    #[error("Invalid varint encoding")]
    InvalidVarint,
}

/// Encode a u64 as a protobuf varint
fn encode_varint(mut value: u64, buf: &mut BytesMut) {
    loop {
        if value < 0x80 {
            buf.put_u8(value as u8);
            break;
        } else {
            buf.put_u8(((value & 0x7F) | 0x80) as u8);
            value >>= 7;
        }
    }
}

/// Decode a protobuf varint; `Ok(None)` means more bytes are needed
fn decode_varint<B: Buf>(buf: &mut B) -> Result<Option<u64>, FrameError> {
    let mut value = 0u64;
    let mut shift = 0;

    loop {
        if !buf.has_remaining() {
            return Ok(None);
        }

        let byte = buf.get_u8();
        value |= ((byte & 0x7F) as u64) << shift;

        if byte < 0x80 {
            return Ok(Some(value));
        }

        shift += 7;
        if shift >= 64 {
            return Err(FrameError::InvalidVarint);
        }
    }
}
