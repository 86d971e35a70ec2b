//! Binary frame encoding/decoding
//!
//! PadLink frame format:
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │ Byte 0:     Magic (0x50 = 'P')                               │
//! │ Byte 1:     Flags                                            │
//! │             [5]   Timestamp present                          │
//! │             rest  Reserved (must be zero)                    │
//! │ Byte 2-3:   Payload Length (uint16 big-endian, max 65535)    │
//! ├──────────────────────────────────────────────────────────────┤
//! │ [If timestamp flag] Bytes 4-11: Timestamp (uint64 µs)        │
//! ├──────────────────────────────────────────────────────────────┤
//! │ Payload (binary message body, see codec)                     │
//! └──────────────────────────────────────────────────────────────┘
//! ```

use crate::{Error, Result, MAGIC_BYTE};
use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Frame header size without timestamp
pub const HEADER_SIZE: usize = 4;

/// Frame header size with timestamp
pub const HEADER_SIZE_WITH_TS: usize = 12;

/// Maximum payload size
pub const MAX_PAYLOAD_SIZE: usize = 65535;

const FLAG_TIMESTAMP: u8 = 0x20;

/// A PadLink frame
#[derive(Debug, Clone)]
pub struct Frame {
    pub timestamp: Option<u64>,
    pub payload: Bytes,
}

impl Frame {
    /// Create a new frame with payload
    pub fn new(payload: impl Into<Bytes>) -> Self {
        Self {
            timestamp: None,
            payload: payload.into(),
        }
    }

    /// Create a frame with timestamp
    pub fn with_timestamp(mut self, timestamp: u64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Calculate the total frame size
    pub fn size(&self) -> usize {
        let header = if self.timestamp.is_some() {
            HEADER_SIZE_WITH_TS
        } else {
            HEADER_SIZE
        };
        header + self.payload.len()
    }

    /// Encode frame to bytes
    pub fn encode(&self) -> Result<Bytes> {
        if self.payload.len() > MAX_PAYLOAD_SIZE {
            return Err(Error::PayloadTooLarge(self.payload.len()));
        }

        let mut buf = BytesMut::with_capacity(self.size());

        buf.put_u8(MAGIC_BYTE);

        let mut flags = 0u8;
        if self.timestamp.is_some() {
            flags |= FLAG_TIMESTAMP;
        }
        buf.put_u8(flags);

        buf.put_u16(self.payload.len() as u16);

        if let Some(ts) = self.timestamp {
            buf.put_u64(ts);
        }

        buf.extend_from_slice(&self.payload);

        Ok(buf.freeze())
    }

    /// Decode frame from bytes
    pub fn decode(mut buf: impl Buf) -> Result<Self> {
        if buf.remaining() < HEADER_SIZE {
            return Err(Error::BufferTooSmall {
                needed: HEADER_SIZE,
                have: buf.remaining(),
            });
        }

        let magic = buf.get_u8();
        if magic != MAGIC_BYTE {
            return Err(Error::InvalidMagic(magic));
        }

        let flags = buf.get_u8();
        let has_timestamp = (flags & FLAG_TIMESTAMP) != 0;

        let payload_len = buf.get_u16() as usize;

        let header_size = if has_timestamp {
            HEADER_SIZE_WITH_TS
        } else {
            HEADER_SIZE
        };
        let total_remaining = if has_timestamp { 8 } else { 0 } + payload_len;

        if buf.remaining() < total_remaining {
            return Err(Error::BufferTooSmall {
                needed: header_size + payload_len,
                have: HEADER_SIZE + buf.remaining(),
            });
        }

        let timestamp = if has_timestamp {
            Some(buf.get_u64())
        } else {
            None
        };

        let payload = buf.copy_to_bytes(payload_len);

        Ok(Self { timestamp, payload })
    }

    /// Check if buffer contains a complete frame, returning its total size
    pub fn check_complete(buf: &[u8]) -> Option<usize> {
        if buf.len() < HEADER_SIZE {
            return None;
        }

        if buf[0] != MAGIC_BYTE {
            return None;
        }

        let has_timestamp = (buf[1] & FLAG_TIMESTAMP) != 0;
        let payload_len = u16::from_be_bytes([buf[2], buf[3]]) as usize;

        let header_size = if has_timestamp {
            HEADER_SIZE_WITH_TS
        } else {
            HEADER_SIZE
        };

        let total_size = header_size + payload_len;

        if buf.len() >= total_size {
            Some(total_size)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_encode_decode() {
        let payload = b"control data";
        let frame = Frame::new(payload.as_slice()).with_timestamp(1234567890);

        let encoded = frame.encode().unwrap();
        let decoded = Frame::decode(&encoded[..]).unwrap();

        assert_eq!(decoded.timestamp, Some(1234567890));
        assert_eq!(decoded.payload.as_ref(), payload);
    }

    #[test]
    fn test_frame_without_timestamp() {
        let frame = Frame::new(b"hello".as_slice());
        let encoded = frame.encode().unwrap();
        assert_eq!(encoded.len(), HEADER_SIZE + 5);

        let decoded = Frame::decode(&encoded[..]).unwrap();
        assert_eq!(decoded.timestamp, None);
        assert_eq!(decoded.payload.as_ref(), b"hello");
    }

    #[test]
    fn test_bad_magic() {
        let mut encoded = Frame::new(b"x".as_slice()).encode().unwrap().to_vec();
        encoded[0] = 0xFF;
        assert!(matches!(
            Frame::decode(&encoded[..]),
            Err(Error::InvalidMagic(0xFF))
        ));
    }

    #[test]
    fn test_check_complete() {
        let frame = Frame::new(b"test".as_slice());
        let encoded = frame.encode().unwrap();

        assert_eq!(Frame::check_complete(&encoded), Some(encoded.len()));
        assert_eq!(Frame::check_complete(&encoded[..2]), None);
        assert_eq!(Frame::check_complete(&encoded[..5]), None);
    }
}
