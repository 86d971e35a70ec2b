//! Error types for PadLink

use crate::types::ConnectionStatus;
use thiserror::Error;

/// Result type alias for PadLink operations
pub type Result<T> = std::result::Result<T, Error>;

/// PadLink protocol error types
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid magic byte in frame header
    #[error("invalid magic byte: expected 0x50, got 0x{0:02x}")]
    InvalidMagic(u8),

    /// Frame payload too large
    #[error("payload too large: {0} bytes (max 65535)")]
    PayloadTooLarge(usize),

    /// Frame buffer too small
    #[error("buffer too small: need {needed} bytes, have {have}")]
    BufferTooSmall { needed: usize, have: usize },

    /// Message body ended before all fields were read
    #[error("truncated message body")]
    Truncated,

    /// Invalid control id code
    #[error("unknown control id: 0x{0:02x}")]
    UnknownControl(u8),

    /// Invalid controller type code
    #[error("unknown controller type: 0x{0:02x}")]
    UnknownControllerType(u8),

    /// Invalid gamepad layout code
    #[error("unknown gamepad layout: 0x{0:02x}")]
    UnknownLayout(u8),

    /// String field was not valid UTF-8
    #[error("invalid utf-8 in string field")]
    InvalidString,

    /// Connection status transition not in the allowed graph
    #[error("invalid status transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: ConnectionStatus,
        to: ConnectionStatus,
    },

    /// Controller index already present in a roster
    #[error("duplicate controller index: {0}")]
    DuplicateIndex(u16),

    /// Control value does not belong to this controller
    #[error("control value for controller {got}, expected {expected}")]
    IndexMismatch { expected: u16, got: u16 },

    /// Encoding error
    #[error("encode error: {0}")]
    EncodeError(String),
}
