//! PadLink Core
//!
//! Core types and protocol primitives for PadLink, the local-network
//! controller discovery and input-streaming protocol.
//!
//! This crate provides:
//! - Protocol message types ([`Message`], [`ControlValue`])
//! - Binary frame encoding/decoding ([`Frame`], [`codec`])
//! - Input primitives with change-only callbacks ([`ButtonInput`], [`JoystickInput`])
//! - The [`Controller`] aggregate and its [`ConnectionStatus`] state machine

pub mod codec;
pub mod controller;
pub mod error;
pub mod frame;
pub mod input;
pub mod types;

pub use codec::{decode, encode};
pub use controller::Controller;
pub use error::{Error, Result};
pub use frame::Frame;
pub use input::{ButtonInput, JoystickInput, VALUE_EPSILON};
pub use types::*;

use std::time::Duration;

/// Protocol version
pub const PROTOCOL_VERSION: u8 = 1;

/// Magic byte for frame identification
pub const MAGIC_BYTE: u8 = 0x50; // 'P'

/// Default mDNS service identifier ("_padlink._tcp")
pub const DEFAULT_SERVICE_IDENTIFIER: &str = "padlink";

/// Bound on a client's connection attempt before it falls back to Disconnected
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// How long an accepted connection may stay silent before its first handshake
pub const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// Current wall-clock time in microseconds since the Unix epoch
pub fn now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0)
}
