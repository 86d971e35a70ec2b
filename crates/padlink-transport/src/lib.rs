//! PadLink Transport Layer
//!
//! Reliable, ordered byte-stream transport for PadLink sessions. TCP is the
//! only transport the protocol requires; every connection carries
//! length-prefixed messages so partial reads and writes reassemble
//! deterministically.

pub mod error;
pub mod tcp;
pub mod traits;

pub use error::{Result, TransportError};
pub use tcp::{TcpConfig, TcpReceiver, TcpSender, TcpServer, TcpTransport};
pub use traits::{TransportEvent, TransportReceiver, TransportSender, TransportServer};
