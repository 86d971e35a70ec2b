//! Client error types

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClientError>;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("client already started")]
    AlreadyStarted,

    #[error("client not started")]
    NotStarted,

    #[error("already connected")]
    AlreadyConnected,

    #[error("not connected")]
    NotConnected,

    #[error("duplicate controller index: {0}")]
    DuplicateIndex(u16),

    #[error("no controller registered with index {0}")]
    UnknownController(u16),

    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("transport error: {0}")]
    Transport(#[from] padlink_transport::TransportError),

    #[error("protocol error: {0}")]
    Core(#[from] padlink_core::Error),
}
