//! Browser error types

use thiserror::Error;

pub type Result<T> = std::result::Result<T, BrowserError>;

#[derive(Error, Debug)]
pub enum BrowserError {
    #[error("browser already started")]
    AlreadyStarted,

    #[error("duplicate controller index: {0}")]
    DuplicateIndex(u16),

    #[error("transport error: {0}")]
    Transport(#[from] padlink_transport::TransportError),

    #[error("discovery error: {0}")]
    Discovery(#[from] padlink_discovery::DiscoveryError),

    #[error("protocol error: {0}")]
    Core(#[from] padlink_core::Error),

    #[error("browser error: {0}")]
    Other(String),
}
