//! Transport trait definitions

use async_trait::async_trait;
use bytes::Bytes;
use std::net::SocketAddr;

use crate::error::Result;

/// Events that can occur on a transport connection
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// Connection closed (clean or error)
    Disconnected { reason: Option<String> },
    /// One complete message received
    Data(Bytes),
    /// Error occurred
    Error(String),
}

/// Trait for sending messages on an open connection
#[async_trait]
pub trait TransportSender: Send + Sync {
    /// Send one message
    async fn send(&self, data: Bytes) -> Result<()>;

    /// Send without waiting for channel capacity
    fn try_send(&self, data: Bytes) -> Result<()>;

    /// Check if connected
    fn is_connected(&self) -> bool;

    /// Close the sender
    async fn close(&self) -> Result<()>;
}

/// Trait for receiving events from an open connection
#[async_trait]
pub trait TransportReceiver: Send {
    /// Receive the next event; `None` once the connection is gone
    async fn recv(&mut self) -> Option<TransportEvent>;
}

/// Trait for transport listeners accepting inbound connections
#[async_trait]
pub trait TransportServer: Send + Sync {
    /// The sender type for accepted connections
    type Sender: TransportSender;
    /// The receiver type for accepted connections
    type Receiver: TransportReceiver;

    /// Accept a new connection
    async fn accept(&mut self) -> Result<(Self::Sender, Self::Receiver, SocketAddr)>;

    /// Get the local address
    fn local_addr(&self) -> Result<SocketAddr>;
}
