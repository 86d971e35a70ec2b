//! TCP transport implementation
//!
//! Each message is preceded by a 4-byte big-endian length prefix so a
//! streaming read reassembles message boundaries deterministically. One IO
//! task per connection; a stalled peer only ever backs up its own channel.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use async_trait::async_trait;
use padlink_core::CONNECT_TIMEOUT;

use crate::error::{Result, TransportError};
use crate::traits::{TransportEvent, TransportReceiver, TransportSender, TransportServer};

/// Maximum message size (64KB)
const MAX_MESSAGE_SIZE: usize = 64 * 1024;

/// Channel buffer size per connection
const CHANNEL_BUFFER_SIZE: usize = 256;

/// TCP configuration
#[derive(Debug, Clone)]
pub struct TcpConfig {
    /// Maximum message size in bytes
    pub max_message_size: usize,
    /// Keep-alive interval in seconds (0 = disabled)
    pub keepalive_secs: u64,
    /// Bound on connection establishment
    pub connect_timeout: std::time::Duration,
}

impl Default for TcpConfig {
    fn default() -> Self {
        Self {
            max_message_size: MAX_MESSAGE_SIZE,
            keepalive_secs: 30,
            connect_timeout: CONNECT_TIMEOUT,
        }
    }
}

/// TCP transport for outbound connections
pub struct TcpTransport {
    config: TcpConfig,
}

impl TcpTransport {
    pub fn new() -> Self {
        Self {
            config: TcpConfig::default(),
        }
    }

    pub fn with_config(config: TcpConfig) -> Self {
        Self { config }
    }

    /// Connect to a listening peer, bounded by the configured timeout
    pub async fn connect(&self, addr: SocketAddr) -> Result<(TcpSender, TcpReceiver)> {
        debug!("Connecting to {}", addr);

        let stream = tokio::time::timeout(self.config.connect_timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| TransportError::Timeout)?
            .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;

        self.apply_keepalive(&stream);

        let (sender, receiver) = spawn_connection(stream, self.config.max_message_size);
        info!("Connected to {}", addr);
        Ok((sender, receiver))
    }

    fn apply_keepalive(&self, stream: &TcpStream) {
        if self.config.keepalive_secs > 0 {
            let socket = socket2::SockRef::from(stream);
            let keepalive = socket2::TcpKeepalive::new()
                .with_time(std::time::Duration::from_secs(self.config.keepalive_secs));
            let _ = socket.set_tcp_keepalive(&keepalive);
        }
    }
}

impl Default for TcpTransport {
    fn default() -> Self {
        Self::new()
    }
}

/// Wire up IO loop and channel endpoints for a live stream
fn spawn_connection(stream: TcpStream, max_size: usize) -> (TcpSender, TcpReceiver) {
    let connected = Arc::new(Mutex::new(true));
    let (outgoing_tx, outgoing_rx) = mpsc::channel::<Bytes>(CHANNEL_BUFFER_SIZE);
    let (incoming_tx, incoming_rx) = mpsc::channel::<TransportEvent>(CHANNEL_BUFFER_SIZE);

    let sender = TcpSender {
        tx: outgoing_tx,
        connected: connected.clone(),
    };
    let receiver = TcpReceiver { rx: incoming_rx };

    let connected_clone = connected.clone();
    tokio::spawn(async move {
        let (reader, writer) = stream.into_split();
        run_tcp_io_loop(reader, writer, outgoing_rx, incoming_tx, max_size).await;
        *connected_clone.lock() = false;
    });

    (sender, receiver)
}

/// Shared IO loop for TCP connections
async fn run_tcp_io_loop(
    mut reader: OwnedReadHalf,
    mut writer: OwnedWriteHalf,
    mut outgoing_rx: mpsc::Receiver<Bytes>,
    incoming_tx: mpsc::Sender<TransportEvent>,
    max_size: usize,
) {
    let mut read_buf = BytesMut::with_capacity(8192);

    loop {
        tokio::select! {
            maybe = outgoing_rx.recv() => {
                let Some(data) = maybe else {
                    // Sender handle dropped: close the socket
                    debug!("TCP sender dropped, closing connection");
                    let _ = writer.shutdown().await;
                    let _ = incoming_tx.send(TransportEvent::Disconnected { reason: None }).await;
                    break;
                };

                let mut frame = BytesMut::with_capacity(4 + data.len());
                frame.put_u32(data.len() as u32);
                frame.extend_from_slice(&data);

                if let Err(e) = writer.write_all(&frame).await {
                    error!("TCP write error: {}", e);
                    let _ = incoming_tx.send(TransportEvent::Disconnected {
                        reason: Some(e.to_string())
                    }).await;
                    break;
                }
            }

            result = reader.read_buf(&mut read_buf) => {
                match result {
                    Ok(0) => {
                        debug!("TCP connection closed");
                        let _ = incoming_tx.send(TransportEvent::Disconnected { reason: None }).await;
                        break;
                    }
                    Ok(_) => {
                        let mut fatal = false;
                        while read_buf.len() >= 4 {
                            let len = (&read_buf[..4]).get_u32() as usize;

                            if len > max_size {
                                error!("Message too large: {} > {}", len, max_size);
                                let _ = incoming_tx.send(TransportEvent::Disconnected {
                                    reason: Some(format!("message too large: {}", len))
                                }).await;
                                fatal = true;
                                break;
                            }

                            if read_buf.len() >= 4 + len {
                                read_buf.advance(4);
                                let data = read_buf.split_to(len).freeze();
                                if incoming_tx.send(TransportEvent::Data(data)).await.is_err() {
                                    fatal = true;
                                    break;
                                }
                            } else {
                                break;
                            }
                        }
                        if fatal {
                            break;
                        }
                    }
                    Err(e) => {
                        error!("TCP read error: {}", e);
                        let _ = incoming_tx.send(TransportEvent::Error(e.to_string())).await;
                        let _ = incoming_tx.send(TransportEvent::Disconnected {
                            reason: Some(e.to_string())
                        }).await;
                        break;
                    }
                }
            }

            else => break,
        }
    }
}

/// TCP sender for writing messages
pub struct TcpSender {
    tx: mpsc::Sender<Bytes>,
    connected: Arc<Mutex<bool>>,
}

#[async_trait]
impl TransportSender for TcpSender {
    async fn send(&self, data: Bytes) -> Result<()> {
        if !*self.connected.lock() {
            return Err(TransportError::NotConnected);
        }

        self.tx
            .send(data)
            .await
            .map_err(|_| TransportError::SendFailed("channel closed".into()))
    }

    fn try_send(&self, data: Bytes) -> Result<()> {
        if !*self.connected.lock() {
            return Err(TransportError::NotConnected);
        }

        self.tx.try_send(data).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => TransportError::BufferFull,
            mpsc::error::TrySendError::Closed(_) => TransportError::ConnectionClosed,
        })
    }

    fn is_connected(&self) -> bool {
        *self.connected.lock()
    }

    async fn close(&self) -> Result<()> {
        *self.connected.lock() = false;
        Ok(())
    }
}

/// TCP receiver for reading events
pub struct TcpReceiver {
    rx: mpsc::Receiver<TransportEvent>,
}

#[async_trait]
impl TransportReceiver for TcpReceiver {
    async fn recv(&mut self) -> Option<TransportEvent> {
        self.rx.recv().await
    }
}

/// TCP server accepting one session per inbound connection
pub struct TcpServer {
    listener: TcpListener,
    config: TcpConfig,
}

impl TcpServer {
    /// Bind to an address and create a new TCP server
    pub async fn bind(addr: SocketAddr) -> Result<Self> {
        Self::bind_with_config(addr, TcpConfig::default()).await
    }

    /// Bind with custom configuration
    pub async fn bind_with_config(addr: SocketAddr, config: TcpConfig) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| TransportError::BindFailed(e.to_string()))?;

        info!("TCP server listening on {}", addr);

        Ok(Self { listener, config })
    }
}

#[async_trait]
impl TransportServer for TcpServer {
    type Sender = TcpSender;
    type Receiver = TcpReceiver;

    async fn accept(&mut self) -> Result<(Self::Sender, Self::Receiver, SocketAddr)> {
        let (stream, peer_addr) = self
            .listener
            .accept()
            .await
            .map_err(|e| TransportError::AcceptFailed(e.to_string()))?;

        info!("TCP connection accepted from {}", peer_addr);

        let (sender, receiver) = spawn_connection(stream, self.config.max_message_size);
        Ok((sender, receiver, peer_addr))
    }

    fn local_addr(&self) -> Result<SocketAddr> {
        self.listener
            .local_addr()
            .map_err(|e| TransportError::Other(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{sleep, Duration};

    fn any_local() -> SocketAddr {
        "127.0.0.1:0".parse().unwrap()
    }

    #[tokio::test]
    async fn test_tcp_config_default() {
        let config = TcpConfig::default();
        assert_eq!(config.max_message_size, 64 * 1024);
        assert_eq!(config.keepalive_secs, 30);
    }

    #[tokio::test]
    async fn test_tcp_client_server_roundtrip() {
        let mut server = TcpServer::bind(any_local()).await.unwrap();
        let addr = server.local_addr().unwrap();

        let accept_handle = tokio::spawn(async move {
            let (sender, mut receiver, _peer) = server.accept().await.unwrap();
            if let Some(TransportEvent::Data(data)) = receiver.recv().await {
                sender.send(data).await.unwrap();
            }
        });

        sleep(Duration::from_millis(20)).await;

        let transport = TcpTransport::new();
        let (client_sender, mut client_receiver) = transport.connect(addr).await.unwrap();

        let test_data = Bytes::from("hello padlink");
        client_sender.send(test_data.clone()).await.unwrap();

        match client_receiver.recv().await {
            Some(TransportEvent::Data(received)) => assert_eq!(received, test_data),
            other => panic!("Expected Data event, got {:?}", other),
        }

        client_sender.close().await.unwrap();
        let _ = accept_handle.await;
    }

    #[tokio::test]
    async fn test_disconnect_event_on_peer_drop() {
        let mut server = TcpServer::bind(any_local()).await.unwrap();
        let addr = server.local_addr().unwrap();

        let accept_handle = tokio::spawn(async move {
            let (sender, receiver, _peer) = server.accept().await.unwrap();
            // Drop both halves to close the socket
            drop(sender);
            drop(receiver);
        });

        let transport = TcpTransport::new();
        let (_sender, mut receiver) = transport.connect(addr).await.unwrap();
        let _ = accept_handle.await;

        match receiver.recv().await {
            Some(TransportEvent::Disconnected { .. }) => {}
            other => panic!("Expected Disconnected event, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_connect_refused() {
        // Bind then drop to get a port nobody is listening on
        let listener = TcpListener::bind(any_local()).await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let transport = TcpTransport::new();
        let result = transport.connect(addr).await;
        assert!(result.is_err());
    }
}
