//! Main PadLink client implementation

use dashmap::DashMap;
use padlink_core::{
    codec, ConnectionStatus, Controller, ControllerType, HelloMessage, Message, SetNameMessage,
    PROTOCOL_VERSION,
};
use padlink_discovery::{DiscoveryEvent, ServiceRecord};
use padlink_transport::{TcpTransport, TransportEvent, TransportReceiver, TransportSender};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{ClientError, Result};

/// Event buffer between the client and the consuming application
const EVENT_BUFFER_SIZE: usize = 64;

/// Events delivered to the consuming application.
///
/// Service appearance/loss is advisory and independent of any active
/// connection. No event is delivered after [`Client::stop`] returns.
#[derive(Debug, Clone)]
pub enum ClientEvent {
    /// A matching service was discovered
    ServiceFound(ServiceRecord),
    /// A previously discovered service disappeared (by fullname)
    ServiceLost(String),
    /// The connection to a service is up; controllers are streaming
    Connected(ServiceRecord),
    /// The active connection ended; controllers are Disconnected
    Disconnected,
    /// Discovery or connection failure that did not stop the client
    Error(String),
}

struct Registered {
    controller: Arc<Controller>,
    kind: ControllerType,
}

type Outbox = Arc<RwLock<Option<mpsc::UnboundedSender<Message>>>>;

/// Browses for PadLink hosts and streams registered local controllers to
/// whichever one [`connect`](Client::connect) picks.
pub struct Client {
    name: String,
    service_identifier: String,
    controllers: Arc<DashMap<u16, Registered>>,
    running: Arc<RwLock<bool>>,
    connected: Arc<RwLock<bool>>,
    events: Mutex<Option<mpsc::Sender<ClientEvent>>>,
    /// Live message channel to the writer task while connected
    outbox: Outbox,
    /// Serializes connect attempts so only one can win the connected flag
    connect_gate: tokio::sync::Mutex<()>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Client {
    pub fn new(name: impl Into<String>, service_identifier: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            service_identifier: service_identifier.into(),
            controllers: Arc::new(DashMap::new()),
            running: Arc::new(RwLock::new(false)),
            connected: Arc::new(RwLock::new(false)),
            events: Mutex::new(None),
            outbox: Arc::new(RwLock::new(None)),
            connect_gate: tokio::sync::Mutex::new(()),
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Register a local controller whose input should be streamed.
    ///
    /// Its index must be unique among registered controllers; a duplicate
    /// is reported synchronously. If a connection is already up the
    /// controller is announced to the host immediately.
    pub fn add_controller(
        &self,
        controller: Arc<Controller>,
        kind: ControllerType,
    ) -> Result<()> {
        let index = controller.index();
        if self.controllers.contains_key(&index) {
            return Err(ClientError::DuplicateIndex(index));
        }

        let outbox = self.outbox.clone();
        controller.observe(Arc::new(move |cv| {
            if let Some(tx) = outbox.read().as_ref() {
                let _ = tx.send(Message::Control(cv));
            }
        }));

        // A controller joining a live connection is Connected from the start
        if *self.connected.read() {
            let _ = controller.set_status(ConnectionStatus::Connecting);
            let _ = controller.set_status(ConnectionStatus::Connected);
            self.queue(self.hello_for(&controller, kind));
        }

        self.controllers.insert(index, Registered { controller, kind });
        Ok(())
    }

    /// Unregister a local controller and stop streaming its input
    pub fn remove_controller(&self, controller: &Controller) {
        controller.clear_observers();
        self.controllers.remove(&controller.index());
    }

    /// Begin browsing for services under this client's service identifier.
    ///
    /// Returns the event receiver. A second `start` on a running client
    /// changes nothing and reports [`ClientError::AlreadyStarted`].
    pub fn start(&self) -> Result<mpsc::Receiver<ClientEvent>> {
        if *self.running.read() {
            return Err(ClientError::AlreadyStarted);
        }

        let (tx, rx) = mpsc::channel(EVENT_BUFFER_SIZE);
        *self.events.lock() = Some(tx.clone());
        *self.running.write() = true;

        let (disc_tx, mut disc_rx) = mpsc::channel(EVENT_BUFFER_SIZE);

        let identifier = self.service_identifier.clone();
        let browse_tx = disc_tx.clone();
        let browse_handle = tokio::spawn(async move {
            if let Err(e) = padlink_discovery::browse(&identifier, browse_tx).await {
                warn!("Discovery error: {}", e);
                let _ = disc_tx.send(DiscoveryEvent::Error(e.to_string())).await;
            }
        });

        let map_handle = tokio::spawn(async move {
            while let Some(event) = disc_rx.recv().await {
                let mapped = match event {
                    DiscoveryEvent::Found(record) => ClientEvent::ServiceFound(record),
                    DiscoveryEvent::Lost(fullname) => ClientEvent::ServiceLost(fullname),
                    DiscoveryEvent::Error(e) => ClientEvent::Error(e),
                };
                if tx.send(mapped).await.is_err() {
                    break;
                }
            }
        });

        let mut tasks = self.tasks.lock();
        tasks.push(browse_handle);
        tasks.push(map_handle);

        info!("Client '{}' browsing for _{}._tcp", self.name, self.service_identifier);
        Ok(rx)
    }

    /// Connect to a discovered service and start streaming.
    ///
    /// Registered controllers move Disconnected -> Connecting -> Connected;
    /// a failed or timed-out attempt flips them back to Disconnected and
    /// surfaces the error both as a return value and an `Error` event.
    pub async fn connect(&self, record: &ServiceRecord) -> Result<()> {
        let _gate = self.connect_gate.lock().await;

        let events = self
            .events
            .lock()
            .clone()
            .ok_or(ClientError::NotStarted)?;
        if *self.connected.read() {
            return Err(ClientError::AlreadyConnected);
        }

        for entry in self.controllers.iter() {
            let _ = entry.controller.set_status(ConnectionStatus::Connecting);
        }

        info!("Connecting to '{}' at {}", record.name, record.addr);

        let transport = TcpTransport::new();
        let (sender, mut receiver) = match transport.connect(record.addr).await {
            Ok(pair) => pair,
            Err(e) => {
                for entry in self.controllers.iter() {
                    let _ = entry.controller.set_status(ConnectionStatus::Disconnected);
                }
                let _ = events
                    .send(ClientEvent::Error(format!(
                        "connect to {} failed: {}",
                        record.addr, e
                    )))
                    .await;
                return Err(ClientError::from(e));
            }
        };
        let sender = Arc::new(sender);

        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<Message>();
        *self.outbox.write() = Some(out_tx.clone());

        // Announce every controller before any control data can flow
        for entry in self.controllers.iter() {
            let _ = out_tx.send(self.hello_for(&entry.controller, entry.kind));
        }

        let writer_sender = sender.clone();
        let writer_handle = tokio::spawn(async move {
            while let Some(message) = out_rx.recv().await {
                match codec::encode(&message) {
                    Ok(data) => {
                        if writer_sender.send(data).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!("Failed to encode outgoing message: {}", e),
                }
            }
        });

        for entry in self.controllers.iter() {
            let _ = entry.controller.set_status(ConnectionStatus::Connected);
        }
        *self.connected.write() = true;

        let connected = self.connected.clone();
        let outbox = self.outbox.clone();
        let controllers = self.controllers.clone();
        let reader_events = events.clone();
        let reader_handle = tokio::spawn(async move {
            loop {
                match receiver.recv().await {
                    Some(TransportEvent::Data(data)) => {
                        // The host sends nothing today; unknown types decode
                        // to None and are discarded, but malformed data ends
                        // the session just as it does on the acceptor side
                        if let Err(e) = codec::decode(&data) {
                            warn!("Malformed inbound data, disconnecting: {}", e);
                            if mark_disconnected(&connected, &outbox, &controllers) {
                                let _ = reader_events.send(ClientEvent::Disconnected).await;
                            }
                            break;
                        }
                    }
                    Some(TransportEvent::Error(e)) => {
                        let _ = reader_events.send(ClientEvent::Error(e)).await;
                    }
                    Some(TransportEvent::Disconnected { reason }) => {
                        debug!("Connection lost: {:?}", reason);
                        if mark_disconnected(&connected, &outbox, &controllers) {
                            let _ = reader_events.send(ClientEvent::Disconnected).await;
                        }
                        break;
                    }
                    None => {
                        if mark_disconnected(&connected, &outbox, &controllers) {
                            let _ = reader_events.send(ClientEvent::Disconnected).await;
                        }
                        break;
                    }
                }
            }
        });

        {
            let mut tasks = self.tasks.lock();
            tasks.push(writer_handle);
            tasks.push(reader_handle);
        }

        let _ = events.send(ClientEvent::Connected(record.clone())).await;
        info!("Connected to '{}'", record.name);
        Ok(())
    }

    /// Close the active connection, leaving discovery running
    pub async fn disconnect(&self) -> Result<()> {
        if !mark_disconnected(&self.connected, &self.outbox, &self.controllers) {
            return Err(ClientError::NotConnected);
        }
        let events = self.events.lock().clone();
        if let Some(tx) = events {
            let _ = tx.send(ClientEvent::Disconnected).await;
        }
        Ok(())
    }

    /// End browsing and tear down any active connection.
    ///
    /// All registered controllers are Disconnected afterwards and no
    /// further events are delivered. Idempotent.
    pub async fn stop(&self) {
        if !*self.running.read() {
            return;
        }
        *self.running.write() = false;

        let handles: Vec<_> = std::mem::take(&mut *self.tasks.lock());
        for handle in &handles {
            handle.abort();
        }
        for handle in handles {
            let _ = handle.await;
        }

        let events = self.events.lock().take();
        if mark_disconnected(&self.connected, &self.outbox, &self.controllers) {
            if let Some(tx) = &events {
                let _ = tx.send(ClientEvent::Disconnected).await;
            }
        }

        info!("Client '{}' stopped", self.name);
    }

    /// Rename a registered controller, propagating to the host if connected
    pub fn set_controller_name(&self, index: u16, name: Option<String>) -> Result<()> {
        let entry = self
            .controllers
            .get(&index)
            .ok_or(ClientError::UnknownController(index))?;
        entry.controller.set_name(name.clone());

        if *self.connected.read() {
            self.queue(Message::SetName(SetNameMessage {
                controller_index: index,
                name,
            }));
        }
        Ok(())
    }

    /// Thread-safe snapshot of the registered controllers
    pub fn controllers(&self) -> Vec<Arc<Controller>> {
        self.controllers
            .iter()
            .map(|e| e.controller.clone())
            .collect()
    }

    pub fn is_running(&self) -> bool {
        *self.running.read()
    }

    pub fn is_connected(&self) -> bool {
        *self.connected.read()
    }

    fn hello_for(&self, controller: &Controller, kind: ControllerType) -> Message {
        Message::Hello(HelloMessage {
            version: PROTOCOL_VERSION,
            controller_type: kind,
            layout: controller.layout(),
            requested_index: Some(controller.index()),
            name: controller.name().or_else(|| Some(self.name.clone())),
        })
    }

    fn queue(&self, message: Message) {
        if let Some(tx) = self.outbox.read().as_ref() {
            let _ = tx.send(message);
        }
    }
}

/// Flip the shared connection state to disconnected exactly once.
///
/// Returns whether this call performed the transition; the caller that wins
/// delivers the single `Disconnected` event.
fn mark_disconnected(
    connected: &Arc<RwLock<bool>>,
    outbox: &Outbox,
    controllers: &DashMap<u16, Registered>,
) -> bool {
    {
        let mut connected = connected.write();
        if !*connected {
            return false;
        }
        *connected = false;
    }

    // Dropping the outbox sender ends the writer task and closes the socket
    *outbox.write() = None;

    for entry in controllers.iter() {
        let _ = entry.controller.set_status(ConnectionStatus::Disconnected);
    }
    true
}
