//! The controller browser: service publication, accept loop, and roster

use dashmap::DashMap;
use padlink_core::{ConnectionStatus, Controller, ControllerType, HelloMessage};
use padlink_discovery::ServiceAdvertiser;
use padlink_transport::{TcpServer, TransportServer};
use parking_lot::{Mutex, RwLock};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::error::{BrowserError, Result};
use crate::session;

/// Event buffer between the browser and the consuming application
const EVENT_BUFFER_SIZE: usize = 64;

/// Browser configuration
#[derive(Debug, Clone)]
pub struct BrowserConfig {
    /// Human-readable service name shown to discovering clients
    pub name: String,
    /// Service identifier; must match what clients browse for
    pub service_identifier: String,
    /// TCP listen port (0 = ephemeral)
    pub port: u16,
    /// Whether to publish an mDNS record (disable for direct-connect setups)
    pub advertise: bool,
    /// Maximum simultaneous peer connections
    pub max_peers: usize,
}

impl BrowserConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            name: "PadLink Host".to_string(),
            service_identifier: padlink_core::DEFAULT_SERVICE_IDENTIFIER.to_string(),
            port: 0,
            advertise: true,
            max_peers: 16,
        }
    }
}

/// Events delivered to the consuming application.
///
/// No event is delivered after [`ControllerBrowser::stop`] returns.
#[derive(Debug, Clone)]
pub enum BrowserEvent {
    /// A peer completed its handshake; the controller is live and Connected
    ControllerConnected {
        controller: Arc<Controller>,
        controller_type: ControllerType,
    },
    /// A peer's controller went away; its status is already Disconnected
    ControllerDisconnected(Arc<Controller>),
    /// Discovery or accept failure that did not stop the browser
    Error(String),
}

/// Live set of controllers known to this browser.
///
/// Remote controllers are owned by their peer session; local ones are
/// registered by the application for symmetric peer-to-peer use. Indices
/// are unique across both at all times.
pub(crate) struct Roster {
    remote: DashMap<u16, Arc<Controller>>,
    local: DashMap<u16, Arc<Controller>>,
}

impl Roster {
    fn new() -> Self {
        Self {
            remote: DashMap::new(),
            local: DashMap::new(),
        }
    }

    pub(crate) fn contains(&self, index: u16) -> bool {
        self.remote.contains_key(&index) || self.local.contains_key(&index)
    }

    pub(crate) fn peer_count(&self) -> usize {
        self.remote.len()
    }

    /// Insert a new remote controller under a roster-unique index.
    ///
    /// The peer's requested index is honored when free; otherwise the
    /// lowest free index is assigned. The entry-based insert makes the
    /// allocation atomic against concurrent sessions.
    pub(crate) fn allocate_remote(&self, hello: &HelloMessage) -> Arc<Controller> {
        loop {
            let candidate = hello
                .requested_index
                .filter(|i| !self.contains(*i))
                .unwrap_or_else(|| self.lowest_free());

            match self.remote.entry(candidate) {
                dashmap::mapref::entry::Entry::Vacant(entry) => {
                    let mut controller = Controller::new(candidate)
                        .with_layout(hello.layout)
                        .with_status(ConnectionStatus::Connected);
                    if let Some(name) = &hello.name {
                        controller = controller.with_name(name.clone());
                    }
                    let controller = Arc::new(controller);
                    entry.insert(controller.clone());
                    return controller;
                }
                dashmap::mapref::entry::Entry::Occupied(_) => continue,
            }
        }
    }

    pub(crate) fn remove_remote(&self, index: u16) -> Option<Arc<Controller>> {
        self.remote.remove(&index).map(|(_, c)| c)
    }

    fn lowest_free(&self) -> u16 {
        (0..=u16::MAX)
            .find(|i| !self.contains(*i))
            .unwrap_or(u16::MAX)
    }

    fn snapshot(&self) -> Vec<Arc<Controller>> {
        self.remote
            .iter()
            .map(|e| e.value().clone())
            .chain(self.local.iter().map(|e| e.value().clone()))
            .collect()
    }
}

/// Advertises a service and accepts remote controllers.
pub struct ControllerBrowser {
    config: BrowserConfig,
    roster: Arc<Roster>,
    running: Arc<RwLock<bool>>,
    events: Mutex<Option<mpsc::Sender<BrowserEvent>>>,
    advertiser: Mutex<Option<ServiceAdvertiser>>,
    tasks: Arc<Mutex<Vec<JoinHandle<()>>>>,
    local_addr: RwLock<Option<SocketAddr>>,
}

impl ControllerBrowser {
    pub fn new(config: BrowserConfig) -> Self {
        Self {
            config,
            roster: Arc::new(Roster::new()),
            running: Arc::new(RwLock::new(false)),
            events: Mutex::new(None),
            advertiser: Mutex::new(None),
            tasks: Arc::new(Mutex::new(Vec::new())),
            local_addr: RwLock::new(None),
        }
    }

    /// Publish the service and begin accepting connections.
    ///
    /// Returns the event receiver. Calling `start` on a running browser
    /// changes nothing and reports [`BrowserError::AlreadyStarted`].
    pub async fn start(&self) -> Result<mpsc::Receiver<BrowserEvent>> {
        if *self.running.read() {
            return Err(BrowserError::AlreadyStarted);
        }

        let bind_addr: SocketAddr = ([0, 0, 0, 0], self.config.port).into();
        let mut server = TcpServer::bind(bind_addr).await?;
        let local_addr = server.local_addr()?;
        *self.local_addr.write() = Some(local_addr);

        if self.config.advertise {
            let mut advertiser = ServiceAdvertiser::new()?;
            advertiser.advertise(
                &self.config.name,
                &self.config.service_identifier,
                local_addr.port(),
            )?;
            *self.advertiser.lock() = Some(advertiser);
        }

        let (tx, rx) = mpsc::channel(EVENT_BUFFER_SIZE);
        *self.events.lock() = Some(tx.clone());
        *self.running.write() = true;

        info!(
            "Browser '{}' accepting controllers on {}",
            self.config.name, local_addr
        );

        let roster = self.roster.clone();
        let running = self.running.clone();
        let tasks = self.tasks.clone();
        let max_peers = self.config.max_peers;

        let accept_handle = tokio::spawn(async move {
            while *running.read() {
                match server.accept().await {
                    Ok((sender, receiver, addr)) => {
                        if roster.peer_count() >= max_peers {
                            warn!("Rejecting {}: peer limit {} reached", addr, max_peers);
                            continue;
                        }

                        let handle = tokio::spawn(session::run_session(
                            Arc::new(sender),
                            receiver,
                            addr,
                            roster.clone(),
                            tx.clone(),
                        ));
                        tasks.lock().push(handle);
                    }
                    Err(e) => {
                        error!("Accept error: {}", e);
                        let _ = tx.send(BrowserEvent::Error(e.to_string())).await;
                    }
                }
            }
        });
        self.tasks.lock().push(accept_handle);

        Ok(rx)
    }

    /// Withdraw the advertisement and tear down every peer session.
    ///
    /// Each remote controller transitions to Disconnected and one
    /// `ControllerDisconnected` event is delivered for it before the event
    /// channel closes. Idempotent.
    pub async fn stop(&self) {
        if !*self.running.read() {
            return;
        }
        *self.running.write() = false;

        if let Some(mut advertiser) = self.advertiser.lock().take() {
            if let Err(e) = advertiser.stop() {
                warn!("Failed to withdraw advertisement: {}", e);
            }
        }

        let handles: Vec<_> = std::mem::take(&mut *self.tasks.lock());
        for handle in &handles {
            handle.abort();
        }
        for handle in handles {
            let _ = handle.await;
        }

        let events = self.events.lock().take();

        let indices: Vec<u16> = self.roster.remote.iter().map(|e| *e.key()).collect();
        for index in indices {
            if let Some(controller) = self.roster.remove_remote(index) {
                let _ = controller.set_status(ConnectionStatus::Disconnected);
                if let Some(tx) = &events {
                    let _ = tx.send(BrowserEvent::ControllerDisconnected(controller)).await;
                }
            }
        }

        *self.local_addr.write() = None;
        info!("Browser '{}' stopped", self.config.name);
    }

    /// Register a locally-sourced controller so this host also exposes it
    /// (symmetric peer-to-peer use). Its index must be roster-unique.
    pub fn add_controller(&self, controller: Arc<Controller>) -> Result<()> {
        let index = controller.index();
        if self.roster.contains(index) {
            return Err(BrowserError::DuplicateIndex(index));
        }
        self.roster.local.insert(index, controller);
        Ok(())
    }

    /// Unregister a locally-sourced controller
    pub fn remove_controller(&self, controller: &Controller) {
        self.roster.local.remove(&controller.index());
    }

    /// Thread-safe snapshot of all currently known controllers
    pub fn controllers(&self) -> Vec<Arc<Controller>> {
        self.roster.snapshot()
    }

    /// Address the browser is listening on, while started
    pub fn local_addr(&self) -> Option<SocketAddr> {
        *self.local_addr.read()
    }

    pub fn is_running(&self) -> bool {
        *self.running.read()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use padlink_core::GamepadLayout;

    fn hello(requested: Option<u16>) -> HelloMessage {
        HelloMessage {
            version: padlink_core::PROTOCOL_VERSION,
            controller_type: ControllerType::Remote,
            layout: GamepadLayout::Regular,
            requested_index: requested,
            name: Some("pad".to_string()),
        }
    }

    #[test]
    fn test_roster_honors_free_requested_index() {
        let roster = Roster::new();
        let controller = roster.allocate_remote(&hello(Some(5)));
        assert_eq!(controller.index(), 5);
        assert_eq!(controller.status(), ConnectionStatus::Connected);
        assert_eq!(controller.name().as_deref(), Some("pad"));
    }

    #[test]
    fn test_roster_resolves_collisions_to_lowest_free() {
        let roster = Roster::new();
        assert_eq!(roster.allocate_remote(&hello(Some(0))).index(), 0);
        assert_eq!(roster.allocate_remote(&hello(Some(0))).index(), 1);
        assert_eq!(roster.allocate_remote(&hello(None)).index(), 2);
    }

    #[test]
    fn test_roster_counts_local_indices_as_taken() {
        let roster = Roster::new();
        roster.local.insert(0, Arc::new(Controller::new(0)));

        assert_eq!(roster.allocate_remote(&hello(None)).index(), 1);
        assert!(roster.contains(0));
        assert_eq!(roster.peer_count(), 1);
        assert_eq!(roster.snapshot().len(), 2);
    }

    #[tokio::test]
    async fn test_start_stop_lifecycle() {
        let mut config = BrowserConfig::new("Lifecycle");
        config.advertise = false;
        let browser = ControllerBrowser::new(config);

        let _events = browser.start().await.unwrap();
        assert!(browser.is_running());
        assert!(browser.local_addr().is_some());

        // A second start must leave the running browser untouched
        assert!(matches!(
            browser.start().await,
            Err(BrowserError::AlreadyStarted)
        ));
        assert!(browser.is_running());

        browser.stop().await;
        assert!(!browser.is_running());
        assert!(browser.local_addr().is_none());

        // Restart comes up with an empty roster
        let _events = browser.start().await.unwrap();
        assert!(browser.controllers().is_empty());
        browser.stop().await;
    }
}
