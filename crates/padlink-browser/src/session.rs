//! Per-peer session: handshake, decode loop, teardown
//!
//! One session per accepted connection. A peer may announce several
//! controllers over the same connection (one HELLO each); every announced
//! controller lives exactly as long as the session.

use padlink_core::{codec, ConnectionStatus, Controller, ControlValue, Message, HANDSHAKE_TIMEOUT};
use padlink_transport::{TcpReceiver, TransportEvent, TransportReceiver, TransportSender};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::browser::{BrowserEvent, Roster};

/// Runtime state of one peer connection
struct PeerSession {
    id: String,
    addr: SocketAddr,
    /// Held for the session's lifetime; dropping it closes the socket
    _sender: Arc<dyn TransportSender>,
    /// Wire index (as the peer tags its control values) -> live controller
    controllers: HashMap<u16, Arc<Controller>>,
}

pub(crate) async fn run_session(
    sender: Arc<dyn TransportSender>,
    mut receiver: TcpReceiver,
    addr: SocketAddr,
    roster: Arc<Roster>,
    events: mpsc::Sender<BrowserEvent>,
) {
    let mut session = PeerSession {
        id: Uuid::new_v4().to_string(),
        addr,
        _sender: sender,
        controllers: HashMap::new(),
    };

    // Identity must arrive before any control data is accepted
    let hello = match tokio::time::timeout(HANDSHAKE_TIMEOUT, first_hello(&mut receiver)).await {
        Ok(Some(hello)) => hello,
        Ok(None) => {
            debug!("Session {} ended before handshake", session.id);
            return;
        }
        Err(_) => {
            warn!("Session {} handshake timed out, dropping {}", session.id, addr);
            return;
        }
    };

    announce(&mut session, &roster, &events, hello).await;

    loop {
        match receiver.recv().await {
            Some(TransportEvent::Data(data)) => match codec::decode(&data) {
                Ok(Some(Message::Control(cv))) => route_control(&session, &cv),
                Ok(Some(Message::Hello(hello))) => {
                    announce(&mut session, &roster, &events, hello).await;
                }
                Ok(Some(Message::SetName(msg))) => {
                    if let Some(controller) = session.controllers.get(&msg.controller_index) {
                        controller.set_name(msg.name);
                    } else {
                        debug!(
                            "Session {}: rename for unknown controller {}",
                            session.id, msg.controller_index
                        );
                    }
                }
                Ok(None) => {} // unknown message type, discarded
                Err(e) => {
                    // Malformed data kills this session only
                    warn!("Session {} decode error: {}", session.id, e);
                    break;
                }
            },
            Some(TransportEvent::Error(e)) => {
                warn!("Session {} transport error: {}", session.id, e);
            }
            Some(TransportEvent::Disconnected { reason }) => {
                debug!("Session {} disconnected: {:?}", session.id, reason);
                break;
            }
            None => break,
        }
    }

    teardown(session, &roster, &events).await;
}

/// Read transport events until the first HELLO decodes.
///
/// Anything other than a HELLO (or a discardable unknown) before identity
/// is established aborts the session.
async fn first_hello(receiver: &mut TcpReceiver) -> Option<padlink_core::HelloMessage> {
    loop {
        match receiver.recv().await? {
            TransportEvent::Data(data) => match codec::decode(&data) {
                Ok(Some(Message::Hello(hello))) => return Some(hello),
                Ok(None) => continue,
                Ok(Some(other)) => {
                    warn!("Message before handshake: {:?}", other);
                    return None;
                }
                Err(e) => {
                    warn!("Decode error during handshake: {}", e);
                    return None;
                }
            },
            TransportEvent::Disconnected { .. } => return None,
            TransportEvent::Error(_) => continue,
        }
    }
}

/// Register one announced controller and notify the application
async fn announce(
    session: &mut PeerSession,
    roster: &Roster,
    events: &mpsc::Sender<BrowserEvent>,
    hello: padlink_core::HelloMessage,
) {
    let wire_index = hello.requested_index;
    let controller = roster.allocate_remote(&hello);
    let key = wire_index.unwrap_or_else(|| controller.index());

    info!(
        "Session {} ({}): controller '{}' joined as index {}",
        session.id,
        session.addr,
        controller.name().unwrap_or_default(),
        controller.index()
    );

    // A wire index maps to at most one live controller; re-announcing one
    // displaces the previous controller, which leaves the roster with a
    // disconnect like any other departure
    if let Some(displaced) = session.controllers.insert(key, controller.clone()) {
        warn!(
            "Session {}: wire index {} re-announced, replacing controller {}",
            session.id,
            key,
            displaced.index()
        );
        roster.remove_remote(displaced.index());
        let _ = displaced.set_status(ConnectionStatus::Disconnected);
        let _ = events
            .send(BrowserEvent::ControllerDisconnected(displaced))
            .await;
    }

    let _ = events
        .send(BrowserEvent::ControllerConnected {
            controller,
            controller_type: hello.controller_type,
        })
        .await;
}

/// Apply a control value to the controller the peer addressed.
///
/// The wire index is the peer's own numbering; it is rewritten to the
/// roster-assigned index before the update is applied.
fn route_control(session: &PeerSession, cv: &ControlValue) {
    let Some(controller) = session.controllers.get(&cv.controller_index) else {
        debug!(
            "Session {}: control value for unannounced controller {}",
            session.id, cv.controller_index
        );
        return;
    };

    let mut update = cv.clone();
    update.controller_index = controller.index();
    if let Err(e) = controller.apply(&update) {
        debug!("Session {}: dropped control value: {}", session.id, e);
    }
}

/// Remove every controller this session announced and notify once each
async fn teardown(session: PeerSession, roster: &Roster, events: &mpsc::Sender<BrowserEvent>) {
    for (_, controller) in session.controllers {
        roster.remove_remote(controller.index());
        let _ = controller.set_status(ConnectionStatus::Disconnected);
        let _ = events
            .send(BrowserEvent::ControllerDisconnected(controller))
            .await;
    }
    debug!("Session {} torn down", session.id);
}
