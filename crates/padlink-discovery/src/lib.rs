//! PadLink Discovery
//!
//! Zero-configuration service advertisement and browsing over mDNS/Bonjour.
//! Hosts advertise `_{identifier}._tcp` services; clients browse for them
//! and receive [`DiscoveryEvent`]s as services appear and disappear.

pub mod error;
pub mod mdns;

pub use error::{DiscoveryError, Result};
pub use mdns::{browse, ServiceAdvertiser};

use std::net::SocketAddr;

/// An advertised service seen by the browser.
///
/// Ephemeral: produced by the discovery mechanism and consumed once to
/// initiate a connection; not retained after connect or loss.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceRecord {
    /// Human-readable service name chosen by the host
    pub name: String,
    /// Fully qualified mDNS instance name, unique on the network
    pub fullname: String,
    /// Resolved connect address
    pub addr: SocketAddr,
}

/// Discovery event
#[derive(Debug, Clone)]
pub enum DiscoveryEvent {
    /// Service appeared (or re-resolved)
    Found(ServiceRecord),
    /// Service disappeared, identified by its fullname
    Lost(String),
    /// Error during discovery
    Error(String),
}

/// The mDNS service type for a given service identifier
pub fn service_type(identifier: &str) -> String {
    format!("_{}._tcp.local.", identifier)
}
