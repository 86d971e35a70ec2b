//! mDNS/Bonjour advertisement and browsing

use crate::{service_type, DiscoveryError, DiscoveryEvent, Result, ServiceRecord};
use mdns_sd::{ServiceDaemon, ServiceEvent, ServiceInfo};
use std::net::SocketAddr;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Browse for PadLink services under the given identifier.
///
/// Runs until the event receiver is dropped or the underlying search stops;
/// resolved services are reported as [`DiscoveryEvent::Found`], removals as
/// [`DiscoveryEvent::Lost`].
pub async fn browse(identifier: &str, tx: mpsc::Sender<DiscoveryEvent>) -> Result<()> {
    let mdns = ServiceDaemon::new().map_err(|e| DiscoveryError::Mdns(e.to_string()))?;

    let ty = service_type(identifier);
    let receiver = mdns
        .browse(&ty)
        .map_err(|e| DiscoveryError::Mdns(e.to_string()))?;

    info!("Browsing for {}", ty);

    loop {
        match receiver.recv_async().await {
            Ok(event) => match event {
                ServiceEvent::ServiceResolved(info) => {
                    debug!("mDNS resolved: {:?}", info);

                    let Some(addr) = first_addr(&info) else {
                        warn!("Resolved service without address: {}", info.get_fullname());
                        continue;
                    };

                    let record = ServiceRecord {
                        name: instance_name(info.get_fullname(), &ty),
                        fullname: info.get_fullname().to_string(),
                        addr,
                    };

                    info!("Discovered service {} at {}", record.name, record.addr);

                    if tx.send(DiscoveryEvent::Found(record)).await.is_err() {
                        break;
                    }
                }
                ServiceEvent::ServiceRemoved(_, fullname) => {
                    info!("Service lost: {}", fullname);
                    if tx.send(DiscoveryEvent::Lost(fullname)).await.is_err() {
                        break;
                    }
                }
                ServiceEvent::SearchStarted(_) => {
                    debug!("mDNS search started");
                }
                ServiceEvent::SearchStopped(_) => {
                    debug!("mDNS search stopped");
                    break;
                }
                _ => {}
            },
            Err(e) => {
                warn!("mDNS receive error: {:?}", e);
                let _ = tx.send(DiscoveryEvent::Error(e.to_string())).await;
                break;
            }
        }
    }

    Ok(())
}

fn first_addr(info: &ServiceInfo) -> Option<SocketAddr> {
    info.get_addresses()
        .iter()
        .next()
        .map(|ip| SocketAddr::new((*ip).into(), info.get_port()))
}

/// Instance name portion of an mDNS fullname ("Pad._padlink._tcp.local.")
fn instance_name(fullname: &str, ty: &str) -> String {
    fullname
        .strip_suffix(ty)
        .map(|n| n.trim_end_matches('.').to_string())
        .unwrap_or_else(|| fullname.to_string())
}

/// Advertise a PadLink service via mDNS
pub struct ServiceAdvertiser {
    mdns: ServiceDaemon,
    fullname: Option<String>,
}

impl ServiceAdvertiser {
    /// Create a new service advertiser
    pub fn new() -> Result<Self> {
        let mdns = ServiceDaemon::new().map_err(|e| DiscoveryError::Mdns(e.to_string()))?;
        Ok(Self {
            mdns,
            fullname: None,
        })
    }

    /// Publish a service record for `name` under `identifier`, pointing at
    /// the given TCP port
    pub fn advertise(&mut self, name: &str, identifier: &str, port: u16) -> Result<()> {
        let host = hostname::get()
            .map(|h| h.to_string_lossy().into_owned())
            .unwrap_or_else(|_| "padlink-host".to_string());

        let version = padlink_core::PROTOCOL_VERSION.to_string();
        let properties: &[(&str, &str)] = &[("version", &version)];

        let service_info = ServiceInfo::new(
            &service_type(identifier),
            name,
            &format!("{}.local.", host),
            "",
            port,
            properties,
        )
        .map_err(|e| DiscoveryError::Mdns(e.to_string()))?
        .enable_addr_auto();

        self.fullname = Some(service_info.get_fullname().to_string());

        self.mdns
            .register(service_info)
            .map_err(|e| DiscoveryError::Mdns(e.to_string()))?;

        info!("Advertising service {} on port {}", name, port);

        Ok(())
    }

    /// Withdraw the advertisement
    pub fn stop(&mut self) -> Result<()> {
        if let Some(fullname) = self.fullname.take() {
            self.mdns
                .unregister(&fullname)
                .map_err(|e| DiscoveryError::Mdns(e.to_string()))?;
        }
        Ok(())
    }
}

impl Drop for ServiceAdvertiser {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instance_name() {
        assert_eq!(
            instance_name("Living Room._padlink._tcp.local.", "_padlink._tcp.local."),
            "Living Room"
        );
        assert_eq!(instance_name("weird", "_padlink._tcp.local."), "weird");
    }
}
