//! mDNS scan for raw-port printers on the local network.
//!
//! Browses `_pdl-datastream._tcp.local.` (the service type label printers
//! advertise for their raw 9100 port) with the `mdns-sd` crate and reports
//! the resolved addresses once, when the scan window closes.

use std::collections::BTreeSet;
use std::net::IpAddr;
use std::sync::mpsc::Sender;
use std::time::{Duration, Instant};

use mdns_sd::{ServiceDaemon, ServiceEvent};
use tracing::{debug, info, warn};

use crate::frame::deadline_after;
use crate::{DEFAULT_PORT, DeviceEvent, SessionError};

/// mDNS service type for raw page-description-language printers.
pub const PDL_SERVICE_TYPE: &str = "_pdl-datastream._tcp.local.";

/// Longest single wait on the browse channel.
const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Start a background scan lasting `timeout`.
///
/// Returns once browsing has started. The result is sent on `notify` when
/// the window closes: `None` if nothing resolved.
pub(crate) fn spawn_scan(timeout: Duration, notify: Sender<DeviceEvent>) -> Result<(), SessionError> {
    let daemon = ServiceDaemon::new()
        .map_err(|e| SessionError::Discovery(format!("failed to start mDNS daemon: {e}")))?;
    let receiver = daemon
        .browse(PDL_SERVICE_TYPE)
        .map_err(|e| SessionError::Discovery(format!("browse {PDL_SERVICE_TYPE}: {e}")))?;

    std::thread::Builder::new()
        .name("labelprint-mdns".into())
        .spawn(move || {
            let deadline = deadline_after(timeout);
            let mut found = BTreeSet::new();

            loop {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    break;
                }
                match receiver.recv_timeout(remaining.min(POLL_INTERVAL)) {
                    Ok(ServiceEvent::ServiceResolved(info)) => {
                        match service_address(info.get_addresses().iter().copied(), info.get_port())
                        {
                            Some(addr) => {
                                debug!(name = %info.get_fullname(), %addr, "printer resolved");
                                found.insert(addr);
                            }
                            None => {
                                warn!(name = %info.get_fullname(), "resolved service has no address");
                            }
                        }
                    }
                    Ok(ServiceEvent::SearchStopped(_)) => break,
                    Ok(_) => {}
                    Err(e) if receiver.is_disconnected() => {
                        debug!(error = %e, "browse channel closed");
                        break;
                    }
                    Err(_) => {}
                }
            }

            if let Err(e) = daemon.stop_browse(PDL_SERVICE_TYPE) {
                debug!(error = %e, "stop browse failed");
            }
            if let Err(e) = daemon.shutdown() {
                debug!(error = %e, "mDNS daemon shutdown failed");
            }

            info!(count = found.len(), "mDNS scan finished");
            let set = if found.is_empty() { None } else { Some(found) };
            // The coordinator may already have timed out and gone away.
            let _ = notify.send(DeviceEvent::NetworkDeviceSet(set));
        })
        .map(drop)
        .map_err(|e| SessionError::Discovery(format!("cannot start mDNS scan: {e}")))
}

/// Connectable address for a resolved service. IPv4 is preferred; the port
/// is omitted when it is the default raw port.
fn service_address(addresses: impl IntoIterator<Item = IpAddr>, port: u16) -> Option<String> {
    let mut v6 = None;
    let mut chosen = None;
    for ip in addresses {
        if ip.is_ipv4() {
            chosen = Some(ip);
            break;
        }
        v6.get_or_insert(ip);
    }
    let ip = chosen.or(v6)?;
    Some(match (ip, port) {
        (ip, DEFAULT_PORT) => ip.to_string(),
        (IpAddr::V4(ip), port) => format!("{ip}:{port}"),
        (IpAddr::V6(ip), port) => format!("[{ip}]:{port}"),
    })
}
