//! Printer address resolution.
//!
//! Handles the formats callers pass as network printer addresses:
//! `IP`, `IP:PORT`, `hostname`, `hostname:PORT`. When the address carries
//! no port, the port from the [`ConnectionTarget`](crate::ConnectionTarget)
//! is used.

use std::net::{IpAddr, SocketAddr, ToSocketAddrs};

use crate::SessionError;

/// Default raw printing port (JetDirect / RAW).
pub const DEFAULT_PORT: u16 = 9100;

/// Resolve a printer address string to a `SocketAddr`.
///
/// Accepts these formats:
/// - `192.168.1.55:9100` -- IP with explicit port
/// - `192.168.1.55` -- IP without port (uses `default_port`)
/// - `printer01.local:9100` -- hostname with port
/// - `printer01.local` -- hostname without port (uses `default_port`)
///
/// Returns the first resolved address. For hostnames that resolve to
/// multiple addresses (dual-stack), the first result is used.
pub fn resolve_printer_addr(input: &str, default_port: u16) -> Result<SocketAddr, SessionError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(SessionError::InvalidAddress("address is empty".into()));
    }

    if let Ok(addr) = input.parse::<SocketAddr>() {
        return Ok(addr);
    }

    if let Ok(ip) = input.parse::<IpAddr>() {
        return Ok(SocketAddr::new(ip, default_port));
    }

    if let Ok(mut addrs) = input.to_socket_addrs()
        && let Some(addr) = addrs.next()
    {
        return Ok(addr);
    }

    if let Ok(mut addrs) = (input, default_port).to_socket_addrs()
        && let Some(addr) = addrs.next()
    {
        return Ok(addr);
    }

    Err(SessionError::NoAddressFound(input.to_string()))
}
