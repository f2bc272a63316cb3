//! TCP transport for label printers (port 9100 / RAW).
//!
//! Provides [`TcpTransport`], a synchronous TCP link that sends command
//! bytes and reads query responses on the same socket.

use std::io::{self, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::time::Duration;

use socket2::{SockRef, TcpKeepalive};
use tracing::debug;

use crate::addr::resolve_printer_addr;
use crate::frame::{DEFAULT_MAX_RESPONSE, Expect, millis_u64, read_response, trace_bytes};
use crate::{SessionConfig, SessionError, Transport};

/// A synchronous TCP connection to a label printer.
pub struct TcpTransport {
    stream: Option<TcpStream>,
    config: SessionConfig,
    addr: SocketAddr,
}

impl TcpTransport {
    /// Connect to a printer.
    ///
    /// `addr` can be `IP`, `IP:PORT`, `hostname`, or `hostname:PORT`; a
    /// missing port becomes `port`. The connect attempt is bounded by
    /// `connect_timeout`; the socket gets TCP_NODELAY, keepalive (60s), and
    /// the read/write timeouts from `config`.
    pub fn connect(
        addr: &str,
        port: u16,
        connect_timeout: Duration,
        config: SessionConfig,
    ) -> Result<Self, SessionError> {
        let socket_addr = resolve_printer_addr(addr, port)?;
        debug!(addr = %socket_addr, timeout_ms = millis_u64(connect_timeout), "opening tcp link");

        let stream = TcpStream::connect_timeout(&socket_addr, connect_timeout).map_err(|e| {
            match e.kind() {
                io::ErrorKind::ConnectionRefused => SessionError::ConnectionRefused {
                    addr: socket_addr.to_string(),
                    source: e,
                },
                io::ErrorKind::TimedOut => SessionError::ConnectionTimeout {
                    addr: socket_addr.to_string(),
                    timeout: connect_timeout,
                    source: e,
                },
                _ => SessionError::ConnectionFailed {
                    addr: socket_addr.to_string(),
                    source: e,
                },
            }
        })?;

        configure_stream(&stream, &socket_addr, &config)?;

        Ok(Self {
            stream: Some(stream),
            config,
            addr: socket_addr,
        })
    }

    /// Return the resolved socket address this transport is connected to.
    pub fn remote_addr(&self) -> SocketAddr {
        self.addr
    }

    fn stream(&mut self) -> Result<&mut TcpStream, SessionError> {
        self.stream.as_mut().ok_or(SessionError::NotConnected)
    }
}

impl Transport for TcpTransport {
    fn send_raw(&mut self, data: &[u8]) -> Result<(), SessionError> {
        trace_bytes(self.config.trace_io, "tx", data);
        let stream = self.stream()?;
        stream.write_all(data).map_err(SessionError::WriteFailed)?;
        stream.flush().map_err(SessionError::WriteFailed)?;
        Ok(())
    }

    fn query(&mut self, cmd: &[u8], expect: Expect) -> Result<Vec<u8>, SessionError> {
        self.send_raw(cmd)?;
        let timeout = self.config.timeouts.read;
        let trace = self.config.trace_io;
        let response = read_response(self.stream()?, expect, timeout, DEFAULT_MAX_RESPONSE)?;
        trace_bytes(trace, "rx", &response);
        Ok(response)
    }

    fn close(&mut self) -> Result<(), SessionError> {
        if let Some(stream) = self.stream.take() {
            debug!(addr = %self.addr, "closing tcp link");
            // The peer may already be gone.
            let _ = stream.shutdown(Shutdown::Both);
        }
        Ok(())
    }
}

impl Drop for TcpTransport {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

// ── Helpers ────────────────────────────────────────────────────────────

/// Configure TCP_NODELAY, keepalive, and read/write timeouts on a stream.
fn configure_stream(
    stream: &TcpStream,
    addr: &SocketAddr,
    config: &SessionConfig,
) -> Result<(), SessionError> {
    let failed = |e: io::Error| SessionError::ConnectionFailed {
        addr: addr.to_string(),
        source: e,
    };

    // Commands are small and latency-sensitive.
    stream.set_nodelay(true).map_err(failed)?;
    configure_keepalive(stream, Duration::from_secs(60)).map_err(failed)?;
    stream
        .set_write_timeout(Some(config.timeouts.write))
        .map_err(failed)?;
    stream
        .set_read_timeout(Some(config.timeouts.read))
        .map_err(failed)?;
    Ok(())
}

/// Configure TCP keepalive on a `TcpStream` via `socket2`.
fn configure_keepalive(stream: &TcpStream, interval: Duration) -> io::Result<()> {
    let keepalive = TcpKeepalive::new().with_time(interval);

    #[cfg(any(target_os = "linux", target_os = "macos"))]
    let keepalive = keepalive.with_interval(interval);

    SockRef::from(stream).set_tcp_keepalive(&keepalive)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write as _};
    use std::net::TcpListener;
    use std::thread;

    #[test]
    fn query_round_trip_over_loopback() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = thread::spawn(move || {
            let (mut conn, _) = listener.accept().unwrap();
            let mut buf = [0u8; 64];
            let n = conn.read(&mut buf).unwrap();
            conn.write_all(b"SRP-Q300\r\n").unwrap();
            buf[..n].to_vec()
        });

        let mut link = TcpTransport::connect(
            "127.0.0.1",
            port,
            Duration::from_secs(2),
            SessionConfig::default(),
        )
        .unwrap();
        assert_eq!(link.remote_addr().port(), port);
        let reply = link.query(crate::codec::IDENTIFY, Expect::Line).unwrap();
        assert_eq!(reply, b"SRP-Q300");
        assert_eq!(server.join().unwrap(), crate::codec::IDENTIFY);

        link.close().unwrap();
        assert!(matches!(
            link.send_raw(b"x"),
            Err(SessionError::NotConnected)
        ));
        link.close().unwrap();
    }

    #[test]
    fn refused_connection_is_typed() {
        // Bind then drop to get a port with nothing listening.
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let result = TcpTransport::connect(
            "127.0.0.1",
            port,
            Duration::from_secs(2),
            SessionConfig::default(),
        );
        match result {
            Err(e) => assert_eq!(e.category(), crate::ErrorCategory::Connect),
            Ok(_) => panic!("expected connection error"),
        }
    }
}
