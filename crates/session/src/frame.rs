//! Response reader -- byte-level loop for printer query responses.
//!
//! Status queries are answered with a fixed number of raw bytes;
//! identification queries with one CR/LF-terminated line. Responses can
//! split across TCP segments, so the reader works byte-by-byte against a
//! wall-clock deadline.

use std::io::Read;
use std::time::{Duration, Instant};

use crate::SessionError;

/// Default maximum response size (1 KB). Guards against runaway reads from
/// a misbehaving printer.
pub(crate) const DEFAULT_MAX_RESPONSE: usize = 1024;

/// What a query response looks like on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expect {
    /// Exactly this many raw bytes.
    Bytes(usize),
    /// One line terminated by CR and/or LF (terminator not included).
    Line,
}

/// Read one response of the given shape from a stream.
///
/// # Arguments
///
/// * `stream` -- Any `Read` source (TCP stream, serial port, etc.)
/// * `expect` -- Response shape
/// * `timeout` -- Maximum wall-clock time to wait for the full response
/// * `max_len` -- Maximum response size (guard against runaway reads)
///
/// Leading CR/LF bytes are skipped for [`Expect::Line`]; bytes after the
/// response in the same read are discarded.
pub fn read_response(
    stream: &mut impl Read,
    expect: Expect,
    timeout: Duration,
    max_len: usize,
) -> Result<Vec<u8>, SessionError> {
    let deadline = deadline_after(timeout);

    let wanted = match expect {
        Expect::Bytes(n) if n > max_len => {
            return Err(SessionError::ResponseTooLarge {
                size: n,
                max: max_len,
            });
        }
        Expect::Bytes(0) => return Ok(Vec::new()),
        Expect::Bytes(n) => Some(n),
        Expect::Line => None,
    };

    let mut response: Vec<u8> = Vec::with_capacity(wanted.unwrap_or(64));
    let mut buf = [0u8; 256];

    loop {
        if Instant::now() >= deadline {
            return Err(SessionError::ReadTimeout);
        }

        let n = match stream.read(&mut buf) {
            Ok(0) => return Err(SessionError::ConnectionClosed),
            Ok(n) => n,
            Err(ref e)
                if e.kind() == std::io::ErrorKind::TimedOut
                    || e.kind() == std::io::ErrorKind::WouldBlock =>
            {
                if Instant::now() >= deadline {
                    return Err(SessionError::ReadTimeout);
                }
                std::thread::sleep(Duration::from_millis(1));
                continue;
            }
            Err(e) => return Err(SessionError::ReadFailed(e)),
        };

        for &byte in &buf[..n] {
            match wanted {
                Some(len) => {
                    response.push(byte);
                    if response.len() == len {
                        return Ok(response);
                    }
                }
                None => match byte {
                    b'\r' | b'\n' if response.is_empty() => {}
                    b'\r' | b'\n' => return Ok(response),
                    _ => {
                        if response.len() >= max_len {
                            return Err(SessionError::ResponseTooLarge {
                                size: response.len() + 1,
                                max: max_len,
                            });
                        }
                        response.push(byte);
                    }
                },
            }
        }
    }
}

/// Stand-in for deadlines that do not fit in an `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(30 * 365 * 86400);

/// `now + timeout`, clamped for timeouts too large to represent.
pub(crate) fn deadline_after(timeout: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(timeout)
        .or_else(|| now.checked_add(FAR_FUTURE))
        .unwrap_or(now)
}

/// Whole milliseconds of `d` for log fields, saturating at `u64::MAX`.
pub(crate) fn millis_u64(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

/// Bytes shown per hex dump; longer payloads are truncated.
const TRACE_LIMIT: usize = 256;

/// Emit a hex dump of `data` at trace level when `enabled`.
pub(crate) fn trace_bytes(enabled: bool, direction: &'static str, data: &[u8]) {
    if !enabled {
        return;
    }
    let shown = &data[..data.len().min(TRACE_LIMIT)];
    let mut hex = String::with_capacity(shown.len() * 3);
    for (i, byte) in shown.iter().enumerate() {
        if i > 0 {
            hex.push(' ');
        }
        hex.push_str(&format!("{byte:02x}"));
    }
    if data.len() > TRACE_LIMIT {
        hex.push_str(" ..");
    }
    tracing::trace!(direction, len = data.len(), bytes = %hex, "printer io");
}
