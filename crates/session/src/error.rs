//! Typed error types for the printer session.

use std::fmt;
use std::io;
use std::time::Duration;

/// Session error conditions, categorized by type.
///
/// Each variant carries enough context (raw device response, protocol code,
/// or underlying I/O error) for the caller to diagnose the failure.
/// Use [`SessionError::category()`] to map a variant onto the coarse error
/// taxonomy, and [`SessionError::is_retryable()`] to classify transient
/// failures. The session itself never retries.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    // -- Validation --
    /// Required input was empty or missing. Raised before any device call.
    #[error("invalid input: {0}")]
    Validation(String),

    // -- Connection --
    /// The device answered the connect attempt with no identifier, an empty
    /// identifier, or one containing a failure marker.
    #[error("connection failed: {}", raw.as_deref().unwrap_or("no response"))]
    Connect {
        /// The raw identifier string reported by the device, if any.
        raw: Option<String>,
    },

    /// The printer actively refused the connection (e.g. port not open).
    #[error("connection refused: {addr}")]
    ConnectionRefused {
        /// The address that was attempted.
        addr: String,
        /// The underlying OS error.
        #[source]
        source: io::Error,
    },

    /// TCP connect timed out before the printer responded.
    #[error("connection timed out: {addr} ({timeout:?})")]
    ConnectionTimeout {
        /// The address that was attempted.
        addr: String,
        /// The configured timeout that elapsed.
        timeout: Duration,
        /// The underlying OS error.
        #[source]
        source: io::Error,
    },

    /// Connection failed for a reason other than refusal or timeout.
    #[error("connection failed: {addr}")]
    ConnectionFailed {
        /// The address that was attempted.
        addr: String,
        /// The underlying OS error.
        #[source]
        source: io::Error,
    },

    /// The printer closed the connection unexpectedly.
    #[error("connection closed by printer")]
    ConnectionClosed,

    // -- Address --
    /// The provided address string could not be parsed.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// DNS resolution found no addresses for the given hostname.
    #[error("no address found for hostname: {0}")]
    NoAddressFound(String),

    // -- Transport state --
    /// An operation that needs a live connection was attempted while
    /// the session is disconnected.
    #[error("printer is not connected")]
    NotConnected,

    // -- Device protocol --
    /// A draw command was rejected by the device.
    #[error("draw failed: device code {code}")]
    Draw {
        /// Protocol code returned by the draw call.
        code: i32,
    },

    /// The end-of-transaction call returned something other than the
    /// success code.
    #[error("transaction failed: device code {code}")]
    Transaction {
        /// Protocol code returned by the end-transaction call.
        code: i32,
    },

    // -- I/O --
    /// Writing data to the printer failed.
    #[error("write failed: {0}")]
    WriteFailed(#[source] io::Error),

    /// Reading data from the printer failed.
    #[error("read failed: {0}")]
    ReadFailed(#[source] io::Error),

    /// The printer did not respond within the read timeout.
    #[error("read timed out waiting for response")]
    ReadTimeout,

    /// A status response exceeded the maximum allowed size.
    #[error("response too large ({size} bytes, max {max})")]
    ResponseTooLarge {
        /// Actual size of the oversized response in bytes.
        size: usize,
        /// Configured maximum response size in bytes.
        max: usize,
    },

    /// The raster source could not be read or rendered.
    #[error("raster source unreadable: {0}")]
    RasterSource(String),

    /// A serial port transport error occurred.
    #[error("serial port error: {0}")]
    SerialError(String),

    // -- Discovery --
    /// The network scan could not be started or its collaborator failed.
    #[error("discovery failed: {0}")]
    Discovery(String),

    /// A discovery request is already outstanding on this session.
    #[error("a discovery request is already in progress")]
    DiscoveryInProgress,

    // -- Configuration --
    /// An invalid configuration was provided.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Coarse error taxonomy shared with callers across the capability boundary.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ErrorCategory {
    /// Empty or missing input; no device call was made.
    Validation,
    /// Device unreachable, rejected, or ambiguous identifier.
    Connect,
    /// Not connected when the operation required a connection.
    Transport,
    /// Protocol-level draw failure.
    Draw,
    /// Non-success end-transaction code.
    Transaction,
    /// Underlying collaborator or transport failure.
    Io,
    /// Discovery could not be started or is already running.
    Discovery,
}

impl SessionError {
    /// Map this error onto the coarse [`ErrorCategory`] taxonomy.
    pub fn category(&self) -> ErrorCategory {
        match self {
            SessionError::Validation(_)
            | SessionError::InvalidAddress(_)
            | SessionError::InvalidConfig(_) => ErrorCategory::Validation,
            SessionError::Connect { .. }
            | SessionError::ConnectionRefused { .. }
            | SessionError::ConnectionTimeout { .. }
            | SessionError::ConnectionFailed { .. }
            | SessionError::NoAddressFound(_)
            | SessionError::SerialError(_) => ErrorCategory::Connect,
            SessionError::NotConnected => ErrorCategory::Transport,
            SessionError::Draw { .. } => ErrorCategory::Draw,
            SessionError::Transaction { .. } => ErrorCategory::Transaction,
            SessionError::ConnectionClosed
            | SessionError::WriteFailed(_)
            | SessionError::ReadFailed(_)
            | SessionError::ReadTimeout
            | SessionError::ResponseTooLarge { .. }
            | SessionError::RasterSource(_) => ErrorCategory::Io,
            SessionError::Discovery(_) | SessionError::DiscoveryInProgress => {
                ErrorCategory::Discovery
            }
        }
    }

    /// Returns `true` if this error is transient and worth retrying by the
    /// caller.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SessionError::ConnectionTimeout { .. }
                | SessionError::ConnectionClosed
                | SessionError::WriteFailed(_)
                | SessionError::ReadFailed(_)
                | SessionError::ReadTimeout
                | SessionError::DiscoveryInProgress
        )
    }

    /// The protocol code carried by draw/transaction failures.
    pub fn device_code(&self) -> Option<i32> {
        match self {
            SessionError::Draw { code } | SessionError::Transaction { code } => Some(*code),
            _ => None,
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Validation => write!(f, "validation"),
            ErrorCategory::Connect => write!(f, "connect"),
            ErrorCategory::Transport => write!(f, "transport"),
            ErrorCategory::Draw => write!(f, "draw"),
            ErrorCategory::Transaction => write!(f, "transaction"),
            ErrorCategory::Io => write!(f, "io"),
            ErrorCategory::Discovery => write!(f, "discovery"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_errors() {
        assert!(
            SessionError::ConnectionTimeout {
                addr: "x".into(),
                timeout: Duration::from_secs(1),
                source: io::Error::new(io::ErrorKind::TimedOut, "test"),
            }
            .is_retryable()
        );
        assert!(SessionError::ConnectionClosed.is_retryable());
        assert!(
            SessionError::WriteFailed(io::Error::new(io::ErrorKind::BrokenPipe, "test"))
                .is_retryable()
        );
        assert!(SessionError::ReadFailed(io::Error::other("test")).is_retryable());
        assert!(SessionError::ReadTimeout.is_retryable());
        assert!(SessionError::DiscoveryInProgress.is_retryable());
    }

    #[test]
    fn non_retryable_errors() {
        assert!(!SessionError::Validation("empty".into()).is_retryable());
        assert!(!SessionError::Connect { raw: None }.is_retryable());
        assert!(!SessionError::NotConnected.is_retryable());
        assert!(!SessionError::Draw { code: -1 }.is_retryable());
        assert!(!SessionError::Transaction { code: 1 }.is_retryable());
        assert!(!SessionError::RasterSource("x".into()).is_retryable());
        assert!(!SessionError::InvalidConfig("x".into()).is_retryable());
    }

    #[test]
    fn categories_follow_taxonomy() {
        assert_eq!(
            SessionError::Validation("x".into()).category(),
            ErrorCategory::Validation
        );
        assert_eq!(
            SessionError::Connect {
                raw: Some("ERROR".into())
            }
            .category(),
            ErrorCategory::Connect
        );
        assert_eq!(
            SessionError::NotConnected.category(),
            ErrorCategory::Transport
        );
        assert_eq!(
            SessionError::Draw { code: 2 }.category(),
            ErrorCategory::Draw
        );
        assert_eq!(
            SessionError::Transaction { code: 0 }.category(),
            ErrorCategory::Transaction
        );
        assert_eq!(
            SessionError::RasterSource("x".into()).category(),
            ErrorCategory::Io
        );
        assert_eq!(
            SessionError::DiscoveryInProgress.category(),
            ErrorCategory::Discovery
        );
    }

    #[test]
    fn connect_error_message_carries_raw_response() {
        let err = SessionError::Connect {
            raw: Some("CONNECT FAIL".into()),
        };
        assert_eq!(err.to_string(), "connection failed: CONNECT FAIL");

        let err = SessionError::Connect { raw: None };
        assert_eq!(err.to_string(), "connection failed: no response");
    }

    #[test]
    fn device_code_only_for_protocol_errors() {
        assert_eq!(SessionError::Draw { code: 7 }.device_code(), Some(7));
        assert_eq!(SessionError::Transaction { code: 1 }.device_code(), Some(1));
        assert_eq!(SessionError::NotConnected.device_code(), None);
    }
}
