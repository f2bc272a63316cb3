//! Connection targets and device identification.

use std::fmt;
use std::time::Duration;

use crate::SessionError;
use crate::addr::DEFAULT_PORT;

/// Default connect timeout for network targets.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_millis(5000);

/// Substrings that mark an identifier response as a failed connection.
const FAILURE_MARKERS: [&str; 2] = ["FAIL", "ERROR"];

/// How the printer is attached.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ConnectionKind {
    /// TCP connection to `address:port`.
    Network,
    /// Device-path open (`/dev/ttyUSB0`, `COM3`, Bluetooth SPP node).
    Serial,
}

/// Where and how to connect. Immutable once handed to `connect`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionTarget {
    kind: ConnectionKind,
    address: String,
    port: u16,
    timeout: Duration,
}

impl ConnectionTarget {
    /// A network target on the default raw port (9100) with a 5s timeout.
    pub fn network(address: impl Into<String>) -> Self {
        Self {
            kind: ConnectionKind::Network,
            address: address.into(),
            port: DEFAULT_PORT,
            timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// A serial target. Serial opens have no explicit connect timeout.
    pub fn serial(path: impl Into<String>) -> Self {
        Self {
            kind: ConnectionKind::Serial,
            address: path.into(),
            port: 0,
            timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Override the TCP port. Ignored for serial targets.
    pub fn with_port(mut self, port: u16) -> Self {
        if self.kind == ConnectionKind::Network {
            self.port = port;
        }
        self
    }

    /// Override the connect timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Connection kind.
    pub fn kind(&self) -> ConnectionKind {
        self.kind
    }

    /// Host, IP address, or device path.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// TCP port (network targets only).
    pub fn port(&self) -> Option<u16> {
        match self.kind {
            ConnectionKind::Network => Some(self.port),
            ConnectionKind::Serial => None,
        }
    }

    /// Connect timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Reject targets that cannot be attempted at all.
    pub(crate) fn validate(&self) -> Result<(), SessionError> {
        if self.address.trim().is_empty() {
            return Err(SessionError::Validation(
                "address cannot be empty".to_string(),
            ));
        }
        if self.kind == ConnectionKind::Network && self.port == 0 {
            return Err(SessionError::Validation("port cannot be 0".to_string()));
        }
        Ok(())
    }
}

impl fmt::Display for ConnectionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ConnectionKind::Network => write!(f, "{}:{}", self.address, self.port),
            ConnectionKind::Serial => write!(f, "{}", self.address),
        }
    }
}

/// Identifier the device reported on a successful connect (its model name).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct DeviceLabel(String);

impl DeviceLabel {
    /// Validate a raw identifier response.
    ///
    /// Succeeds only for a non-blank string containing none of the failure
    /// markers. Every other outcome becomes [`SessionError::Connect`] with the
    /// raw response attached.
    pub fn from_response(raw: Option<String>) -> Result<Self, SessionError> {
        match raw {
            Some(id)
                if !id.trim().is_empty()
                    && !FAILURE_MARKERS.iter().any(|marker| id.contains(marker)) =>
            {
                Ok(DeviceLabel(id))
            }
            other => Err(SessionError::Connect { raw: other }),
        }
    }

    /// The identifier as reported by the device.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn network_defaults() {
        let target = ConnectionTarget::network("192.0.2.10");
        assert_eq!(target.kind(), ConnectionKind::Network);
        assert_eq!(target.port(), Some(9100));
        assert_eq!(target.timeout(), Duration::from_millis(5000));
        assert_eq!(target.to_string(), "192.0.2.10:9100");
    }

    #[test]
    fn serial_has_no_port() {
        let target = ConnectionTarget::serial("/dev/ttyUSB0").with_port(9100);
        assert_eq!(target.port(), None);
        assert_eq!(target.to_string(), "/dev/ttyUSB0");
    }

    #[test]
    fn empty_address_fails_validation() {
        for addr in ["", "   "] {
            match ConnectionTarget::network(addr).validate().unwrap_err() {
                SessionError::Validation(_) => {}
                other => panic!("expected Validation, got {other:?}"),
            }
        }
        assert!(ConnectionTarget::serial("").validate().is_err());
    }

    #[test]
    fn zero_port_fails_validation() {
        let target = ConnectionTarget::network("192.0.2.10").with_port(0);
        assert!(matches!(
            target.validate(),
            Err(SessionError::Validation(_))
        ));
    }

    #[test]
    fn identifier_accepted() {
        let label = DeviceLabel::from_response(Some("SRP-Q300".into())).unwrap();
        assert_eq!(label.as_str(), "SRP-Q300");
    }

    #[test]
    fn identifier_rejections_keep_raw_response() {
        let cases: [Option<&str>; 5] = [
            None,
            Some(""),
            Some("   "),
            Some("CONNECT FAIL"),
            Some("ERROR: timeout"),
        ];
        for raw in cases {
            match DeviceLabel::from_response(raw.map(String::from)).unwrap_err() {
                SessionError::Connect { raw: got } => assert_eq!(got.as_deref(), raw),
                other => panic!("expected Connect, got {other:?}"),
            }
        }
    }
}
