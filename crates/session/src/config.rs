//! Configuration types for the printer session.

use std::time::Duration;

/// Complete session configuration: transport timeouts + discovery settings.
#[non_exhaustive]
#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    /// Network/transport timeout settings.
    pub timeouts: DeviceTimeouts,
    /// Network discovery settings.
    pub discovery: DiscoveryConfig,
    /// Enable transport-level byte tracing for diagnostics.
    ///
    /// When enabled, transports emit hex dumps of every exchange at
    /// `trace` level.
    pub trace_io: bool,
}

/// Timeout settings for printer transports.
///
/// Defaults are tuned for LAN-connected label printers:
/// - `connect`: 5s (matches the plugin's default connect timeout)
/// - `write`: 30s (raster pages can be several hundred KB)
/// - `read`: 10s (status can be delayed while the printer is mid-print)
#[non_exhaustive]
#[derive(Debug, Clone)]
pub struct DeviceTimeouts {
    /// Maximum time to wait for a TCP connection to establish.
    pub connect: Duration,
    /// Maximum time to wait for a write to complete.
    pub write: Duration,
    /// Maximum time to wait for a response after sending a query command.
    pub read: Duration,
}

impl Default for DeviceTimeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(5),
            write: Duration::from_secs(30),
            read: Duration::from_secs(10),
        }
    }
}

/// Settings for bounded network discovery.
#[non_exhaustive]
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// Scan duration used when the caller does not supply one.
    pub default_timeout: Duration,
    /// Extra time the fallback timer waits beyond the scan timeout, so the
    /// collaborator's own timeout normally reports first.
    pub grace: Duration,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            default_timeout: Duration::from_millis(5000),
            grace: Duration::from_millis(1000),
        }
    }
}

impl DiscoveryConfig {
    /// Total time a pending discovery may stay unresolved.
    pub fn deadline_for(&self, timeout: Duration) -> Duration {
        timeout.saturating_add(self.grace)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_plugin_defaults() {
        let cfg = SessionConfig::default();
        assert_eq!(cfg.timeouts.connect, Duration::from_millis(5000));
        assert_eq!(cfg.discovery.default_timeout, Duration::from_millis(5000));
        assert_eq!(cfg.discovery.grace, Duration::from_millis(1000));
        assert!(!cfg.trace_io);
    }

    #[test]
    fn deadline_adds_grace_and_saturates() {
        let cfg = DiscoveryConfig::default();
        assert_eq!(
            cfg.deadline_for(Duration::from_millis(2000)),
            Duration::from_millis(3000)
        );
        assert_eq!(cfg.deadline_for(Duration::MAX), Duration::MAX);
    }
}
