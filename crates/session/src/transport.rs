//! Connection lifecycle around one owned [`LabelDevice`].

use tracing::{debug, info, warn};

use crate::{ConnectionTarget, DeviceLabel, LabelDevice, SessionError};

/// Owns the device handle and the connected flag.
///
/// `connected == true` implies the device accepted the link and reported a
/// usable identifier. The flag is not refreshed by any heartbeat: a link the
/// printer dropped silently still reads as connected until the next
/// operation fails or the caller disconnects.
pub struct TransportSession {
    device: Box<dyn LabelDevice>,
    connected: bool,
    label: Option<DeviceLabel>,
}

impl TransportSession {
    /// Wrap a device. The session starts disconnected.
    pub fn new(device: Box<dyn LabelDevice>) -> Self {
        Self {
            device,
            connected: false,
            label: None,
        }
    }

    /// Connect to `target` and validate the identifier the device reports.
    ///
    /// An empty address fails with [`SessionError::Validation`] before the
    /// device is touched. An absent, blank, or failure-marked identifier
    /// fails with [`SessionError::Connect`]; the half-open link is closed
    /// again before returning.
    ///
    /// Connecting while already connected closes the previous link first.
    pub fn connect(&mut self, target: &ConnectionTarget) -> Result<DeviceLabel, SessionError> {
        target.validate()?;

        if self.connected {
            debug!("closing previous connection before reconnecting");
            self.disconnect()?;
        }

        info!(%target, "connecting");
        let raw = self.device.connect(target)?;
        match DeviceLabel::from_response(raw) {
            Ok(label) => {
                info!(printer = %label, "connected");
                self.connected = true;
                self.label = Some(label.clone());
                Ok(label)
            }
            Err(e) => {
                warn!(error = %e, "device rejected connection");
                if let Err(close_err) = self.device.disconnect() {
                    debug!(error = %close_err, "closing rejected link failed");
                }
                Err(e)
            }
        }
    }

    /// Close the connection.
    ///
    /// Returns `Ok(false)` when nothing was connected (soft success; the
    /// device is not touched), `Ok(true)` after closing a live link. The
    /// session is marked disconnected even if the device reports an error
    /// while closing.
    pub fn disconnect(&mut self) -> Result<bool, SessionError> {
        if !self.connected {
            debug!("disconnect on idle session");
            return Ok(false);
        }
        self.connected = false;
        self.label = None;
        self.device.disconnect()?;
        info!("disconnected");
        Ok(true)
    }

    /// Whether the session believes it is connected.
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Identifier reported by the currently connected device.
    pub fn label(&self) -> Option<&DeviceLabel> {
        self.label.as_ref()
    }

    /// Read the vendor status bytes.
    pub fn query_raw_status(&mut self, extended: bool) -> Result<Vec<u8>, SessionError> {
        if !self.connected {
            return Err(SessionError::NotConnected);
        }
        self.device.status(extended)
    }

    /// The device, for operations that require a live connection.
    pub(crate) fn device_mut(&mut self) -> Result<&mut dyn LabelDevice, SessionError> {
        if !self.connected {
            return Err(SessionError::NotConnected);
        }
        Ok(self.device.as_mut())
    }

    /// The device regardless of connection state (discovery does not need
    /// a link).
    pub(crate) fn device_unchecked(&mut self) -> &mut dyn LabelDevice {
        self.device.as_mut()
    }
}

impl Drop for TransportSession {
    fn drop(&mut self) {
        if self.connected {
            let _ = self.device.disconnect();
        }
    }
}

impl std::fmt::Debug for TransportSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportSession")
            .field("connected", &self.connected)
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DeviceEvent, DrawOp};
    use std::sync::mpsc::Sender;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[derive(Default)]
    struct Calls {
        connect: usize,
        disconnect: usize,
        status: usize,
    }

    struct FakeDevice {
        identifier: Option<String>,
        calls: Arc<Mutex<Calls>>,
    }

    impl LabelDevice for FakeDevice {
        fn connect(&mut self, _: &ConnectionTarget) -> Result<Option<String>, SessionError> {
            self.calls.lock().unwrap().connect += 1;
            Ok(self.identifier.clone())
        }
        fn disconnect(&mut self) -> Result<(), SessionError> {
            self.calls.lock().unwrap().disconnect += 1;
            Ok(())
        }
        fn clear_buffer(&mut self) -> Result<(), SessionError> {
            Ok(())
        }
        fn begin_transaction(&mut self) -> Result<(), SessionError> {
            Ok(())
        }
        fn draw(&mut self, _: &DrawOp) -> Result<i32, SessionError> {
            Ok(0)
        }
        fn end_transaction(&mut self) -> Result<i32, SessionError> {
            Ok(3)
        }
        fn print(&mut self, _: u32, _: u32) -> Result<(), SessionError> {
            Ok(())
        }
        fn status(&mut self, _: bool) -> Result<Vec<u8>, SessionError> {
            self.calls.lock().unwrap().status += 1;
            Ok(vec![0])
        }
        fn find_network_printers(
            &mut self,
            _: Duration,
            _: Sender<DeviceEvent>,
        ) -> Result<(), SessionError> {
            Ok(())
        }
    }

    fn session(identifier: Option<&str>) -> (TransportSession, Arc<Mutex<Calls>>) {
        let calls = Arc::new(Mutex::new(Calls::default()));
        let device = FakeDevice {
            identifier: identifier.map(str::to_string),
            calls: Arc::clone(&calls),
        };
        (TransportSession::new(Box::new(device)), calls)
    }

    #[test]
    fn empty_address_makes_no_device_call() {
        let (mut ts, calls) = session(Some("SRP-Q300"));
        let err = ts.connect(&ConnectionTarget::network("")).unwrap_err();
        assert!(matches!(err, SessionError::Validation(_)));
        assert_eq!(calls.lock().unwrap().connect, 0);
        assert!(!ts.is_connected());
    }

    #[test]
    fn failure_marker_is_connect_error_and_link_closed() {
        let (mut ts, calls) = session(Some("CONNECT FAIL"));
        let err = ts.connect(&ConnectionTarget::network("10.0.0.5")).unwrap_err();
        match err {
            SessionError::Connect { raw } => assert_eq!(raw.as_deref(), Some("CONNECT FAIL")),
            other => panic!("expected Connect, got {other:?}"),
        }
        assert!(!ts.is_connected());
        assert_eq!(calls.lock().unwrap().disconnect, 1);
    }

    #[test]
    fn connect_disconnect_round_trip() {
        let (mut ts, calls) = session(Some("SRP-Q300"));
        let label = ts.connect(&ConnectionTarget::network("10.0.0.5")).unwrap();
        assert_eq!(label.as_str(), "SRP-Q300");
        assert!(ts.is_connected());
        assert_eq!(ts.label().map(DeviceLabel::as_str), Some("SRP-Q300"));

        assert!(ts.disconnect().unwrap());
        assert!(!ts.is_connected());
        assert!(!ts.disconnect().unwrap());
        assert_eq!(calls.lock().unwrap().disconnect, 1);
    }

    #[test]
    fn status_requires_connection() {
        let (mut ts, calls) = session(Some("SRP-Q300"));
        assert!(matches!(
            ts.query_raw_status(false),
            Err(SessionError::NotConnected)
        ));
        assert_eq!(calls.lock().unwrap().status, 0);

        ts.connect(&ConnectionTarget::network("10.0.0.5")).unwrap();
        assert_eq!(ts.query_raw_status(false).unwrap(), vec![0]);
    }

    #[test]
    fn reconnect_closes_previous_link() {
        let (mut ts, calls) = session(Some("SRP-Q300"));
        ts.connect(&ConnectionTarget::network("10.0.0.5")).unwrap();
        ts.connect(&ConnectionTarget::network("10.0.0.6")).unwrap();
        let calls = calls.lock().unwrap();
        assert_eq!(calls.connect, 2);
        assert_eq!(calls.disconnect, 1);
    }

    #[test]
    fn drop_closes_live_link() {
        let (mut ts, calls) = session(Some("SRP-Q300"));
        ts.connect(&ConnectionTarget::network("10.0.0.5")).unwrap();
        drop(ts);
        assert_eq!(calls.lock().unwrap().disconnect, 1);
    }
}
