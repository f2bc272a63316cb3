//! Bounded network discovery.
//!
//! A scan is handed to the device together with a fresh notification
//! channel. Two threads then race to resolve the request:
//!
//! - the listener, which forwards the device's `NetworkDeviceSet` event;
//! - the timer, which fires `timeout + grace` after the scan started.
//!
//! Both go through one [`ResultSlot`], so exactly one outcome reaches the
//! caller no matter which side arrives first. The loser is a no-op.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::frame::{deadline_after, millis_u64};
use crate::{DeviceEvent, DiscoveryConfig, LabelDevice, SessionError};

/// How a discovery request ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryOutcome {
    /// The device reported a (possibly empty) device set.
    Completed(Vec<String>),
    /// The device stayed silent until the deadline.
    TimedOut,
}

impl DiscoveryOutcome {
    /// Devices found. Empty for [`DiscoveryOutcome::TimedOut`].
    pub fn devices(&self) -> &[String] {
        match self {
            DiscoveryOutcome::Completed(devices) => devices,
            DiscoveryOutcome::TimedOut => &[],
        }
    }

    /// Consume the outcome, returning the device list.
    pub fn into_devices(self) -> Vec<String> {
        match self {
            DiscoveryOutcome::Completed(devices) => devices,
            DiscoveryOutcome::TimedOut => Vec::new(),
        }
    }

    /// Whether the request ended by timeout.
    pub fn timed_out(&self) -> bool {
        matches!(self, DiscoveryOutcome::TimedOut)
    }
}

/// Single-assignment cell: the first `resolve` wins, later ones are no-ops.
///
/// Holds the caller's result sender and the timer's cancel sender; both are
/// taken together under the lock.
struct ResultSlot {
    inner: Mutex<Option<(Sender<DiscoveryOutcome>, Sender<()>)>>,
}

impl ResultSlot {
    fn new(result: Sender<DiscoveryOutcome>, cancel: Sender<()>) -> Self {
        Self {
            inner: Mutex::new(Some((result, cancel))),
        }
    }

    /// Deliver `outcome` if nothing was delivered yet. Returns whether this
    /// call won.
    fn resolve(&self, outcome: DiscoveryOutcome) -> bool {
        let taken = self
            .inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some((result, cancel)) = taken else {
            return false;
        };
        // The caller may have dropped its handle; the request is still
        // resolved.
        let _ = result.send(outcome);
        let _ = cancel.send(());
        true
    }

    fn is_resolved(&self) -> bool {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }
}

/// Caller's side of a pending discovery.
#[derive(Debug)]
pub struct DiscoveryHandle {
    rx: Receiver<DiscoveryOutcome>,
    deadline: Instant,
}

impl DiscoveryHandle {
    /// Block until the request resolves. Returns no later than the
    /// deadline (`timeout + grace` after the scan started).
    pub fn wait(self) -> DiscoveryOutcome {
        self.rx.recv().unwrap_or(DiscoveryOutcome::TimedOut)
    }

    /// Block for at most `timeout`. `None` if still unresolved.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<DiscoveryOutcome> {
        self.rx.recv_timeout(timeout).ok()
    }

    /// The outcome, if already resolved.
    pub fn try_outcome(&self) -> Option<DiscoveryOutcome> {
        self.rx.try_recv().ok()
    }

    /// Instant by which the request is guaranteed to resolve.
    pub fn deadline(&self) -> Instant {
        self.deadline
    }
}

/// Runs at most one discovery request at a time.
#[derive(Default)]
pub struct DiscoveryCoordinator {
    config: DiscoveryConfig,
    pending: Option<Arc<ResultSlot>>,
}

impl DiscoveryCoordinator {
    /// Coordinator with the given default timeout and grace period.
    pub fn new(config: DiscoveryConfig) -> Self {
        Self {
            config,
            pending: None,
        }
    }

    /// Scan duration used when the caller does not supply one.
    pub fn default_timeout(&self) -> Duration {
        self.config.default_timeout
    }

    /// Whether a request is still waiting for its outcome.
    pub fn is_scanning(&self) -> bool {
        self.pending
            .as_ref()
            .is_some_and(|slot| !slot.is_resolved())
    }

    /// Start a scan lasting `timeout` on `device`.
    ///
    /// Fails with [`SessionError::DiscoveryInProgress`] while a previous
    /// request is unresolved, and with [`SessionError::Discovery`] when the
    /// device cannot start the scan. A device that never reports yields
    /// [`DiscoveryOutcome::TimedOut`], never an error.
    pub fn begin(
        &mut self,
        device: &mut dyn LabelDevice,
        timeout: Duration,
    ) -> Result<DiscoveryHandle, SessionError> {
        if self.is_scanning() {
            return Err(SessionError::DiscoveryInProgress);
        }
        self.pending = None;

        let wait = self.config.deadline_for(timeout);
        let deadline = deadline_after(wait);

        let (result_tx, result_rx) = mpsc::channel();
        let (cancel_tx, cancel_rx) = mpsc::channel();
        let (notify_tx, notify_rx) = mpsc::channel();
        let slot = Arc::new(ResultSlot::new(result_tx, cancel_tx));

        debug!(timeout_ms = millis_u64(timeout), "starting network scan");
        device
            .find_network_printers(timeout, notify_tx)
            .map_err(|e| match e {
                SessionError::Discovery(_) => e,
                other => SessionError::Discovery(other.to_string()),
            })?;

        spawn_listener(Arc::clone(&slot), notify_rx, wait)?;
        spawn_timer(Arc::clone(&slot), cancel_rx, wait)?;

        self.pending = Some(slot);
        Ok(DiscoveryHandle {
            rx: result_rx,
            deadline,
        })
    }
}

impl std::fmt::Debug for DiscoveryCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscoveryCoordinator")
            .field("config", &self.config)
            .field("scanning", &self.is_scanning())
            .finish()
    }
}

fn spawn_listener(
    slot: Arc<ResultSlot>,
    notify: Receiver<DeviceEvent>,
    wait: Duration,
) -> Result<(), SessionError> {
    thread::Builder::new()
        .name("labelprint-discovery".into())
        .spawn(move || match notify.recv_timeout(wait) {
            Ok(DeviceEvent::NetworkDeviceSet(set)) => {
                let devices: Vec<String> = set.map(|s| s.into_iter().collect()).unwrap_or_default();
                let count = devices.len();
                if slot.resolve(DiscoveryOutcome::Completed(devices)) {
                    info!(count, "network scan completed");
                } else {
                    debug!("device set arrived after timeout, ignored");
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                debug!("device closed notification channel without reporting");
            }
        })
        .map(drop)
        .map_err(|e| SessionError::Discovery(format!("cannot start listener: {e}")))
}

fn spawn_timer(
    slot: Arc<ResultSlot>,
    cancel: Receiver<()>,
    wait: Duration,
) -> Result<(), SessionError> {
    thread::Builder::new()
        .name("labelprint-discovery-timer".into())
        .spawn(move || match cancel.recv_timeout(wait) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {}
            Err(RecvTimeoutError::Timeout) => {
                if slot.resolve(DiscoveryOutcome::TimedOut) {
                    info!("network scan timed out with no report");
                }
            }
        })
        .map(drop)
        .map_err(|e| SessionError::Discovery(format!("cannot start timer: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_resolves_once() {
        let (result_tx, result_rx) = mpsc::channel();
        let (cancel_tx, cancel_rx) = mpsc::channel();
        let slot = ResultSlot::new(result_tx, cancel_tx);

        assert!(!slot.is_resolved());
        assert!(slot.resolve(DiscoveryOutcome::Completed(vec!["10.0.0.5".into()])));
        assert!(!slot.resolve(DiscoveryOutcome::TimedOut));
        assert!(slot.is_resolved());

        assert_eq!(
            result_rx.recv().unwrap(),
            DiscoveryOutcome::Completed(vec!["10.0.0.5".into()])
        );
        assert!(result_rx.recv().is_err());
        assert!(cancel_rx.recv().is_ok());
    }

    #[test]
    fn resolve_tolerates_dropped_handle() {
        let (result_tx, result_rx) = mpsc::channel();
        let (cancel_tx, _cancel_rx) = mpsc::channel();
        let slot = ResultSlot::new(result_tx, cancel_tx);
        drop(result_rx);
        assert!(slot.resolve(DiscoveryOutcome::TimedOut));
    }

    #[test]
    fn outcome_accessors() {
        let done = DiscoveryOutcome::Completed(vec!["a".into(), "b".into()]);
        assert_eq!(done.devices().len(), 2);
        assert!(!done.timed_out());
        assert!(DiscoveryOutcome::TimedOut.devices().is_empty());
        assert!(DiscoveryOutcome::TimedOut.timed_out());
        assert!(DiscoveryOutcome::TimedOut.into_devices().is_empty());
    }
}
