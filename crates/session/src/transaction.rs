//! The print transaction: clear, begin, draw, end, print.

use tracing::{debug, warn};

use crate::{
    DRAW_OK, DrawOp, END_TRANSACTION_OK, LabelDevice, SessionError, TransportSession,
};

/// One draw op committed to paper.
///
/// Every failure after the initial buffer clear clears the buffer again,
/// exactly once, before the error is returned, so a half-composed label
/// never leaks into the next transaction.
#[derive(Debug)]
pub struct PrintTransaction<'a> {
    op: &'a DrawOp,
    copies: u32,
    sets: u32,
}

impl<'a> PrintTransaction<'a> {
    /// A transaction printing one copy of one set.
    pub fn new(op: &'a DrawOp) -> Self {
        Self {
            op,
            copies: 1,
            sets: 1,
        }
    }

    /// Run the transaction against a connected session.
    ///
    /// Fails with [`SessionError::Validation`] for an empty payload and
    /// [`SessionError::NotConnected`] for an idle session, in both cases
    /// before any device call.
    pub fn run(self, transport: &mut TransportSession) -> Result<(), SessionError> {
        if self.op.payload_is_empty() {
            return Err(SessionError::Validation(format!(
                "{} payload cannot be empty",
                self.op.kind()
            )));
        }
        let device = transport.device_mut()?;

        device.clear_buffer()?;
        if let Err(e) = self.commit(device) {
            warn!(op = self.op.kind(), error = %e, "transaction failed, clearing buffer");
            if let Err(clear_err) = device.clear_buffer() {
                warn!(error = %clear_err, "buffer clear after failure also failed");
            }
            return Err(e);
        }
        debug!(op = self.op.kind(), "printed");
        Ok(())
    }

    /// begin → draw → end → print, mapping protocol codes to errors.
    fn commit(&self, device: &mut dyn LabelDevice) -> Result<(), SessionError> {
        device.begin_transaction()?;

        let code = device.draw(self.op)?;
        if code != DRAW_OK {
            return Err(SessionError::Draw { code });
        }

        let code = device.end_transaction()?;
        if code != END_TRANSACTION_OK {
            return Err(SessionError::Transaction { code });
        }

        device.print(self.copies, self.sets)
    }
}
