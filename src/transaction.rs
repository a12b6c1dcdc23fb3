//! Transaction identifier generation and response correlation

use tracing::warn;

use crate::error::{ModbusError, ModbusResult};

/// Hands out wrapping 16-bit transaction ids and remembers the last one sent.
///
/// Uniqueness of outstanding ids follows from the client issuing a single
/// request at a time, not from anything tracked here.
#[derive(Debug, Clone)]
pub struct TransactionTracker {
    next: u16,
    last_sent: Option<u16>,
}

impl TransactionTracker {
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    pub fn starting_at(first: u16) -> Self {
        Self {
            next: first,
            last_sent: None,
        }
    }

    /// Return the current counter, then advance it (65535 wraps to 0).
    pub fn next_id(&mut self) -> u16 {
        let id = self.next;
        self.next = self.next.wrapping_add(1);
        self.last_sent = Some(id);
        id
    }

    /// Id of the most recently issued request
    pub fn last_sent(&self) -> Option<u16> {
        self.last_sent
    }

    /// Fail with [`ModbusError::Correlation`] unless the ids are equal.
    pub fn validate(sent_id: u16, received_id: u16) -> ModbusResult<()> {
        if sent_id != received_id {
            warn!(
                "Discarding response for transaction {} while waiting on {}",
                received_id, sent_id
            );
            return Err(ModbusError::correlation(sent_id, received_id));
        }
        Ok(())
    }

    /// Validate against the most recently issued id.
    pub fn validate_last(&self, received_id: u16) -> ModbusResult<()> {
        match self.last_sent {
            Some(sent) => Self::validate(sent, received_id),
            None => Err(ModbusError::decode(format!(
                "Unsolicited response with transaction id {}",
                received_id
            ))),
        }
    }
}

impl Default for TransactionTracker {
    fn default() -> Self {
        Self::new()
    }
}
