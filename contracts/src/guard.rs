//! # Re-entrancy Guard
//!
//! A transient busy flag. Every mutating ledger operation enters it on the
//! way in and leaves it on every way out; a second entry while the flag is
//! set fails with [`LedgerError::ReentrancyBlocked`].
//!
//! The flag is not part of the persisted schema. It only exists while an
//! operation is running, so it always reads "idle" between operations.

use crate::error::LedgerError;

/// Busy flag guarding the ledger's mutating operations.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReentrancyGuard {
    entered: bool,
}

impl ReentrancyGuard {
    /// Creates an idle guard.
    pub const fn new() -> Self {
        Self { entered: false }
    }

    /// Marks an operation as in progress. Fails if one already is.
    pub fn enter(&mut self) -> Result<(), LedgerError> {
        if self.entered {
            return Err(LedgerError::ReentrancyBlocked);
        }
        self.entered = true;
        Ok(())
    }

    /// Marks the running operation as finished.
    pub fn leave(&mut self) {
        self.entered = false;
    }

    /// Whether an operation is currently running.
    pub fn is_entered(&self) -> bool {
        self.entered
    }
}
