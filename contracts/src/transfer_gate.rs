//! # Transfer Gate
//!
//! Owner-controlled pause switch. While the gate is closed, `mint` and
//! `transfer` fail with [`LedgerError::ContractPaused`]. Custody deposits
//! and withdrawals ignore it.

use luigi_protocol::{Address, LedgerEvent};

use crate::error::LedgerError;
use crate::host::ValueHost;
use crate::ledger::Ledger;

impl<H: ValueHost> Ledger<H> {
    /// Closes the gate.
    ///
    /// # Errors
    ///
    /// [`LedgerError::NotOwner`] for anyone but the owner,
    /// [`LedgerError::AlreadyPaused`] if the gate is already closed.
    pub fn pause(&mut self, caller: Address) -> Result<(), LedgerError> {
        self.guarded(|ledger| {
            ledger.only_owner(caller)?;
            if ledger.state.paused {
                return Err(LedgerError::AlreadyPaused);
            }
            ledger.state.paused = true;
            tracing::info!(%caller, "transfers paused");
            ledger.emit(LedgerEvent::Paused { account: caller });
            Ok(())
        })
    }

    /// Opens the gate.
    ///
    /// # Errors
    ///
    /// [`LedgerError::NotOwner`] for anyone but the owner,
    /// [`LedgerError::NotPaused`] if the gate is already open.
    pub fn unpause(&mut self, caller: Address) -> Result<(), LedgerError> {
        self.guarded(|ledger| {
            ledger.only_owner(caller)?;
            if !ledger.state.paused {
                return Err(LedgerError::NotPaused);
            }
            ledger.state.paused = false;
            tracing::info!(%caller, "transfers unpaused");
            ledger.emit(LedgerEvent::Unpaused { account: caller });
            Ok(())
        })
    }

    pub fn paused(&self) -> bool {
        self.state.paused
    }

    pub(crate) fn require_active(&self) -> Result<(), LedgerError> {
        if self.state.paused {
            return Err(LedgerError::ContractPaused);
        }
        Ok(())
    }
}
