//! # Value Host
//!
//! The ledger does not own native value; the platform it runs on does.
//! [`ValueHost`] is that platform seen from the ledger: it reports how much
//! value custody holds, moves value in on deposit and out on withdrawal, and
//! can snapshot itself so a failed withdrawal leaves no trace.
//!
//! [`ValueReceiver`] is the recipient side of a withdrawal. On a chain, the
//! recipient's code runs when value lands, and that code may call straight
//! back into the ledger. Receivers get `&mut Ledger` for exactly that reason.

use luigi_protocol::{Address, NativeBank, ValueError};

use crate::error::LedgerError;
use crate::ledger::Ledger;

/// The native value layer under the ledger.
pub trait ValueHost {
    /// Opaque copy of the host's state, for rollback.
    type Snapshot;

    /// Aggregate value held at the contract address.
    fn custody_balance(&self) -> u128;

    /// Moves `value` from `from` into custody. Must be all-or-nothing.
    fn receive(&mut self, from: Address, value: u128) -> Result<(), ValueError>;

    /// Moves `value` out of custody to `to`. Must be all-or-nothing.
    fn send(&mut self, to: Address, value: u128) -> Result<(), ValueError>;

    /// Captures the current state.
    fn snapshot(&self) -> Self::Snapshot;

    /// Returns to a previously captured state.
    fn restore(&mut self, snapshot: Self::Snapshot);
}

impl ValueHost for NativeBank {
    type Snapshot = NativeBank;

    fn custody_balance(&self) -> u128 {
        self.custody()
    }

    fn receive(&mut self, from: Address, value: u128) -> Result<(), ValueError> {
        self.pull(from, value)
    }

    fn send(&mut self, to: Address, value: u128) -> Result<(), ValueError> {
        self.push(to, value)
    }

    fn snapshot(&self) -> NativeBank {
        self.clone()
    }

    fn restore(&mut self, snapshot: NativeBank) {
        *self = snapshot;
    }
}

/// Code that runs when withdrawn value reaches its recipient.
///
/// Returning an error makes the whole withdrawal fail with
/// [`LedgerError::TransferFailed`] and rolls it back.
pub trait ValueReceiver<H: ValueHost> {
    fn on_value_received(
        &mut self,
        ledger: &mut Ledger<H>,
        recipient: Address,
        amount: u128,
    ) -> Result<(), LedgerError>;
}

/// A recipient with no code: accepts value and does nothing else.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainAccount;

impl<H: ValueHost> ValueReceiver<H> for PlainAccount {
    fn on_value_received(
        &mut self,
        _ledger: &mut Ledger<H>,
        _recipient: Address,
        _amount: u128,
    ) -> Result<(), LedgerError> {
        Ok(())
    }
}
