//! # Custody Ledger
//!
//! Native value held on behalf of accounts, tracked apart from token
//! balances. Any account can deposit and withdraw its own entry; neither
//! operation is owner-gated or affected by the transfer gate.
//!
//! Withdrawal decrements the caller's entry before value leaves custody
//! and before the recipient's code runs. If either step fails, the host is
//! restored from a snapshot taken just before the release and the entry is
//! put back.

use luigi_protocol::{Address, LedgerEvent};

use crate::error::{LedgerError, ZeroAmountContext};
use crate::host::{PlainAccount, ValueHost, ValueReceiver};
use crate::ledger::Ledger;

impl<H: ValueHost> Ledger<H> {
    /// Moves `value` from `caller` into custody and credits the caller's
    /// deposit entry.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::ZeroValue`] if `value` is zero.
    /// - [`LedgerError::TransferFailed`] if the host cannot move the value
    ///   or the entry would overflow.
    pub fn deposit_ether(&mut self, caller: Address, value: u128) -> Result<(), LedgerError> {
        self.guarded(|ledger| {
            if value == 0 {
                return Err(LedgerError::ZeroValue);
            }
            let deposit = ledger
                .state
                .deposits
                .get(&caller)
                .checked_add(value)
                .ok_or(LedgerError::TransferFailed)?;

            ledger.host.receive(caller, value).map_err(|err| {
                tracing::warn!(%caller, value, error = %err, "deposit value transfer failed");
                LedgerError::TransferFailed
            })?;
            ledger.state.deposits.set(caller, deposit);

            tracing::debug!(%caller, value, deposit, "deposit");
            ledger.emit(LedgerEvent::EtherDeposited {
                account: caller,
                amount: value,
            });
            Ok(())
        })
    }

    /// Releases `amount` of the caller's custody back to the caller, who
    /// has no receiving code.
    ///
    /// See [`withdraw_ether_with`](Ledger::withdraw_ether_with).
    pub fn withdraw_ether(&mut self, caller: Address, amount: u128) -> Result<(), LedgerError> {
        self.withdraw_ether_with(caller, amount, &mut PlainAccount)
    }

    /// Releases `amount` of the caller's custody back to the caller, then
    /// runs `receiver` as the caller's receiving code.
    ///
    /// `receiver` sees the ledger with the entry already decremented and
    /// the guard held: any mutating call it makes fails with
    /// [`LedgerError::ReentrancyBlocked`].
    ///
    /// # Errors
    ///
    /// - [`LedgerError::ZeroAmount`] if `amount` is zero.
    /// - [`LedgerError::InsufficientContractBalance`] if the caller's entry
    ///   or the aggregate custody balance is below `amount`.
    /// - [`LedgerError::TransferFailed`] if the host cannot release the
    ///   value or `receiver` fails. Nothing changes in that case.
    pub fn withdraw_ether_with<R>(
        &mut self,
        caller: Address,
        amount: u128,
        receiver: &mut R,
    ) -> Result<(), LedgerError>
    where
        R: ValueReceiver<H> + ?Sized,
    {
        self.guarded(|ledger| {
            if amount == 0 {
                return Err(LedgerError::ZeroAmount(ZeroAmountContext::Withdraw));
            }

            let deposit = ledger.state.deposits.get(&caller);
            let remaining = deposit
                .checked_sub(amount)
                .ok_or(LedgerError::InsufficientContractBalance)?;

            let custody = ledger.host.custody_balance();
            if custody < amount {
                tracing::error!(
                    %caller,
                    amount,
                    deposit,
                    custody,
                    "custody diverged: deposit entry covers withdrawal but aggregate balance does not"
                );
                return Err(LedgerError::InsufficientContractBalance);
            }

            ledger.state.deposits.set(caller, remaining);
            let snapshot = ledger.host.snapshot();

            let released = match ledger.host.send(caller, amount) {
                Ok(()) => receiver.on_value_received(ledger, caller, amount),
                Err(err) => {
                    tracing::warn!(%caller, amount, error = %err, "withdrawal release failed");
                    Err(LedgerError::TransferFailed)
                }
            };

            if let Err(err) = released {
                tracing::warn!(%caller, amount, reason = %err, "withdrawal rolled back");
                ledger.host.restore(snapshot);
                ledger.state.deposits.set(caller, deposit);
                return Err(LedgerError::TransferFailed);
            }

            tracing::debug!(%caller, amount, remaining, "withdraw");
            ledger.emit(LedgerEvent::EtherWithdrawn {
                account: caller,
                amount,
            });
            Ok(())
        })
    }

    /// Custody entry of `account`.
    pub fn ether_deposits(&self, account: &Address) -> u128 {
        self.state.deposits.get(account)
    }

    /// Aggregate value the host holds in custody.
    pub fn custody_balance(&self) -> u128 {
        self.host.custody_balance()
    }
}
