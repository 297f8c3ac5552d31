//! # Supply Ledger
//!
//! Token issuance and movement. `mint` is owner-only and capped by
//! `max_supply`; `transfer` moves tokens between accounts. Both are
//! blocked while the transfer gate is closed.
//!
//! New balances and the new total are computed with checked arithmetic
//! before anything is written, so a rejected call leaves no partial update.

use luigi_protocol::config::{TOKEN_DECIMALS, TOKEN_NAME, TOKEN_SYMBOL};
use luigi_protocol::{Address, LedgerEvent};

use crate::error::{LedgerError, ZeroAddressContext, ZeroAmountContext};
use crate::host::ValueHost;
use crate::ledger::Ledger;

impl<H: ValueHost> Ledger<H> {
    /// Issues `amount` new tokens to `to`.
    ///
    /// Checks run in a fixed order: owner, gate, recipient, amount, cap.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::NotOwner`]
    /// - [`LedgerError::ContractPaused`]
    /// - [`LedgerError::ZeroAddress`] if `to` is the zero-sentinel
    /// - [`LedgerError::ZeroAmount`] if `amount` is zero
    /// - [`LedgerError::ExceedsMaxSupply`] if the new total would pass the
    ///   cap or overflow
    pub fn mint(&mut self, caller: Address, to: Address, amount: u128) -> Result<(), LedgerError> {
        self.guarded(|ledger| {
            ledger.only_owner(caller)?;
            ledger.require_active()?;
            if to.is_zero() {
                return Err(LedgerError::ZeroAddress(ZeroAddressContext::Mint));
            }
            if amount == 0 {
                return Err(LedgerError::ZeroAmount(ZeroAmountContext::Mint));
            }

            let total_supply = ledger
                .state
                .total_supply
                .checked_add(amount)
                .filter(|total| *total <= ledger.state.max_supply)
                .ok_or(LedgerError::ExceedsMaxSupply)?;
            // Bounded by total_supply while the balances sum matches it.
            let balance = ledger
                .state
                .balances
                .get(&to)
                .checked_add(amount)
                .ok_or(LedgerError::ExceedsMaxSupply)?;

            ledger.state.total_supply = total_supply;
            ledger.state.balances.set(to, balance);

            tracing::debug!(%caller, %to, amount, total_supply, "mint");
            ledger.emit(LedgerEvent::Transfer {
                from: Address::ZERO,
                to,
                amount,
            });
            Ok(())
        })
    }

    /// Moves `amount` tokens from `caller` to `to`.
    ///
    /// Zero amounts and self-transfers succeed and still emit an event.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::ContractPaused`]
    /// - [`LedgerError::ZeroAddress`] if either side is the zero-sentinel
    /// - [`LedgerError::InsufficientBalance`] if `caller` holds less than
    ///   `amount`
    pub fn transfer(
        &mut self,
        caller: Address,
        to: Address,
        amount: u128,
    ) -> Result<(), LedgerError> {
        self.guarded(|ledger| {
            ledger.require_active()?;
            if to.is_zero() {
                return Err(LedgerError::ZeroAddress(ZeroAddressContext::TransferTo));
            }
            if caller.is_zero() {
                return Err(LedgerError::ZeroAddress(ZeroAddressContext::TransferFrom));
            }

            let from_balance = ledger
                .state
                .balances
                .get(&caller)
                .checked_sub(amount)
                .ok_or(LedgerError::InsufficientBalance)?;

            if caller != to {
                let to_balance = ledger
                    .state
                    .balances
                    .get(&to)
                    .checked_add(amount)
                    .ok_or(LedgerError::InsufficientBalance)?;
                ledger.state.balances.set(caller, from_balance);
                ledger.state.balances.set(to, to_balance);
            }

            tracing::debug!(%caller, %to, amount, "transfer");
            ledger.emit(LedgerEvent::Transfer {
                from: caller,
                to,
                amount,
            });
            Ok(())
        })
    }

    pub fn balance_of(&self, account: &Address) -> u128 {
        self.state.balances.get(account)
    }

    pub fn total_supply(&self) -> u128 {
        self.state.total_supply
    }

    pub fn max_supply(&self) -> u128 {
        self.state.max_supply
    }

    pub fn name(&self) -> &'static str {
        TOKEN_NAME
    }

    pub fn symbol(&self) -> &'static str {
        TOKEN_SYMBOL
    }

    pub fn decimals(&self) -> u8 {
        TOKEN_DECIMALS
    }
}
