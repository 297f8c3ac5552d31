//! # Native Value Bank
//!
//! The ether-style value layer the ledger runs on. It is not part of the
//! ledger state: it models the platform that moves native value in and out
//! of the contract's custody.
//!
//! Two quantities live here:
//!
//! - each external account's spendable native balance, and
//! - `custody`, the aggregate value held at the contract's own address.
//!
//! Deposits move value from an account into custody, withdrawals move it
//! back. Value can also reach custody without a deposit (`credit_custody`),
//! which is how the per-account deposit ledger and the aggregate balance
//! can drift apart.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::address::Address;
use crate::storage::state::AccountMap;

/// Failures of a native value movement.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    /// The paying side does not hold enough native value.
    #[error("insufficient native funds: have {available}, need {required}")]
    InsufficientFunds {
        /// Value available to the payer.
        available: u128,
        /// Value the movement required.
        required: u128,
    },

    /// A balance would exceed `u128::MAX`.
    #[error("native balance overflow")]
    Overflow,

    /// The receiving side refused the value.
    #[error("value rejected by recipient: {0}")]
    Rejected(String),
}

/// In-memory native value accounting for external accounts and the
/// contract's custody.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeBank {
    accounts: AccountMap,
    custody: u128,
}

impl NativeBank {
    /// Creates a bank with no funded accounts and empty custody.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a bank from persisted parts.
    pub fn from_parts(accounts: AccountMap, custody: u128) -> Self {
        Self { accounts, custody }
    }

    /// Spendable native balance of an external account.
    pub fn balance_of(&self, account: &Address) -> u128 {
        self.accounts.get(account)
    }

    /// Aggregate value held at the contract address.
    pub fn custody(&self) -> u128 {
        self.custody
    }

    /// All external account balances.
    pub fn accounts(&self) -> &AccountMap {
        &self.accounts
    }

    /// Credits an external account out of thin air (dev faucet, genesis
    /// allocations).
    pub fn fund(&mut self, account: Address, value: u128) -> Result<(), ValueError> {
        let updated = self
            .accounts
            .get(&account)
            .checked_add(value)
            .ok_or(ValueError::Overflow)?;
        self.accounts.set(account, updated);
        Ok(())
    }

    /// Adds value to custody without attributing it to any depositor, the
    /// way a plain value send to the contract address would.
    pub fn credit_custody(&mut self, value: u128) -> Result<(), ValueError> {
        self.custody = self.custody.checked_add(value).ok_or(ValueError::Overflow)?;
        Ok(())
    }

    /// Moves `value` from `from` into custody. All-or-nothing.
    pub fn pull(&mut self, from: Address, value: u128) -> Result<(), ValueError> {
        let available = self.accounts.get(&from);
        let remaining = available
            .checked_sub(value)
            .ok_or(ValueError::InsufficientFunds {
                available,
                required: value,
            })?;
        let custody = self.custody.checked_add(value).ok_or(ValueError::Overflow)?;
        self.accounts.set(from, remaining);
        self.custody = custody;
        Ok(())
    }

    /// Moves `value` out of custody to `to`. All-or-nothing.
    pub fn push(&mut self, to: Address, value: u128) -> Result<(), ValueError> {
        let custody = self
            .custody
            .checked_sub(value)
            .ok_or(ValueError::InsufficientFunds {
                available: self.custody,
                required: value,
            })?;
        let credited = self
            .accounts
            .get(&to)
            .checked_add(value)
            .ok_or(ValueError::Overflow)?;
        self.custody = custody;
        self.accounts.set(to, credited);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pull_moves_value_into_custody() {
        let mut bank = NativeBank::new();
        let bob = Address::from_label("bob");
        bank.fund(bob, 10).unwrap();

        bank.pull(bob, 4).unwrap();
        assert_eq!(bank.balance_of(&bob), 6);
        assert_eq!(bank.custody(), 4);
    }

    #[test]
    fn pull_without_funds_changes_nothing() {
        let mut bank = NativeBank::new();
        let bob = Address::from_label("bob");
        bank.fund(bob, 1).unwrap();

        let err = bank.pull(bob, 2).unwrap_err();
        assert_eq!(
            err,
            ValueError::InsufficientFunds {
                available: 1,
                required: 2
            }
        );
        assert_eq!(bank.balance_of(&bob), 1);
        assert_eq!(bank.custody(), 0);
    }

    #[test]
    fn push_returns_value_from_custody() {
        let mut bank = NativeBank::new();
        let bob = Address::from_label("bob");
        bank.fund(bob, 10).unwrap();
        bank.pull(bob, 10).unwrap();

        bank.push(bob, 3).unwrap();
        assert_eq!(bank.custody(), 7);
        assert_eq!(bank.balance_of(&bob), 3);
        assert!(bank.push(bob, 8).is_err());
        assert_eq!(bank.custody(), 7);
    }

    #[test]
    fn credit_custody_is_unattributed() {
        let mut bank = NativeBank::new();
        bank.credit_custody(5).unwrap();
        assert_eq!(bank.custody(), 5);
        assert!(bank.accounts().is_empty());
    }

    #[test]
    fn fund_overflow_is_rejected() {
        let mut bank = NativeBank::new();
        let whale = Address::from_label("whale");
        bank.fund(whale, u128::MAX).unwrap();
        assert_eq!(bank.fund(whale, 1), Err(ValueError::Overflow));
        assert_eq!(bank.balance_of(&whale), u128::MAX);
    }
}
