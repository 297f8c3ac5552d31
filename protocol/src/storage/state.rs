//! # Ledger State Schema
//!
//! The persistent state of the ledger, and nothing else. Operations live in
//! `luigi-contracts` and borrow this schema mutably; swapping the logic
//! never requires touching the data.
//!
//! ## Layout contract
//!
//! | Field          | Meaning                                           |
//! |----------------|---------------------------------------------------|
//! | `total_supply` | Tokens issued so far. Only grows.                 |
//! | `max_supply`   | Issuance cap, fixed at initialization.            |
//! | `paused`       | Transfer gate. `false` means active.              |
//! | `owner`        | Privileged account, `Address::ZERO` once renounced.|
//! | `balances`     | Token balance per account.                        |
//! | `deposits`     | Native value held in custody per account.         |
//!
//! The schema is append-only: new fields go at the end with a serde
//! default, existing fields are never reordered, renamed or removed.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::address::Address;

// ---------------------------------------------------------------------------
// AccountMap
// ---------------------------------------------------------------------------

/// Address → amount mapping with zero-default reads.
///
/// Accounts appear lazily: reading an absent key yields 0 and nothing is
/// ever pre-populated. Entries that drop back to zero are kept, so an
/// account that once held value stays addressable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountMap(BTreeMap<Address, u128>);

impl AccountMap {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Amount held by `account`; 0 when absent.
    pub fn get(&self, account: &Address) -> u128 {
        self.0.get(account).copied().unwrap_or(0)
    }

    /// Overwrites the amount held by `account`.
    pub fn set(&mut self, account: Address, amount: u128) {
        self.0.insert(account, amount);
    }

    /// Whether `account` has ever been written.
    pub fn contains(&self, account: &Address) -> bool {
        self.0.contains_key(account)
    }

    /// Number of materialized entries (including zero balances).
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no entry has been materialized yet.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Entries in address order.
    pub fn iter(&self) -> impl Iterator<Item = (&Address, &u128)> {
        self.0.iter()
    }

    /// Sum of all entries, or `None` if the sum overflows `u128`.
    pub fn checked_sum(&self) -> Option<u128> {
        self.0
            .values()
            .try_fold(0u128, |acc, amount| acc.checked_add(*amount))
    }
}

impl FromIterator<(Address, u128)> for AccountMap {
    fn from_iter<I: IntoIterator<Item = (Address, u128)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

// ---------------------------------------------------------------------------
// LedgerState
// ---------------------------------------------------------------------------

/// The complete persisted state: global fields plus the two account maps.
///
/// `Default` is the pre-initialization state: no supply, no cap, active
/// gate, zero-sentinel owner, empty maps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerState {
    /// Tokens issued so far. Equals the sum of `balances`.
    pub total_supply: u128,
    /// Issuance cap.
    pub max_supply: u128,
    /// Transfer gate.
    pub paused: bool,
    /// Current owner, or `Address::ZERO` when there is none.
    pub owner: Address,
    /// Token balances.
    pub balances: AccountMap,
    /// Native value in custody, per depositor.
    pub deposits: AccountMap,
}

impl LedgerState {
    /// Fresh state for a new deployment: `initial_supply` credited to
    /// `owner`, gate active.
    pub fn genesis(owner: Address, initial_supply: u128, max_supply: u128) -> Self {
        let mut balances = AccountMap::new();
        if initial_supply > 0 {
            balances.set(owner, initial_supply);
        }
        Self {
            total_supply: initial_supply,
            max_supply,
            paused: false,
            owner,
            balances,
            deposits: AccountMap::new(),
        }
    }

    /// Whether ownership has been renounced (or was never assigned).
    pub fn is_ownerless(&self) -> bool {
        self.owner.is_zero()
    }
}
