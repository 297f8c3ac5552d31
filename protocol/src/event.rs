//! # Ledger Events
//!
//! Every committed mutation of the ledger produces exactly one event per
//! effect (initialization produces two). Events are the ledger's only
//! outbound signal: indexers, the WebSocket stream and tests all observe
//! the ledger through them.
//!
//! A mint is a [`LedgerEvent::Transfer`] whose `from` is the zero-sentinel,
//! the same convention ERC-20 indexers already understand.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::address::Address;

/// A structured, observable record of one committed ledger effect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerEvent {
    /// Tokens moved between accounts, or were minted (`from == ZERO`).
    Transfer {
        from: Address,
        to: Address,
        amount: u128,
    },
    /// The transfer gate was closed by `account`.
    Paused { account: Address },
    /// The transfer gate was reopened by `account`.
    Unpaused { account: Address },
    /// Ownership changed. `new_owner == ZERO` records a renunciation.
    OwnershipTransferred {
        previous_owner: Address,
        new_owner: Address,
    },
    /// Native value entered custody on behalf of `account`.
    EtherDeposited { account: Address, amount: u128 },
    /// Native value left custody back to `account`.
    EtherWithdrawn { account: Address, amount: u128 },
}

impl LedgerEvent {
    /// Short kind name, stable across releases (used as a metrics label and
    /// in the WebSocket envelope).
    pub fn kind(&self) -> &'static str {
        match self {
            LedgerEvent::Transfer { .. } => "Transfer",
            LedgerEvent::Paused { .. } => "Paused",
            LedgerEvent::Unpaused { .. } => "Unpaused",
            LedgerEvent::OwnershipTransferred { .. } => "OwnershipTransferred",
            LedgerEvent::EtherDeposited { .. } => "EtherDeposited",
            LedgerEvent::EtherWithdrawn { .. } => "EtherWithdrawn",
        }
    }

    /// Accounts touched by the event, in (primary, secondary) order.
    pub fn accounts(&self) -> (Address, Option<Address>) {
        match self {
            LedgerEvent::Transfer { from, to, .. } => (*from, Some(*to)),
            LedgerEvent::Paused { account } | LedgerEvent::Unpaused { account } => {
                (*account, None)
            }
            LedgerEvent::OwnershipTransferred {
                previous_owner,
                new_owner,
            } => (*previous_owner, Some(*new_owner)),
            LedgerEvent::EtherDeposited { account, .. }
            | LedgerEvent::EtherWithdrawn { account, .. } => (*account, None),
        }
    }

    /// Amount carried by the event, if any.
    pub fn amount(&self) -> Option<u128> {
        match self {
            LedgerEvent::Transfer { amount, .. }
            | LedgerEvent::EtherDeposited { amount, .. }
            | LedgerEvent::EtherWithdrawn { amount, .. } => Some(*amount),
            _ => None,
        }
    }

    /// Returns `true` for the mint flavor of `Transfer`.
    pub fn is_mint(&self) -> bool {
        matches!(self, LedgerEvent::Transfer { from, .. } if from.is_zero())
    }
}

impl fmt::Display for LedgerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedgerEvent::Transfer { from, to, amount } => {
                write!(f, "Transfer({} -> {}, {})", from, to, amount)
            }
            LedgerEvent::Paused { account } => write!(f, "Paused({})", account),
            LedgerEvent::Unpaused { account } => write!(f, "Unpaused({})", account),
            LedgerEvent::OwnershipTransferred {
                previous_owner,
                new_owner,
            } => write!(f, "OwnershipTransferred({} -> {})", previous_owner, new_owner),
            LedgerEvent::EtherDeposited { account, amount } => {
                write!(f, "EtherDeposited({}, {})", account, amount)
            }
            LedgerEvent::EtherWithdrawn { account, amount } => {
                write!(f, "EtherWithdrawn({}, {})", account, amount)
            }
        }
    }
}

/// An event together with its position in the persisted log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedEvent {
    /// Monotonic sequence number, starting at 0 for the first event.
    pub seq: u64,
    /// The event itself.
    pub event: LedgerEvent,
}
