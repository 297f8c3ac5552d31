//! # LuigiCoin Ledger Logic
//!
//! The replaceable half of the ledger. State lives in `luigi-protocol`;
//! this crate holds the operations that act on it:
//!
//! - **Access Control**: a single owner, set once at initialization, who
//!   can hand over or renounce ownership.
//! - **Transfer Gate**: an owner-controlled pause switch over minting and
//!   transfers.
//! - **Supply Ledger**: capped, owner-gated minting and plain transfers.
//! - **Custody Ledger**: per-account deposits of native value with bounded
//!   withdrawal.
//!
//! ## Design Principles
//!
//! 1. All amounts are `u128` and every sum goes through `checked_add` /
//!    `checked_sub`. Overflow is a rejection, never a wrap.
//! 2. A rejected operation changes nothing and emits nothing.
//! 3. Every mutating operation runs inside the re-entrancy guard.
//! 4. The caller is an explicit argument. There is no ambient sender.

pub mod access_control;
pub mod custody_ledger;
pub mod error;
pub mod guard;
pub mod host;
pub mod ledger;
pub mod supply_ledger;
pub mod transfer_gate;

pub use error::{InvariantViolation, LedgerError, ZeroAddressContext, ZeroAmountContext};
pub use guard::ReentrancyGuard;
pub use host::{PlainAccount, ValueHost, ValueReceiver};
pub use ledger::{logic_version, supports_schema, Ledger, LedgerParams};
