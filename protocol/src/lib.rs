// Copyright (c) 2026 Luigi Coin Developers. MIT License.
// See LICENSE for details.

//! # LuigiCoin Protocol: Schema & Primitives
//!
//! The stable half of the LuigiCoin ledger: everything that must survive a
//! logic upgrade unchanged.
//!
//! ## Architecture
//!
//! - **address**: 160-bit account identifiers and the zero-sentinel.
//! - **units**: decimal string ⇄ base unit conversion (18 decimals).
//! - **event**: the structured events every mutation emits.
//! - **native**: the ether-style value layer custody runs on.
//! - **storage**: the persisted state schema and its sled database.
//! - **config**: supply figures, token metadata and host defaults.
//!
//! The operations that act on this state live in `luigi-contracts`.
//!
//! ## Design Philosophy
//!
//! 1. All amounts are `u128` with checked arithmetic. Nothing wraps.
//! 2. The state schema is append-only; logic can be replaced, data is not
//!    migrated.
//! 3. Absent accounts read as zero. Nothing is pre-populated.

pub mod address;
pub mod config;
pub mod event;
pub mod native;
pub mod storage;
pub mod units;

pub use address::{Address, AddressError};
pub use event::{LedgerEvent, RecordedEvent};
pub use native::{NativeBank, ValueError};
pub use storage::{AccountMap, LedgerState};
