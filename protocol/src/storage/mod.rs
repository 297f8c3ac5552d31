//! # Storage Module
//!
//! The persisted side of the ledger.
//!
//! ```text
//! state.rs : LedgerState schema and the zero-default AccountMap
//! db.rs    : sled persistence: state trees, native bank, event log, proxy metadata
//! ```
//!
//! The schema here is the stable half of the ledger. Operations are the
//! replaceable half and live in `luigi-contracts`; they only ever see the
//! schema through `&mut LedgerState`.

pub mod db;
pub mod state;

pub use db::{Commit, DbError, DbResult, LedgerDB, ProxyRecord};
pub use state::{AccountMap, LedgerState};
