//! # Ledger Errors
//!
//! Every rejection the ledger can produce. The `Display` strings are part of
//! the external contract: calling tooling pattern-matches on them, so they
//! are kept byte-for-byte identical to what deployed clients already expect.
//!
//! A rejected operation never leaves a trace in state. The caller sees the
//! error, observers see no event.

use std::fmt;
use thiserror::Error;

/// Which operation tripped a zero-address check. Each has its own reason
/// string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZeroAddressContext {
    /// `mint` to the zero-sentinel.
    Mint,
    /// `transfer` to the zero-sentinel.
    TransferTo,
    /// `transfer` from the zero-sentinel.
    TransferFrom,
    /// `initialize` with a zero-sentinel owner.
    Owner,
}

impl fmt::Display for ZeroAddressContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ZeroAddressContext::Mint => write!(f, "Mint to zero address"),
            ZeroAddressContext::TransferTo => write!(f, "ERC20: transfer to the zero address"),
            ZeroAddressContext::TransferFrom => {
                write!(f, "ERC20: transfer from the zero address")
            }
            ZeroAddressContext::Owner => write!(f, "Ownable: new owner is the zero address"),
        }
    }
}

/// Which operation tripped a zero-amount check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZeroAmountContext {
    /// `mint` of nothing.
    Mint,
    /// `withdraw_ether` of nothing.
    Withdraw,
}

impl fmt::Display for ZeroAmountContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ZeroAmountContext::Mint => write!(f, "Mint amount must be greater than zero"),
            ZeroAmountContext::Withdraw => {
                write!(f, "Withdraw amount must be greater than zero")
            }
        }
    }
}

/// Rejections of a ledger operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// `initialize` was called on an initialized ledger.
    #[error("Initializable: contract is already initialized")]
    AlreadyInitialized,

    /// The caller is not the owner, or there is no owner any more.
    #[error("Ownable: caller is not the owner")]
    NotOwner,

    /// A balance-moving operation hit a closed transfer gate.
    #[error("Pausable: paused")]
    ContractPaused,

    /// `pause` on a gate that is already closed.
    #[error("Pausable: paused")]
    AlreadyPaused,

    /// `unpause` on a gate that is already open.
    #[error("Pausable: not paused")]
    NotPaused,

    /// An operation named the zero-sentinel where a real account is needed.
    #[error("{0}")]
    ZeroAddress(ZeroAddressContext),

    /// An amount that must be positive was zero.
    #[error("{0}")]
    ZeroAmount(ZeroAmountContext),

    /// `deposit_ether` carried no value.
    #[error("No Ether sent")]
    ZeroValue,

    /// Minting would push total supply above the cap (or overflow).
    #[error("Exceeds maximum supply")]
    ExceedsMaxSupply,

    /// The sender holds fewer tokens than the transfer amount.
    #[error("ERC20: transfer amount exceeds balance")]
    InsufficientBalance,

    /// The withdrawal exceeds the caller's custody entry or the aggregate
    /// custody balance.
    #[error("Insufficient contract balance")]
    InsufficientContractBalance,

    /// A native value movement failed; the operation was rolled back.
    #[error("Transfer failed")]
    TransferFailed,

    /// A mutating operation was entered while another one was in progress.
    #[error("ReentrancyGuard: reentrant call")]
    ReentrancyBlocked,
}

impl LedgerError {
    /// Stable variant name, for tooling that prefers codes over reason
    /// strings (JSON-RPC error data, metrics labels).
    pub fn kind(&self) -> &'static str {
        match self {
            LedgerError::AlreadyInitialized => "AlreadyInitialized",
            LedgerError::NotOwner => "NotOwner",
            LedgerError::ContractPaused => "ContractPaused",
            LedgerError::AlreadyPaused => "AlreadyPaused",
            LedgerError::NotPaused => "NotPaused",
            LedgerError::ZeroAddress(_) => "ZeroAddress",
            LedgerError::ZeroAmount(_) => "ZeroAmount",
            LedgerError::ZeroValue => "ZeroValue",
            LedgerError::ExceedsMaxSupply => "ExceedsMaxSupply",
            LedgerError::InsufficientBalance => "InsufficientBalance",
            LedgerError::InsufficientContractBalance => "InsufficientContractBalance",
            LedgerError::TransferFailed => "TransferFailed",
            LedgerError::ReentrancyBlocked => "ReentrancyBlocked",
        }
    }
}

/// A broken ledger invariant, reported by [`crate::Ledger::audit`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    /// Sum of balances differs from `total_supply`.
    #[error("balances sum to {sum} but total supply is {total_supply}")]
    SupplyMismatch { sum: u128, total_supply: u128 },

    /// `total_supply` is above the cap.
    #[error("total supply {total_supply} exceeds cap {max_supply}")]
    SupplyAboveCap { total_supply: u128, max_supply: u128 },

    /// Sum of deposits exceeds what custody actually holds.
    #[error("deposits sum to {deposits} but custody holds only {custody}")]
    CustodyShortfall { deposits: u128, custody: u128 },

    /// A map sum does not fit in a `u128`.
    #[error("{0} sum overflows")]
    SumOverflow(&'static str),
}
