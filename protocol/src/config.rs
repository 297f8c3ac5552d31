//! # Ledger Configuration & Constants
//!
//! Every fixed number of the LuigiCoin ledger lives here. The supply figures
//! are part of the deployed contract's identity: changing them after
//! deployment means a different token, not a tweak.

// ---------------------------------------------------------------------------
// Token Metadata
// ---------------------------------------------------------------------------

/// ERC-20 style token name.
pub const TOKEN_NAME: &str = "LuigiCoin";

/// Ticker symbol. Yes, it does not spell LUIGI. It never did.
pub const TOKEN_SYMBOL: &str = "UHC";

/// Fractional decimal places of the token. Amounts are integers scaled by
/// `10^TOKEN_DECIMALS`.
pub const TOKEN_DECIMALS: u8 = 18;

/// Fractional decimal places of the native (ether-style) custody value.
pub const NATIVE_DECIMALS: u8 = 18;

/// One whole token in base units.
pub const ONE_TOKEN: u128 = 1_000_000_000_000_000_000;

/// One whole native coin ("ether") in base units (wei).
pub const ONE_ETHER: u128 = 1_000_000_000_000_000_000;

// ---------------------------------------------------------------------------
// Supply
// ---------------------------------------------------------------------------

/// Allotment minted to the initial owner at initialization: 1,000,000 tokens.
pub const INITIAL_SUPPLY: u128 = 1_000_000 * ONE_TOKEN;

/// Hard cap on total issuance: 2,000,000 tokens. Fixed at initialization
/// and never changed afterwards.
pub const MAX_SUPPLY: u128 = 2_000_000 * ONE_TOKEN;

// ---------------------------------------------------------------------------
// Versions
// ---------------------------------------------------------------------------

/// Layout version of the persisted ledger state. Bumped only when fields are
/// appended to the schema; existing fields are never reordered or removed.
pub const SCHEMA_VERSION: u32 = 1;

/// Version of the ledger logic shipped in this build. A deployment records
/// the logic version it runs; upgrades move it forward without touching
/// state.
pub const LOGIC_VERSION: u32 = 1;

/// Crate version string, for status endpoints and the CLI.
pub const PROTOCOL_VERSION: &str = env!("CARGO_PKG_VERSION");

// ---------------------------------------------------------------------------
// Host Defaults
// ---------------------------------------------------------------------------

/// Default JSON-RPC / REST port. 8545 is what every wallet tries first.
pub const DEFAULT_RPC_PORT: u16 = 8545;

/// Default Prometheus metrics port.
pub const DEFAULT_METRICS_PORT: u16 = 9545;

/// Default data directory for the node's sled database.
pub const DEFAULT_DATA_DIR: &str = ".luigi";

/// Capacity of the live event broadcast channel. Slow WebSocket
/// subscribers that fall further behind than this lose events.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Maximum number of events returned by a single `luigi_events` query.
pub const MAX_EVENTS_PER_QUERY: usize = 1_000;
