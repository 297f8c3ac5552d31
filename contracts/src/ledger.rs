//! # Ledger Runtime
//!
//! [`Ledger`] binds the persisted [`LedgerState`] to the logic in this
//! crate. It owns the state, the value host, the transient re-entrancy
//! guard and the buffer of events emitted since the host last drained it.
//!
//! The operations themselves are spread over one `impl` block per
//! responsibility:
//!
//! - [`access_control`](crate::access_control): initialize, ownership
//! - [`transfer_gate`](crate::transfer_gate): pause / unpause
//! - [`supply_ledger`](crate::supply_ledger): mint, transfer, token reads
//! - [`custody_ledger`](crate::custody_ledger): deposit / withdraw
//!
//! ## Upgrades
//!
//! Replacing the logic is [`Ledger::into_parts`] followed by
//! [`Ledger::from_parts`] in the new build. The state passes through
//! untouched; there is no migration step.

use serde::{Deserialize, Serialize};
use std::ops::{Deref, DerefMut};

use luigi_protocol::config::{INITIAL_SUPPLY, LOGIC_VERSION, MAX_SUPPLY, SCHEMA_VERSION};
use luigi_protocol::{LedgerEvent, LedgerState};

use crate::error::{InvariantViolation, LedgerError};
use crate::guard::ReentrancyGuard;
use crate::host::ValueHost;

/// Supply parameters fixed at initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerParams {
    /// Minted to the initial owner.
    pub initial_supply: u128,
    /// Issuance cap.
    pub max_supply: u128,
}

impl Default for LedgerParams {
    /// The reference deployment: 1,000,000 tokens minted, 2,000,000 cap.
    fn default() -> Self {
        Self {
            initial_supply: INITIAL_SUPPLY,
            max_supply: MAX_SUPPLY,
        }
    }
}

/// Logic version implemented by this crate.
pub const fn logic_version() -> u32 {
    LOGIC_VERSION
}

/// Whether this logic can run on state written with `schema_version`.
/// The schema is append-only, so every older layout is readable.
pub const fn supports_schema(schema_version: u32) -> bool {
    schema_version <= SCHEMA_VERSION
}

/// The ledger: state, value host, guard and pending events.
#[derive(Debug)]
pub struct Ledger<H: ValueHost> {
    pub(crate) state: LedgerState,
    pub(crate) host: H,
    pub(crate) initialized: bool,
    guard: ReentrancyGuard,
    events: Vec<LedgerEvent>,
}

impl<H: ValueHost> Ledger<H> {
    /// An uninitialized ledger over `host`. Call
    /// [`initialize`](Ledger::initialize) before anything else.
    pub fn new(host: H) -> Self {
        Self::from_parts(LedgerState::default(), host, false)
    }

    /// Rebuilds a ledger around existing state, e.g. after loading it from
    /// storage or when binding new logic to old data.
    pub fn from_parts(state: LedgerState, host: H, initialized: bool) -> Self {
        Self {
            state,
            host,
            initialized,
            guard: ReentrancyGuard::new(),
            events: Vec::new(),
        }
    }

    /// Hands back the state and the host. Undrained events are dropped.
    pub fn into_parts(self) -> (LedgerState, H, bool) {
        (self.state, self.host, self.initialized)
    }

    /// Read-only view of the persisted state.
    pub fn state(&self) -> &LedgerState {
        &self.state
    }

    /// Read-only view of the value host.
    pub fn host(&self) -> &H {
        &self.host
    }

    /// Platform-side access to the value host (dev funding, unsolicited
    /// value). Ledger state is not reachable through it.
    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// Whether `initialize` has run.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Whether an operation is currently in progress. Only ever `true` when
    /// observed from inside a value receiver.
    pub fn is_busy(&self) -> bool {
        self.guard.is_entered()
    }

    /// Events emitted since the last drain, oldest first.
    pub fn pending_events(&self) -> &[LedgerEvent] {
        &self.events
    }

    /// Takes all pending events.
    pub fn drain_events(&mut self) -> Vec<LedgerEvent> {
        std::mem::take(&mut self.events)
    }

    /// Checks every ledger invariant against the current state.
    pub fn audit(&self) -> Result<(), InvariantViolation> {
        let state = &self.state;

        let sum = state
            .balances
            .checked_sum()
            .ok_or(InvariantViolation::SumOverflow("balances"))?;
        if sum != state.total_supply {
            return Err(InvariantViolation::SupplyMismatch {
                sum,
                total_supply: state.total_supply,
            });
        }
        if state.total_supply > state.max_supply {
            return Err(InvariantViolation::SupplyAboveCap {
                total_supply: state.total_supply,
                max_supply: state.max_supply,
            });
        }

        let deposits = state
            .deposits
            .checked_sum()
            .ok_or(InvariantViolation::SumOverflow("deposits"))?;
        let custody = self.host.custody_balance();
        if deposits > custody {
            return Err(InvariantViolation::CustodyShortfall { deposits, custody });
        }

        Ok(())
    }

    pub(crate) fn emit(&mut self, event: LedgerEvent) {
        tracing::debug!(kind = event.kind(), event = %event, "ledger event");
        self.events.push(event);
    }

    /// Runs `op` inside the re-entrancy guard. The guard is released on
    /// success, on failure, and when `op` unwinds.
    pub(crate) fn guarded<T>(
        &mut self,
        op: impl FnOnce(&mut Self) -> Result<T, LedgerError>,
    ) -> Result<T, LedgerError> {
        self.guard.enter()?;
        let mut entered = Entered(self);
        op(&mut *entered)
    }
}

/// Holds the ledger while its guard is entered and leaves it on drop.
struct Entered<'a, H: ValueHost>(&'a mut Ledger<H>);

impl<H: ValueHost> Deref for Entered<'_, H> {
    type Target = Ledger<H>;

    fn deref(&self) -> &Ledger<H> {
        self.0
    }
}

impl<H: ValueHost> DerefMut for Entered<'_, H> {
    fn deref_mut(&mut self) -> &mut Ledger<H> {
        self.0
    }
}

impl<H: ValueHost> Drop for Entered<'_, H> {
    fn drop(&mut self) {
        self.0.guard.leave();
    }
}
