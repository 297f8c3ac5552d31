//! # Access Control
//!
//! Single-owner access control. The owner is set once by `initialize`, may
//! hand ownership to another account, and may renounce it. Renunciation
//! sets the owner to the zero-sentinel, and from then on every privileged
//! operation fails with [`LedgerError::NotOwner`] for every caller. There is
//! no way back.

use luigi_protocol::{Address, LedgerEvent};

use crate::error::{LedgerError, ZeroAddressContext};
use crate::host::ValueHost;
use crate::ledger::{Ledger, LedgerParams};

impl<H: ValueHost> Ledger<H> {
    /// Initializes the ledger with the reference supply parameters.
    ///
    /// See [`initialize_with`](Ledger::initialize_with).
    pub fn initialize(&mut self, caller: Address, initial_owner: Address) -> Result<(), LedgerError> {
        self.initialize_with(caller, initial_owner, LedgerParams::default())
    }

    /// Sets the owner, fixes the supply cap and mints the initial allotment
    /// to the owner. Runs at most once per ledger.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::AlreadyInitialized`] on any call after the first.
    /// - [`LedgerError::ZeroAddress`] if `initial_owner` is the zero-sentinel.
    /// - [`LedgerError::ExceedsMaxSupply`] if the initial allotment does not
    ///   fit under the cap.
    pub fn initialize_with(
        &mut self,
        caller: Address,
        initial_owner: Address,
        params: LedgerParams,
    ) -> Result<(), LedgerError> {
        self.guarded(|ledger| {
            if ledger.initialized {
                tracing::warn!(%caller, "initialize called twice");
                return Err(LedgerError::AlreadyInitialized);
            }
            if initial_owner.is_zero() {
                return Err(LedgerError::ZeroAddress(ZeroAddressContext::Owner));
            }

            let total_supply = ledger
                .state
                .total_supply
                .checked_add(params.initial_supply)
                .filter(|total| *total <= params.max_supply)
                .ok_or(LedgerError::ExceedsMaxSupply)?;
            let owner_balance = ledger
                .state
                .balances
                .get(&initial_owner)
                .checked_add(params.initial_supply)
                .ok_or(LedgerError::ExceedsMaxSupply)?;

            ledger.state.owner = initial_owner;
            ledger.state.max_supply = params.max_supply;
            ledger.state.total_supply = total_supply;
            if params.initial_supply > 0 {
                ledger.state.balances.set(initial_owner, owner_balance);
            }
            ledger.initialized = true;

            tracing::info!(
                deployer = %caller,
                owner = %initial_owner,
                initial_supply = params.initial_supply,
                max_supply = params.max_supply,
                "ledger initialized"
            );

            ledger.emit(LedgerEvent::OwnershipTransferred {
                previous_owner: Address::ZERO,
                new_owner: initial_owner,
            });
            if params.initial_supply > 0 {
                ledger.emit(LedgerEvent::Transfer {
                    from: Address::ZERO,
                    to: initial_owner,
                    amount: params.initial_supply,
                });
            }
            Ok(())
        })
    }

    /// Current owner; the zero-sentinel once ownership is renounced.
    pub fn owner(&self) -> Address {
        self.state.owner
    }

    /// Hands ownership to `new_owner`.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::NotOwner`] unless `caller` is the current owner.
    /// - [`LedgerError::ZeroAddress`] if `new_owner` is the zero-sentinel;
    ///   giving up ownership goes through
    ///   [`renounce_ownership`](Ledger::renounce_ownership).
    pub fn transfer_ownership(
        &mut self,
        caller: Address,
        new_owner: Address,
    ) -> Result<(), LedgerError> {
        self.guarded(|ledger| {
            ledger.only_owner(caller)?;
            if new_owner.is_zero() {
                return Err(LedgerError::ZeroAddress(ZeroAddressContext::Owner));
            }
            ledger.set_owner(new_owner);
            Ok(())
        })
    }

    /// Gives up ownership for good. Every privileged operation is
    /// unreachable afterwards.
    ///
    /// # Errors
    ///
    /// [`LedgerError::NotOwner`] unless `caller` is the current owner.
    pub fn renounce_ownership(&mut self, caller: Address) -> Result<(), LedgerError> {
        self.guarded(|ledger| {
            ledger.only_owner(caller)?;
            ledger.set_owner(Address::ZERO);
            tracing::info!(previous_owner = %caller, "ownership renounced");
            Ok(())
        })
    }

    /// Fails unless `caller` is the owner. An ownerless ledger rejects
    /// everyone, including a zero-address caller.
    pub(crate) fn only_owner(&self, caller: Address) -> Result<(), LedgerError> {
        let owner = self.state.owner;
        if owner.is_zero() || caller != owner {
            tracing::warn!(%caller, %owner, "privileged call rejected");
            return Err(LedgerError::NotOwner);
        }
        Ok(())
    }

    fn set_owner(&mut self, new_owner: Address) {
        let previous_owner = self.state.owner;
        self.state.owner = new_owner;
        self.emit(LedgerEvent::OwnershipTransferred {
            previous_owner,
            new_owner,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use luigi_protocol::config::{INITIAL_SUPPLY, MAX_SUPPLY};
    use luigi_protocol::NativeBank;

    fn owner() -> Address {
        Address::from_label("owner")
    }

    fn initialized() -> Ledger<NativeBank> {
        let mut ledger = Ledger::new(NativeBank::new());
        ledger.initialize(owner(), owner()).unwrap();
        ledger
    }

    #[test]
    fn initialize_mints_to_owner() {
        let mut ledger = initialized();
        assert!(ledger.is_initialized());
        assert_eq!(ledger.owner(), owner());
        assert_eq!(ledger.total_supply(), INITIAL_SUPPLY);
        assert_eq!(ledger.max_supply(), MAX_SUPPLY);
        assert_eq!(ledger.balance_of(&owner()), INITIAL_SUPPLY);

        let events = ledger.drain_events();
        assert_eq!(
            events,
            vec![
                LedgerEvent::OwnershipTransferred {
                    previous_owner: Address::ZERO,
                    new_owner: owner(),
                },
                LedgerEvent::Transfer {
                    from: Address::ZERO,
                    to: owner(),
                    amount: INITIAL_SUPPLY,
                },
            ]
        );
    }

    #[test]
    fn initialize_twice_fails() {
        let mut ledger = initialized();
        ledger.drain_events();
        let other = Address::from_label("other");
        assert_eq!(
            ledger.initialize(other, other),
            Err(LedgerError::AlreadyInitialized)
        );
        assert_eq!(ledger.owner(), owner());
        assert_eq!(ledger.total_supply(), INITIAL_SUPPLY);
        assert!(ledger.pending_events().is_empty());
    }

    #[test]
    fn initialize_rejects_zero_owner() {
        let mut ledger = Ledger::new(NativeBank::new());
        assert_eq!(
            ledger.initialize(owner(), Address::ZERO),
            Err(LedgerError::ZeroAddress(ZeroAddressContext::Owner))
        );
        assert!(!ledger.is_initialized());
    }

    #[test]
    fn initialize_rejects_allotment_above_cap() {
        let mut ledger = Ledger::new(NativeBank::new());
        let params = LedgerParams {
            initial_supply: 11,
            max_supply: 10,
        };
        assert_eq!(
            ledger.initialize_with(owner(), owner(), params),
            Err(LedgerError::ExceedsMaxSupply)
        );
        assert!(!ledger.is_initialized());
        assert_eq!(ledger.total_supply(), 0);
    }

    #[test]
    fn zero_initial_supply_emits_no_mint() {
        let mut ledger = Ledger::new(NativeBank::new());
        let params = LedgerParams {
            initial_supply: 0,
            max_supply: 10,
        };
        ledger.initialize_with(owner(), owner(), params).unwrap();
        assert_eq!(ledger.drain_events().len(), 1);
        assert!(!ledger.state().balances.contains(&owner()));
    }

    #[test]
    fn renounce_is_terminal() {
        let mut ledger = initialized();
        ledger.renounce_ownership(owner()).unwrap();
        assert_eq!(ledger.owner(), Address::ZERO);

        assert_eq!(ledger.renounce_ownership(owner()), Err(LedgerError::NotOwner));
        assert_eq!(
            ledger.renounce_ownership(Address::ZERO),
            Err(LedgerError::NotOwner)
        );
        assert_eq!(
            ledger.transfer_ownership(Address::ZERO, owner()),
            Err(LedgerError::NotOwner)
        );
        assert_eq!(ledger.owner(), Address::ZERO);
    }

    #[test]
    fn renounce_emits_transfer_to_zero() {
        let mut ledger = initialized();
        ledger.drain_events();
        ledger.renounce_ownership(owner()).unwrap();
        assert_eq!(
            ledger.drain_events(),
            vec![LedgerEvent::OwnershipTransferred {
                previous_owner: owner(),
                new_owner: Address::ZERO,
            }]
        );
    }

    #[test]
    fn non_owner_cannot_renounce() {
        let mut ledger = initialized();
        let mallory = Address::from_label("mallory");
        assert_eq!(ledger.renounce_ownership(mallory), Err(LedgerError::NotOwner));
        assert_eq!(ledger.owner(), owner());
    }

    #[test]
    fn transfer_ownership_moves_privileges() {
        let mut ledger = initialized();
        let heir = Address::from_label("heir");
        ledger.transfer_ownership(owner(), heir).unwrap();
        assert_eq!(ledger.owner(), heir);
        assert_eq!(ledger.pause(owner()), Err(LedgerError::NotOwner));
        ledger.pause(heir).unwrap();
    }

    #[test]
    fn transfer_ownership_rejects_zero() {
        let mut ledger = initialized();
        assert_eq!(
            ledger.transfer_ownership(owner(), Address::ZERO),
            Err(LedgerError::ZeroAddress(ZeroAddressContext::Owner))
        );
        assert_eq!(ledger.owner(), owner());
    }
}
