//! Integration tests for the ledger.
//!
//! These drive the public surface the way a host would: one caller per
//! operation, events drained after each step, invariants audited
//! throughout. Re-entrancy is exercised with receivers that call back into
//! the ledger while a withdrawal is in flight.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use luigi_contracts::{
    Ledger, LedgerError, PlainAccount, ValueReceiver, ZeroAddressContext,
};
use luigi_protocol::config::{INITIAL_SUPPLY, MAX_SUPPLY, ONE_ETHER, ONE_TOKEN};
use luigi_protocol::{Address, LedgerEvent, NativeBank};

fn owner() -> Address {
    Address::from_label("owner")
}

fn alice() -> Address {
    Address::from_label("alice")
}

fn bob() -> Address {
    Address::from_label("bob")
}

/// Reference deployment with `bob` holding 10 ether of native value.
fn deployed() -> Ledger<NativeBank> {
    let mut bank = NativeBank::new();
    bank.fund(bob(), 10 * ONE_ETHER).unwrap();
    let mut ledger = Ledger::new(bank);
    ledger.initialize(owner(), owner()).unwrap();
    ledger.drain_events();
    ledger
}

// ---------------------------------------------------------------------------
// Reference scenarios
// ---------------------------------------------------------------------------

#[test]
fn owner_mints_to_alice() {
    let mut ledger = deployed();
    ledger.mint(owner(), alice(), 1_000 * ONE_TOKEN).unwrap();

    assert_eq!(ledger.balance_of(&alice()), 1_000 * ONE_TOKEN);
    assert_eq!(ledger.total_supply(), 1_001_000 * ONE_TOKEN);
    ledger.audit().unwrap();
}

#[test]
fn mint_past_cap_changes_nothing() {
    let mut ledger = deployed();
    assert_eq!(
        ledger.mint(owner(), alice(), 2_000_000 * ONE_TOKEN),
        Err(LedgerError::ExceedsMaxSupply)
    );
    assert_eq!(ledger.total_supply(), INITIAL_SUPPLY);
    assert_eq!(ledger.balance_of(&alice()), 0);
    assert!(ledger.pending_events().is_empty());
}

#[test]
fn mint_to_zero_address() {
    let mut ledger = deployed();
    let err = ledger
        .mint(owner(), Address::ZERO, 1_000 * ONE_TOKEN)
        .unwrap_err();
    assert_eq!(err, LedgerError::ZeroAddress(ZeroAddressContext::Mint));
    assert_eq!(err.to_string(), "Mint to zero address");
}

#[test]
fn paused_transfer_is_rejected() {
    let mut ledger = deployed();
    ledger.pause(owner()).unwrap();
    let err = ledger
        .transfer(owner(), alice(), 100 * ONE_TOKEN)
        .unwrap_err();
    assert_eq!(err, LedgerError::ContractPaused);
    assert_eq!(err.to_string(), "Pausable: paused");
    assert_eq!(
        ledger.mint(owner(), alice(), ONE_TOKEN),
        Err(LedgerError::ContractPaused)
    );
    assert_eq!(ledger.balance_of(&alice()), 0);
}

#[test]
fn deposit_then_partial_withdraw() {
    let mut ledger = deployed();
    let native_before = ledger.host().balance_of(&bob());

    ledger.deposit_ether(bob(), ONE_ETHER).unwrap();
    ledger.withdraw_ether(bob(), ONE_ETHER / 2).unwrap();

    assert_eq!(ledger.ether_deposits(&bob()), ONE_ETHER / 2);
    assert_eq!(
        ledger.host().balance_of(&bob()),
        native_before - ONE_ETHER / 2
    );
    assert_eq!(
        ledger.drain_events(),
        vec![
            LedgerEvent::EtherDeposited {
                account: bob(),
                amount: ONE_ETHER,
            },
            LedgerEvent::EtherWithdrawn {
                account: bob(),
                amount: ONE_ETHER / 2,
            },
        ]
    );
    ledger.audit().unwrap();
}

#[test]
fn withdraw_more_than_deposited() {
    let mut ledger = deployed();
    ledger.deposit_ether(bob(), ONE_ETHER).unwrap();
    let err = ledger.withdraw_ether(bob(), 2 * ONE_ETHER).unwrap_err();
    assert_eq!(err, LedgerError::InsufficientContractBalance);
    assert_eq!(err.to_string(), "Insufficient contract balance");
    assert_eq!(ledger.ether_deposits(&bob()), ONE_ETHER);
}

#[test]
fn renounced_owner_cannot_pause() {
    let mut ledger = deployed();
    ledger.renounce_ownership(owner()).unwrap();
    let err = ledger.pause(owner()).unwrap_err();
    assert_eq!(err, LedgerError::NotOwner);
    assert_eq!(err.to_string(), "Ownable: caller is not the owner");
}

// ---------------------------------------------------------------------------
// Pause and ownership
// ---------------------------------------------------------------------------

#[test]
fn unpause_restores_transfers() {
    let mut ledger = deployed();
    ledger.pause(owner()).unwrap();
    ledger.unpause(owner()).unwrap();
    ledger.transfer(owner(), alice(), 100 * ONE_TOKEN).unwrap();
    assert_eq!(ledger.balance_of(&alice()), 100 * ONE_TOKEN);
}

#[test]
fn renunciation_is_permanent_for_every_privileged_call() {
    let mut ledger = deployed();
    ledger.pause(owner()).unwrap();
    ledger.renounce_ownership(owner()).unwrap();

    for caller in [owner(), alice(), Address::ZERO] {
        assert_eq!(ledger.mint(caller, alice(), ONE_TOKEN), Err(LedgerError::NotOwner));
        assert_eq!(ledger.pause(caller), Err(LedgerError::NotOwner));
        assert_eq!(ledger.unpause(caller), Err(LedgerError::NotOwner));
        assert_eq!(ledger.renounce_ownership(caller), Err(LedgerError::NotOwner));
        assert_eq!(
            ledger.transfer_ownership(caller, alice()),
            Err(LedgerError::NotOwner)
        );
    }
    // Stuck paused for good; custody still works.
    assert!(ledger.paused());
    ledger.deposit_ether(bob(), ONE_ETHER).unwrap();
    ledger.withdraw_ether(bob(), ONE_ETHER).unwrap();
}

#[test]
fn reinitialize_after_renounce_still_fails() {
    let mut ledger = deployed();
    ledger.renounce_ownership(owner()).unwrap();
    assert_eq!(
        ledger.initialize(alice(), alice()),
        Err(LedgerError::AlreadyInitialized)
    );
    assert_eq!(ledger.owner(), Address::ZERO);
}

// ---------------------------------------------------------------------------
// Re-entrancy
// ---------------------------------------------------------------------------

/// Tries to withdraw again while the first withdrawal is in flight and
/// propagates whatever the ledger says.
struct DoubleDipper {
    nested: Option<Result<(), LedgerError>>,
    observed_deposit: u128,
}

impl ValueReceiver<NativeBank> for DoubleDipper {
    fn on_value_received(
        &mut self,
        ledger: &mut Ledger<NativeBank>,
        recipient: Address,
        amount: u128,
    ) -> Result<(), LedgerError> {
        self.observed_deposit = ledger.ether_deposits(&recipient);
        let nested = ledger.withdraw_ether(recipient, amount);
        self.nested = Some(nested);
        nested
    }
}

#[test]
fn reentrant_withdrawal_is_blocked_and_rolled_back() {
    let mut ledger = deployed();
    ledger.deposit_ether(bob(), ONE_ETHER).unwrap();
    ledger.drain_events();
    let bank_before = ledger.host().clone();

    let mut attacker = DoubleDipper {
        nested: None,
        observed_deposit: u128::MAX,
    };
    let result = ledger.withdraw_ether_with(bob(), ONE_ETHER / 2, &mut attacker);

    assert_eq!(result, Err(LedgerError::TransferFailed));
    assert_eq!(attacker.nested, Some(Err(LedgerError::ReentrancyBlocked)));
    // The nested call saw the decrement already applied.
    assert_eq!(attacker.observed_deposit, ONE_ETHER / 2);

    assert_eq!(ledger.ether_deposits(&bob()), ONE_ETHER);
    assert_eq!(ledger.host(), &bank_before);
    assert!(ledger.pending_events().is_empty());
    assert!(!ledger.is_busy());
    ledger.audit().unwrap();
}

/// Swallows the nested failure and accepts the value.
struct QuietDoubleDipper {
    nested: Vec<LedgerError>,
}

impl ValueReceiver<NativeBank> for QuietDoubleDipper {
    fn on_value_received(
        &mut self,
        ledger: &mut Ledger<NativeBank>,
        recipient: Address,
        amount: u128,
    ) -> Result<(), LedgerError> {
        if let Err(err) = ledger.withdraw_ether(recipient, amount) {
            self.nested.push(err);
        }
        if let Err(err) = ledger.transfer(recipient, recipient, 0) {
            self.nested.push(err);
        }
        if let Err(err) = ledger.deposit_ether(recipient, amount) {
            self.nested.push(err);
        }
        Ok(())
    }
}

#[test]
fn swallowed_reentry_withdraws_once() {
    let mut ledger = deployed();
    ledger.deposit_ether(bob(), ONE_ETHER).unwrap();
    ledger.drain_events();

    let mut receiver = QuietDoubleDipper { nested: Vec::new() };
    ledger
        .withdraw_ether_with(bob(), ONE_ETHER / 2, &mut receiver)
        .unwrap();

    assert_eq!(receiver.nested, vec![LedgerError::ReentrancyBlocked; 3]);
    assert_eq!(ledger.ether_deposits(&bob()), ONE_ETHER / 2);
    assert_eq!(ledger.custody_balance(), ONE_ETHER / 2);
    assert_eq!(
        ledger.drain_events(),
        vec![LedgerEvent::EtherWithdrawn {
            account: bob(),
            amount: ONE_ETHER / 2,
        }]
    );
    ledger.audit().unwrap();
}

// ---------------------------------------------------------------------------
// Custody divergence
// ---------------------------------------------------------------------------

#[test]
fn unsolicited_value_does_not_raise_withdrawal_limit() {
    let mut ledger = deployed();
    ledger.deposit_ether(bob(), ONE_ETHER).unwrap();
    ledger.host_mut().credit_custody(5 * ONE_ETHER).unwrap();

    assert_eq!(
        ledger.withdraw_ether(bob(), 2 * ONE_ETHER),
        Err(LedgerError::InsufficientContractBalance)
    );
    ledger.withdraw_ether(bob(), ONE_ETHER).unwrap();
    assert_eq!(ledger.custody_balance(), 5 * ONE_ETHER);
    ledger.audit().unwrap();
}

#[test]
fn plain_account_is_the_default_receiver() {
    let mut a = deployed();
    let mut b = deployed();
    a.deposit_ether(bob(), ONE_ETHER).unwrap();
    b.deposit_ether(bob(), ONE_ETHER).unwrap();

    a.withdraw_ether(bob(), ONE_ETHER).unwrap();
    b.withdraw_ether_with(bob(), ONE_ETHER, &mut PlainAccount)
        .unwrap();
    assert_eq!(a.state(), b.state());
    assert_eq!(a.host(), b.host());
}

// ---------------------------------------------------------------------------
// Upgrade
// ---------------------------------------------------------------------------

#[test]
fn rebinding_logic_preserves_state() {
    let mut ledger = deployed();
    ledger.mint(owner(), alice(), 7 * ONE_TOKEN).unwrap();
    ledger.deposit_ether(bob(), ONE_ETHER).unwrap();
    ledger.pause(owner()).unwrap();
    let before = ledger.state().clone();

    let (state, bank, initialized) = ledger.into_parts();
    let upgraded = Ledger::from_parts(state, bank, initialized);

    assert_eq!(upgraded.state(), &before);
    assert!(upgraded.is_initialized());
    assert!(upgraded.paused());
    assert_eq!(upgraded.owner(), owner());
    assert_eq!(upgraded.ether_deposits(&bob()), ONE_ETHER);
}

// ---------------------------------------------------------------------------
// Randomized operation sequences
// ---------------------------------------------------------------------------

#[test]
fn random_operations_keep_invariants() {
    let accounts: Vec<Address> = (0..6)
        .map(|i| Address::from_label(&format!("acct-{i}")))
        .chain([owner(), Address::ZERO])
        .collect();

    for seed in 0..16u64 {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut bank = NativeBank::new();
        for account in &accounts {
            bank.fund(*account, 50 * ONE_ETHER).unwrap();
        }
        let mut ledger = Ledger::new(bank);
        ledger.initialize(owner(), owner()).unwrap();

        for _ in 0..400 {
            let caller = accounts[rng.gen_range(0..accounts.len())];
            let other = accounts[rng.gen_range(0..accounts.len())];
            let amount = match rng.gen_range(0..4) {
                0 => 0,
                1 => rng.gen_range(1..=10 * ONE_TOKEN),
                2 => rng.gen_range(1..=MAX_SUPPLY),
                _ => u128::MAX - rng.gen_range(0..1_000u128),
            };

            let state_before = ledger.state().clone();
            let bank_before = ledger.host().clone();
            let result = match rng.gen_range(0..8) {
                0 => ledger.mint(caller, other, amount),
                1 | 2 => ledger.transfer(caller, other, amount),
                3 => ledger.pause(caller),
                4 => ledger.unpause(caller),
                5 => ledger.deposit_ether(caller, amount % (5 * ONE_ETHER)),
                6 => ledger.withdraw_ether(caller, amount % (5 * ONE_ETHER)),
                _ => {
                    if rng.gen_bool(0.02) {
                        ledger.renounce_ownership(caller)
                    } else {
                        Ok(())
                    }
                }
            };

            if result.is_err() {
                assert_eq!(ledger.state(), &state_before, "seed {seed}: {result:?}");
                assert_eq!(ledger.host(), &bank_before, "seed {seed}: {result:?}");
            }
            assert!(!ledger.is_busy());
            ledger.audit().unwrap_or_else(|v| panic!("seed {seed}: {v}"));
            assert!(ledger.total_supply() <= MAX_SUPPLY);
        }
    }
}
