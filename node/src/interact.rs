//! Scripted walkthrough of the ledger: reads the token metadata, then mints,
//! transfers, pauses, unpauses, deposits and withdraws, printing each step.
//! The first rejection stops the run and surfaces its reason string.

use anyhow::Context;
use std::io::Write;

use luigi_protocol::config::{ONE_ETHER, ONE_TOKEN};
use luigi_protocol::units::{format_ether, format_token};
use luigi_protocol::Address;

use crate::service::{LedgerService, Receipt};

/// Tokens minted to the recipient.
const MINT_AMOUNT: u128 = 1_000 * ONE_TOKEN;
/// Tokens the recipient would receive by transfer.
const TRANSFER_AMOUNT: u128 = 100 * ONE_TOKEN;
const DEPOSIT_VALUE: u128 = ONE_ETHER;
const WITHDRAW_AMOUNT: u128 = ONE_ETHER / 2;

/// Runs the walkthrough as `caller`, sending tokens to `recipient`.
pub fn run(
    service: &LedgerService,
    caller: Address,
    recipient: Address,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let (name, symbol) = service.read(|ledger| (ledger.name(), ledger.symbol()));
    writeln!(out, "Token name: {} ({})", name, symbol)?;

    let minted = format!("{} {} to {}", format_token(MINT_AMOUNT), symbol, recipient);
    let receipt = service
        .mint(caller, recipient, MINT_AMOUNT)
        .with_context(|| format!("mint {}", minted))?;
    step(out, "Minted", &minted, &receipt)?;

    let sent = format!("{} {} to {}", format_token(TRANSFER_AMOUNT), symbol, recipient);
    let receipt = service
        .transfer(caller, recipient, TRANSFER_AMOUNT)
        .with_context(|| format!("transfer {}", sent))?;
    step(out, "Transferred", &sent, &receipt)?;

    let receipt = service.pause(caller).context("pause")?;
    step(out, "Paused", "transfers and minting", &receipt)?;

    let receipt = service.unpause(caller).context("unpause")?;
    step(out, "Unpaused", "transfers and minting", &receipt)?;

    let receipt = service
        .deposit_ether(caller, DEPOSIT_VALUE)
        .with_context(|| format!("deposit {} ether", format_ether(DEPOSIT_VALUE)))?;
    step(out, "Deposited", &format!("{} ether", format_ether(DEPOSIT_VALUE)), &receipt)?;

    let receipt = service
        .withdraw_ether(caller, WITHDRAW_AMOUNT)
        .with_context(|| format!("withdraw {} ether", format_ether(WITHDRAW_AMOUNT)))?;
    step(out, "Withdrew", &format!("{} ether", format_ether(WITHDRAW_AMOUNT)), &receipt)?;

    let view = service.account(recipient);
    writeln!(
        out,
        "Recipient balance: {} {}",
        format_token(view.balance),
        symbol
    )?;
    writeln!(
        out,
        "Caller deposits: {} ether",
        format_ether(service.read(|ledger| ledger.ether_deposits(&caller)))
    )?;
    writeln!(out, "Walkthrough complete!")?;
    Ok(())
}

fn step(out: &mut impl Write, verb: &str, what: &str, receipt: &Receipt) -> std::io::Result<()> {
    let seqs: Vec<String> = receipt.events.iter().map(|e| e.seq.to_string()).collect();
    writeln!(out, "{} {} (events: {})", verb, what, seqs.join(", "))
}
