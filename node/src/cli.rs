//! # CLI Interface
//!
//! Defines the command-line argument structure for `luigi-node` using
//! `clap` derive. Every flag that names an account or a directory can also
//! come from the environment, the way the deployment scripts always took
//! their addresses.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use luigi_protocol::config::{DEFAULT_DATA_DIR, DEFAULT_METRICS_PORT, DEFAULT_RPC_PORT};
use luigi_protocol::Address;

/// LuigiCoin ledger host.
///
/// Deploys the ledger into a local data directory, drives it from the
/// command line, upgrades its logic, and serves it over JSON-RPC with live
/// event streaming and Prometheus metrics.
#[derive(Parser, Debug)]
#[command(
    name = "luigi-node",
    about = "LuigiCoin ledger host",
    version,
    propagate_version = true
)]
pub struct LuigiNodeCli {
    /// Log output format: `pretty` or `json`.
    #[arg(long, global = true, env = "LUIGI_LOG_FORMAT", default_value = "pretty")]
    pub log_format: String,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands for the node binary.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a fresh ledger in the data directory.
    Deploy(DeployArgs),
    /// Serve the ledger over JSON-RPC, REST and WebSocket.
    Serve(ServeArgs),
    /// Run the scripted walkthrough: mint, transfer, pause, unpause,
    /// deposit, withdraw.
    Interact(InteractArgs),
    /// Credit native value to an account (development faucet).
    Fund(FundArgs),
    /// Move the deployment to a newer logic version.
    Upgrade(UpgradeArgs),
    /// Print the ledger's current state and invariant audit.
    Status(StatusArgs),
    /// Print version information and exit.
    Version,
}

/// Location of the ledger database.
#[derive(Args, Debug, Clone)]
pub struct StoreArgs {
    /// Data directory holding the sled database. Created if missing.
    #[arg(long, short = 'd', env = "LUIGI_DATA_DIR", default_value = DEFAULT_DATA_DIR)]
    pub data_dir: PathBuf,
}

/// Arguments for the `deploy` subcommand.
#[derive(Args, Debug)]
pub struct DeployArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    /// Initial owner; receives the initial token allotment.
    #[arg(long, env = "LUIGI_OWNER")]
    pub owner: Address,

    /// Deploying account, recorded as the upgrade admin. Defaults to the
    /// owner.
    #[arg(long, env = "LUIGI_CALLER")]
    pub deployer: Option<Address>,
}

/// Arguments for the `serve` subcommand.
#[derive(Args, Debug)]
pub struct ServeArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    /// Port for the JSON-RPC, REST and WebSocket API.
    #[arg(long, env = "LUIGI_RPC_PORT", default_value_t = DEFAULT_RPC_PORT)]
    pub rpc_port: u16,

    /// Port for the Prometheus metrics endpoint.
    #[arg(long, env = "LUIGI_METRICS_PORT", default_value_t = DEFAULT_METRICS_PORT)]
    pub metrics_port: u16,

    /// Bind address for both listeners.
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Enable the `dev_fund` faucet method.
    #[arg(long, env = "LUIGI_DEV")]
    pub dev: bool,
}

/// Arguments for the `interact` subcommand.
#[derive(Args, Debug)]
pub struct InteractArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    /// Account the walkthrough runs as. Must be the owner for the mint and
    /// pause steps to succeed.
    #[arg(long, env = "LUIGI_CALLER")]
    pub caller: Address,

    /// Recipient of the minted and transferred tokens.
    #[arg(long, env = "LUIGI_TRANSFER_ADDRESS")]
    pub recipient: Address,
}

/// Arguments for the `fund` subcommand.
#[derive(Args, Debug)]
pub struct FundArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    /// Account to credit.
    #[arg(long)]
    pub account: Address,

    /// Amount in whole ether, decimals allowed (e.g. `2.5`).
    #[arg(long)]
    pub amount: String,
}

/// Arguments for the `upgrade` subcommand.
#[derive(Args, Debug)]
pub struct UpgradeArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    /// Upgrade admin recorded at deployment.
    #[arg(long, env = "LUIGI_CALLER")]
    pub admin: Address,

    /// Logic version to move to. Must be newer than the deployed one.
    #[arg(long)]
    pub to: u32,
}

/// Arguments for the `status` subcommand.
#[derive(Args, Debug)]
pub struct StatusArgs {
    #[command(flatten)]
    pub store: StoreArgs,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli_structure() {
        // Ensures the derive macros produce a valid CLI definition.
        LuigiNodeCli::command().debug_assert();
    }

    #[test]
    fn parses_deploy_addresses() {
        let owner = Address::from_label("owner");
        let cli = LuigiNodeCli::try_parse_from([
            "luigi-node",
            "deploy",
            "--owner",
            &owner.to_hex(),
            "-d",
            "/tmp/luigi",
        ])
        .unwrap();

        match cli.command {
            Commands::Deploy(args) => {
                assert_eq!(args.owner, owner);
                assert_eq!(args.deployer, None);
                assert_eq!(args.store.data_dir, PathBuf::from("/tmp/luigi"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn faucet_is_off_by_default() {
        let cli = LuigiNodeCli::try_parse_from(["luigi-node", "serve"]).unwrap();
        match cli.command {
            Commands::Serve(args) => assert!(!args.dev),
            other => panic!("unexpected command: {:?}", other),
        }

        let cli = LuigiNodeCli::try_parse_from(["luigi-node", "serve", "--dev"]).unwrap();
        match cli.command {
            Commands::Serve(args) => assert!(args.dev),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn rejects_malformed_address() {
        let result =
            LuigiNodeCli::try_parse_from(["luigi-node", "deploy", "--owner", "0x1234"]);
        assert!(result.is_err());
    }
}
