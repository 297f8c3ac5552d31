// Copyright (c) 2026 Luigi Coin Developers. MIT License.
// See LICENSE for details.

//! # LuigiCoin Ledger Host
//!
//! Entry point for the `luigi-node` binary. Parses CLI arguments,
//! initializes logging and metrics, opens the ledger database, and runs the
//! requested subcommand:
//!
//! - `deploy`   initialize a fresh ledger and record the upgrade admin
//! - `serve`    serve the JSON-RPC/WS API and the Prometheus endpoint
//! - `interact` run the scripted walkthrough
//! - `fund`     credit native value to an account
//! - `upgrade`  move the deployment to a newer logic version
//! - `status`   print the ledger summary and audit
//! - `version`  print build version information

mod api;
mod cli;
mod interact;
mod logging;
mod metrics;
mod service;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use tokio::signal;

use luigi_contracts::LedgerParams;
use luigi_protocol::config::PROTOCOL_VERSION;
use luigi_protocol::storage::LedgerDB;
use luigi_protocol::units::{format_ether, format_token, parse_ether};

use cli::{Commands, LuigiNodeCli};
use logging::LogFormat;
use metrics::LedgerMetrics;
use service::LedgerService;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = LuigiNodeCli::parse();
    logging::init_logging(
        logging::DEFAULT_FILTER,
        LogFormat::from_str_lossy(&cli.log_format),
    );

    match cli.command {
        Commands::Deploy(args) => deploy(args),
        Commands::Serve(args) => serve(args).await,
        Commands::Interact(args) => {
            let service = open_service(&args.store.data_dir)?;
            interact::run(&service, args.caller, args.recipient, &mut std::io::stdout())
        }
        Commands::Fund(args) => fund(args),
        Commands::Upgrade(args) => upgrade(args),
        Commands::Status(args) => status(args),
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Opens (creating if needed) the database under `data_dir` and loads the
/// ledger from it.
fn open_service(data_dir: &Path) -> Result<LedgerService> {
    let db_path = data_dir.join("db");
    std::fs::create_dir_all(&db_path)
        .with_context(|| format!("failed to create database directory: {}", db_path.display()))?;

    let db = LedgerDB::open(&db_path)
        .with_context(|| format!("failed to open database at {}", db_path.display()))?;
    tracing::info!(path = %db_path.display(), "database opened");

    let metrics = Arc::new(LedgerMetrics::new().context("failed to register metrics")?);
    LedgerService::open(db, metrics).context("failed to load ledger")
}

/// Initializes the ledger with the reference parameters.
fn deploy(args: cli::DeployArgs) -> Result<()> {
    let service = open_service(&args.store.data_dir)?;
    let deployer = args.deployer.unwrap_or(args.owner);
    let (record, receipt) = service
        .deploy(deployer, args.owner, LedgerParams::default())
        .context("deploy failed")?;

    let snapshot = service.snapshot()?;
    println!("LuigiCoin deployed to: {}", args.store.data_dir.display());
    println!("  Token          : {} ({})", snapshot.name, snapshot.symbol);
    println!("  Owner          : {}", snapshot.owner);
    println!("  Upgrade admin  : {}", record.admin);
    println!("  Logic version  : {}", record.logic_version);
    println!(
        "  Total supply   : {} {}",
        format_token(snapshot.total_supply),
        snapshot.symbol
    );
    println!(
        "  Max supply     : {} {}",
        format_token(snapshot.max_supply),
        snapshot.symbol
    );
    println!("  Events logged  : {}", receipt.events.len());
    Ok(())
}

/// Serves the API and metrics until SIGINT or SIGTERM.
async fn serve(args: cli::ServeArgs) -> Result<()> {
    tracing::info!(
        rpc_port = args.rpc_port,
        metrics_port = args.metrics_port,
        data_dir = %args.store.data_dir.display(),
        "starting luigi-node"
    );

    let db_path = args.store.data_dir.join("db");
    std::fs::create_dir_all(&db_path)
        .with_context(|| format!("failed to create database directory: {}", db_path.display()))?;
    let db = LedgerDB::open(&db_path)
        .with_context(|| format!("failed to open database at {}", db_path.display()))?;

    // --- Metrics ---
    let ledger_metrics = Arc::new(LedgerMetrics::new().context("failed to register metrics")?);

    // --- Ledger ---
    let service = Arc::new(
        LedgerService::open(db.clone(), Arc::clone(&ledger_metrics))
            .context("failed to load ledger")?,
    );
    if service.proxy().is_none() {
        tracing::warn!("no deployment found; write methods will fail until `deploy` runs");
    }

    let app_state = api::AppState {
        version: format!("{} (protocol {})", env!("CARGO_PKG_VERSION"), PROTOCOL_VERSION),
        started_at: chrono::Utc::now(),
        service,
        dev_mode: args.dev,
    };
    if args.dev {
        tracing::warn!("dev mode: dev_fund faucet is enabled");
    }

    // --- API server ---
    let api_router = api::create_router(app_state);
    let api_addr = format!("{}:{}", args.host, args.rpc_port);
    let api_listener = tokio::net::TcpListener::bind(&api_addr)
        .await
        .with_context(|| format!("failed to bind RPC listener on {}", api_addr))?;
    tracing::info!("RPC/API server listening on {}", api_addr);

    // --- Metrics server ---
    let metrics_router = axum::Router::new()
        .route("/metrics", axum::routing::get(metrics::metrics_handler))
        .with_state(Arc::clone(&ledger_metrics));
    let metrics_addr = format!("{}:{}", args.host, args.metrics_port);
    let metrics_listener = tokio::net::TcpListener::bind(&metrics_addr)
        .await
        .with_context(|| format!("failed to bind metrics listener on {}", metrics_addr))?;
    tracing::info!("Metrics server listening on {}", metrics_addr);

    // --- Serve ---
    tokio::select! {
        res = axum::serve(api_listener, api_router) => {
            if let Err(e) = res {
                tracing::error!("API server error: {}", e);
            }
        }
        res = axum::serve(metrics_listener, metrics_router) => {
            if let Err(e) = res {
                tracing::error!("Metrics server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            tracing::info!("shutdown signal received, draining connections");
        }
    }

    db.flush().context("failed to flush database")?;
    tracing::info!("luigi-node stopped");
    Ok(())
}

/// Credits native value to an account.
fn fund(args: cli::FundArgs) -> Result<()> {
    let value = parse_ether(&args.amount)
        .with_context(|| format!("invalid ether amount: {}", args.amount))?;
    let service = open_service(&args.store.data_dir)?;
    let balance = service
        .fund(args.account, value)
        .with_context(|| format!("failed to fund {}", args.account))?;

    println!(
        "Funded {} with {} ether (balance {} ether)",
        args.account,
        format_ether(value),
        format_ether(balance)
    );
    Ok(())
}

/// Moves the deployment to a newer logic version.
fn upgrade(args: cli::UpgradeArgs) -> Result<()> {
    let service = open_service(&args.store.data_dir)?;
    let report = service
        .upgrade(args.admin, args.to)
        .context("upgrade failed")?;

    println!(
        "Upgraded logic v{} -> v{}",
        report.from_version, report.to_version
    );
    println!("  State digest before : {}", report.digest_before);
    println!("  State digest after  : {}", report.digest_after);
    Ok(())
}

/// Prints the ledger summary and audit.
fn status(args: cli::StatusArgs) -> Result<()> {
    let service = open_service(&args.store.data_dir)?;
    let snapshot = service.snapshot().context("failed to read ledger")?;

    if !snapshot.deployed {
        println!("No ledger deployed in {}", args.store.data_dir.display());
        return Ok(());
    }

    println!("{} ({})", snapshot.name, snapshot.symbol);
    println!("  Owner          : {}", snapshot.owner);
    println!("  Paused         : {}", snapshot.paused);
    println!(
        "  Total supply   : {} / {} {}",
        format_token(snapshot.total_supply),
        format_token(snapshot.max_supply),
        snapshot.symbol
    );
    println!("  Custody        : {} ether", format_ether(snapshot.custody_balance));
    if let (Some(admin), Some(logic), Some(schema)) = (
        snapshot.admin,
        snapshot.logic_version,
        snapshot.schema_version,
    ) {
        println!("  Upgrade admin  : {}", admin);
        println!("  Logic / schema : v{} / v{}", logic, schema);
    }
    println!("  Events logged  : {}", snapshot.event_count);
    println!("  State digest   : {}", snapshot.state_digest);
    match &snapshot.audit_failure {
        None => println!("  Audit          : ok"),
        Some(violation) => println!("  Audit          : FAILED ({})", violation),
    }
    Ok(())
}

/// Prints version information to stdout.
fn print_version() {
    println!("luigi-node {}", env!("CARGO_PKG_VERSION"));
    println!("protocol   {}", PROTOCOL_VERSION);
    println!("logic      v{}", luigi_contracts::logic_version());
    println!("rustc      {}", rustc_version());
}

/// Returns the Rust compiler version used to build this binary.
fn rustc_version() -> &'static str {
    option_env!("RUSTC_VERSION").unwrap_or("unknown")
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
///
/// A handler that cannot be installed never fires; the other one still
/// does.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
