//! minter - submit one atomic mint transaction to a deployed minter program
//!
//! Creates a fresh zero-decimal mint, mints one unit into the payer's
//! associated token account and invokes the minter program, all in one
//! transaction. With `--dry-run` the transaction is built and priced but
//! never sent.

// Compiler warning configuration
#![deny(unused_imports)]
#![deny(unused_mut)]
#![deny(unused_variables)]
#![warn(unused_must_use)]

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use solana_sdk::signature::{Keypair, Signer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use minter_client::config::Config;
use minter_client::ledger::{LedgerClient, RpcLedger};
use minter_client::programs::ProgramIds;
use minter_client::session::{MintSession, MintSettings, PreparedMint};
use minter_client::wallet::{pubkey_from_keypair_file, Wallet};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "minter.toml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,

    /// Override the RPC endpoint from the config file
    #[arg(long, env = "MINTER_RPC_URL")]
    rpc_url: Option<String>,

    /// Build and price the transaction without submitting it
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose, args.json_logs)?;

    info!(version = env!("CARGO_PKG_VERSION"), "Starting minter");

    let mut config = load_config(&args.config)?;
    if let Some(url) = args.rpc_url {
        config.rpc.url = url;
    }
    config.validate()?;

    let ledger = Arc::new(RpcLedger::new(
        config.rpc.url.clone(),
        config.rpc_timeout(),
        config.commitment()?,
    ));
    let version = ledger
        .get_version()
        .await
        .with_context(|| format!("Failed to reach RPC node at {}", ledger.url()))?;
    info!(url = %ledger.url(), version = %version, "Connected to cluster");

    let wallet = Wallet::from_file(&config.wallet.keypair_path)
        .with_context(|| format!("Failed to load payer keypair {}", config.wallet.keypair_path))?;
    info!(payer = %wallet.pubkey(), "Loaded payer");

    let programs = resolve_programs(&config)?;
    info!(program = %programs.minter, "Using minter program");

    let settings = MintSettings::from_config(&config)?;
    let session = MintSession::new(ledger, wallet.keypair_arc(), programs, settings);
    session.ensure_program_deployed().await?;

    let mint = Keypair::new();

    if args.dry_run {
        let prepared = session.prepare(&mint.pubkey()).await?;
        print_plan(&prepared);
        return Ok(());
    }

    let outcome = session.run(&mint).await?;
    println!("Mint:          {}", outcome.mint);
    println!("Token account: {}", outcome.associated_token);
    println!("Signature:     {}", outcome.receipt.signature);

    Ok(())
}

/// Initialize logging subsystem
fn init_logging(verbose: bool, json: bool) -> Result<()> {
    let env_filter = if verbose {
        "minter_client=debug,minter=debug,info"
    } else {
        "minter_client=info,minter=info,warn"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| env_filter.into());

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .init();
    }

    Ok(())
}

/// Load configuration from file
fn load_config(path: &str) -> Result<Config> {
    if !std::path::Path::new(path).exists() {
        warn!(path, "Config file not found");
    }
    Config::from_file_with_env(path).with_context(|| format!("Failed to load config from {}", path))
}

/// Program ids from config, reading the deploy keypair when no id is given
fn resolve_programs(config: &Config) -> Result<ProgramIds> {
    let minter = match (config.program_id()?, &config.program.keypair_path) {
        (Some(id), _) => id,
        (None, Some(path)) => pubkey_from_keypair_file(path)
            .with_context(|| format!("Failed to read program keypair {}", path))?,
        (None, None) => anyhow::bail!("program.program_id or program.keypair_path is required"),
    };
    Ok(ProgramIds::new(minter).with_metadata(config.metadata_program_id()?))
}

fn print_plan(prepared: &PreparedMint) {
    println!("Mint:             {}", prepared.mint);
    println!("Blockhash:        {}", prepared.assembled.blockhash);
    println!("Fee:              {} lamports", prepared.fee);
    println!("Mint rent:        {} lamports", prepared.rent.mint);
    println!("Token rent:       {} lamports", prepared.rent.token_account);
    println!("Required balance: {} lamports", prepared.required_lamports());
    println!("Signers:");
    for signer in prepared.assembled.required_signers() {
        println!("  {}", signer);
    }
    println!("Instructions:");
    let message = prepared.assembled.message();
    for (kind, ix) in prepared.assembled.kinds.iter().zip(message.instructions.iter()) {
        let program = message.account_keys[usize::from(ix.program_id_index)];
        println!("  {:<26} {} ({} accounts)", kind.as_str(), program, ix.accounts.len());
    }
}
