//! CLI commands module.

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use powchain_chain::{Blockchain, ChainConfig};
use powchain_core::{Block, Wallet};
use std::fs;
use std::path::Path;

mod demo;
mod fork;
mod keygen;
mod staking;

#[derive(Subcommand)]
pub enum Commands {
    /// Generate a keypair and print its address
    Keygen(keygen::KeygenArgs),
    /// Run a multi-node walkthrough: wallets, transfers, mining, broadcast
    Demo(demo::DemoArgs),
    /// Deposit into and withdraw from the penalty-staking contract
    Staking(staking::StakingArgs),
    /// Mine two competing chains and merge them by cumulative work
    Fork(fork::ForkArgs),
}

pub fn run(cmd: Commands, config_path: Option<&Path>) -> Result<()> {
    match cmd {
        Commands::Keygen(args) => keygen::run(args),
        Commands::Demo(args) => demo::run(args, load_config(config_path)?),
        Commands::Staking(args) => staking::run(args, load_config(config_path)?),
        Commands::Fork(args) => fork::run(args, load_config(config_path)?),
    }
}

/// Read a chain configuration, falling back to defaults when no path is given.
pub fn load_config(path: Option<&Path>) -> Result<ChainConfig> {
    let Some(path) = path else {
        return Ok(ChainConfig::default());
    };
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Invalid config file {}", path.display()))
}

pub(crate) fn print_block(block: &Block) {
    println!(
        "  {} {} {} {}",
        format!("#{}", block.index).bright_black(),
        block.hash.to_hex()[..16].bright_yellow(),
        format!("({} txs, difficulty {}, nonce {})", block.tx_count(), block.difficulty, block.nonce).bright_black(),
        format!("{}ms", block.mining_duration_ms).bright_black()
    );
}

pub(crate) fn print_balances(chain: &Blockchain, wallets: &[&Wallet]) {
    for wallet in wallets {
        println!(
            "  {:<12} {} {}",
            wallet.display_name,
            wallet.address.as_str().bright_black(),
            chain.balance_of(&wallet.address, false).to_string().bright_green()
        );
    }
}

pub(crate) fn print_validity(name: &str, chain: &Blockchain) {
    let status = match chain.first_invalid_index() {
        None => "valid".green(),
        Some(index) => format!("invalid at block {}", index).red(),
    };
    println!(
        "  {:<12} length {} work {} {}",
        name,
        chain.chain_length().to_string().bright_cyan(),
        chain.total_work().to_string().bright_cyan(),
        status
    );
}

pub(crate) fn dump_json(chain: &Blockchain) -> Result<()> {
    let json = serde_json::to_string_pretty(chain.blocks()).context("Failed to serialize chain")?;
    println!("{}", json);
    Ok(())
}
