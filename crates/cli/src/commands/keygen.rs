//! Key generation command.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use powchain_core::Keypair;

#[derive(Args)]
pub struct KeygenArgs {
    /// Derive from an existing private key (hex) instead of generating one
    #[arg(long)]
    private_key: Option<String>,

    /// Print as JSON
    #[arg(long)]
    json: bool,
}

pub fn run(args: KeygenArgs) -> Result<()> {
    let keypair = match args.private_key {
        Some(hex_key) => Keypair::from_private_hex(&hex_key).context("Invalid private key")?,
        None => Keypair::generate(),
    };
    let address = keypair.address();
    let public_hex = hex::encode(keypair.public_key.as_bytes());
    let private_hex = hex::encode(keypair.private_key());

    if args.json {
        let value = serde_json::json!({
            "address": address.as_str(),
            "public_key": public_hex,
            "private_key": private_hex,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("{}", "Generated keypair:".bold().cyan());
    println!();
    println!("  Address:     {}", address.as_str().bright_yellow());
    println!("  Public Key:  {}", public_hex.bright_black());
    println!("  Private Key: {}", private_hex.bright_black());
    println!();
    println!("{}", "Keep the private key secret.".yellow());
    Ok(())
}
