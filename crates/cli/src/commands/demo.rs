//! Multi-node walkthrough.

use super::{dump_json, print_balances, print_block, print_validity};
use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;
use powchain_chain::{Admission, BlockchainError, ChainConfig, NodeRegistry};
use powchain_core::{Amount, Transaction};

#[derive(Args)]
pub struct DemoArgs {
    /// Node ids; the first one does all the work
    #[arg(long, value_delimiter = ',', default_value = "A,B,C")]
    nodes: Vec<String>,

    /// Mining rounds on the first node
    #[arg(short, long, default_value = "4")]
    rounds: u32,

    /// Override the initial difficulty
    #[arg(short, long)]
    difficulty: Option<u32>,

    /// Amount sent from Alice to Bob each round
    #[arg(long, default_value = "0.25")]
    amount: Amount,

    /// Fee attached to each transfer
    #[arg(long, default_value = "0.01")]
    fee: Amount,

    /// Dump the first node's chain as JSON at the end
    #[arg(long)]
    json: bool,
}

pub fn run(args: DemoArgs, mut config: ChainConfig) -> Result<()> {
    if let Some(difficulty) = args.difficulty {
        config.initial_difficulty = difficulty;
    }
    let Some(origin) = args.nodes.first().cloned() else {
        bail!("At least one node id is required");
    };

    let mut registry = NodeRegistry::with_nodes(args.nodes.iter().cloned(), config);
    let chain = registry
        .node_mut(&origin)
        .with_context(|| format!("Node {} was not created", origin))?;

    let (alice, alice_key) = chain.create_wallet("Alice");
    let (bob, bob_key) = chain.create_wallet("Bob");

    println!("{}", format!("Node {}: mining {} rounds", origin, args.rounds).bold().cyan());
    println!();

    for round in 0..args.rounds {
        let miner = if round % 2 == 0 { &alice_key } else { &bob_key };
        let block = chain.mine_pending(miner)?;
        print_block(&block);

        let tx = Transaction::transfer(alice.address.clone(), bob.address.clone(), args.amount, args.fee)
            .with_note(format!("round {}", round))
            .signed(&alice_key);
        match chain.create_transaction(tx) {
            Ok(Admission::Queued { id }) => {
                println!("    {} transfer #{} queued", "+".green(), id);
            }
            Ok(Admission::Dropped { reason }) => {
                println!("    {} transfer dropped: {}", "-".yellow(), reason);
            }
            Err(e @ BlockchainError::InsufficientFunds { .. }) => {
                println!("    {} {}", "!".red(), e);
            }
            Err(e) => return Err(e.into()),
        }
    }

    let block = chain.mine_pending(&alice_key)?;
    print_block(&block);

    println!();
    println!("{}", "Balances:".bold());
    print_balances(chain, &[&alice, &bob]);
    println!("  pending:     {}", chain.mempool().len());

    if let Some(found) = chain.find_block("1") {
        println!();
        println!(
            "{} {}",
            "Block 1 found by index, hash".bold(),
            found.hash.to_hex().bright_yellow()
        );
    }

    println!();
    let report = registry.broadcast_from(&origin)?;
    println!(
        "{} accepted by {}/{} nodes",
        "Broadcast".bold().cyan(),
        report.accepted.to_string().bright_green(),
        report.total
    );

    println!();
    println!("{}", "Nodes:".bold());
    for id in registry.node_ids() {
        if let Some(node) = registry.node(id) {
            print_validity(id, node);
        }
    }

    if args.json {
        if let Some(node) = registry.node(&origin) {
            dump_json(node)?;
        }
    }
    Ok(())
}
