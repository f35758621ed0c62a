//! Competing chains merged by cumulative work.

use super::print_validity;
use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use powchain_chain::{ChainConfig, NodeRegistry};

#[derive(Args)]
pub struct ForkArgs {
    /// Blocks mined on node A (including genesis)
    #[arg(long, default_value = "5")]
    a_length: u64,

    /// Blocks mined on node B (including genesis)
    #[arg(long, default_value = "4")]
    b_length: u64,

    /// Difficulty used by node B after genesis
    #[arg(long)]
    b_difficulty: Option<u32>,
}

pub fn run(args: ForkArgs, config: ChainConfig) -> Result<()> {
    let mut registry = NodeRegistry::with_nodes(["A", "B"], config);

    for (id, length, difficulty) in [("A", args.a_length, None), ("B", args.b_length, args.b_difficulty)] {
        let chain = registry
            .node_mut(id)
            .with_context(|| format!("Node {} was not created", id))?;
        if let Some(d) = difficulty {
            chain.set_difficulty(d);
        }
        let (_, miner) = chain.create_wallet(format!("{} miner", id));
        while chain.chain_length() < length {
            chain.mine_pending(&miner)?;
        }
    }

    println!("{}", "Before merge:".bold());
    for id in ["A", "B"] {
        if let Some(node) = registry.node(id) {
            print_validity(id, node);
        }
    }

    println!();
    for origin in ["A", "B"] {
        let report = registry.broadcast_from(origin)?;
        let verdict = if report.accepted > 0 {
            "adopted".green()
        } else {
            "rejected".yellow()
        };
        println!("  {} -> other: {}", origin, verdict);
    }

    println!();
    println!("{}", "After merge:".bold());
    for id in ["A", "B"] {
        if let Some(node) = registry.node(id) {
            print_validity(id, node);
        }
    }
    Ok(())
}
