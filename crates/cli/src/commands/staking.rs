//! Penalty-staking walkthrough.

use super::{print_balances, print_block};
use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;
use powchain_chain::{Admission, Blockchain, ChainConfig};
use powchain_core::Amount;

/// Upper bound on blocks mined while funding the staker.
const MAX_FUNDING_BLOCKS: u32 = 1_000;

#[derive(Args)]
pub struct StakingArgs {
    /// Amount to stake
    #[arg(short, long, default_value = "10")]
    amount: Amount,

    /// Blocks to wait between deposit and withdrawal
    #[arg(long, default_value = "19")]
    hold: u64,

    /// Base block reward used for this run
    #[arg(long)]
    base_reward: Option<Amount>,
}

pub fn run(args: StakingArgs, mut config: ChainConfig) -> Result<()> {
    if let Some(reward) = args.base_reward {
        config.base_reward = reward;
    }
    let mut chain = Blockchain::new(config);
    let (staker, staker_key) = chain.create_wallet("Staker");
    let (miner, miner_key) = chain.create_wallet("Miner");

    println!("{}", "Funding staker".bold().cyan());
    let mut mined = 0;
    while !chain.balance_of(&staker.address, false).covers(args.amount) {
        if mined >= MAX_FUNDING_BLOCKS {
            bail!("Staker could not be funded with {} after {} blocks", args.amount, mined);
        }
        let block = chain.mine_pending(&staker_key)?;
        print_block(&block);
        mined += 1;
    }

    let admission = chain.stake(&staker_key, args.amount, Amount::ZERO)?;
    let deposit_block = chain.chain_length();
    if let Admission::Dropped { reason } = admission {
        bail!("Deposit dropped: {}", reason);
    }
    println!();
    println!(
        "{} {} at block {}",
        "Staked".bold().cyan(),
        args.amount.to_string().bright_green(),
        deposit_block
    );

    for _ in 0..args.hold {
        chain.mine_pending(&miner_key)?;
    }
    let now = chain.chain_length();

    let staking = chain
        .staking_contract()
        .context("Staking contract is not registered")?;
    let withdrawable = staking.withdrawable_amount(&staker.address, now);
    println!();
    println!("{}", format!("Position at block {}", now).bold());
    println!("  {}", staking.configuration().bright_black());
    println!("  principal:    {}", staking.stake_amount(&staker.address));
    println!("  reward:       {}", staking.pending_reward(&staker.address, now));
    println!("  penalty:      {}", staking.penalty(&staker.address, now));
    println!("  withdrawable: {}", withdrawable.to_string().bright_green());
    println!("  net payout:   {}", staking.net_withdrawable(&staker.address, now));

    chain.withdraw_stake(&staker.address, withdrawable)?;
    let payout = chain
        .mempool()
        .iter()
        .last()
        .map(|tx| tx.amount)
        .unwrap_or_default();
    println!("  payout:       {}", payout.to_string().bright_green());

    let block = chain.mine_pending(&miner_key)?;
    println!();
    print_block(&block);

    println!();
    println!("{}", "Balances:".bold());
    print_balances(&chain, &[&staker, &miner]);
    println!(
        "  {:<12} {} {}",
        "Contract",
        chain.staking_address().as_str().bright_black(),
        chain.balance_of(&chain.staking_address(), false).to_string().bright_green()
    );
    Ok(())
}
