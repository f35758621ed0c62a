//! Penalty staking: deposits earn a per-block reward, early exits pay a penalty.

use crate::view::LedgerView;
use powchain_core::{Address, Amount, Transaction};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Residual stake at or below this is treated as fully withdrawn.
pub const STAKE_EPSILON: Amount = Amount::from_units(10);

/// Staking parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StakingConfig {
    /// Reward per held block per staked coin.
    pub reward_per_block_per_token: Amount,
    /// Blocks a stake must be held to avoid the penalty.
    pub lock_period_blocks: u64,
    /// Fraction of the withdrawn principal forfeited on early exit.
    pub early_penalty: Amount,
}

impl Default for StakingConfig {
    fn default() -> Self {
        Self {
            reward_per_block_per_token: Amount::from_units(100_000),
            lock_period_blocks: 20,
            early_penalty: Amount::from_units(20_000_000),
        }
    }
}

/// Breakdown of a withdrawal request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WithdrawalQuote {
    pub held_blocks: u64,
    pub full_withdrawable: Amount,
    pub principal_portion: Amount,
    pub reward_portion: Amount,
    pub penalty: Amount,
    pub payout: Amount,
}

/// Deposits are transfers *to* the contract; withdrawals are transfers *from*
/// it, with the requested amount interpreted as a share of the staker's full
/// withdrawable balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PenaltyStakingContract {
    address: Address,
    config: StakingConfig,
    stakes: BTreeMap<Address, Amount>,
    stake_start_blocks: BTreeMap<Address, u64>,
    last_validation_error: Option<String>,
}

impl PenaltyStakingContract {
    pub fn new(address: Address, config: StakingConfig) -> Self {
        Self {
            address,
            config,
            stakes: BTreeMap::new(),
            stake_start_blocks: BTreeMap::new(),
            last_validation_error: None,
        }
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn config(&self) -> &StakingConfig {
        &self.config
    }

    pub fn lock_period(&self) -> u64 {
        self.config.lock_period_blocks
    }

    pub fn last_validation_error(&self) -> Option<&str> {
        self.last_validation_error.as_deref()
    }

    pub(crate) fn set_last_validation_error(&mut self, error: Option<String>) {
        self.last_validation_error = error;
    }

    /// Current principal staked by `staker`.
    pub fn stake_amount(&self, staker: &Address) -> Amount {
        self.stakes.get(staker).copied().unwrap_or_default()
    }

    pub fn stake_start_block(&self, staker: &Address) -> Option<u64> {
        self.stake_start_blocks.get(staker).copied()
    }

    /// Addresses with a non-zero stake.
    pub fn stakers(&self) -> impl Iterator<Item = &Address> {
        self.stakes
            .iter()
            .filter(|(_, amount)| !amount.is_zero())
            .map(|(address, _)| address)
    }

    pub fn all_stakes(&self) -> &BTreeMap<Address, Amount> {
        &self.stakes
    }

    fn held_blocks(&self, staker: &Address, current_block: u64) -> u64 {
        self.stake_start_block(staker)
            .map(|start| current_block.saturating_sub(start))
            .unwrap_or(0)
    }

    /// Reward accrued on the whole stake so far.
    pub fn pending_reward(&self, staker: &Address, current_block: u64) -> Amount {
        self.stake_amount(staker)
            .mul_rate(self.config.reward_per_block_per_token)
            .mul_int(self.held_blocks(staker, current_block))
    }

    /// Penalty that withdrawing the whole stake now would incur.
    pub fn penalty(&self, staker: &Address, current_block: u64) -> Amount {
        if self.held_blocks(staker, current_block) >= self.config.lock_period_blocks {
            return Amount::ZERO;
        }
        self.stake_amount(staker).mul_rate(self.config.early_penalty)
    }

    /// Principal plus accrued reward, before any early penalty.
    ///
    /// This gross figure is what a withdrawal request is measured against.
    /// See [`net_withdrawable`](Self::net_withdrawable) for what a full
    /// withdrawal would actually pay out.
    pub fn withdrawable_amount(&self, staker: &Address, current_block: u64) -> Amount {
        self.stake_amount(staker)
            .saturating_add(self.pending_reward(staker, current_block))
    }

    /// Payout of a full withdrawal now: principal plus reward minus penalty.
    pub fn net_withdrawable(&self, staker: &Address, current_block: u64) -> Amount {
        self.withdrawable_amount(staker, current_block)
            .saturating_sub(self.penalty(staker, current_block))
    }

    /// Price a withdrawal of `requested` without touching any state.
    pub fn quote_withdrawal(
        &self,
        staker: &Address,
        requested: Amount,
        current_block: u64,
    ) -> Result<WithdrawalQuote, String> {
        let principal = self.stake_amount(staker);
        if principal.is_zero() {
            return Err(format!("{} has no stake to withdraw", staker));
        }
        let start = self
            .stake_start_block(staker)
            .ok_or_else(|| format!("no stake start block recorded for {}", staker))?;

        let held_blocks = current_block.saturating_sub(start);
        let full_reward = principal
            .mul_rate(self.config.reward_per_block_per_token)
            .mul_int(held_blocks);
        let full_withdrawable = principal.saturating_add(full_reward);
        if requested > full_withdrawable {
            return Err(format!(
                "requested {} exceeds withdrawable amount {}",
                requested, full_withdrawable
            ));
        }

        let principal_portion = principal.mul_div(requested, full_withdrawable);
        let reward_portion = full_reward.mul_div(requested, full_withdrawable);
        let penalty = if held_blocks < self.config.lock_period_blocks {
            principal_portion.mul_rate(self.config.early_penalty)
        } else {
            Amount::ZERO
        };
        let payout = principal_portion
            .saturating_add(reward_portion)
            .saturating_sub(penalty);
        if payout.is_zero() {
            return Err(format!("withdrawal payout for {} would be zero", staker));
        }

        Ok(WithdrawalQuote {
            held_blocks,
            full_withdrawable,
            principal_portion,
            reward_portion,
            penalty,
            payout,
        })
    }

    pub fn validate_transaction(
        &mut self,
        _view: &dyn LedgerView,
        tx: &mut Transaction,
        current_block: u64,
    ) -> bool {
        if tx.to == self.address {
            self.deposit(tx, current_block);
            return true;
        }
        if tx.from == self.address {
            return self.withdraw(tx, current_block);
        }
        self.last_validation_error = Some(format!(
            "transaction does not involve staking contract {}",
            self.address
        ));
        false
    }

    fn deposit(&mut self, tx: &Transaction, current_block: u64) {
        let stake = self.stakes.entry(tx.from.clone()).or_default();
        *stake = stake.saturating_add(tx.amount);
        self.stake_start_blocks
            .entry(tx.from.clone())
            .or_insert(current_block);
        self.last_validation_error = None;
        tracing::debug!(staker = %tx.from, amount = %tx.amount, block = current_block, "stake deposited");
    }

    fn withdraw(&mut self, tx: &mut Transaction, current_block: u64) -> bool {
        let staker = tx.to.clone();
        let quote = match self.quote_withdrawal(&staker, tx.amount, current_block) {
            Ok(quote) => quote,
            Err(reason) => {
                tracing::debug!(%staker, %reason, "withdrawal rejected");
                self.last_validation_error = Some(reason);
                return false;
            }
        };

        tx.amount = quote.payout;

        let remaining = self
            .stake_amount(&staker)
            .saturating_sub(quote.principal_portion);
        if remaining <= STAKE_EPSILON {
            self.stakes.insert(staker.clone(), Amount::ZERO);
            self.stake_start_blocks.remove(&staker);
        } else {
            self.stakes.insert(staker.clone(), remaining);
        }
        self.last_validation_error = None;
        tracing::debug!(
            %staker,
            payout = %quote.payout,
            penalty = %quote.penalty,
            remaining = %remaining,
            "stake withdrawn"
        );
        true
    }

    pub fn configuration(&self) -> String {
        format!(
            "PenaltyStakingContract: reward per block per token = {}, lock period = {} blocks, early penalty = {}",
            self.config.reward_per_block_per_token,
            self.config.lock_period_blocks,
            self.config.early_penalty
        )
    }
}
