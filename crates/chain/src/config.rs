//! Engine configuration.

use crate::mempool::MempoolConfig;
use powchain_consensus::{DifficultyConfig, ForkChoiceConfig, RewardSchedule};
use powchain_contracts::StakingConfig;
use powchain_core::Amount;
use serde::{Deserialize, Serialize};

/// Everything a [`Blockchain`](crate::Blockchain) needs at construction.
///
/// Every field has a default, so a partial JSON document is enough.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    /// Difficulty used for genesis and the first blocks.
    pub initial_difficulty: u32,
    /// Transactions taken from the mempool per block, excluding the coinbase.
    pub max_transactions_per_block: usize,
    pub base_reward: Amount,
    pub halving_interval: u64,
    pub difficulty: DifficultyConfig,
    pub staking: StakingConfig,
    pub fork_choice: ForkChoiceConfig,
    pub mempool: MempoolConfig,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            initial_difficulty: 1,
            max_transactions_per_block: 5,
            base_reward: Amount::from_whole(1),
            halving_interval: 200,
            difficulty: DifficultyConfig::default(),
            staking: StakingConfig::default(),
            fork_choice: ForkChoiceConfig::default(),
            mempool: MempoolConfig::default(),
        }
    }
}

impl ChainConfig {
    pub fn with_difficulty(mut self, difficulty: u32) -> Self {
        self.initial_difficulty = difficulty;
        self
    }

    pub fn reward_schedule(&self) -> RewardSchedule {
        RewardSchedule::new(self.base_reward, self.halving_interval)
    }
}
