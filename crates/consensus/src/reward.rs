//! Block reward schedule.

use powchain_core::Amount;
use serde::{Deserialize, Serialize};

/// Base reward halved once every `halving_interval` blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardSchedule {
    pub base_reward: Amount,
    pub halving_interval: u64,
}

impl Default for RewardSchedule {
    fn default() -> Self {
        Self {
            base_reward: Amount::from_whole(1),
            halving_interval: 200,
        }
    }
}

impl RewardSchedule {
    pub fn new(base_reward: Amount, halving_interval: u64) -> Self {
        Self {
            base_reward,
            halving_interval,
        }
    }

    /// Number of halvings applied at `block_index`.
    pub fn halvings(&self, block_index: u64) -> u64 {
        if self.halving_interval == 0 {
            return 0;
        }
        block_index / self.halving_interval
    }

    /// Coinbase reward for the block at `block_index`. Genesis earns nothing.
    pub fn reward_at(&self, block_index: u64) -> Amount {
        if block_index < 1 {
            return Amount::ZERO;
        }
        let halvings = u32::try_from(self.halvings(block_index)).unwrap_or(u32::MAX);
        self.base_reward.halve(halvings)
    }
}
