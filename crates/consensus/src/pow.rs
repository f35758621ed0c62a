//! Proof-of-work policy: difficulty bounds, retargeting and chain work.
//!
//! Difficulty is the number of leading zero hex characters a block hash
//! must have. Every `adjust_every` blocks the average mining time of the
//! most recent window is compared against the target block time and the
//! difficulty moves by one step in the direction that brings it closer.

use powchain_core::Block;
use serde::{Deserialize, Serialize};

/// Retargeting parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DifficultyConfig {
    /// Retarget when the chain length is a multiple of this.
    pub adjust_every: u64,
    /// Desired average mining time per block.
    pub target_block_time_secs: u64,
    /// Relative half-width of the band around the target that leaves difficulty unchanged.
    pub tolerance: f64,
    pub min: u32,
    pub max: u32,
}

impl Default for DifficultyConfig {
    fn default() -> Self {
        Self {
            adjust_every: 40,
            target_block_time_secs: 20,
            tolerance: 0.2,
            min: 1,
            max: 10,
        }
    }
}

impl DifficultyConfig {
    /// Clamp a requested difficulty into `[min, max]`.
    pub fn clamp(&self, difficulty: u32) -> u32 {
        difficulty.clamp(self.min, self.max.max(self.min))
    }

    pub fn target_ms(&self) -> f64 {
        (self.target_block_time_secs * 1000) as f64
    }

    /// Whether a chain of `chain_len` blocks is at a retarget boundary.
    pub fn is_adjustment_height(&self, chain_len: u64) -> bool {
        self.adjust_every > 0 && chain_len >= self.adjust_every && chain_len % self.adjust_every == 0
    }

    /// Difficulty to use after evaluating `chain`.
    ///
    /// The window is the last `adjust_every` non-genesis blocks; if the chain
    /// does not have that many yet, `current` is returned unchanged.
    pub fn retarget(&self, current: u32, chain: &[Block]) -> u32 {
        if !self.is_adjustment_height(chain.len() as u64) {
            return current;
        }
        let window = self.adjust_every as usize;
        let non_genesis = chain.get(1..).unwrap_or_default();
        if non_genesis.len() < window {
            return current;
        }
        let recent = &non_genesis[non_genesis.len() - window..];
        let total_ms: u64 = recent.iter().map(|b| b.mining_duration_ms).sum();
        let avg_ms = total_ms as f64 / window as f64;

        let lower = self.target_ms() * (1.0 - self.tolerance);
        let upper = self.target_ms() * (1.0 + self.tolerance);

        let mut next = current;
        if avg_ms < lower {
            next = next.saturating_add(1);
        } else if avg_ms > upper && next > self.min {
            next -= 1;
        }
        let next = self.clamp(next);
        if next != current {
            tracing::info!(from = current, to = next, avg_ms, "difficulty retargeted");
        }
        next
    }
}

/// Work contributed by one block: `2^difficulty`, saturating.
pub fn block_work(difficulty: u32) -> u128 {
    1u128.checked_shl(difficulty).unwrap_or(u128::MAX)
}

/// Cumulative work of a chain.
pub fn total_work(blocks: &[Block]) -> u128 {
    blocks
        .iter()
        .fold(0u128, |acc, b| acc.saturating_add(block_work(b.difficulty)))
}
