//! Proof-of-work consensus rules for powchain.
//!
//! This crate holds the policy side of the chain, independent of any
//! engine state:
//! - Difficulty bounds and periodic retargeting
//! - The halving block reward schedule
//! - Block and chain integrity validation
//! - Fork choice by cumulative work
//!
//! # Example
//!
//! ```rust
//! use powchain_consensus::{evaluate, BlockValidator, ForkChoiceConfig, RewardSchedule};
//! use powchain_core::{Amount, Block, Keypair};
//!
//! let miner = Keypair::generate();
//! let genesis = Block::genesis(1);
//!
//! let mut block = Block::new(1, genesis.hash);
//! block.mine(1);
//! let chain = vec![genesis.clone(), block.signed(&miner)];
//!
//! assert!(BlockValidator::validate_chain(&chain).is_ok());
//! assert_eq!(RewardSchedule::default().reward_at(1), Amount::from_whole(1));
//! assert!(evaluate(&[genesis], &chain, &ForkChoiceConfig::default()).is_ok());
//! ```

pub mod fork;
pub mod pow;
pub mod reward;
pub mod validator;

pub use fork::{evaluate, ForkChoiceConfig, ForkRejection};
pub use pow::{block_work, total_work, DifficultyConfig};
pub use reward::RewardSchedule;
pub use validator::{BlockValidator, ValidationError};
