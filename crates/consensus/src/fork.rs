//! Fork choice by cumulative work.
//!
//! A candidate chain replaces the local one only when it shares the local
//! genesis, its blocks check out, it is not shorter, and its total work
//! (`Σ 2^difficulty`) is strictly greater. Equal work keeps the local chain.

use crate::pow::total_work;
use crate::validator::{BlockValidator, ValidationError};
use powchain_core::Block;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fork-choice options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForkChoiceConfig {
    /// Also validate the candidate's last block. When `false` only the
    /// interior blocks `1..len-1` are checked.
    pub verify_tip: bool,
}

/// Why a candidate chain was not adopted.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ForkRejection {
    #[error("candidate chain is empty")]
    EmptyCandidate,

    #[error("candidate chain does not start from our genesis block")]
    GenesisMismatch,

    #[error("candidate block at position {position} is invalid: {source}")]
    InvalidBlock {
        position: usize,
        #[source]
        source: ValidationError,
    },

    #[error("candidate chain is shorter ({candidate} < {current})")]
    Shorter { candidate: usize, current: usize },

    #[error("candidate work {candidate} does not exceed current work {current}")]
    InsufficientWork { candidate: u128, current: u128 },
}

impl ForkRejection {
    /// Whether the rejection came from a block failing its checks.
    pub fn is_invalid_block(&self) -> bool {
        matches!(self, ForkRejection::InvalidBlock { .. })
    }
}

/// Decide whether `candidate` should replace `current`.
pub fn evaluate(
    current: &[Block],
    candidate: &[Block],
    config: &ForkChoiceConfig,
) -> Result<(), ForkRejection> {
    let candidate_genesis = candidate.first().ok_or(ForkRejection::EmptyCandidate)?;
    match current.first() {
        Some(genesis) if genesis.hash == candidate_genesis.hash => {}
        _ => return Err(ForkRejection::GenesisMismatch),
    }

    let end = if config.verify_tip {
        candidate.len()
    } else {
        candidate.len().saturating_sub(1)
    };
    BlockValidator::validate_range(candidate, end)
        .map_err(|(position, source)| ForkRejection::InvalidBlock { position, source })?;

    if candidate.len() < current.len() {
        return Err(ForkRejection::Shorter {
            candidate: candidate.len(),
            current: current.len(),
        });
    }

    let candidate_work = total_work(candidate);
    let current_work = total_work(current);
    if candidate_work <= current_work {
        return Err(ForkRejection::InsufficientWork {
            candidate: candidate_work,
            current: current_work,
        });
    }

    Ok(())
}
