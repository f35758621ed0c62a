//! Block and chain integrity checks.
//!
//! A non-genesis block is valid relative to its parent when its index follows
//! the parent's, it links to the parent's hash, its stored hash matches a
//! recomputation, its miner signature verifies and its hash meets its own
//! difficulty.

use powchain_core::Block;
use thiserror::Error;

/// Errors that can occur during validation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("block at index {found} should have index {expected}")]
    InvalidIndex { expected: u64, found: u64 },

    #[error("block {index} does not link to its parent's hash")]
    InvalidPrevHash { index: u64 },

    #[error("block {index} stored hash does not match its contents")]
    HashMismatch { index: u64 },

    #[error("block {index} miner signature verification failed")]
    InvalidSignature { index: u64 },

    #[error("block {index} hash does not meet difficulty {difficulty}")]
    InsufficientProof { index: u64, difficulty: u32 },
}

pub type Result<T> = std::result::Result<T, ValidationError>;

/// Block validator.
pub struct BlockValidator;

impl BlockValidator {
    /// Validate `block` as the successor of `parent`.
    pub fn validate_block(block: &Block, parent: &Block) -> Result<()> {
        let index = block.index;

        // Checked first: `Block::verify` exempts index 0 from signing.
        let expected = parent.index.saturating_add(1);
        if index != expected {
            return Err(ValidationError::InvalidIndex { expected, found: index });
        }

        if block.prev_hash != Some(parent.hash) {
            return Err(ValidationError::InvalidPrevHash { index });
        }

        if block.hash != block.compute_hash() {
            return Err(ValidationError::HashMismatch { index });
        }

        if !block.verify() {
            return Err(ValidationError::InvalidSignature { index });
        }

        if !block.hash.meets_difficulty(block.difficulty) {
            return Err(ValidationError::InsufficientProof {
                index,
                difficulty: block.difficulty,
            });
        }

        Ok(())
    }

    /// Validate `chain[1..end]` against their parents, returning the first
    /// failing position and its error.
    pub fn validate_range(chain: &[Block], end: usize) -> std::result::Result<(), (usize, ValidationError)> {
        let end = end.min(chain.len());
        for i in 1..end {
            Self::validate_block(&chain[i], &chain[i - 1]).map_err(|e| (i, e))?;
        }
        Ok(())
    }

    /// Validate every non-genesis block of `chain`.
    pub fn validate_chain(chain: &[Block]) -> Result<()> {
        Self::validate_range(chain, chain.len()).map_err(|(_, e)| e)
    }

    /// Position of the first block that fails validation, if any.
    pub fn first_invalid_index(chain: &[Block]) -> Option<usize> {
        Self::validate_range(chain, chain.len()).err().map(|(i, _)| i)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use powchain_core::{Amount, Keypair, Transaction};

    fn build_chain(len: usize, keypair: &Keypair) -> Vec<Block> {
        let mut chain = vec![Block::genesis(1)];
        for i in 1..len {
            let prev = chain[i - 1].hash;
            let mut block = Block::new(i as u64, prev);
            block.set_transactions(vec![Transaction::coinbase(keypair.address(), Amount::from_whole(1))]);
            block.mine(1);
            chain.push(block.signed(keypair));
        }
        chain
    }

    #[test]
    fn test_valid_chain() {
        let keypair = Keypair::generate();
        let chain = build_chain(4, &keypair);

        assert!(BlockValidator::validate_chain(&chain).is_ok());
        assert_eq!(BlockValidator::first_invalid_index(&chain), None);
    }

    #[test]
    fn test_genesis_only_chain_is_valid() {
        assert!(BlockValidator::validate_chain(&[Block::genesis(1)]).is_ok());
    }

    #[test]
    fn test_tampered_transaction_detected() {
        let keypair = Keypair::generate();
        let mut chain = build_chain(4, &keypair);
        chain[2].transactions[0].amount = Amount::from_whole(50);

        assert_eq!(BlockValidator::first_invalid_index(&chain), Some(2));
        assert_eq!(
            BlockValidator::validate_chain(&chain),
            Err(ValidationError::HashMismatch { index: 2 })
        );
    }

    #[test]
    fn test_broken_link_detected() {
        let keypair = Keypair::generate();
        let mut chain = build_chain(4, &keypair);
        chain[3].prev_hash = Some(chain[1].hash);

        assert_eq!(
            BlockValidator::validate_chain(&chain),
            Err(ValidationError::InvalidPrevHash { index: 3 })
        );
    }

    #[test]
    fn test_missing_signature_detected() {
        let keypair = Keypair::generate();
        let mut chain = build_chain(3, &keypair);
        chain[1].miner_public_key = None;

        assert_eq!(BlockValidator::first_invalid_index(&chain), Some(1));
    }

    #[test]
    fn test_insufficient_proof_detected() {
        let keypair = Keypair::generate();
        let mut chain = build_chain(2, &keypair);
        // Claim far more work than was done, then re-mine at zero so the
        // hash matches but the proof does not.
        let mut block = chain[1].clone();
        block.mine(0);
        block.difficulty = 64;
        block.hash = block.compute_hash();
        chain[1] = block.signed(&keypair);

        assert!(matches!(
            BlockValidator::validate_chain(&chain),
            Err(ValidationError::InsufficientProof { index: 1, difficulty: 64 })
        ));
    }

    #[test]
    fn test_interior_block_posing_as_genesis_detected() {
        let keypair = Keypair::generate();
        let forger = Keypair::generate();
        let mut chain = build_chain(2, &keypair);

        let mut forged = Block::new(0, chain[1].hash);
        forged.set_transactions(vec![Transaction::coinbase(forger.address(), Amount::from_whole(1000))]);
        forged.mine(1);
        assert!(forged.verify());
        chain.push(forged);

        assert_eq!(BlockValidator::first_invalid_index(&chain), Some(2));
        assert_eq!(
            BlockValidator::validate_chain(&chain),
            Err(ValidationError::InvalidIndex { expected: 2, found: 0 })
        );
    }

    #[test]
    fn test_skipped_index_detected() {
        let keypair = Keypair::generate();
        let mut chain = build_chain(3, &keypair);
        let mut block = Block::new(5, chain[1].hash);
        block.mine(1);
        chain[2] = block.signed(&keypair);

        assert_eq!(
            BlockValidator::validate_chain(&chain),
            Err(ValidationError::InvalidIndex { expected: 2, found: 5 })
        );
    }

    #[test]
    fn test_validate_range_skips_tail() {
        let keypair = Keypair::generate();
        let mut chain = build_chain(4, &keypair);
        chain[3].miner_public_key = None;

        assert!(BlockValidator::validate_range(&chain, 3).is_ok());
        assert!(BlockValidator::validate_range(&chain, 4).is_err());
    }
}
