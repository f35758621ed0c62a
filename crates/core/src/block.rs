//! Blocks and proof-of-work mining.

use crate::crypto::{Keypair, PublicKey, Signature};
use crate::hash::{hash, Hash};
use crate::transaction::Transaction;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::time::Instant;

/// Genesis timestamp: 2025-01-01T00:00:00Z.
pub const GENESIS_TIMESTAMP_SECS: i64 = 1_735_689_600;

/// A block of transactions sealed by proof-of-work and signed by its miner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Position in the chain (0 for genesis).
    pub index: u64,
    /// Transactions, coinbase first for mined blocks.
    pub transactions: Vec<Transaction>,
    /// Creation time.
    pub timestamp: DateTime<Utc>,
    /// Hash of the previous block (None for genesis).
    pub prev_hash: Option<Hash>,
    /// Stored hash, set by `mine`.
    pub hash: Hash,
    /// Miner signature over `hash`.
    pub signature: Signature,
    /// Public key recorded by the miner at signing time.
    pub miner_public_key: Option<PublicKey>,
    /// Proof-of-work counter.
    pub nonce: u64,
    /// Required number of leading zero hex characters.
    pub difficulty: u32,
    /// Wall-clock time spent in `mine`.
    pub mining_duration_ms: u64,
}

impl Block {
    /// Create a new, empty, unmined block stamped with the current time.
    pub fn new(index: u64, prev_hash: Hash) -> Self {
        Self::with_timestamp(index, Some(prev_hash), Utc::now())
    }

    fn with_timestamp(index: u64, prev_hash: Option<Hash>, timestamp: DateTime<Utc>) -> Self {
        let mut block = Self {
            index,
            transactions: Vec::new(),
            timestamp,
            prev_hash,
            hash: Hash::ZERO,
            signature: Signature::default(),
            miner_public_key: None,
            nonce: 0,
            difficulty: 0,
            mining_duration_ms: 0,
        };
        block.hash = block.compute_hash();
        block
    }

    /// Create and mine the genesis block.
    ///
    /// The timestamp is fixed, so every chain created with the same
    /// difficulty shares the same genesis hash.
    pub fn genesis(difficulty: u32) -> Self {
        let timestamp = DateTime::<Utc>::from_timestamp(GENESIS_TIMESTAMP_SECS, 0).unwrap_or_default();
        let mut block = Self::with_timestamp(0, None, timestamp);
        block.mine(difficulty);
        block
    }

    /// Replace the block's transactions.
    pub fn set_transactions(&mut self, transactions: Vec<Transaction>) {
        self.transactions = transactions;
    }

    /// Check if this is the genesis block.
    pub fn is_genesis(&self) -> bool {
        self.index == 0
    }

    /// Get the number of transactions in this block.
    pub fn tx_count(&self) -> usize {
        self.transactions.len()
    }

    fn canonical_string(&self) -> String {
        let mut raw = String::new();
        let prev = self.prev_hash.map(|h| h.to_hex()).unwrap_or_default();
        let _ = write!(
            raw,
            "{}{}{}{}{}",
            self.index,
            prev,
            self.timestamp.timestamp_millis(),
            self.nonce,
            self.difficulty
        );
        for tx in &self.transactions {
            raw.push_str(&tx.canonical_payload());
            raw.push('|');
        }
        raw
    }

    /// Hash of the current field values, excluding `hash` and `signature`.
    pub fn compute_hash(&self) -> Hash {
        hash(self.canonical_string().as_bytes())
    }

    /// Search nonces until the hash has `difficulty` leading zero hex characters.
    pub fn mine(&mut self, difficulty: u32) {
        self.difficulty = difficulty;
        let started = Instant::now();
        loop {
            self.nonce = self.nonce.wrapping_add(1);
            self.hash = self.compute_hash();
            if self.hash.meets_difficulty(difficulty) {
                break;
            }
        }
        self.mining_duration_ms = started.elapsed().as_millis() as u64;
        tracing::debug!(
            index = self.index,
            nonce = self.nonce,
            difficulty,
            ms = self.mining_duration_ms,
            "block mined"
        );
    }

    /// Sign the stored hash and record the miner's public key.
    pub fn sign(&mut self, keypair: &Keypair) {
        self.signature = keypair.sign_hash(&self.hash);
        self.miner_public_key = Some(keypair.public_key.clone());
    }

    /// Create a signed block.
    pub fn signed(mut self, keypair: &Keypair) -> Self {
        self.sign(keypair);
        self
    }

    /// Verify the miner signature. A block indexed 0 is treated as genesis
    /// and always passes, so chain validation must check index continuity.
    pub fn verify(&self) -> bool {
        if self.is_genesis() {
            return true;
        }
        match &self.miner_public_key {
            Some(public_key) => public_key.verify_hash(&self.hash, &self.signature).is_ok(),
            None => false,
        }
    }

    /// The stored hash matches a fresh recomputation and meets the difficulty target.
    pub fn has_valid_proof(&self) -> bool {
        self.hash == self.compute_hash() && self.hash.meets_difficulty(self.difficulty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amount::Amount;

    fn transfer(keypair: &Keypair, amount: &str) -> Transaction {
        let to = Keypair::generate().address();
        Transaction::transfer(keypair.address(), to, amount.parse().unwrap(), Amount::ZERO)
            .signed(keypair)
    }

    #[test]
    fn test_genesis_block() {
        let genesis = Block::genesis(1);

        assert!(genesis.is_genesis());
        assert_eq!(genesis.index, 0);
        assert_eq!(genesis.prev_hash, None);
        assert!(genesis.transactions.is_empty());
        assert!(genesis.has_valid_proof());
        assert!(genesis.verify());
    }

    #[test]
    fn test_genesis_is_deterministic() {
        assert_eq!(Block::genesis(2).hash, Block::genesis(2).hash);
    }

    #[test]
    fn test_block_hash_deterministic() {
        let block = Block::new(1, Hash::ZERO);

        let h1 = block.compute_hash();
        let h2 = block.compute_hash();
        assert_eq!(h1, h2);
    }

    #[test]
    fn test_mine_meets_target() {
        for difficulty in 0..=3 {
            let mut block = Block::new(1, Hash::ZERO);
            block.mine(difficulty);

            assert!(block.hash.to_hex().starts_with(&"0".repeat(difficulty as usize)));
            assert!(block.has_valid_proof());
            assert_eq!(block.difficulty, difficulty);
        }
    }

    #[test]
    fn test_mine_difficulty_zero_takes_one_step() {
        let mut block = Block::new(1, Hash::ZERO);
        block.mine(0);
        assert_eq!(block.nonce, 1);
        assert!(block.has_valid_proof());
    }

    #[test]
    fn test_transaction_order_changes_hash() {
        let keypair = Keypair::generate();
        let tx1 = transfer(&keypair, "1");
        let tx2 = transfer(&keypair, "2");

        let mut a = Block::new(1, Hash::ZERO);
        a.set_transactions(vec![tx1.clone(), tx2.clone()]);
        let mut b = a.clone();
        b.set_transactions(vec![tx2, tx1]);

        assert_ne!(a.compute_hash(), b.compute_hash());
    }

    #[test]
    fn test_tampering_breaks_proof() {
        let keypair = Keypair::generate();
        let mut block = Block::new(1, Hash::ZERO);
        block.set_transactions(vec![transfer(&keypair, "1")]);
        block.mine(1);
        assert!(block.has_valid_proof());

        block.transactions[0].amount = "100".parse().unwrap();
        assert!(!block.has_valid_proof());
    }

    #[test]
    fn test_block_signing() {
        let keypair = Keypair::generate();
        let mut block = Block::new(1, Hash::ZERO);
        block.mine(1);
        let block = block.signed(&keypair);

        assert!(block.verify());
        assert_eq!(block.miner_public_key, Some(keypair.public_key.clone()));
    }

    #[test]
    fn test_unsigned_block_fails_verification() {
        let mut block = Block::new(1, Hash::ZERO);
        block.mine(1);
        assert!(!block.verify());
    }

    #[test]
    fn test_wrong_key_fails_verification() {
        let keypair1 = Keypair::generate();
        let keypair2 = Keypair::generate();

        let mut block = Block::new(1, Hash::ZERO);
        block.mine(1);
        let mut block = block.signed(&keypair1);
        block.miner_public_key = Some(keypair2.public_key.clone());

        assert!(!block.verify());
    }
}
