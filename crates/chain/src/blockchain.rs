//! The chain engine.
//!
//! A [`Blockchain`] owns one node's view of the ledger: the block list, the
//! mempool, registered wallets and contracts, and the current difficulty.
//! Balances are never stored; they are folded from history on demand.

use crate::balances::{self, Balances};
use crate::config::ChainConfig;
use crate::mempool::{Mempool, MempoolStats};
use powchain_consensus::{evaluate, total_work, BlockValidator, ForkRejection, RewardSchedule};
use powchain_contracts::{LedgerView, PenaltyStakingContract, SmartContract};
use powchain_core::{
    Address, Amount, Balance, Block, CryptoError, Hash, Keypair, PublicKey, Transaction, Wallet,
};
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

/// Display name of the wallet backing the built-in staking contract.
pub const STAKING_WALLET_NAME: &str = "Penalty Staking Contract Wallet";

/// Errors that can occur during blockchain operations.
#[derive(Debug, Error)]
pub enum BlockchainError {
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("transaction signature verification failed")]
    InvalidSignature,

    #[error("insufficient funds for {address}: required {required}, available {available}")]
    InsufficientFunds {
        address: Address,
        required: Amount,
        available: Balance,
    },

    #[error("rejected by sender contract: {0}")]
    ContractRejected(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("mempool error: {0}")]
    Mempool(#[from] crate::mempool::MempoolError),
}

pub type Result<T> = std::result::Result<T, BlockchainError>;

/// Outcome of a successful [`Blockchain::create_transaction`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// Added to the mempool under this entry id.
    Queued { id: u64 },
    /// Refused by the receiver's contract. Not an error; nothing was stored.
    Dropped { reason: String },
}

impl Admission {
    pub fn is_queued(&self) -> bool {
        matches!(self, Admission::Queued { .. })
    }
}

/// What contracts get to see while the engine validates a transaction.
struct ChainView<'a> {
    blocks: &'a [Block],
}

impl LedgerView for ChainView<'_> {
    fn height(&self) -> u64 {
        self.blocks.len() as u64
    }
}

/// One node's chain state.
#[derive(Debug)]
pub struct Blockchain {
    config: ChainConfig,
    rewards: RewardSchedule,
    blocks: Vec<Block>,
    mempool: Mempool,
    wallets: BTreeMap<Address, Wallet>,
    contracts: BTreeMap<Address, SmartContract>,
    difficulty: u32,
    node_keypair: Keypair,
    staking_keypair: Keypair,
}

impl Blockchain {
    /// Create a chain with a freshly mined genesis block and the built-in
    /// penalty-staking contract.
    pub fn new(config: ChainConfig) -> Self {
        let difficulty = config.difficulty.clamp(config.initial_difficulty);
        let genesis = Block::genesis(difficulty);
        let staking_keypair = Keypair::generate();

        let mut chain = Self {
            rewards: config.reward_schedule(),
            mempool: Mempool::with_config(config.mempool),
            blocks: vec![genesis],
            wallets: BTreeMap::new(),
            contracts: BTreeMap::new(),
            difficulty,
            node_keypair: Keypair::generate(),
            staking_keypair: staking_keypair.clone(),
            config,
        };

        let staking_wallet = chain.register_wallet(staking_keypair.public_key.clone(), STAKING_WALLET_NAME);
        chain.register_contract(
            PenaltyStakingContract::new(staking_wallet.address, chain.config.staking).into(),
        );
        chain
    }

    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    // ---- wallets ----

    /// Register (or replace) the wallet for `public_key`.
    pub fn register_wallet(&mut self, public_key: PublicKey, display_name: impl Into<String>) -> Wallet {
        let wallet = Wallet::new(public_key, display_name);
        tracing::info!(address = %wallet.address, name = %wallet.display_name, "wallet registered");
        self.wallets.insert(wallet.address.clone(), wallet.clone());
        wallet
    }

    /// Generate a keypair and register its wallet.
    pub fn create_wallet(&mut self, display_name: impl Into<String>) -> (Wallet, Keypair) {
        let keypair = Keypair::generate();
        let wallet = self.register_wallet(keypair.public_key.clone(), display_name);
        (wallet, keypair)
    }

    pub fn wallet(&self, address: &Address) -> Option<&Wallet> {
        self.wallets.get(address)
    }

    pub fn wallets(&self) -> impl Iterator<Item = &Wallet> {
        self.wallets.values()
    }

    // ---- contracts ----

    /// Bind `contract` to its address, replacing any previous binding.
    pub fn register_contract(&mut self, contract: SmartContract) {
        tracing::info!(address = %contract.address(), kind = contract.kind(), "contract registered");
        self.contracts.insert(contract.address().clone(), contract);
    }

    pub fn contract(&self, address: &Address) -> Option<&SmartContract> {
        self.contracts.get(address)
    }

    pub fn contracts(&self) -> impl Iterator<Item = &SmartContract> {
        self.contracts.values()
    }

    pub fn staking_address(&self) -> Address {
        self.staking_keypair.address()
    }

    pub fn staking_contract(&self) -> Option<&PenaltyStakingContract> {
        self.contract(&self.staking_address())
            .and_then(SmartContract::as_staking)
    }

    pub fn staking_keypair(&self) -> &Keypair {
        &self.staking_keypair
    }

    pub fn node_keypair(&self) -> &Keypair {
        &self.node_keypair
    }

    // ---- transactions ----

    /// Validate `tx` and queue it in the mempool.
    ///
    /// Checks run in a fixed order: sender signature, sender balance (skipped
    /// for contract and coinbase senders), sender contract, receiver
    /// contract. A sender contract rejection is an error; a receiver contract
    /// rejection drops the transaction without one.
    ///
    /// Contracts validate against working copies that are committed only
    /// when the transaction is queued, so a rejected transaction leaves
    /// contract state untouched apart from its last validation error.
    pub fn create_transaction(&mut self, tx: Transaction) -> Result<Admission> {
        let wallet = self
            .wallets
            .get(&tx.from)
            .ok_or(BlockchainError::InvalidSignature)?;
        tx.verify(&wallet.public_key)
            .map_err(|_| BlockchainError::InvalidSignature)?;

        if !self.contracts.contains_key(&tx.from) && !tx.is_coinbase() {
            let available = self.balance_of(&tx.from, true);
            let required = tx.total_cost();
            if !available.covers(required) {
                return Err(BlockchainError::InsufficientFunds {
                    address: tx.from.clone(),
                    required,
                    available,
                });
            }
        }

        let current_block = self.blocks.len() as u64;
        let view = ChainView { blocks: &self.blocks };
        let mut working = tx.clone();

        let mut sender_contract = self.contracts.get(&tx.from).cloned();
        if let Some(contract) = sender_contract.as_mut() {
            if !contract.validate_transaction(&view, &mut working, current_block) {
                let reason = contract.last_validation_error().unwrap_or_default().to_string();
                if let Some(registered) = self.contracts.get_mut(&tx.from) {
                    registered.set_last_validation_error(Some(reason.clone()));
                }
                return Err(BlockchainError::ContractRejected(reason));
            }
        }

        let self_bound = tx.to == tx.from && sender_contract.is_some();
        let mut receiver_contract = if self_bound {
            None
        } else {
            self.contracts.get(&tx.to).cloned()
        };
        let receiver = if self_bound {
            sender_contract.as_mut()
        } else {
            receiver_contract.as_mut()
        };
        if let Some(contract) = receiver {
            if !contract.validate_transaction(&view, &mut working, current_block) {
                let reason = contract.last_validation_error().unwrap_or_default().to_string();
                if let Some(registered) = self.contracts.get_mut(&tx.to) {
                    registered.set_last_validation_error(Some(reason.clone()));
                }
                tracing::debug!(from = %tx.from, to = %tx.to, %reason, "transaction dropped by receiver contract");
                return Ok(Admission::Dropped { reason });
            }
        }

        // Staking payouts rewrite the amount; keep the queued copy verifiable.
        if working.amount != tx.amount && working.from == self.staking_keypair.address() {
            working.sign(&self.staking_keypair);
        }

        let id = self.mempool.add(working)?;
        for contract in sender_contract.into_iter().chain(receiver_contract) {
            self.contracts.insert(contract.address().clone(), contract);
        }
        tracing::debug!(id, from = %tx.from, to = %tx.to, amount = %tx.amount, "transaction queued");
        Ok(Admission::Queued { id })
    }

    /// Deposit `amount` from `staker` into the built-in staking contract.
    pub fn stake(&mut self, staker: &Keypair, amount: Amount, fee: Amount) -> Result<Admission> {
        let tx = Transaction::transfer(staker.address(), self.staking_address(), amount, fee)
            .with_note("Stake tokens")
            .signed(staker);
        self.create_transaction(tx)
    }

    /// Request a withdrawal of `amount` (a share of the full withdrawable
    /// balance) from the staking contract to `staker`.
    pub fn withdraw_stake(&mut self, staker: &Address, amount: Amount) -> Result<Admission> {
        let tx = Transaction::transfer(self.staking_address(), staker.clone(), amount, Amount::ZERO)
            .with_note("Withdraw stake")
            .signed(&self.staking_keypair);
        self.create_transaction(tx)
    }

    // ---- mining ----

    pub fn difficulty(&self) -> u32 {
        self.difficulty
    }

    /// Set the mining difficulty, clamped to the configured bounds.
    pub fn set_difficulty(&mut self, difficulty: u32) -> u32 {
        self.difficulty = self.config.difficulty.clamp(difficulty);
        self.difficulty
    }

    /// Coinbase reward for the block at `block_index`.
    pub fn current_block_reward(&self, block_index: u64) -> Amount {
        self.rewards.reward_at(block_index)
    }

    /// Mine the highest-fee pending transactions into a new block.
    ///
    /// The coinbase pays the block reward plus the selected fees to the
    /// wallet registered for `miner`'s public key. Blocks until a nonce
    /// meeting the current difficulty is found.
    pub fn mine_pending(&mut self, miner: &Keypair) -> Result<Block> {
        let miner_address = self
            .wallets
            .values()
            .find(|w| w.public_key == miner.public_key)
            .map(|w| w.address.clone())
            .ok_or_else(|| BlockchainError::NotFound(format!("wallet for miner key {}", miner.public_key.to_hex())))?;

        let selected = self.mempool.select_by_fee(self.config.max_transactions_per_block);
        let index = self.blocks.len() as u64;
        let fees: Amount = selected.iter().map(|(_, tx)| tx.fee).sum();
        let reward = self.current_block_reward(index).saturating_add(fees);

        let mut transactions = Vec::with_capacity(selected.len() + 1);
        transactions.push(Transaction::coinbase(miner_address.clone(), reward));
        transactions.extend(selected.iter().map(|(_, tx)| tx.clone()));

        let mut block = Block::new(index, self.latest_block().hash);
        block.set_transactions(transactions);
        block.mine(self.difficulty);

        self.difficulty = self.config.difficulty.retarget(self.difficulty, &self.blocks);

        block.sign(miner);
        self.blocks.push(block.clone());

        let ids: Vec<u64> = selected.iter().map(|(id, _)| *id).collect();
        self.mempool.remove_batch(&ids);

        tracing::info!(
            index,
            hash = %block.hash,
            miner = %miner_address,
            txs = block.tx_count(),
            %reward,
            ms = block.mining_duration_ms,
            "block mined"
        );
        Ok(block)
    }

    // ---- chain queries ----

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// The chain always holds at least its genesis block.
    pub fn latest_block(&self) -> &Block {
        &self.blocks[self.blocks.len() - 1]
    }

    pub fn genesis(&self) -> &Block {
        &self.blocks[0]
    }

    /// Number of blocks, including genesis.
    pub fn chain_length(&self) -> u64 {
        self.blocks.len() as u64
    }

    /// Index of the latest block.
    pub fn height(&self) -> u64 {
        self.latest_block().index
    }

    /// Look a block up by index, or failing that by hash (any case).
    pub fn find_block(&self, query: &str) -> Option<&Block> {
        let query = query.trim();
        if let Ok(index) = query.parse::<usize>() {
            return self.blocks.get(index);
        }
        self.blocks
            .iter()
            .find(|b| b.hash.to_hex().eq_ignore_ascii_case(query))
    }

    pub fn mempool(&self) -> &Mempool {
        &self.mempool
    }

    /// Balances of every address seen in history.
    pub fn balances(&self, include_mempool: bool) -> Balances {
        if include_mempool {
            balances::fold(balances::history(&self.blocks, self.mempool.iter()))
        } else {
            balances::fold(balances::history(&self.blocks, std::iter::empty()))
        }
    }

    pub fn balance_of(&self, address: &Address, include_mempool: bool) -> Balance {
        if include_mempool {
            balances::balance_of(address, balances::history(&self.blocks, self.mempool.iter()))
        } else {
            balances::balance_of(address, balances::history(&self.blocks, std::iter::empty()))
        }
    }

    // ---- validation and fork choice ----

    pub fn is_valid(&self) -> bool {
        self.first_invalid_index().is_none()
    }

    /// Index of the first block failing linkage, hash, signature or proof checks.
    pub fn first_invalid_index(&self) -> Option<usize> {
        BlockValidator::first_invalid_index(&self.blocks)
    }

    pub fn total_work(&self) -> u128 {
        total_work(&self.blocks)
    }

    /// Check whether `candidate` would replace this chain, without changing anything.
    pub fn evaluate_external_chain(&self, candidate: &[Block]) -> std::result::Result<(), ForkRejection> {
        evaluate(&self.blocks, candidate, &self.config.fork_choice)
    }

    /// Adopt `candidate` if it has strictly more cumulative work.
    pub fn try_add_external_chain(&mut self, candidate: &[Block]) -> bool {
        match self.evaluate_external_chain(candidate) {
            Ok(()) => {
                tracing::info!(
                    old_len = self.blocks.len(),
                    new_len = candidate.len(),
                    "chain replaced by external chain"
                );
                self.blocks = candidate.to_vec();
                true
            }
            Err(rejection) if rejection.is_invalid_block() => {
                tracing::warn!(%rejection, "external chain rejected");
                false
            }
            Err(rejection) => {
                tracing::debug!(%rejection, "external chain rejected");
                false
            }
        }
    }

    pub fn stats(&self) -> BlockchainStats {
        let latest = self.latest_block();
        BlockchainStats {
            height: latest.index,
            latest_block_hash: latest.hash,
            difficulty: self.difficulty,
            total_work: self.total_work(),
            wallets: self.wallets.len(),
            contracts: self.contracts.len(),
            mempool: self.mempool.stats(),
            is_valid: self.is_valid(),
        }
    }
}

impl Default for Blockchain {
    fn default() -> Self {
        Self::new(ChainConfig::default())
    }
}

/// Blockchain statistics.
#[derive(Debug, Clone, Serialize)]
pub struct BlockchainStats {
    pub height: u64,
    pub latest_block_hash: Hash,
    pub difficulty: u32,
    pub total_work: u128,
    pub wallets: usize,
    pub contracts: usize,
    pub mempool: MempoolStats,
    pub is_valid: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn amt(s: &str) -> Amount {
        s.parse().unwrap()
    }

    fn setup() -> (Blockchain, Keypair) {
        let mut chain = Blockchain::new(ChainConfig::default());
        let (_, keypair) = chain.create_wallet("Miner");
        (chain, keypair)
    }

    #[test]
    fn test_contract_view_reports_next_block_index() {
        let (mut chain, miner) = setup();
        chain.mine_pending(&miner).unwrap();

        let view = ChainView { blocks: chain.blocks() };
        assert_eq!(view.height(), chain.chain_length());
        assert_eq!(view.height(), chain.height() + 1);
    }

    #[test]
    fn test_blockchain_init() {
        let chain = Blockchain::default();

        assert_eq!(chain.chain_length(), 1);
        assert_eq!(chain.height(), 0);
        assert!(chain.latest_block().is_genesis());
        assert_eq!(chain.difficulty(), 1);
        assert!(chain.is_valid());

        let staking = chain.staking_contract().unwrap();
        assert_eq!(staking.address(), &chain.staking_address());
        assert_eq!(
            chain.wallet(&chain.staking_address()).unwrap().display_name,
            STAKING_WALLET_NAME
        );
    }

    #[test]
    fn test_mine_pays_reward_to_miner() {
        let (mut chain, miner) = setup();
        let block = chain.mine_pending(&miner).unwrap();

        assert_eq!(block.index, 1);
        assert_eq!(block.transactions.len(), 1);
        assert!(block.transactions[0].is_coinbase());
        assert_eq!(chain.balance_of(&miner.address(), false), Balance::from(amt("1")));
        assert!(chain.is_valid());
    }

    #[test]
    fn test_unknown_miner_not_found() {
        let mut chain = Blockchain::default();
        assert!(matches!(
            chain.mine_pending(&Keypair::generate()),
            Err(BlockchainError::NotFound(_))
        ));
        assert_eq!(chain.chain_length(), 1);
    }

    #[test]
    fn test_unregistered_sender_is_invalid_signature() {
        let mut chain = Blockchain::default();
        let stranger = Keypair::generate();
        let tx = Transaction::transfer(stranger.address(), Keypair::generate().address(), amt("1"), Amount::ZERO)
            .signed(&stranger);

        assert!(matches!(
            chain.create_transaction(tx),
            Err(BlockchainError::InvalidSignature)
        ));
    }

    #[test]
    fn test_coinbase_submission_rejected() {
        let mut chain = Blockchain::default();
        let tx = Transaction::coinbase(Keypair::generate().address(), amt("100"));
        assert!(matches!(
            chain.create_transaction(tx),
            Err(BlockchainError::InvalidSignature)
        ));
    }

    #[test]
    fn test_insufficient_funds_counts_mempool() {
        let (mut chain, miner) = setup();
        chain.mine_pending(&miner).unwrap();
        let to = Keypair::generate().address();

        let first = Transaction::transfer(miner.address(), to.clone(), amt("0.6"), Amount::ZERO).signed(&miner);
        assert!(chain.create_transaction(first).unwrap().is_queued());

        let second = Transaction::transfer(miner.address(), to, amt("0.6"), Amount::ZERO).signed(&miner);
        match chain.create_transaction(second) {
            Err(BlockchainError::InsufficientFunds { required, available, .. }) => {
                assert_eq!(required, amt("0.6"));
                assert_eq!(available, Balance::from(amt("0.4")));
            }
            other => panic!("expected InsufficientFunds, got {:?}", other),
        }
    }

    #[test]
    fn test_set_difficulty_clamped() {
        let mut chain = Blockchain::default();
        assert_eq!(chain.set_difficulty(0), 1);
        assert_eq!(chain.set_difficulty(4), 4);
        assert_eq!(chain.set_difficulty(99), 10);
        assert_eq!(chain.difficulty(), 10);
    }

    #[test]
    fn test_find_block_by_index_and_hash() {
        let (mut chain, miner) = setup();
        let block = chain.mine_pending(&miner).unwrap();

        assert_eq!(chain.find_block("1"), Some(&block));
        assert_eq!(chain.find_block(&block.hash.to_hex().to_lowercase()), Some(&block));
        assert_eq!(chain.find_block("7"), None);
        assert_eq!(chain.find_block("not-a-hash"), None);
    }

    #[test]
    fn test_stats() {
        let (mut chain, miner) = setup();
        chain.mine_pending(&miner).unwrap();

        let stats = chain.stats();
        assert_eq!(stats.height, 1);
        assert_eq!(stats.wallets, 2);
        assert_eq!(stats.contracts, 1);
        assert_eq!(stats.total_work, 4);
        assert!(stats.is_valid);
    }
}
