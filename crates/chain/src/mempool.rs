//! Transaction mempool for pending transactions.
//!
//! Entries are keyed by a monotonically increasing id, so iteration order is
//! admission order and fee ties are broken by whichever arrived first.

use powchain_core::{Address, Amount, Transaction};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

/// Errors that can occur during mempool operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MempoolError {
    #[error("mempool is full (capacity: {0})")]
    MempoolFull(usize),

    #[error("transaction {0} not found in mempool")]
    TransactionNotFound(u64),
}

pub type Result<T> = std::result::Result<T, MempoolError>;

/// Configuration for the mempool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MempoolConfig {
    /// Maximum number of transactions in the mempool.
    pub max_transactions: usize,
}

impl Default for MempoolConfig {
    fn default() -> Self {
        Self {
            max_transactions: 10_000,
        }
    }
}

/// Transaction mempool.
#[derive(Debug, Clone)]
pub struct Mempool {
    config: MempoolConfig,
    /// Transactions indexed by admission id.
    transactions: BTreeMap<u64, Transaction>,
    /// Admission ids grouped by sender address.
    by_sender: HashMap<Address, Vec<u64>>,
    next_id: u64,
}

impl Mempool {
    /// Create a new mempool with default configuration.
    pub fn new() -> Self {
        Self::with_config(MempoolConfig::default())
    }

    /// Create a new mempool with the given configuration.
    pub fn with_config(config: MempoolConfig) -> Self {
        Self {
            config,
            transactions: BTreeMap::new(),
            by_sender: HashMap::new(),
            next_id: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    pub fn contains(&self, id: u64) -> bool {
        self.transactions.contains_key(&id)
    }

    pub fn get(&self, id: u64) -> Option<&Transaction> {
        self.transactions.get(&id)
    }

    /// Add a transaction, returning its admission id.
    ///
    /// Identical transactions are allowed; each gets its own entry.
    pub fn add(&mut self, tx: Transaction) -> Result<u64> {
        if self.transactions.len() >= self.config.max_transactions {
            return Err(MempoolError::MempoolFull(self.config.max_transactions));
        }

        let id = self.next_id;
        self.next_id += 1;
        self.by_sender.entry(tx.from.clone()).or_default().push(id);
        self.transactions.insert(id, tx);
        Ok(id)
    }

    /// Remove a transaction from the mempool.
    pub fn remove(&mut self, id: u64) -> Result<Transaction> {
        let tx = self
            .transactions
            .remove(&id)
            .ok_or(MempoolError::TransactionNotFound(id))?;

        if let Some(ids) = self.by_sender.get_mut(&tx.from) {
            ids.retain(|i| *i != id);
            if ids.is_empty() {
                self.by_sender.remove(&tx.from);
            }
        }

        Ok(tx)
    }

    /// Remove exactly the given entries. Unknown ids are ignored.
    pub fn remove_batch(&mut self, ids: &[u64]) {
        for id in ids {
            let _ = self.remove(*id);
        }
    }

    /// Get transactions from a specific sender, oldest first.
    pub fn get_by_sender(&self, sender: &Address) -> Vec<Transaction> {
        self.by_sender
            .get(sender)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| self.transactions.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Up to `limit` entries ordered by fee (highest first), ties by admission order.
    pub fn select_by_fee(&self, limit: usize) -> Vec<(u64, Transaction)> {
        let mut entries: Vec<(u64, Transaction)> = self
            .transactions
            .iter()
            .map(|(id, tx)| (*id, tx.clone()))
            .collect();
        entries.sort_by(|a, b| b.1.fee.cmp(&a.1.fee));
        entries.truncate(limit);
        entries
    }

    /// Transactions in admission order.
    pub fn iter(&self) -> impl Iterator<Item = &Transaction> {
        self.transactions.values()
    }

    /// Sum of fees currently waiting.
    pub fn total_fees(&self) -> Amount {
        self.iter().map(|tx| tx.fee).sum()
    }

    pub fn clear(&mut self) {
        self.transactions.clear();
        self.by_sender.clear();
    }

    pub fn stats(&self) -> MempoolStats {
        MempoolStats {
            total_transactions: self.len(),
            unique_senders: self.by_sender.len(),
            total_fees: self.total_fees(),
            capacity: self.config.max_transactions,
        }
    }
}

impl Default for Mempool {
    fn default() -> Self {
        Self::new()
    }
}

/// Mempool statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MempoolStats {
    pub total_transactions: usize,
    pub unique_senders: usize,
    pub total_fees: Amount,
    pub capacity: usize,
}
