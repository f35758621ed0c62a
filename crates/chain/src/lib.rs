//! Chain engine for powchain.
//!
//! This crate brings the lower layers together into a working ledger node:
//! - **Blockchain**: mempool admission, mining, validation and fork choice
//! - **Mempool**: pending transactions ordered by admission
//! - **Balances**: per-address amounts folded from history
//! - **NodeRegistry**: several isolated nodes and broadcast between them
//!
//! # Example
//!
//! ```rust
//! use powchain_chain::{Blockchain, ChainConfig};
//! use powchain_core::{Amount, Transaction};
//!
//! let mut chain = Blockchain::new(ChainConfig::default());
//! let (alice, alice_key) = chain.create_wallet("Alice");
//! let (bob, _) = chain.create_wallet("Bob");
//!
//! // Mine a block to fund Alice.
//! chain.mine_pending(&alice_key).unwrap();
//!
//! let tx = Transaction::transfer(alice.address.clone(), bob.address.clone(), "0.5".parse().unwrap(), Amount::ZERO)
//!     .signed(&alice_key);
//! assert!(chain.create_transaction(tx).unwrap().is_queued());
//!
//! chain.mine_pending(&alice_key).unwrap();
//! assert!(chain.is_valid());
//! assert_eq!(chain.balance_of(&bob.address, false).to_string(), "0.5");
//! ```

pub mod balances;
pub mod blockchain;
pub mod config;
pub mod mempool;
pub mod registry;

pub use balances::Balances;
pub use blockchain::{
    Admission, Blockchain, BlockchainError, BlockchainStats, Result, STAKING_WALLET_NAME,
};
pub use config::ChainConfig;
pub use mempool::{Mempool, MempoolConfig, MempoolError, MempoolStats};
pub use registry::{BroadcastReport, NodeRegistry};
