//! Core ledger primitives for powchain.
//!
//! This crate provides the fundamental types used throughout the ledger:
//! - Cryptographic primitives (hashing, signing, addresses)
//! - Fixed-point amounts and signed balances
//! - Transactions and their canonical payloads
//! - Blocks with proof-of-work mining
//! - Wallets

pub mod amount;
pub mod block;
pub mod crypto;
pub mod hash;
pub mod transaction;
pub mod wallet;

// Re-export commonly used types at the crate root
pub use amount::{Amount, AmountError, Balance};
pub use block::Block;
pub use crypto::{Address, CryptoError, Keypair, PublicKey, Signature};
pub use hash::{hash, Hash};
pub use transaction::Transaction;
pub use wallet::Wallet;
