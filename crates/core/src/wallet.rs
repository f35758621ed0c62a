//! Registered wallets.

use crate::crypto::{Address, PublicKey};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A wallet known to a node: the binding from an address to its public key.
///
/// Immutable once created; re-registering the same key replaces the entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    pub address: Address,
    pub public_key: PublicKey,
    pub display_name: String,
    pub registered_at: DateTime<Utc>,
}

impl Wallet {
    /// Create a wallet, deriving its address from the public key.
    pub fn new(public_key: PublicKey, display_name: impl Into<String>) -> Self {
        Self {
            address: public_key.to_address(),
            public_key,
            display_name: display_name.into(),
            registered_at: Utc::now(),
        }
    }
}
