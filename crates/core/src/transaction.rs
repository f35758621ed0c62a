//! Transaction types and signing.

use crate::amount::Amount;
use crate::crypto::{Address, CryptoError, Keypair, PublicKey, Signature};
use crate::hash::{hash, Hash};
use serde::{Deserialize, Serialize};

/// A value transfer on the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Sender's address (`COINBASE` for mining rewards).
    pub from: Address,
    /// Recipient's address.
    pub to: Address,
    /// Value to transfer.
    pub amount: Amount,
    /// Fee paid to the miner that includes this transaction.
    pub fee: Amount,
    /// Free-form note. Not covered by the signature.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// Sender's signature over the canonical payload.
    pub signature: Signature,
}

impl Transaction {
    /// Create a new unsigned transfer.
    pub fn transfer(from: Address, to: Address, amount: Amount, fee: Amount) -> Self {
        Self {
            from,
            to,
            amount,
            fee,
            note: None,
            signature: Signature::default(),
        }
    }

    /// Create a mining reward transaction.
    pub fn coinbase(to: Address, amount: Amount) -> Self {
        Self::transfer(Address::coinbase(), to, amount, Amount::ZERO)
    }

    /// Attach a note.
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// The exact string covered by the signature.
    ///
    /// Only `from`, `to`, `amount` and `fee` take part; notes do not.
    pub fn canonical_payload(&self) -> String {
        format!(
            "From:{}|To:{}|Amount:{}|Fee:{}",
            self.from, self.to, self.amount, self.fee
        )
    }

    /// Hash of the canonical payload (what actually gets signed).
    pub fn signing_hash(&self) -> Hash {
        hash(self.canonical_payload().as_bytes())
    }

    /// Sign the transaction with the given keypair.
    pub fn sign(&mut self, keypair: &Keypair) {
        self.signature = keypair.sign_hash(&self.signing_hash());
    }

    /// Create a signed transaction.
    pub fn signed(mut self, keypair: &Keypair) -> Self {
        self.sign(keypair);
        self
    }

    /// Verify the transaction signature.
    pub fn verify(&self, public_key: &PublicKey) -> Result<(), CryptoError> {
        public_key.verify_hash(&self.signing_hash(), &self.signature)
    }

    /// Check if this is a mining reward.
    pub fn is_coinbase(&self) -> bool {
        self.from.is_coinbase()
    }

    /// Amount plus fee.
    pub fn total_cost(&self) -> Amount {
        self.amount.saturating_add(self.fee)
    }
}
