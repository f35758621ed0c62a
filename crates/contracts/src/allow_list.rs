//! Receiver-side allow-list contract.

use crate::view::LedgerView;
use powchain_core::{Address, Transaction};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Accepts incoming transfers only from a fixed set of senders.
///
/// As a sender binding it has nothing to check and always accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowListContract {
    address: Address,
    allowed_senders: BTreeSet<Address>,
    last_validation_error: Option<String>,
}

impl AllowListContract {
    pub fn new(address: Address, allowed: impl IntoIterator<Item = Address>) -> Self {
        Self {
            address,
            allowed_senders: allowed.into_iter().collect(),
            last_validation_error: None,
        }
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn allowed_senders(&self) -> &BTreeSet<Address> {
        &self.allowed_senders
    }

    pub fn last_validation_error(&self) -> Option<&str> {
        self.last_validation_error.as_deref()
    }

    pub(crate) fn set_last_validation_error(&mut self, error: Option<String>) {
        self.last_validation_error = error;
    }

    pub fn validate_transaction(
        &mut self,
        _view: &dyn LedgerView,
        tx: &mut Transaction,
        _current_block: u64,
    ) -> bool {
        if tx.to == self.address && !self.allowed_senders.contains(&tx.from) {
            self.last_validation_error = Some(format!(
                "address {} is not allowed to send transactions to {}",
                tx.from, self.address
            ));
            return false;
        }
        self.last_validation_error = None;
        true
    }

    pub fn configuration(&self) -> String {
        let allowed: Vec<&str> = self.allowed_senders.iter().map(Address::as_str).collect();
        format!("AllowListContract: allowed senders = [{}]", allowed.join(", "))
    }
}
