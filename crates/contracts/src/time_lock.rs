//! Sender-side time-lock contract.

use crate::view::LedgerView;
use powchain_core::{Address, Transaction};
use serde::{Deserialize, Serialize};

/// Funds held at the contract address cannot leave before `unlock_block_index`.
///
/// Only sender-side logic exists: when invoked for a transaction where it is
/// the `to` side it returns `false`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeLockContract {
    address: Address,
    unlock_block_index: u64,
    last_validation_error: Option<String>,
}

impl TimeLockContract {
    pub fn new(address: Address, unlock_block_index: u64) -> Self {
        Self {
            address,
            unlock_block_index,
            last_validation_error: None,
        }
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn unlock_block_index(&self) -> u64 {
        self.unlock_block_index
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
        current_block: u64,
    ) -> bool {
        if tx.from != self.address {
            self.last_validation_error = None;
            return false;
        }
        if current_block < self.unlock_block_index {
            self.last_validation_error = Some(format!(
                "contract is locked until block {}, current block is {}",
                self.unlock_block_index, current_block
            ));
            return false;
        }
        self.last_validation_error = None;
        true
    }

    pub fn configuration(&self) -> String {
        format!("TimeLockContract: unlock block index = {}", self.unlock_block_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::StaticView;
    use powchain_core::{Amount, Keypair};

    fn setup() -> (TimeLockContract, Address, Address) {
        let vault = Keypair::generate().address();
        let user = Keypair::generate().address();
        (TimeLockContract::new(vault.clone(), 100), vault, user)
    }

    #[test]
    fn test_locked_until_unlock_block() {
        let (mut contract, vault, user) = setup();
        let mut tx = Transaction::transfer(vault, user, Amount::from_whole(1), Amount::ZERO);

        assert!(!contract.validate_transaction(&StaticView::at_height(50), &mut tx, 50));
        let error = contract.last_validation_error().unwrap();
        assert!(error.contains("100"));
        assert!(error.contains("50"));

        assert!(!contract.validate_transaction(&StaticView::at_height(99), &mut tx, 99));
        assert!(contract.validate_transaction(&StaticView::at_height(100), &mut tx, 100));
        assert!(contract.last_validation_error().is_none());
        assert!(contract.validate_transaction(&StaticView::at_height(150), &mut tx, 150));
    }

    #[test]
    fn test_receiver_binding_always_rejects() {
        let (mut contract, vault, user) = setup();
        let mut deposit = Transaction::transfer(user, vault, Amount::from_whole(1), Amount::ZERO);

        assert!(!contract.validate_transaction(&StaticView::default(), &mut deposit, 500));
        assert!(contract.last_validation_error().is_none());
    }
}
