//! The closed set of contract kinds and their common entry point.

use crate::allow_list::AllowListContract;
use crate::staking::PenaltyStakingContract;
use crate::time_lock::TimeLockContract;
use crate::view::LedgerView;
use powchain_core::{Address, Transaction};
use serde::{Deserialize, Serialize};

/// A contract bound to an address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum SmartContract {
    AllowList(AllowListContract),
    TimeLock(TimeLockContract),
    PenaltyStaking(PenaltyStakingContract),
}

impl SmartContract {
    /// Address the contract is bound to.
    pub fn address(&self) -> &Address {
        match self {
            SmartContract::AllowList(c) => c.address(),
            SmartContract::TimeLock(c) => c.address(),
            SmartContract::PenaltyStaking(c) => c.address(),
        }
    }

    /// Short name of the contract kind.
    pub fn kind(&self) -> &'static str {
        match self {
            SmartContract::AllowList(_) => "AllowList",
            SmartContract::TimeLock(_) => "TimeLock",
            SmartContract::PenaltyStaking(_) => "PenaltyStaking",
        }
    }

    /// Validate `tx` at `current_block`.
    ///
    /// May update private state and, for staking withdrawals, rewrite
    /// `tx.amount`. Callers that need all-or-nothing semantics should run
    /// this on clones and commit them only on success.
    pub fn validate_transaction(
        &mut self,
        view: &dyn LedgerView,
        tx: &mut Transaction,
        current_block: u64,
    ) -> bool {
        let accepted = match self {
            SmartContract::AllowList(c) => c.validate_transaction(view, tx, current_block),
            SmartContract::TimeLock(c) => c.validate_transaction(view, tx, current_block),
            SmartContract::PenaltyStaking(c) => c.validate_transaction(view, tx, current_block),
        };
        if !accepted {
            tracing::debug!(
                contract = %self.address(),
                kind = self.kind(),
                height = view.height(),
                reason = self.last_validation_error().unwrap_or(""),
                "contract rejected transaction"
            );
        }
        accepted
    }

    /// Reason for the most recent rejection, cleared on acceptance.
    pub fn last_validation_error(&self) -> Option<&str> {
        match self {
            SmartContract::AllowList(c) => c.last_validation_error(),
            SmartContract::TimeLock(c) => c.last_validation_error(),
            SmartContract::PenaltyStaking(c) => c.last_validation_error(),
        }
    }

    /// Overwrite the recorded rejection reason without touching other state.
    pub fn set_last_validation_error(&mut self, error: Option<String>) {
        match self {
            SmartContract::AllowList(c) => c.set_last_validation_error(error),
            SmartContract::TimeLock(c) => c.set_last_validation_error(error),
            SmartContract::PenaltyStaking(c) => c.set_last_validation_error(error),
        }
    }

    /// Human-readable configuration summary.
    pub fn configuration(&self) -> String {
        match self {
            SmartContract::AllowList(c) => c.configuration(),
            SmartContract::TimeLock(c) => c.configuration(),
            SmartContract::PenaltyStaking(c) => c.configuration(),
        }
    }

    pub fn as_staking(&self) -> Option<&PenaltyStakingContract> {
        match self {
            SmartContract::PenaltyStaking(c) => Some(c),
            _ => None,
        }
    }
}

impl From<AllowListContract> for SmartContract {
    fn from(contract: AllowListContract) -> Self {
        SmartContract::AllowList(contract)
    }
}

impl From<TimeLockContract> for SmartContract {
    fn from(contract: TimeLockContract) -> Self {
        SmartContract::TimeLock(contract)
    }
}

impl From<PenaltyStakingContract> for SmartContract {
    fn from(contract: PenaltyStakingContract) -> Self {
        SmartContract::PenaltyStaking(contract)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::staking::StakingConfig;
    use crate::view::StaticView;
    use powchain_core::{Amount, Keypair};

    #[test]
    fn test_dispatch_reaches_variant() {
        let vault = Keypair::generate().address();
        let user = Keypair::generate().address();
        let mut contract = SmartContract::from(TimeLockContract::new(vault.clone(), 10));
        let mut tx = Transaction::transfer(vault.clone(), user, Amount::from_whole(1), Amount::ZERO);

        assert_eq!(contract.address(), &vault);
        assert_eq!(contract.kind(), "TimeLock");
        assert!(!contract.validate_transaction(&StaticView::at_height(3), &mut tx, 3));
        assert!(contract.last_validation_error().is_some());
        assert!(contract.configuration().contains("10"));
    }

    #[test]
    fn test_set_last_validation_error_only_touches_error() {
        let addr = Keypair::generate().address();
        let staker = Keypair::generate().address();
        let mut contract = SmartContract::from(PenaltyStakingContract::new(addr.clone(), StakingConfig::default()));
        let mut deposit = Transaction::transfer(staker.clone(), addr, Amount::from_whole(2), Amount::ZERO);
        assert!(contract.validate_transaction(&StaticView::default(), &mut deposit, 1));

        contract.set_last_validation_error(Some("nope".into()));
        assert_eq!(contract.last_validation_error(), Some("nope"));
        assert_eq!(
            contract.as_staking().unwrap().stake_amount(&staker),
            Amount::from_whole(2)
        );
    }

    #[test]
    fn test_serde_tagged() {
        let contract = SmartContract::from(TimeLockContract::new(Keypair::generate().address(), 7));
        let json = serde_json::to_string(&contract).unwrap();
        assert!(json.contains("\"kind\":\"TimeLock\""));
        let back: SmartContract = serde_json::from_str(&json).unwrap();
        assert_eq!(back, contract);
    }
}
