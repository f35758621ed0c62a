//! Transaction-validating smart contracts for powchain.
//!
//! A contract is bound to its own address. The chain engine invokes it as
//! the **receiver** validator when `tx.to` is the contract address and as
//! the **sender** validator when `tx.from` is; both may apply to the same
//! transaction.
//!
//! Contracts never fail with an error: rejection is a `false` result plus
//! a human-readable [`SmartContract::last_validation_error`].
//!
//! # Example
//!
//! ```rust
//! use powchain_contracts::{SmartContract, TimeLockContract, StaticView};
//! use powchain_core::{Amount, Keypair, Transaction};
//!
//! let vault = Keypair::generate();
//! let mut contract = SmartContract::from(TimeLockContract::new(vault.address(), 100));
//!
//! let mut tx = Transaction::transfer(vault.address(), Keypair::generate().address(), Amount::from_whole(1), Amount::ZERO);
//! assert!(!contract.validate_transaction(&StaticView::at_height(50), &mut tx, 50));
//! assert!(contract.validate_transaction(&StaticView::at_height(100), &mut tx, 100));
//! ```

pub mod allow_list;
pub mod contract;
pub mod staking;
pub mod time_lock;
pub mod view;

pub use allow_list::AllowListContract;
pub use contract::SmartContract;
pub use staking::{PenaltyStakingContract, StakingConfig, STAKE_EPSILON};
pub use time_lock::TimeLockContract;
pub use view::{LedgerView, StaticView};
