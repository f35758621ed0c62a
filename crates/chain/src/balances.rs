//! Balances derived by folding transaction history.
//!
//! Nothing here is cached: every call re-walks the transactions it is given.
//! A transfer debits `amount + fee` from the sender and credits `amount` to
//! the receiver; fees reappear in the miner's coinbase. Coinbase credits
//! have no matching debit.

use powchain_core::{Address, Balance, Block, Transaction};
use std::collections::BTreeMap;

/// Per-address net amounts.
pub type Balances = BTreeMap<Address, Balance>;

/// Apply one transaction to `balances`.
pub fn apply(mut balances: Balances, tx: &Transaction) -> Balances {
    if !tx.is_coinbase() {
        balances.entry(tx.from.clone()).or_default().debit(tx.total_cost());
    }
    balances.entry(tx.to.clone()).or_default().credit(tx.amount);
    balances
}

/// Fold an ordered sequence of transactions into balances.
pub fn fold<'a>(txs: impl IntoIterator<Item = &'a Transaction>) -> Balances {
    txs.into_iter().fold(Balances::new(), apply)
}

/// Every transaction of `blocks` in chain order, followed by `pending`.
pub fn history<'a>(
    blocks: &'a [Block],
    pending: impl IntoIterator<Item = &'a Transaction> + 'a,
) -> impl Iterator<Item = &'a Transaction> + 'a {
    blocks
        .iter()
        .flat_map(|block| block.transactions.iter())
        .chain(pending)
}

/// Balance of a single address over `txs`.
pub fn balance_of<'a>(address: &Address, txs: impl IntoIterator<Item = &'a Transaction>) -> Balance {
    txs.into_iter().fold(Balance::ZERO, |mut balance, tx| {
        if &tx.from == address && !tx.is_coinbase() {
            balance.debit(tx.total_cost());
        }
        if &tx.to == address {
            balance.credit(tx.amount);
        }
        balance
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use powchain_core::{Amount, Keypair};

    fn amt(s: &str) -> Amount {
        s.parse().unwrap()
    }

    #[test]
    fn test_conservation_without_coinbase() {
        let a = Keypair::generate().address();
        let b = Keypair::generate().address();
        let c = Keypair::generate().address();
        let txs = vec![
            Transaction::transfer(a.clone(), b.clone(), amt("5"), Amount::ZERO),
            Transaction::transfer(b.clone(), c.clone(), amt("2.5"), Amount::ZERO),
            Transaction::transfer(c, a, amt("0.00000001"), Amount::ZERO),
        ];

        let total: Balance = fold(&txs).into_values().sum();
        assert_eq!(total, Balance::ZERO);
    }

    #[test]
    fn test_fees_leave_sender() {
        let a = Keypair::generate().address();
        let b = Keypair::generate().address();
        let txs = vec![
            Transaction::coinbase(a.clone(), amt("2")),
            Transaction::transfer(a.clone(), b.clone(), amt("1"), amt("0.1")),
        ];

        let balances = fold(&txs);
        assert_eq!(balances[&a], Balance::from(amt("0.9")));
        assert_eq!(balances[&b], Balance::from(amt("1")));
        assert!(!balances.contains_key(&Address::coinbase()));
        assert_eq!(balance_of(&a, &txs), balances[&a]);
    }

    #[test]
    fn test_history_orders_blocks_before_pending() {
        let a = Keypair::generate().address();
        let mut block = Block::genesis(0);
        block.set_transactions(vec![Transaction::coinbase(a.clone(), amt("1"))]);
        let pending = vec![Transaction::transfer(a.clone(), a.clone(), amt("1"), amt("0.5"))];

        let ordered: Vec<&Transaction> = history(std::slice::from_ref(&block), &pending).collect();
        assert_eq!(ordered.len(), 2);
        assert!(ordered[0].is_coinbase());
        assert_eq!(balance_of(&a, ordered), Balance::from(amt("0.5")));
    }
}
