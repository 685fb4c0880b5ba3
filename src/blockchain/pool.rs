use std::mem;

use super::transaction::Transaction;

/// Transactions waiting to be included in a block, in arrival order
#[derive(Debug, Clone, Default)]
pub struct TransactionPool {
    pending: Vec<Transaction>,
}

impl TransactionPool {
    pub fn new() -> Self {
        TransactionPool::default()
    }

    /// Stamps a new transaction with a fresh id and timestamp
    pub fn create(
        resource: impl Into<String>,
        amount: f64,
        sender: impl Into<String>,
        recipient: impl Into<String>,
    ) -> Transaction {
        Transaction::new(resource, amount, sender, recipient)
    }

    pub fn push(&mut self, transaction: Transaction) {
        self.pending.push(transaction);
    }

    /// Empties the pool, returning what it held
    pub fn drain(&mut self) -> Vec<Transaction> {
        mem::take(&mut self.pending)
    }

    /// Swaps in another node's pool wholesale
    pub fn replace(&mut self, transactions: Vec<Transaction>) {
        self.pending = transactions;
    }

    pub fn pending(&self) -> &[Transaction] {
        &self.pending
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_preserves_order() {
        let mut pool = TransactionPool::new();
        let first = TransactionPool::create("R", 1.0, "A", "B");
        let second = TransactionPool::create("R", 2.0, "B", "C");

        pool.push(first.clone());
        pool.push(second.clone());

        assert_eq!(pool.pending(), &[first, second]);
    }

    #[test]
    fn test_drain_empties_pool() {
        let mut pool = TransactionPool::new();
        pool.push(TransactionPool::create("R", 1.0, "A", "B"));

        let drained = pool.drain();

        assert_eq!(drained.len(), 1);
        assert!(pool.is_empty());
        assert!(pool.drain().is_empty());
    }
}
