use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::block::Block;
use super::transaction::Transaction;

/// Settled activity of one address
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddressSummary {
    /// Received minus sent, over settled blocks only
    pub balance: f64,
    pub sent_transactions: Vec<Transaction>,
    pub received_transactions: Vec<Transaction>,
}

/// Read-only lookups over a chain. Every lookup is a linear scan.
#[derive(Debug, Clone, Copy)]
pub struct Indexer<'a> {
    chain: &'a [Block],
}

impl<'a> Indexer<'a> {
    pub fn new(chain: &'a [Block]) -> Self {
        Indexer { chain }
    }

    pub fn block_by_hash(&self, hash: &str) -> Option<&'a Block> {
        self.chain.iter().find(|block| block.hash == hash)
    }

    /// Finds a settled transaction and the block that holds it
    pub fn transaction_by_id(&self, id: &str) -> Option<(&'a Transaction, &'a Block)> {
        self.chain.iter().find_map(|block| {
            block
                .transactions
                .iter()
                .find(|transaction| transaction.id == id)
                .map(|transaction| (transaction, block))
        })
    }

    /// Aggregates every settled transaction touching `address`.
    /// A self-transfer shows up in both lists and nets to zero.
    ///
    /// # Returns
    ///
    /// An empty summary when the address never appears on the chain
    pub fn address_summary(&self, address: &str) -> AddressSummary {
        let mut summary = AddressSummary::default();

        for transaction in self.chain.iter().flat_map(|block| &block.transactions) {
            if transaction.recipient == address {
                summary.balance += transaction.amount;
                summary.received_transactions.push(transaction.clone());
            }
            if transaction.sender == address {
                summary.balance -= transaction.amount;
                summary.sent_transactions.push(transaction.clone());
            }
        }

        summary
    }
}
