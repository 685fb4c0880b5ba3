use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::hash;
use super::transaction::Transaction;

/// Represents a block in the blockchain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    /// Index of the block in the chain
    pub index: u64,

    /// Timestamp when the block was created
    #[schema(value_type = String, example = "2023-01-01T12:00:00Z")]
    pub timestamp: DateTime<Utc>,

    /// Transactions that were pending when the block was mined
    pub transactions: Vec<Transaction>,

    /// Proof of work
    pub nonce: u64,

    /// Hash of this block
    pub hash: String,

    /// Hash of the previous block
    pub previous_block_hash: String,
}

/// The part of a block covered by its digest, besides the previous hash and nonce
#[derive(Debug, Clone, Copy, Serialize)]
pub struct BlockData<'a> {
    pub index: u64,
    pub transactions: &'a [Transaction],
}

/// Constants describing the canonical first block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenesisConfig {
    pub nonce: u64,
    pub previous_hash: String,
    pub hash: String,
}

impl Default for GenesisConfig {
    fn default() -> Self {
        GenesisConfig {
            nonce: 100,
            previous_hash: "0".to_string(),
            hash: "0".to_string(),
        }
    }
}

impl GenesisConfig {
    /// Builds the genesis block. Its timestamp is local and not checked by peers.
    pub fn block(&self) -> Block {
        Block::new(
            0,
            Vec::new(),
            self.nonce,
            self.previous_hash.clone(),
            self.hash.clone(),
        )
    }

    /// Returns true if `block` is the canonical genesis block
    pub fn matches(&self, block: &Block) -> bool {
        block.index == 0
            && block.nonce == self.nonce
            && block.previous_block_hash == self.previous_hash
            && block.hash == self.hash
            && block.transactions.is_empty()
    }
}

impl Block {
    /// Creates a block from already computed proof and hash
    pub fn new(
        index: u64,
        transactions: Vec<Transaction>,
        nonce: u64,
        previous_block_hash: String,
        hash: String,
    ) -> Self {
        Block {
            index,
            timestamp: Utc::now(),
            transactions,
            nonce,
            hash,
            previous_block_hash,
        }
    }

    /// Returns the payload covered by this block's digest
    pub fn data(&self) -> BlockData<'_> {
        BlockData {
            index: self.index,
            transactions: &self.transactions,
        }
    }

    /// Recomputes the digest from the block's contents
    pub fn calculate_hash(&self) -> String {
        hash::digest(&self.previous_block_hash, &self.data(), self.nonce)
    }
}
