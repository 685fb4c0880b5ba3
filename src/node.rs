//! A running node: the ledger behind one lock, the peer registry, and the
//! background miner.

use std::sync::{Mutex, MutexGuard};

use log::{debug, info};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::blockchain::{
    AddressSummary, Block, BlockchainError, ChainSnapshot, Ledger, ReconcileOutcome, Transaction,
    TransactionPool,
};
use crate::config::{LedgerConfig, RewardConfig};
use crate::network::PeerRegistry;

/// Everything `GET /blockchain` exposes about this node
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NodeSnapshot {
    pub chain: Vec<Block>,
    pub pending_transactions: Vec<Transaction>,
    pub current_node_url: String,
    pub network_nodes: Vec<String>,
}

#[derive(Debug)]
pub struct Node {
    /// Chain and pool are mutated together under this lock
    ledger: Mutex<Ledger>,
    registry: Mutex<PeerRegistry>,
    /// Recipient of this node's mining rewards
    node_address: String,
    reward: RewardConfig,
}

impl Node {
    pub fn new(current_node_url: impl Into<String>, ledger: &LedgerConfig, reward: RewardConfig) -> Self {
        Node {
            ledger: Mutex::new(Ledger::new(ledger)),
            registry: Mutex::new(PeerRegistry::new(current_node_url)),
            node_address: Uuid::new_v4().simple().to_string(),
            reward,
        }
    }

    pub fn node_address(&self) -> &str {
        &self.node_address
    }

    fn ledger(&self) -> Result<MutexGuard<'_, Ledger>, BlockchainError> {
        self.ledger
            .lock()
            .map_err(|_| BlockchainError::SystemError("ledger lock poisoned".to_string()))
    }

    fn registry(&self) -> Result<MutexGuard<'_, PeerRegistry>, BlockchainError> {
        self.registry
            .lock()
            .map_err(|_| BlockchainError::SystemError("peer registry lock poisoned".to_string()))
    }

    pub fn snapshot(&self) -> Result<NodeSnapshot, BlockchainError> {
        let ChainSnapshot { chain, pending_transactions } = self.ledger()?.snapshot();
        let registry = self.registry()?;

        Ok(NodeSnapshot {
            chain,
            pending_transactions,
            current_node_url: registry.self_address().to_string(),
            network_nodes: registry.list_others(),
        })
    }

    /// Accepts an externally built transaction into the pool.
    /// Returns the index of the block it is expected to land in.
    pub fn submit_transaction(&self, transaction: Transaction) -> Result<u64, BlockchainError> {
        transaction.validate()?;
        Ok(self.ledger()?.enqueue(transaction))
    }

    /// Creates a transaction stamped by this node and queues it
    pub fn create_transaction(
        &self,
        resource: &str,
        amount: f64,
        sender: &str,
        recipient: &str,
    ) -> Result<(Transaction, u64), BlockchainError> {
        let transaction = TransactionPool::create(resource, amount, sender, recipient);
        let hint = self.submit_transaction(transaction.clone())?;
        Ok((transaction, hint))
    }

    /// Queues the reward for the block this node just mined
    pub fn create_reward_transaction(&self) -> Result<(Transaction, u64), BlockchainError> {
        self.create_transaction(
            &self.reward.resource,
            self.reward.amount,
            &self.reward.sender,
            &self.node_address,
        )
    }

    /// Mines the next block from the current pool.
    ///
    /// The nonce search runs on a blocking worker with the ledger unlocked; the
    /// lock is taken again only to append. If another block is accepted first
    /// the search is abandoned, as it is when this future is dropped.
    pub async fn mine(&self) -> Result<Block, BlockchainError> {
        loop {
            let job = self.ledger()?.mining_job();
            debug!("Mining block {} over {} transactions", job.index, job.transactions.len());

            let _abandon = job.abandon_on_drop();
            let worker = job.clone();
            let nonce = tokio::task::spawn_blocking(move || worker.solve())
                .await
                .map_err(|e| BlockchainError::SystemError(format!("mining task failed: {}", e)))?;

            let Some(nonce) = nonce else {
                info!("Abandoned mining block {}: tip moved", job.index);
                return Err(BlockchainError::MiningCancelled { height: job.index });
            };

            if let Some(block) = self.ledger()?.complete(&job, nonce)? {
                info!("Mined block {} with nonce {}", block.index, block.nonce);
                return Ok(block);
            }
        }
    }

    /// Accepts a peer's block if it extends our tip
    pub fn receive_block(&self, block: Block) -> Result<Block, BlockchainError> {
        Ok(self.ledger()?.receive_block(block)?.clone())
    }

    /// Runs the longest-valid-chain rule over candidates in the given order
    pub fn reconcile(&self, candidates: Vec<ChainSnapshot>) -> Result<ReconcileOutcome, BlockchainError> {
        Ok(self.ledger()?.reconcile(candidates))
    }

    pub fn chain(&self) -> Result<Vec<Block>, BlockchainError> {
        Ok(self.ledger()?.chain().to_vec())
    }

    pub fn is_valid(&self) -> Result<bool, BlockchainError> {
        Ok(self.ledger()?.is_valid())
    }

    pub fn block_by_hash(&self, hash: &str) -> Result<Option<Block>, BlockchainError> {
        Ok(self.ledger()?.indexer().block_by_hash(hash).cloned())
    }

    pub fn transaction_by_id(&self, id: &str) -> Result<Option<(Transaction, Block)>, BlockchainError> {
        Ok(self
            .ledger()?
            .indexer()
            .transaction_by_id(id)
            .map(|(transaction, block)| (transaction.clone(), block.clone())))
    }

    pub fn address_summary(&self, address: &str) -> Result<AddressSummary, BlockchainError> {
        Ok(self.ledger()?.indexer().address_summary(address))
    }

    pub fn current_node_url(&self) -> Result<String, BlockchainError> {
        Ok(self.registry()?.self_address().to_string())
    }

    pub fn register_peer(&self, address: &str) -> Result<bool, BlockchainError> {
        let added = self.registry()?.add(address);
        if added {
            info!("Registered peer {}", address);
        }
        Ok(added)
    }

    pub fn register_peers(&self, addresses: &[String]) -> Result<usize, BlockchainError> {
        let added = self.registry()?.add_bulk(addresses);
        info!("Registered {} new peers in bulk", added);
        Ok(added)
    }

    /// Known peers in registration order
    pub fn peers(&self) -> Result<Vec<String>, BlockchainError> {
        Ok(self.registry()?.list_others())
    }
}
