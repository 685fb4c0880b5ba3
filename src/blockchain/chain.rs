use log::{debug, info};
use thiserror::Error;

use super::block::{Block, BlockData};
use super::consensus::{self, ChainSnapshot, ReconcileOutcome};
use super::hash;
use super::indexer::Indexer;
use super::pool::TransactionPool;
use super::pow::{CancelFlag, CancelOnDrop, ProofOfWork};
use super::transaction::{Transaction, TransactionError};
use super::validator::{ValidationError, Validator};
use crate::config::LedgerConfig;

/// Errors that can occur during blockchain operations
#[derive(Debug, Error)]
pub enum BlockchainError {
    #[error("Transaction error: {0}")]
    TransactionError(#[from] TransactionError),

    #[error("Invalid block: {0}")]
    InvalidBlock(#[from] ValidationError),

    #[error("Stale append: chain tip is {expected}, block was built on {got}")]
    StaleAppend { expected: String, got: String },

    #[error("Mining cancelled: a block at height {height} was accepted first")]
    MiningCancelled { height: u64 },

    #[error("System error: {0}")]
    SystemError(String),
}

/// Everything a worker needs to search for the next block's nonce
/// without holding the ledger.
#[derive(Debug, Clone)]
pub struct MiningJob {
    pub index: u64,
    pub previous_hash: String,
    pub transactions: Vec<Transaction>,
    pow: ProofOfWork,
    /// Shared with every job on the same tip
    cancel: CancelFlag,
    /// Private to this job; set when its caller goes away
    abandon: CancelFlag,
}

impl MiningJob {
    pub fn data(&self) -> BlockData<'_> {
        BlockData {
            index: self.index,
            transactions: &self.transactions,
        }
    }

    /// Runs the nonce search. Blocks the calling thread; `None` means the
    /// tip moved or the job was abandoned while searching.
    pub fn solve(&self) -> Option<u64> {
        self.pow.solve_until(&self.previous_hash, &self.data(), || {
            self.cancel.is_cancelled() || self.abandon.is_cancelled()
        })
    }

    /// True once the tip this job was built on has moved
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Guard that stops this job's search, and only this job's, when dropped
    pub fn abandon_on_drop(&self) -> CancelOnDrop {
        CancelOnDrop::new(self.abandon.clone())
    }
}

/// The node's copy of the ledger: chain plus pending pool, mutated as one unit.
///
/// Callers share it behind a single lock; nothing in here blocks except
/// [`Ledger::reconcile`], which validates candidate chains.
#[derive(Debug)]
pub struct Ledger {
    chain: Vec<Block>,
    pool: TransactionPool,
    validator: Validator,
    /// Cancels searches built on the current tip once the tip moves
    tip: CancelFlag,
}

impl Ledger {
    /// Creates a ledger holding only the genesis block
    pub fn new(config: &LedgerConfig) -> Self {
        let validator = Validator::new(
            ProofOfWork::new(config.difficulty_prefix.clone()),
            config.genesis.clone(),
        );

        Ledger {
            chain: vec![validator.genesis().block()],
            pool: TransactionPool::new(),
            validator,
            tip: CancelFlag::new(),
        }
    }

    /// Builds the canonical first block
    pub fn genesis(&self) -> Block {
        self.validator.genesis().block()
    }

    pub fn chain(&self) -> &[Block] {
        &self.chain
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    pub fn pending(&self) -> &[Transaction] {
        self.pool.pending()
    }

    pub fn validator(&self) -> &Validator {
        &self.validator
    }

    pub fn indexer(&self) -> Indexer<'_> {
        Indexer::new(&self.chain)
    }

    pub fn snapshot(&self) -> ChainSnapshot {
        ChainSnapshot {
            chain: self.chain.clone(),
            pending_transactions: self.pool.pending().to_vec(),
        }
    }

    pub fn last_block(&self) -> &Block {
        self.chain
            .last()
            .expect("ledger chain always starts with the genesis block")
    }

    /// Queues a transaction for the next block.
    ///
    /// # Arguments
    ///
    /// * `transaction` - An already validated transaction
    ///
    /// # Returns
    ///
    /// The index of the block expected to hold it. The hint is not binding: a
    /// peer's block may be accepted first.
    pub fn enqueue(&mut self, transaction: Transaction) -> u64 {
        self.pool.push(transaction);
        self.chain.len() as u64
    }

    /// Snapshots the next block's contents for an off-lock nonce search
    pub fn mining_job(&self) -> MiningJob {
        let last = self.last_block();
        MiningJob {
            index: last.index + 1,
            previous_hash: last.hash.clone(),
            transactions: self.pool.pending().to_vec(),
            pow: self.validator.pow().clone(),
            cancel: self.tip.clone(),
            abandon: CancelFlag::new(),
        }
    }

    /// Appends a block built from the current pool, then drains the pool.
    ///
    /// The caller guarantees `previous_hash` is the current tip and that
    /// `nonce`/`hash` were computed over the current pool.
    pub fn append(&mut self, nonce: u64, previous_hash: String, hash: String) -> Block {
        let index = self.last_block().index + 1;
        let transactions = self.pool.drain();
        let block = Block::new(index, transactions, nonce, previous_hash, hash);

        self.chain.push(block.clone());
        self.advance_tip();
        info!("Appended block {} ({} transactions)", block.index, block.transactions.len());

        block
    }

    /// Attempts to append the result of a finished search.
    ///
    /// Returns `Ok(None)` when the pool changed during the search, in which case
    /// the caller should start a new job.
    pub fn complete(&mut self, job: &MiningJob, nonce: u64) -> Result<Option<Block>, BlockchainError> {
        let tip = self.last_block();
        if job.is_cancelled() || tip.hash != job.previous_hash {
            return Err(BlockchainError::StaleAppend {
                expected: tip.hash.clone(),
                got: job.previous_hash.clone(),
            });
        }

        if self.pool.pending() != job.transactions.as_slice() {
            debug!("Pending pool changed while mining block {}, restarting search", job.index);
            return Ok(None);
        }

        let hash = hash::digest(&job.previous_hash, &job.data(), nonce);
        Ok(Some(self.append(nonce, job.previous_hash.clone(), hash)))
    }

    /// Accepts a block mined elsewhere if it extends the tip.
    ///
    /// On acceptance the whole pending pool is dropped, whether or not the
    /// block carried those transactions.
    ///
    /// # Returns
    ///
    /// The new tip, or `InvalidBlock` naming the first failed check. A rejected
    /// block leaves chain and pool untouched.
    pub fn receive_block(&mut self, block: Block) -> Result<&Block, BlockchainError> {
        self.validator.check_link(self.last_block(), &block)?;

        let dropped = self.pool.drain();
        if !dropped.is_empty() {
            debug!("Dropped {} pending transactions on block receipt", dropped.len());
        }
        info!("Accepted block {} from peer", block.index);

        self.chain.push(block);
        self.advance_tip();

        Ok(self.last_block())
    }

    /// Adopts the longest valid candidate strictly longer than the local chain,
    /// replacing chain and pending pool together.
    pub fn reconcile(&mut self, mut candidates: Vec<ChainSnapshot>) -> ReconcileOutcome {
        let previous_length = self.chain.len();

        match consensus::select_longest_valid(previous_length, &candidates, &self.validator) {
            Some(position) => {
                let winner = candidates.swap_remove(position);
                self.chain = winner.chain;
                self.pool.replace(winner.pending_transactions);
                self.advance_tip();
                info!("Replaced chain of length {} with length {}", previous_length, self.chain.len());

                ReconcileOutcome::Replaced {
                    previous_length,
                    length: self.chain.len(),
                }
            }
            None => {
                info!("Kept local chain of length {}", previous_length);
                ReconcileOutcome::Kept { length: previous_length }
            }
        }
    }

    pub fn is_valid(&self) -> bool {
        self.validator.is_valid(&self.chain)
    }

    fn advance_tip(&mut self) {
        self.tip.cancel();
        self.tip = CancelFlag::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::block::GenesisConfig;

    fn test_config() -> LedgerConfig {
        LedgerConfig {
            difficulty_prefix: "0".to_string(),
            genesis: GenesisConfig::default(),
        }
    }

    fn mine(ledger: &mut Ledger) -> Block {
        let job = ledger.mining_job();
        let nonce = job.solve().unwrap();
        ledger.complete(&job, nonce).unwrap().unwrap()
    }

    #[test]
    fn test_new_ledger() {
        let ledger = Ledger::new(&test_config());
        let last = ledger.last_block();

        assert_eq!(ledger.len(), 1);
        assert_eq!(last.index, 0);
        assert!(last.transactions.is_empty());
        assert_eq!(last.previous_block_hash, "0");
        assert_eq!(last, &ledger.genesis());
    }

    #[test]
    fn test_enqueue_solve_append() {
        let mut ledger = Ledger::new(&test_config());
        let transaction = TransactionPool::create("R", 5.0, "A", "B");

        assert_eq!(ledger.enqueue(transaction.clone()), 1);

        let last = ledger.last_block().clone();
        let transactions = ledger.pending().to_vec();
        let payload = BlockData { index: last.index + 1, transactions: &transactions };
        let nonce = ledger.validator().pow().solve(&last.hash, &payload);
        let hash = hash::digest(&last.hash, &payload, nonce);
        let block = ledger.append(nonce, last.hash.clone(), hash);

        assert_eq!(ledger.len(), 2);
        assert!(ledger.pending().is_empty());
        assert_eq!(block.transactions, vec![transaction]);
        assert!(ledger.is_valid());
    }

    #[test]
    fn test_address_summary_after_mining() {
        let mut ledger = Ledger::new(&test_config());
        ledger.enqueue(TransactionPool::create("R", 5.0, "A", "B"));
        mine(&mut ledger);

        let summary = ledger.indexer().address_summary("B");
        assert_eq!(summary.balance, 5.0);
        assert_eq!(summary.received_transactions.len(), 1);
        assert!(summary.sent_transactions.is_empty());
    }

    #[test]
    fn test_pending_transactions_do_not_count() {
        let mut ledger = Ledger::new(&test_config());
        ledger.enqueue(TransactionPool::create("R", 5.0, "A", "B"));

        assert_eq!(ledger.indexer().address_summary("B").balance, 0.0);
    }

    #[test]
    fn test_sequential_appends_stay_valid() {
        let mut ledger = Ledger::new(&test_config());
        for round in 0..5 {
            ledger.enqueue(TransactionPool::create("R", round as f64, "A", "B"));
            mine(&mut ledger);
        }

        assert_eq!(ledger.len(), 6);
        assert!(ledger.is_valid());
    }

    #[test]
    fn test_complete_restarts_when_pool_changes() {
        let mut ledger = Ledger::new(&test_config());
        let job = ledger.mining_job();
        let nonce = job.solve().unwrap();

        ledger.enqueue(TransactionPool::create("R", 1.0, "A", "B"));

        assert!(ledger.complete(&job, nonce).unwrap().is_none());
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_receive_block_cancels_local_search_and_clears_pool() {
        let mut peer = Ledger::new(&test_config());
        peer.enqueue(TransactionPool::create("R", 5.0, "A", "B"));
        let block = mine(&mut peer);

        let mut local = Ledger::new(&test_config());
        local.enqueue(TransactionPool::create("Z", 9.0, "C", "D"));
        let job = local.mining_job();

        local.receive_block(block).unwrap();

        assert!(job.is_cancelled());
        assert_eq!(job.solve(), None);
        assert!(local.pending().is_empty());
        assert_eq!(local.len(), 2);
        assert!(matches!(
            local.complete(&job, 0),
            Err(BlockchainError::StaleAppend { .. })
        ));
    }

    #[test]
    fn test_receive_block_survives_wire_round_trip() {
        let mut peer = Ledger::new(&test_config());
        peer.enqueue(TransactionPool::create("R", 985.6906946328695, "A", "B"));
        let block = mine(&mut peer);

        let wire = serde_json::to_string(&block).unwrap();
        let parsed: Block = serde_json::from_str(&wire).unwrap();

        let mut local = Ledger::new(&test_config());
        assert!(local.receive_block(parsed).is_ok());
        assert_eq!(local.chain(), peer.chain());
    }

    #[test]
    fn test_decimal_amount_keeps_its_digest() {
        let body = r#"{"transactionId":"abc","urlResource":"R","amount":0.14308855823429798,"sender":"A","recipient":"B","timestamp":"2024-01-01T00:00:00Z"}"#;
        let transaction = Transaction::from_json(serde_json::from_str(body).unwrap()).unwrap();
        assert_eq!(transaction.amount, 0.14308855823429798);
        let block = Block::new(1, vec![transaction], 7, "0".to_string(), String::new());

        let parsed: Block = serde_json::from_str(&serde_json::to_string(&block).unwrap()).unwrap();

        assert_eq!(parsed.calculate_hash(), block.calculate_hash());
    }

    #[test]
    fn test_receive_block_rejects_malformed_transaction() {
        let mut peer = Ledger::new(&test_config());
        peer.enqueue(Transaction::new("R", -500.0, "", "B"));
        let forged = mine(&mut peer);

        let mut local = Ledger::new(&test_config());
        local.enqueue(TransactionPool::create("L", 1.0, "C", "D"));

        assert!(matches!(
            local.receive_block(forged),
            Err(BlockchainError::InvalidBlock(ValidationError::MalformedTransaction { index: 1, .. }))
        ));
        assert_eq!(local.len(), 1);
        assert_eq!(local.pending().len(), 1);
        assert_eq!(local.indexer().address_summary("B").balance, 0.0);
    }

    #[test]
    fn test_reconcile_rejects_chain_with_malformed_transaction() {
        let mut peer = Ledger::new(&test_config());
        peer.enqueue(Transaction::new("R", -500.0, "", "B"));
        mine(&mut peer);
        mine(&mut peer);

        let mut local = Ledger::new(&test_config());
        let outcome = local.reconcile(vec![peer.snapshot()]);

        assert_eq!(outcome, ReconcileOutcome::Kept { length: 1 });
        assert_eq!(local.indexer().address_summary("B").balance, 0.0);
    }

    #[test]
    fn test_receive_block_rejects_bad_link() {
        let mut peer = Ledger::new(&test_config());
        mine(&mut peer);
        let second = mine(&mut peer);

        let mut local = Ledger::new(&test_config());
        local.enqueue(TransactionPool::create("R", 5.0, "A", "B"));

        assert!(matches!(
            local.receive_block(second),
            Err(BlockchainError::InvalidBlock(ValidationError::IndexGap { .. }))
        ));
        assert_eq!(local.len(), 1);
        assert_eq!(local.pending().len(), 1);
    }

    #[test]
    fn test_reconcile_adopts_longest_valid_chain() {
        let mut two = Ledger::new(&test_config());
        mine(&mut two);
        let mut three = Ledger::new(&test_config());
        mine(&mut three);
        mine(&mut three);
        three.enqueue(TransactionPool::create("R", 1.0, "A", "B"));

        let mut local = Ledger::new(&test_config());
        local.enqueue(TransactionPool::create("L", 2.0, "C", "D"));
        let outcome = local.reconcile(vec![two.snapshot(), three.snapshot()]);

        assert_eq!(outcome, ReconcileOutcome::Replaced { previous_length: 1, length: 3 });
        assert_eq!(local.chain(), three.chain());
        assert_eq!(local.pending(), three.pending());
    }

    #[test]
    fn test_reconcile_cancels_local_search() {
        let mut three = Ledger::new(&test_config());
        mine(&mut three);
        mine(&mut three);

        let mut local = Ledger::new(&test_config());
        local.enqueue(TransactionPool::create("L", 2.0, "C", "D"));
        let job = local.mining_job();

        let outcome = local.reconcile(vec![three.snapshot()]);

        assert_eq!(outcome, ReconcileOutcome::Replaced { previous_length: 1, length: 3 });
        assert!(job.is_cancelled());
        assert_eq!(job.solve(), None);
        assert!(matches!(
            local.complete(&job, 0),
            Err(BlockchainError::StaleAppend { .. })
        ));
        assert_eq!(local.len(), 3);
    }

    #[test]
    fn test_abandoned_job_stops_without_touching_the_tip() {
        let mut config = test_config();
        config.difficulty_prefix = "z".to_string();
        let ledger = Ledger::new(&config);
        let job = ledger.mining_job();
        let sibling = ledger.mining_job();

        drop(job.abandon_on_drop());

        assert_eq!(job.solve(), None);
        assert!(!job.is_cancelled());
        assert!(!sibling.is_cancelled());
    }

    #[test]
    fn test_reconcile_rejects_tampered_chain() {
        let mut three = Ledger::new(&test_config());
        mine(&mut three);
        mine(&mut three);
        let mut snapshot = three.snapshot();
        snapshot.chain[2].nonce += 1;

        let mut local = Ledger::new(&test_config());
        let before = local.chain().to_vec();
        let outcome = local.reconcile(vec![snapshot]);

        assert_eq!(outcome, ReconcileOutcome::Kept { length: 1 });
        assert_eq!(local.chain(), before.as_slice());
    }

    #[test]
    fn test_digest_agrees_across_ledgers() {
        let first = Ledger::new(&test_config());
        let second = Ledger::new(&test_config());
        let transactions = vec![TransactionPool::create("R", 5.0, "A", "B")];
        let payload = BlockData { index: 1, transactions: &transactions };

        let a = hash::digest(&first.last_block().hash, &payload, 3);
        let b = hash::digest(&second.last_block().hash, &payload, 3);
        assert_eq!(a, b);
    }
}
