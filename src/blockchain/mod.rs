// Blockchain module
//
// This module contains the ledger engine:
// - Block and transaction structures
// - Hashing and proof of work
// - Pending pool and chain store
// - Validation, consensus and lookups

pub mod block;
pub mod chain;
pub mod consensus;
pub mod hash;
pub mod indexer;
pub mod pool;
pub mod pow;
pub mod transaction;
pub mod validator;

// Re-export main components for easier access
pub use block::{Block, GenesisConfig};
pub use chain::{BlockchainError, Ledger};
pub use consensus::{ChainSnapshot, ReconcileOutcome};
pub use indexer::AddressSummary;
pub use pool::TransactionPool;
pub use transaction::Transaction;
