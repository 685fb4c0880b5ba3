use thiserror::Error;

use super::block::{Block, GenesisConfig};
use super::pow::ProofOfWork;
use super::transaction::Transaction;

/// Why a block or chain was refused
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Chain is empty")]
    EmptyChain,

    #[error("Genesis block does not match the canonical constants")]
    BadGenesis,

    #[error("Block {index}: expected index {expected}")]
    IndexGap { index: u64, expected: u64 },

    #[error("Block {index}: previous hash {got} does not match {expected}")]
    BrokenLink { index: u64, expected: String, got: String },

    #[error("Block {index}: recorded hash {recorded} does not match contents ({computed})")]
    HashMismatch { index: u64, recorded: String, computed: String },

    #[error("Block {index}: hash {hash} does not meet difficulty prefix {prefix}")]
    InsufficientWork { index: u64, hash: String, prefix: String },

    #[error("Block {index}: transaction {id} is malformed: {reason}")]
    MalformedTransaction { index: u64, id: String, reason: String },

    #[error("Pending transaction {id} is malformed: {reason}")]
    MalformedPending { id: String, reason: String },
}

/// Structural and proof-of-work checks over blocks and whole chains
#[derive(Debug, Clone, Default)]
pub struct Validator {
    pow: ProofOfWork,
    genesis: GenesisConfig,
}

impl Validator {
    pub fn new(pow: ProofOfWork, genesis: GenesisConfig) -> Self {
        Validator { pow, genesis }
    }

    pub fn pow(&self) -> &ProofOfWork {
        &self.pow
    }

    pub fn genesis(&self) -> &GenesisConfig {
        &self.genesis
    }

    /// Checks that `block` correctly extends `previous`
    pub fn check_link(&self, previous: &Block, block: &Block) -> Result<(), ValidationError> {
        let expected = previous.index + 1;
        if block.index != expected {
            return Err(ValidationError::IndexGap { index: block.index, expected });
        }

        if block.previous_block_hash != previous.hash {
            return Err(ValidationError::BrokenLink {
                index: block.index,
                expected: previous.hash.clone(),
                got: block.previous_block_hash.clone(),
            });
        }

        for transaction in &block.transactions {
            transaction
                .validate()
                .map_err(|err| ValidationError::MalformedTransaction {
                    index: block.index,
                    id: transaction.id.clone(),
                    reason: err.to_string(),
                })?;
        }

        let computed = block.calculate_hash();
        if computed != block.hash {
            return Err(ValidationError::HashMismatch {
                index: block.index,
                recorded: block.hash.clone(),
                computed,
            });
        }

        if !self.pow.is_satisfied(&block.hash) {
            return Err(ValidationError::InsufficientWork {
                index: block.index,
                hash: block.hash.clone(),
                prefix: self.pow.prefix().to_string(),
            });
        }

        Ok(())
    }

    /// Walks the chain from genesis, stopping at the first violation
    pub fn validate(&self, chain: &[Block]) -> Result<(), ValidationError> {
        let genesis = chain.first().ok_or(ValidationError::EmptyChain)?;
        if !self.genesis.matches(genesis) {
            return Err(ValidationError::BadGenesis);
        }

        chain
            .windows(2)
            .try_for_each(|pair| self.check_link(&pair[0], &pair[1]))
    }

    pub fn is_valid(&self, chain: &[Block]) -> bool {
        self.validate(chain).is_ok()
    }

    /// Checks a pool offered by a peer before it can replace ours
    pub fn validate_pending(&self, pending: &[Transaction]) -> Result<(), ValidationError> {
        pending.iter().try_for_each(|transaction| {
            transaction
                .validate()
                .map_err(|err| ValidationError::MalformedPending {
                    id: transaction.id.clone(),
                    reason: err.to_string(),
                })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::block::BlockData;
    use crate::blockchain::{hash, Transaction};

    fn validator() -> Validator {
        Validator::new(ProofOfWork::new("0"), GenesisConfig::default())
    }

    fn mine_next(validator: &Validator, previous: &Block, transactions: Vec<Transaction>) -> Block {
        let payload = BlockData { index: previous.index + 1, transactions: &transactions };
        let nonce = validator.pow().solve(&previous.hash, &payload);
        let hash = hash::digest(&previous.hash, &payload, nonce);
        Block::new(previous.index + 1, transactions, nonce, previous.hash.clone(), hash)
    }

    fn build_chain(validator: &Validator, length: usize) -> Vec<Block> {
        let mut chain = vec![validator.genesis().block()];
        while chain.len() < length {
            let transactions = vec![Transaction::new("R", chain.len() as f64, "A", "B")];
            let next = mine_next(validator, chain.last().unwrap(), transactions);
            chain.push(next);
        }
        chain
    }

    #[test]
    fn test_valid_chain() {
        let validator = validator();
        let chain = build_chain(&validator, 4);

        assert!(validator.is_valid(&chain));
        assert!(validator.is_valid(&chain[..1]));
    }

    #[test]
    fn test_empty_chain_is_invalid() {
        assert_eq!(validator().validate(&[]), Err(ValidationError::EmptyChain));
    }

    #[test]
    fn test_bad_genesis() {
        let validator = validator();
        let mut chain = build_chain(&validator, 2);
        chain[0].nonce = 1;

        assert_eq!(validator.validate(&chain), Err(ValidationError::BadGenesis));
    }

    #[test]
    fn test_tampered_amount_is_detected() {
        let validator = validator();
        let mut chain = build_chain(&validator, 4);
        chain[2].transactions[0].amount = 1000.0;

        assert!(matches!(
            validator.validate(&chain),
            Err(ValidationError::HashMismatch { index: 2, .. })
        ));
    }

    #[test]
    fn test_malformed_transaction_in_block_is_detected() {
        let validator = validator();
        let mut chain = build_chain(&validator, 2);
        let forged = mine_next(&validator, &chain[1], vec![Transaction::new("R", -500.0, "", "B")]);
        chain.push(forged);

        assert!(matches!(
            validator.validate(&chain),
            Err(ValidationError::MalformedTransaction { index: 2, .. })
        ));
    }

    #[test]
    fn test_validate_pending() {
        let validator = validator();

        assert!(validator.validate_pending(&[Transaction::new("R", 1.0, "A", "B")]).is_ok());
        assert!(matches!(
            validator.validate_pending(&[Transaction::new("R", f64::INFINITY, "A", "B")]),
            Err(ValidationError::MalformedPending { .. })
        ));
    }

    #[test]
    fn test_broken_link_is_detected() {
        let validator = validator();
        let mut chain = build_chain(&validator, 3);
        chain[2].previous_block_hash = "deadbeef".to_string();

        assert!(matches!(
            validator.validate(&chain),
            Err(ValidationError::BrokenLink { index: 2, .. })
        ));
    }

    #[test]
    fn test_index_gap_is_detected() {
        let validator = validator();
        let mut chain = build_chain(&validator, 3);
        chain.remove(1);

        assert!(!validator.is_valid(&chain));
    }

    #[test]
    fn test_insufficient_work_is_detected() {
        let easy = Validator::new(ProofOfWork::new(""), GenesisConfig::default());
        let genesis = easy.genesis().block();
        let payload = BlockData { index: 1, transactions: &[] };
        // Pick a nonce whose hash does not start with '0'
        let nonce = (0..)
            .find(|&n| !hash::digest(&genesis.hash, &payload, n).starts_with('0'))
            .unwrap();
        let hash = hash::digest(&genesis.hash, &payload, nonce);
        let block = Block::new(1, Vec::new(), nonce, genesis.hash.clone(), hash);

        let chain = vec![genesis, block];
        assert!(easy.is_valid(&chain));
        assert!(matches!(
            validator().validate(&chain),
            Err(ValidationError::InsufficientWork { index: 1, .. })
        ));
    }
}
