use log::debug;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::block::Block;
use super::transaction::Transaction;
use super::validator::Validator;

/// A peer's view of the ledger, as offered for reconciliation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChainSnapshot {
    pub chain: Vec<Block>,
    pub pending_transactions: Vec<Transaction>,
}

/// Result of a reconciliation round
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// No candidate was both longer and valid
    Kept { length: usize },
    /// The local chain and pool were swapped for a candidate's
    Replaced { previous_length: usize, length: usize },
}

/// Longest-valid-chain rule.
///
/// Only candidates strictly longer than `current_len` that pass full validation
/// qualify. Among qualifying candidates of equal length, the first one in input
/// order wins, so callers must present candidates in a fixed order.
///
/// # Arguments
///
/// * `current_len` - Length of the local chain
/// * `candidates` - Peer chains with their pending pools
/// * `validator` - Checks each candidate's blocks and pool
///
/// # Returns
///
/// The position of the winning candidate, or `None` to keep the local chain
pub fn select_longest_valid(
    current_len: usize,
    candidates: &[ChainSnapshot],
    validator: &Validator,
) -> Option<usize> {
    let mut best: Option<(usize, usize)> = None;

    for (position, candidate) in candidates.iter().enumerate() {
        let length = candidate.chain.len();
        let floor = best.map_or(current_len, |(_, best_len)| best_len);
        if length <= floor {
            continue;
        }

        let checked = validator
            .validate(&candidate.chain)
            .and_then(|()| validator.validate_pending(&candidate.pending_transactions));
        if let Err(err) = checked {
            debug!("Skipping candidate chain {} of length {}: {}", position, length, err);
            continue;
        }

        best = Some((position, length));
    }

    best.map(|(position, _)| position)
}
