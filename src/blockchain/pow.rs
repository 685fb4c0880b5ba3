use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::block::BlockData;
use super::hash;

/// Default difficulty: the hash must start with four zero characters
pub const DEFAULT_DIFFICULTY_PREFIX: &str = "0000";

/// Shared flag used to abandon an in-flight nonce search.
///
/// Once triggered the flag stays set; a new search needs a new flag.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        CancelFlag(Arc::new(AtomicBool::new(false)))
    }

    /// Signals every search holding this flag to stop
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Triggers the wrapped flag when dropped, so a search outlives no one waiting on it
#[derive(Debug)]
pub struct CancelOnDrop(CancelFlag);

impl CancelOnDrop {
    pub fn new(flag: CancelFlag) -> Self {
        CancelOnDrop(flag)
    }
}

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.cancel();
    }
}

/// Brute-force nonce search against a fixed hash prefix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProofOfWork {
    prefix: String,
}

impl Default for ProofOfWork {
    fn default() -> Self {
        ProofOfWork::new(DEFAULT_DIFFICULTY_PREFIX)
    }
}

impl ProofOfWork {
    pub fn new(prefix: impl Into<String>) -> Self {
        ProofOfWork { prefix: prefix.into() }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Returns true if `hash` meets the difficulty
    pub fn is_satisfied(&self, hash: &str) -> bool {
        hash.starts_with(&self.prefix)
    }

    /// Finds the first nonce, counting up from zero, whose digest meets the difficulty
    ///
    /// Runs until a nonce is found; expected work grows 16x per prefix character.
    ///
    /// # Arguments
    ///
    /// * `previous_hash` - Hash of the block being extended
    /// * `payload` - Index and transactions of the block being mined
    ///
    /// # Returns
    ///
    /// The smallest satisfying nonce
    pub fn solve(&self, previous_hash: &str, payload: &BlockData<'_>) -> u64 {
        let mut nonce = 0;
        while !self.is_satisfied(&hash::digest(previous_hash, payload, nonce)) {
            nonce += 1;
        }
        nonce
    }

    /// Same search as [`ProofOfWork::solve`], checking `stop` before every
    /// attempt and returning `None` once it reports true
    pub fn solve_until(
        &self,
        previous_hash: &str,
        payload: &BlockData<'_>,
        stop: impl Fn() -> bool,
    ) -> Option<u64> {
        let mut nonce = 0;
        loop {
            if stop() {
                return None;
            }
            if self.is_satisfied(&hash::digest(previous_hash, payload, nonce)) {
                return Some(nonce);
            }
            nonce += 1;
        }
    }
}
