use sha2::{Digest, Sha256};

use super::block::BlockData;

/// Computes the digest of a block
///
/// The input is the previous block hash, then the payload as compact JSON
/// (`index` followed by the transactions in list order, each with its fields
/// in declared order), then the nonce in decimal. The SHA-256 of that byte
/// stream is returned as lowercase hex.
///
/// # Arguments
///
/// * `previous_hash` - Hash of the preceding block
/// * `payload` - The block's index and transactions
/// * `nonce` - Candidate proof of work
pub fn digest(previous_hash: &str, payload: &BlockData<'_>, nonce: u64) -> String {
    let mut hasher = Sha256::new();

    hasher.update(previous_hash.as_bytes());
    serde_json::to_writer(&mut hasher, payload)
        .expect("block payload only holds strings, numbers and timestamps");
    hasher.update(nonce.to_string().as_bytes());

    hex::encode(hasher.finalize())
}
